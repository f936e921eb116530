mod init;
pub use init::cmd_init;

use std::error::Error;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::document_io::{self, DocumentStore, JsonStore};
use crate::io::lock::PlanLock;
use crate::model::{Document, EditorConfig, NodeId, NodeKind, Status, YearMonth};
use crate::ops::{check, search};
use crate::session::{Edit, Session, Side};

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let file = cli.file.as_deref();
    match cli.command {
        // Init creates the plan, so it runs before discovery
        Commands::Init(args) => cmd_init(args, file),
        // Config only needs the directory
        Commands::Config(args) => cmd_config(args, file, cli.json),
        command => {
            let ctx = Context::resolve(file, cli.json)?;
            run(&ctx, command)
        }
    }
}

fn run(ctx: &Context, command: Commands) -> CmdResult {
    match command {
        Commands::Init(_) | Commands::Config(_) => Ok(()),

        // Read commands
        Commands::Tree(args) => cmd_tree(ctx, args),
        Commands::Show(args) => cmd_show(ctx, args),
        Commands::Check => cmd_check(ctx),
        Commands::Search(args) => cmd_search(ctx, args),
        Commands::Stats(args) => cmd_stats(ctx, args),

        // Write commands
        Commands::Add(args) => cmd_add(ctx, args),
        Commands::Rename(args) => cmd_rename(ctx, args),
        Commands::Owner(args) => cmd_owner(ctx, args),
        Commands::Prefix(args) => cmd_prefix(ctx, args),
        Commands::Target(args) => cmd_target(ctx, args),
        Commands::Milestone(args) => cmd_milestone(ctx, args),
        Commands::Mv(args) => cmd_mv(ctx, args),
        Commands::Rm(args) => cmd_rm(ctx, args),
        Commands::Paste(args) => cmd_paste(ctx, args),
        Commands::Import(args) => cmd_import(ctx, args),
        Commands::Wp(cmd) => cmd_wp(ctx, cmd.action),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Where the plan lives and how to treat it, resolved once per invocation
struct Context {
    plan: PathBuf,
    config: EditorConfig,
    json: bool,
    today: NaiveDate,
}

/// Result of a write: what the recorded command did, and the node it made
struct Written {
    action: Option<String>,
    node: Option<NodeId>,
}

fn plan_dir(plan: &Path) -> PathBuf {
    match plan.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Context {
    fn resolve(file: Option<&str>, json: bool) -> Result<Self, Box<dyn Error>> {
        let cwd = std::env::current_dir()?;
        let plan = match file {
            Some(f) => cwd.join(f),
            None => document_io::discover_document(&cwd)?,
        };
        let (config, _) = config_io::read_config(&plan_dir(&plan))?;
        tracing::debug!(plan = %plan.display(), "using plan");
        Ok(Context {
            plan,
            config,
            json,
            today: Local::now().date_naive(),
        })
    }

    fn store(&self) -> JsonStore {
        JsonStore {
            exclusivity: self.config.program_exclusivity,
        }
    }

    fn load(&self) -> Result<Document, Box<dyn Error>> {
        Ok(self.store().load(&self.plan)?)
    }

    /// Load under the plan lock, run one edit, and save if it changed
    /// anything. A rejected edit is reported as an error.
    fn write<T>(
        &self,
        edit: impl FnOnce(&mut Session, NaiveDate) -> Result<Edit<T>, Box<dyn Error>>,
    ) -> Result<(T, Option<String>), Box<dyn Error>> {
        let _lock = PlanLock::acquire_default(&self.plan)?;
        let mut session = Session::new(self.load()?, self.config.clone());
        let value = match edit(&mut session, self.today)? {
            Edit::Applied(value) => value,
            Edit::Rejected(reason) => return Err(reason.into()),
        };
        if !session.is_dirty() {
            return Ok((value, None));
        }
        let action = session.history().peek_undo_description().map(str::to_string);
        self.store().save(session.document(), &self.plan)?;
        session.mark_saved();
        Ok((value, action))
    }

    fn report(&self, written: Written) -> CmdResult {
        if self.json {
            let out = EditJson {
                action: written.action.unwrap_or_else(|| "no change".to_string()),
                node: written.node,
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
            return Ok(());
        }
        match (written.action, written.node) {
            (Some(action), Some(node)) => println!("{} ({})", action, node),
            (Some(action), None) => println!("{}", action),
            (None, _) => println!("no change"),
        }
        Ok(())
    }
}

/// Resolve a node reference: `#ID`, `@SEQ`, a `/` path of names below the
/// root, or a name that is unique in the plan.
fn resolve_node(doc: &Document, reference: &str) -> Result<NodeId, String> {
    let reference = reference.trim();
    if let Some(id) = reference.strip_prefix('#') {
        let id: NodeId = id
            .parse()
            .map_err(|_| format!("invalid node id '{}'", reference))?;
        return if doc.contains(id) && doc.is_attached(id) {
            Ok(id)
        } else {
            Err(format!("no node {}", reference))
        };
    }
    if let Some(seq) = reference.strip_prefix('@') {
        let seq: u32 = seq
            .parse()
            .map_err(|_| format!("invalid feature number '{}'", reference))?;
        return doc
            .find_feature(seq)
            .ok_or_else(|| format!("no feature {}", reference));
    }

    let segments: Vec<&str> = reference
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(found) = walk_path(doc, &segments) {
        return Ok(found);
    }
    if let [name] = segments.as_slice() {
        let matches: Vec<NodeId> = doc
            .walk()
            .into_iter()
            .filter(|id| doc.name(*id) == *name)
            .collect();
        match matches.as_slice() {
            [single] => return Ok(*single),
            [] => {}
            many => {
                let ids: Vec<String> = many.iter().map(|id| id.to_string()).collect();
                return Err(format!(
                    "'{}' is ambiguous ({}); use an id or a path",
                    name,
                    ids.join(", ")
                ));
            }
        }
    }
    Err(format!("no node '{}'", reference))
}

/// Follow child names from the root. A leading segment naming the root is
/// optional.
fn walk_path(doc: &Document, segments: &[&str]) -> Option<NodeId> {
    let root = doc.root();
    let segments = match segments.split_first() {
        Some((first, rest)) if *first == doc.name(root) => rest,
        _ => segments,
    };
    segments.iter().try_fold(root, |current, name| {
        doc.children(current)
            .iter()
            .copied()
            .find(|c| doc.name(*c) == *name)
    })
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

/// Milestone by 1-based position or by name
fn resolve_milestone(doc: &Document, feature: NodeId, reference: &str) -> Result<usize, String> {
    let count = doc.node(feature).milestones().len();
    if let Ok(n) = reference.parse::<usize>() {
        return if (1..=count).contains(&n) {
            Ok(n - 1)
        } else {
            Err(format!("milestone {} out of range (1-{})", n, count))
        };
    }
    milestone_names(doc, feature)
        .iter()
        .position(|name| name.eq_ignore_ascii_case(reference))
        .ok_or_else(|| format!("no milestone named '{}'", reference))
}

/// `None` for a missing or blank value, or the word "none"
fn optional_value(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("none"))
}

// ---------------------------------------------------------------------------
// Read command handlers
// ---------------------------------------------------------------------------

fn cmd_tree(ctx: &Context, args: TreeArgs) -> CmdResult {
    let doc = ctx.load()?;
    let start = match &args.node {
        Some(r) => resolve_node(&doc, r)?,
        None => doc.root(),
    };
    if ctx.json {
        let tree = node_to_json(&doc, start, args.depth, ctx.today);
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        for line in format_tree(&doc, start, args.depth, &ctx.config.display, ctx.today) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_show(ctx: &Context, args: NodeArg) -> CmdResult {
    let doc = ctx.load()?;
    let id = resolve_node(&doc, &args.node)?;
    if ctx.json {
        let detail = node_detail_to_json(&doc, id, ctx.today);
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        for line in format_node_detail(&doc, id, ctx.today) {
            println!("{}", line);
        }
    }
    Ok(())
}

fn cmd_check(ctx: &Context) -> CmdResult {
    // Read without validation so every problem is reported
    let doc = ctx.store().read(&ctx.plan)?;
    let result = check::check_document(&doc, ctx.config.program_exclusivity, ctx.today);

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        if !result.errors.is_empty() {
            println!("Errors:");
            for err in &result.errors {
                println!("  {}", err);
            }
        }
        if !result.warnings.is_empty() {
            if !result.errors.is_empty() {
                println!();
            }
            println!("Warnings:");
            for warn in &result.warnings {
                println!("  {}", warn);
            }
        }
        if result.valid {
            println!("✓ plan is valid");
        } else {
            println!("✗ plan has errors");
        }
    }
    if result.valid {
        Ok(())
    } else {
        Err(format!("{} error(s) found", result.errors.len()).into())
    }
}

fn cmd_search(ctx: &Context, args: SearchArgs) -> CmdResult {
    let doc = ctx.load()?;
    let results: Vec<SearchResultJson> = if args.regex {
        let re = Regex::new(&args.query)?;
        search::search_nodes(&doc, &re)
            .into_iter()
            .map(|hit| SearchResultJson {
                id: hit.node,
                kind: doc.kind(hit.node),
                name: doc.name(hit.node).to_string(),
                path: doc.path(hit.node).into_iter().map(str::to_string).collect(),
                score: None,
                field: Some(hit.field),
            })
            .collect()
    } else {
        search::fuzzy_search(&doc, &args.query)
            .into_iter()
            .map(|m| SearchResultJson {
                id: m.node,
                kind: doc.kind(m.node),
                name: doc.name(m.node).to_string(),
                path: m.path,
                score: Some(m.score),
                field: None,
            })
            .collect()
    };

    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for r in &results {
            let field = r
                .field
                .filter(|f| *f != search::MatchField::Name)
                .map(|f| format!(" (matched {})", f.label()))
                .unwrap_or_default();
            println!("{} [{}] {}{}", r.id, r.kind, r.path.join(" / "), field);
        }
    }
    Ok(())
}

fn cmd_stats(ctx: &Context, args: StatsArgs) -> CmdResult {
    let doc = ctx.load()?;
    let id = match &args.node {
        Some(r) => resolve_node(&doc, r)?,
        None => doc.root(),
    };
    if ctx.json {
        println!("{}", serde_json::to_string_pretty(&stats_to_json(&doc, id))?);
        return Ok(());
    }
    println!("{} {}", doc.kind(id), doc.name(id));
    for line in format_stats(&doc, id) {
        println!("  {}", line);
    }
    let children = doc.children(id);
    if !children.is_empty() && doc.kind(id) != NodeKind::Activity {
        println!();
        for child in children {
            let s = stats_to_json(&doc, *child);
            println!(
                "  {:>3}%  {}/{} complete  {}",
                s.completion,
                s.complete,
                s.features,
                doc.name(*child)
            );
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Write command handlers
// ---------------------------------------------------------------------------

fn cmd_add(ctx: &Context, args: AddArgs) -> CmdResult {
    let kind: NodeKind = args.kind.parse()?;
    let (node, action) = ctx.write(|s, today| {
        let parent = resolve_node(s.document(), &args.parent)?;
        Ok(s.add_child(parent, kind, &args.name, args.at, today)?)
    })?;
    ctx.report(Written {
        action,
        node: Some(node),
    })
}

fn cmd_rename(ctx: &Context, args: RenameArgs) -> CmdResult {
    let ((), action) = ctx.write(|s, _| {
        let node = resolve_node(s.document(), &args.node)?;
        Ok(s.rename(node, &args.name)?)
    })?;
    ctx.report(Written { action, node: None })
}

fn cmd_owner(ctx: &Context, args: OptionalValueArgs) -> CmdResult {
    let ((), action) = ctx.write(|s, _| {
        let node = resolve_node(s.document(), &args.node)?;
        Ok(s.set_owner(node, optional_value(args.value.as_deref()))?)
    })?;
    ctx.report(Written { action, node: None })
}

fn cmd_prefix(ctx: &Context, args: OptionalValueArgs) -> CmdResult {
    let ((), action) = ctx.write(|s, _| {
        let node = resolve_node(s.document(), &args.node)?;
        Ok(s.set_prefix(node, optional_value(args.value.as_deref()))?)
    })?;
    ctx.report(Written { action, node: None })
}

fn cmd_target(ctx: &Context, args: OptionalValueArgs) -> CmdResult {
    let month = optional_value(args.value.as_deref())
        .map(str::parse::<YearMonth>)
        .transpose()?;
    let ((), action) = ctx.write(|s, _| {
        let node = resolve_node(s.document(), &args.node)?;
        Ok(s.set_target_month(node, month)?)
    })?;
    ctx.report(Written { action, node: None })
}

fn cmd_milestone(ctx: &Context, args: MilestoneArgs) -> CmdResult {
    if args.status.is_none() && args.planned.is_none() && args.actual.is_none() {
        return Err("nothing to change: give a status, --planned or --actual".into());
    }
    let status = args.status.as_deref().map(str::parse::<Status>).transpose()?;
    let planned = args.planned.as_deref().map(parse_date).transpose()?;
    let actual = match optional_value(args.actual.as_deref()) {
        Some(d) => Some(Some(parse_date(d)?)),
        None if args.actual.is_some() => Some(None),
        None => None,
    };

    let ((), action) = ctx.write(|s, today| {
        let feature = resolve_node(s.document(), &args.feature)?;
        if s.document().kind(feature) != NodeKind::Feature {
            return Ok(Edit::Rejected(format!("{} is not a feature", args.feature)));
        }
        let index = resolve_milestone(s.document(), feature, &args.milestone)?;
        if let Some(status) = status {
            s.set_milestone_status(feature, index, status, today)?;
        }
        if planned.is_some() || actual.is_some() {
            let current = &s.document().node(feature).milestones()[index];
            let planned = planned.unwrap_or(current.planned);
            let actual = actual.unwrap_or(current.actual);
            s.set_milestone_dates(feature, index, planned, actual)?;
        }
        Ok(Edit::Applied(()))
    })?;
    ctx.report(Written { action, node: None })
}

fn cmd_mv(ctx: &Context, args: MvArgs) -> CmdResult {
    let (index, action) = ctx.write(|s, today| {
        let node = resolve_node(s.document(), &args.node)?;
        let sibling = match (&args.before, &args.after) {
            (Some(r), _) => Some((r, Side::Before)),
            (None, Some(r)) => Some((r, Side::After)),
            (None, None) => None,
        };
        if let Some((reference, side)) = sibling {
            let reference = resolve_node(s.document(), reference)?;
            return Ok(s.insert_as_sibling(node, reference, side, today)?);
        }
        let Some(parent) = &args.parent else {
            return Err("give a new parent, --before or --after".into());
        };
        let parent = resolve_node(s.document(), parent)?;
        Ok(s.move_node(node, parent, args.at, today)?)
    })?;
    let action = action.map(|a| format!("{} to position {}", a, index));
    ctx.report(Written { action, node: None })
}

fn cmd_rm(ctx: &Context, args: NodeArg) -> CmdResult {
    let ((), action) = ctx.write(|s, _| {
        let node = resolve_node(s.document(), &args.node)?;
        Ok(s.delete(node)?)
    })?;
    ctx.report(Written { action, node: None })
}

fn cmd_paste(ctx: &Context, args: PasteArgs) -> CmdResult {
    let (copy, action) = ctx.write(|s, today| {
        let source = resolve_node(s.document(), &args.source)?;
        let parent = resolve_node(s.document(), &args.parent)?;
        Ok(s.paste(source, parent, args.at, today)?)
    })?;
    ctx.report(Written {
        action,
        node: Some(copy),
    })
}

fn cmd_import(ctx: &Context, args: ImportArgs) -> CmdResult {
    let text = if args.file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(&args.file)
            .map_err(|e| format!("could not read {}: {}", args.file, e))?
    };
    let (roots, action) = ctx.write(|s, today| {
        let parent = resolve_node(s.document(), &args.parent)?;
        Ok(s.import_outline(parent, &text, today)?)
    })?;
    let action = action.map(|a| format!("{} ({} top-level entries)", a, roots.len()));
    ctx.report(Written {
        action,
        node: roots.first().copied(),
    })
}

fn cmd_wp(ctx: &Context, action: WpAction) -> CmdResult {
    if let WpAction::List { project } = &action {
        let doc = ctx.load()?;
        let id = resolve_node(&doc, project)?;
        let Some(packages) = doc.node(id).work_packages() else {
            return Err(format!("{} is not a project", project).into());
        };
        if ctx.json {
            println!("{}", serde_json::to_string_pretty(packages)?);
        } else {
            for line in format_work_packages(packages) {
                println!("{}", line);
            }
        }
        return Ok(());
    }

    if let WpAction::Prune = &action {
        let (removed, done) = ctx.write(|s, _| Ok(s.prune_work_packages()?))?;
        let done = done.map(|a| format!("{} ({} entries removed)", a, removed));
        return ctx.report(Written {
            action: done,
            node: None,
        });
    }

    let ((), done) = ctx.write(|s, _| {
        let edit = match &action {
            WpAction::Add { project, name } => {
                let project = resolve_node(s.document(), project)?;
                s.add_work_package(project, name)?
            }
            WpAction::Rename { project, from, to } => {
                let project = resolve_node(s.document(), project)?;
                s.rename_work_package(project, from, to)?
            }
            WpAction::Rm { project, name } => {
                let project = resolve_node(s.document(), project)?;
                s.delete_work_package(project, name)?
            }
            WpAction::Assign { feature, package } => {
                let feature = resolve_node(s.document(), feature)?;
                s.assign_work_package(feature, optional_value(package.as_deref()))?
            }
            WpAction::List { .. } | WpAction::Prune => Edit::Applied(()),
        };
        Ok(edit)
    })?;
    ctx.report(Written {
        action: done,
        node: None,
    })
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn cmd_config(args: ConfigArgs, file: Option<&str>, json: bool) -> CmdResult {
    let cwd = std::env::current_dir()?;
    let dir = match file {
        Some(f) => plan_dir(&cwd.join(f)),
        None => document_io::discover_document(&cwd)
            .map(|plan| plan_dir(&plan))
            .unwrap_or(cwd),
    };
    let (config, mut doc) = config_io::read_config(&dir)?;

    match (args.key, args.value) {
        (None, _) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                for key in config_io::KEYS {
                    println!("{} = {}", key, config_io::get_option(&config, key)?);
                }
            }
        }
        (Some(key), None) => println!("{}", config_io::get_option(&config, &key)?),
        (Some(key), Some(value)) => {
            let updated = config_io::set_option(&mut doc, &key, &value)?;
            config_io::write_config(&dir, &doc)?;
            println!("{} = {}", key, config_io::get_option(&updated, &key)?);
        }
    }
    Ok(())
}
