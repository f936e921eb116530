use clap::{Args, Parser, Subcommand};

/// Nodes are addressed as `#ID` (arena id shown by `fdt tree`), `@SEQ`
/// (Feature sequence number) or a `/`-separated name path below the root.
#[derive(Parser)]
#[command(name = "fdt", about = concat!("fdt v", env!("CARGO_PKG_VERSION"), " - feature-driven development plans"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Plan file (default: nearest plan.fdd.json in this or a parent directory)
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new plan file in the current directory
    Init(InitArgs),
    /// Show the plan tree with progress
    Tree(TreeArgs),
    /// Show one node in detail
    Show(NodeArg),
    /// Validate plan integrity
    Check,
    /// Search node names (ranked), or names, owners and prefixes by regex
    Search(SearchArgs),
    /// Show feature counts and completion
    Stats(StatsArgs),
    /// Add a node under a parent
    Add(AddArgs),
    /// Rename a node
    Rename(RenameArgs),
    /// Set or clear the owner of an Activity or Feature
    Owner(OptionalValueArgs),
    /// Set or clear the prefix of a Subject
    Prefix(OptionalValueArgs),
    /// Set or clear the target month (YYYY-MM) of an Activity
    Target(OptionalValueArgs),
    /// Update a Feature milestone
    Milestone(MilestoneArgs),
    /// Move a node (and its subtree)
    Mv(MvArgs),
    /// Delete a node (and its subtree)
    Rm(NodeArg),
    /// Copy a node (and its subtree) under a parent
    Paste(PasteArgs),
    /// Import an indented bullet outline under a parent
    Import(ImportArgs),
    /// Manage Project work packages
    Wp(WpCmd),
    /// Show or change editor settings in fdt.toml
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Init args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Root name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Root kind: program or project
    #[arg(long, default_value = "program")]
    pub kind: String,
    /// Overwrite an existing plan file
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NodeArg {
    /// Node reference
    pub node: String,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Subtree to show (default: whole plan)
    pub node: Option<String>,
    /// Limit depth below the starting node
    #[arg(long)]
    pub depth: Option<usize>,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Query text, or a regex with --regex
    pub query: String,
    /// Treat the query as a regular expression
    #[arg(long)]
    pub regex: bool,
}

#[derive(Args)]
pub struct StatsArgs {
    /// Node to report on (default: root)
    pub node: Option<String>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct AddArgs {
    /// Kind of node: project, aspect, subject, activity, feature (or program)
    pub kind: String,
    /// Parent node reference
    pub parent: String,
    /// Node name
    pub name: String,
    /// Position among the parent's children (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

#[derive(Args)]
pub struct RenameArgs {
    /// Node reference
    pub node: String,
    /// New name
    pub name: String,
}

#[derive(Args)]
pub struct OptionalValueArgs {
    /// Node reference
    pub node: String,
    /// New value (omit to clear)
    pub value: Option<String>,
}

#[derive(Args)]
pub struct MilestoneArgs {
    /// Feature reference
    pub feature: String,
    /// Milestone position (1-based) or name
    pub milestone: String,
    /// New status: notstarted, underway, complete
    pub status: Option<String>,
    /// Planned date (YYYY-MM-DD)
    #[arg(long)]
    pub planned: Option<String>,
    /// Actual date (YYYY-MM-DD, or "none")
    #[arg(long)]
    pub actual: Option<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Node to move
    pub node: String,
    /// New parent (omit with --before/--after)
    pub parent: Option<String>,
    /// Position among the new parent's children (default: last)
    #[arg(long, conflicts_with_all = ["before", "after"])]
    pub at: Option<usize>,
    /// Place directly before this sibling
    #[arg(long, conflicts_with = "after")]
    pub before: Option<String>,
    /// Place directly after this sibling
    #[arg(long)]
    pub after: Option<String>,
}

#[derive(Args)]
pub struct PasteArgs {
    /// Node to copy
    pub source: String,
    /// Parent for the copy
    pub parent: String,
    /// Position among the parent's children (default: last)
    #[arg(long)]
    pub at: Option<usize>,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Parent node reference
    pub parent: String,
    /// Outline file ("-" reads stdin)
    #[arg(id = "outline", value_name = "FILE")]
    pub file: String,
}

// ---------------------------------------------------------------------------
// Work packages
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct WpCmd {
    #[command(subcommand)]
    pub action: WpAction,
}

#[derive(Subcommand)]
pub enum WpAction {
    /// List a Project's work packages
    List {
        /// Project reference
        project: String,
    },
    /// Create an empty work package
    Add {
        /// Project reference
        project: String,
        /// Package name
        name: String,
    },
    /// Rename a work package
    Rename {
        /// Project reference
        project: String,
        /// Current name
        from: String,
        /// New name
        to: String,
    },
    /// Delete a work package
    Rm {
        /// Project reference
        project: String,
        /// Package name
        name: String,
    },
    /// Put a Feature into a package (omit the package to unassign)
    Assign {
        /// Feature reference
        feature: String,
        /// Package name
        package: Option<String>,
    },
    /// Drop references to Features no longer in their Project
    Prune,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct ConfigArgs {
    /// Setting to show or change (default: list all)
    pub key: Option<String>,
    /// New value ("none" restores the default)
    pub value: Option<String>,
}
