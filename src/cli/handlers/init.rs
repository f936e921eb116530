use std::path::{Path, PathBuf};

use crate::cli::commands::InitArgs;
use crate::io::config_io::CONFIG_FILE;
use crate::io::document_io::{self, DEFAULT_FILE, DocumentStore, JsonStore};
use crate::model::{Document, NodeKind};

const CONFIG_TEMPLATE: &str = r##"# fdt editor settings. Uncomment and edit to override defaults,
# or use: fdt config <key> <value>

# A Program holds either sub-Programs or Projects, never both
# program_exclusivity = true

# Maximum undo depth inside one session (default: unbounded)
# undo_limit = 100

# Give pasted Features fresh sequence numbers
# resequence_on_paste = true

# [display]
# show_dates = true
# name_width = 40
"##;

/// Infer a root name from a directory name: hyphens and underscores become
/// spaces, words are title-cased.
fn infer_name(dir_name: &str) -> String {
    dir_name
        .split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(c) => {
                    let upper: String = c.to_uppercase().collect();
                    upper + chars.as_str()
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_root_kind(kind: &str) -> Result<NodeKind, String> {
    match kind.parse::<NodeKind>()? {
        k @ (NodeKind::Program | NodeKind::Project) => Ok(k),
        other => Err(format!("a plan root must be a program or project, not {}", other)),
    }
}

pub fn cmd_init(args: InitArgs, file: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let path = match file {
        Some(f) => cwd.join(f),
        None => cwd.join(DEFAULT_FILE),
    };
    let dir: PathBuf = path.parent().map(Path::to_path_buf).unwrap_or(cwd.clone());

    if path.exists() && !args.force {
        return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
    }

    // Nested plans are allowed, but say which one commands will pick up
    if file.is_none()
        && let Some(parent) = cwd.parent()
        && let Ok(outer) = document_io::discover_document(parent)
    {
        eprintln!("Note: outer plan found at {}", outer.display());
        eprintln!("Creating new plan in ./{}", DEFAULT_FILE);
    }

    let kind = parse_root_kind(&args.kind)?;
    let name = args.name.unwrap_or_else(|| {
        dir.file_name()
            .and_then(|n| n.to_str())
            .map(infer_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let doc = Document::with_root(kind, &name)?;
    JsonStore::default().save(&doc, &path)?;

    let config_path = dir.join(CONFIG_FILE);
    if !config_path.exists() {
        document_io::atomic_write(&config_path, CONFIG_TEMPLATE.as_bytes())?;
    }

    println!("Initialized plan: {} ({})", name, kind);
    Ok(())
}
