use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::document_io::atomic_write;
use crate::model::config::EditorConfig;

/// Config file name, looked up next to the plan file
pub const CONFIG_FILE: &str = "fdt.toml";

/// Error type for config reads and edits
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    WriteError { path: PathBuf, source: io::Error },
    #[error("invalid config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid config syntax: {0}")]
    SyntaxError(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

/// Keys accepted by `set_option`, in display order
pub const KEYS: [&str; 5] = [
    "program_exclusivity",
    "undo_limit",
    "resequence_on_paste",
    "display.show_dates",
    "display.name_width",
];

/// Read the config in `dir`, returning both the parsed config and the raw
/// toml_edit document for formatting-preserving edits. A missing file yields
/// defaults and an empty document.
pub fn read_config(dir: &Path) -> Result<(EditorConfig, toml_edit::DocumentMut), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(ConfigError::ReadError { path, source: e }),
    };
    let config: EditorConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = dir.join(CONFIG_FILE);
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|e| ConfigError::WriteError { path, source: e })
}

/// Set `key` (dotted for nested tables) to `value` and return the resulting
/// config. `none` removes the key so its default applies again. The document
/// is left untouched when the new value does not parse.
pub fn set_option(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: &str,
) -> Result<EditorConfig, ConfigError> {
    if !KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    let mut edited = doc.clone();
    let (table, field) = match key.split_once('.') {
        Some((table, field)) => {
            if !edited.contains_key(table) {
                edited[table] = toml_edit::Item::Table(toml_edit::Table::new());
            }
            (Some(table), field)
        }
        None => (None, key),
    };
    let target = match table {
        Some(t) => &mut edited[t],
        None => edited.as_item_mut(),
    };
    if value.eq_ignore_ascii_case("none") {
        if let Some(t) = target.as_table_like_mut() {
            t.remove(field);
        }
    } else {
        target[field] = toml_edit::value(parse_scalar(value));
    }

    let config: EditorConfig = toml::from_str(&edited.to_string())?;
    *doc = edited;
    tracing::debug!(key, value, "config option set");
    Ok(config)
}

/// Booleans and integers keep their type; anything else is a string
fn parse_scalar(value: &str) -> toml_edit::Value {
    if let Ok(b) = value.parse::<bool>() {
        toml_edit::Value::from(b)
    } else if let Ok(n) = value.parse::<i64>() {
        toml_edit::Value::from(n)
    } else {
        toml_edit::Value::from(value)
    }
}

/// Current value of `key` in `config`, rendered for display
pub fn get_option(config: &EditorConfig, key: &str) -> Result<String, ConfigError> {
    let value = match key {
        "program_exclusivity" => config.program_exclusivity.to_string(),
        "undo_limit" => config
            .undo_limit
            .map_or_else(|| "none".to_string(), |n| n.to_string()),
        "resequence_on_paste" => config.resequence_on_paste.to_string(),
        "display.show_dates" => config.display.show_dates.to_string(),
        "display.name_width" => config.display.name_width.to_string(),
        _ => return Err(ConfigError::UnknownKey(key.to_string())),
    };
    Ok(value)
}
