use serde::{Deserialize, Serialize};

/// Configuration from fdt.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// A Program holds either sub-Programs or Projects, never both.
    /// Default: true
    #[serde(default = "default_true")]
    pub program_exclusivity: bool,
    /// Maximum undo depth. Absent = unbounded.
    #[serde(default)]
    pub undo_limit: Option<usize>,
    /// Give pasted Features fresh sequence numbers. Default: true
    #[serde(default = "default_true")]
    pub resequence_on_paste: bool,
    #[serde(default)]
    pub display: DisplayConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            program_exclusivity: true,
            undo_limit: None,
            resequence_on_paste: true,
            display: DisplayConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Show target dates in `fdt tree`
    #[serde(default = "default_true")]
    pub show_dates: bool,
    /// Column width for node names in `fdt tree`
    #[serde(default = "default_name_width")]
    pub name_width: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            show_dates: true,
            name_width: default_name_width(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_name_width() -> usize {
    40
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: EditorConfig = toml::from_str("").unwrap();
        assert!(config.program_exclusivity);
        assert!(config.resequence_on_paste);
        assert_eq!(config.undo_limit, None);
        assert!(config.display.show_dates);
        assert_eq!(config.display.name_width, 40);
    }

    #[test]
    fn partial_toml_overrides() {
        let config: EditorConfig = toml::from_str(
            "program_exclusivity = false\nundo_limit = 100\n\n[display]\nname_width = 24\n",
        )
        .unwrap();
        assert!(!config.program_exclusivity);
        assert_eq!(config.undo_limit, Some(100));
        assert_eq!(config.display.name_width, 24);
        assert!(config.display.show_dates);
    }
}
