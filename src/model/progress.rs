use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Milestone (and Feature) status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    NotStarted,
    Underway,
    Complete,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::NotStarted, Status::Underway, Status::Complete];

    pub fn label(self) -> &'static str {
        match self {
            Status::NotStarted => "notstarted",
            Status::Underway => "underway",
            Status::Complete => "complete",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_', ' '], "").as_str() {
            "notstarted" | "todo" => Ok(Status::NotStarted),
            "underway" | "active" => Ok(Status::Underway),
            "complete" | "done" => Ok(Status::Complete),
            _ => Err(format!("unknown status: {}", s)),
        }
    }
}

/// Count of Features in one status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kpi {
    pub status: Status,
    pub count: u32,
}

/// Derived progress of a node. Written only by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Completion percentage, 0..=100
    pub completion: u8,
    /// Feature counts per status, in `Status::ALL` order
    pub kpi: Vec<Kpi>,
    /// Set on Features only
    pub status: Option<Status>,
    pub repeat: u32,
}

impl Default for Progress {
    fn default() -> Self {
        Progress {
            completion: 0,
            kpi: Status::ALL
                .into_iter()
                .map(|status| Kpi { status, count: 0 })
                .collect(),
            status: None,
            repeat: 1,
        }
    }
}

impl Progress {
    pub fn kpi_count(&self, status: Status) -> u32 {
        self.kpi
            .iter()
            .find(|k| k.status == status)
            .map(|k| k.count)
            .unwrap_or(0)
    }

    /// Total number of Features counted
    pub fn feature_count(&self) -> u32 {
        self.kpi.iter().map(|k| k.count).sum()
    }
}
