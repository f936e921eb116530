use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::progress::{Progress, Status};

/// Index of a node in its document's arena. Never reused within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches('#').parse().map(NodeId)
    }
}

/// The six node kinds of an FDD plan, outermost first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Program,
    Project,
    Aspect,
    Subject,
    Activity,
    Feature,
}

impl NodeKind {
    pub const ALL: [NodeKind; 6] = [
        NodeKind::Program,
        NodeKind::Project,
        NodeKind::Aspect,
        NodeKind::Subject,
        NodeKind::Activity,
        NodeKind::Feature,
    ];

    /// Kinds a node of this kind may hold as children, in display order.
    /// Empty for Feature: a leaf has no child operations at all.
    pub fn child_kinds(self) -> &'static [NodeKind] {
        match self {
            NodeKind::Program => &[NodeKind::Program, NodeKind::Project],
            NodeKind::Project => &[NodeKind::Aspect],
            NodeKind::Aspect => &[NodeKind::Subject],
            NodeKind::Subject => &[NodeKind::Activity],
            NodeKind::Activity => &[NodeKind::Feature],
            NodeKind::Feature => &[],
        }
    }

    /// Kind-level compatibility only (no exclusivity check)
    pub fn accepts(self, child: NodeKind) -> bool {
        self.child_kinds().contains(&child)
    }

    pub fn is_leaf(self) -> bool {
        self.child_kinds().is_empty()
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeKind::Program => "program",
            NodeKind::Project => "project",
            NodeKind::Aspect => "aspect",
            NodeKind::Subject => "subject",
            NodeKind::Activity => "activity",
            NodeKind::Feature => "feature",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        NodeKind::ALL
            .into_iter()
            .find(|k| k.label() == lower)
            .ok_or_else(|| format!("unknown node kind: {}", s))
    }
}

/// A year and month, e.g. `2025-06` (Activity target)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(YearMonth { year, month })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {:?}", s))?;
        let year = y.parse().map_err(|_| format!("invalid year in {:?}", s))?;
        let month = m.parse().map_err(|_| format!("invalid month in {:?}", s))?;
        YearMonth::new(year, month).ok_or_else(|| format!("month out of range in {:?}", s))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> String {
        ym.to_string()
    }
}

/// Definition of one milestone, declared once per Aspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneInfo {
    pub name: String,
    /// Relative effort weight
    pub effort: u32,
}

impl MilestoneInfo {
    pub fn new(name: &str, effort: u32) -> Self {
        MilestoneInfo {
            name: name.to_string(),
            effort,
        }
    }
}

/// Per-Aspect labels and milestone definitions shared by every Feature below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectInfo {
    pub subject_name: String,
    pub activity_name: String,
    pub feature_name: String,
    pub milestone_name: String,
    #[serde(default)]
    pub milestones: Vec<MilestoneInfo>,
}

impl AspectInfo {
    /// The six standard FDD milestones. Efforts sum to 100.
    pub fn standard() -> Self {
        AspectInfo {
            subject_name: "Subject".into(),
            activity_name: "Activity".into(),
            feature_name: "Feature".into(),
            milestone_name: "Milestone".into(),
            milestones: vec![
                MilestoneInfo::new("Domain Walkthrough", 1),
                MilestoneInfo::new("Design", 40),
                MilestoneInfo::new("Design Inspection", 3),
                MilestoneInfo::new("Code", 45),
                MilestoneInfo::new("Code Inspection", 10),
                MilestoneInfo::new("Promote to Build", 1),
            ],
        }
    }

    pub fn total_effort(&self) -> u32 {
        self.milestones.iter().map(|m| m.effort).sum()
    }
}

/// A Feature's progress against one MilestoneInfo (matched by index)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub planned: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<NaiveDate>,
    #[serde(default)]
    pub status: Status,
}

impl Milestone {
    pub fn planned(planned: NaiveDate) -> Self {
        Milestone {
            planned,
            actual: None,
            status: Status::NotStarted,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == Status::Complete
    }
}

/// Work packages of a Project: package name → Feature sequence numbers
pub type WorkPackages = IndexMap<String, Vec<u32>>;

/// Kind-specific payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeData {
    Program,
    Project {
        #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
        work_packages: WorkPackages,
    },
    Aspect {
        info: AspectInfo,
    },
    Subject {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
    Activity {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_month: Option<YearMonth>,
    },
    Feature {
        seq: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        owner: Option<String>,
        #[serde(default)]
        milestones: Vec<Milestone>,
    },
}

impl NodeData {
    /// Fresh payload for a new node of the given kind. Features get `seq`.
    pub fn empty(kind: NodeKind, seq: u32) -> Self {
        match kind {
            NodeKind::Program => NodeData::Program,
            NodeKind::Project => NodeData::Project {
                work_packages: WorkPackages::new(),
            },
            NodeKind::Aspect => NodeData::Aspect {
                info: AspectInfo::standard(),
            },
            NodeKind::Subject => NodeData::Subject { prefix: None },
            NodeKind::Activity => NodeData::Activity {
                owner: None,
                target_month: None,
            },
            NodeKind::Feature => NodeData::Feature {
                seq,
                owner: None,
                milestones: Vec::new(),
            },
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Program => NodeKind::Program,
            NodeData::Project { .. } => NodeKind::Project,
            NodeData::Aspect { .. } => NodeKind::Aspect,
            NodeData::Subject { .. } => NodeKind::Subject,
            NodeData::Activity { .. } => NodeKind::Activity,
            NodeData::Feature { .. } => NodeKind::Feature,
        }
    }
}

/// A node in the plan tree.
///
/// Structure (`children`, `parent`) and derived values (`progress`,
/// `target_date`) are owned by the document and the aggregation engine;
/// collaborators read them through accessors and change them only through
/// commands.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) external_id: Option<String>,
    pub(crate) data: NodeData,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) progress: Progress,
    pub(crate) target_date: Option<NaiveDate>,
}

impl Node {
    pub(crate) fn new(name: String, data: NodeData) -> Self {
        Node {
            name,
            external_id: None,
            data,
            children: Vec::new(),
            parent: None,
            progress: Progress::default(),
            target_date: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn data(&self) -> &NodeData {
        &self.data
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn target_date(&self) -> Option<NaiveDate> {
        self.target_date
    }

    /// Feature sequence number
    pub fn seq(&self) -> Option<u32> {
        match &self.data {
            NodeData::Feature { seq, .. } => Some(*seq),
            _ => None,
        }
    }

    /// Owner initials (Activity, Feature)
    pub fn owner(&self) -> Option<&str> {
        match &self.data {
            NodeData::Activity { owner, .. } | NodeData::Feature { owner, .. } => {
                owner.as_deref()
            }
            _ => None,
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        match &self.data {
            NodeData::Subject { prefix } => prefix.as_deref(),
            _ => None,
        }
    }

    pub fn target_month(&self) -> Option<YearMonth> {
        match &self.data {
            NodeData::Activity { target_month, .. } => *target_month,
            _ => None,
        }
    }

    pub fn milestones(&self) -> &[Milestone] {
        match &self.data {
            NodeData::Feature { milestones, .. } => milestones,
            _ => &[],
        }
    }

    pub fn aspect_info(&self) -> Option<&AspectInfo> {
        match &self.data {
            NodeData::Aspect { info } => Some(info),
            _ => None,
        }
    }

    pub fn work_packages(&self) -> Option<&WorkPackages> {
        match &self.data {
            NodeData::Project { work_packages } => Some(work_packages),
            _ => None,
        }
    }
}
