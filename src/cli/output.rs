use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{
    DisplayConfig, Document, Milestone, NodeId, NodeKind, Status, WorkPackages, YearMonth,
};
use crate::ops::aggregate::is_late;
use crate::ops::search::MatchField;
use crate::undo::work_package_of;
use crate::util::text::fit_to_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct NodeJson {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u32>,
    pub completion: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub late: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeJson>,
}

#[derive(Serialize)]
pub struct NodeDetailJson {
    #[serde(flatten)]
    pub node: NodeJson,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_month: Option<YearMonth>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub milestones: Vec<MilestoneJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_package: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_packages: Option<WorkPackages>,
    pub stats: StatsJson,
}

#[derive(Serialize)]
pub struct MilestoneJson {
    pub name: String,
    pub planned: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<NaiveDate>,
    pub status: Status,
}

#[derive(Serialize)]
pub struct StatsJson {
    pub completion: u8,
    pub features: u32,
    pub not_started: u32,
    pub underway: u32,
    pub complete: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct SearchResultJson {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<MatchField>,
}

/// Result of a write command
#[derive(Serialize)]
pub struct EditJson {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

/// `id` and, up to `depth` levels down, its children
pub fn node_to_json(doc: &Document, id: NodeId, depth: Option<usize>, today: NaiveDate) -> NodeJson {
    let node = doc.node(id);
    let children = match depth {
        Some(0) => Vec::new(),
        _ => node
            .children()
            .iter()
            .map(|c| node_to_json(doc, *c, depth.map(|d| d - 1), today))
            .collect(),
    };
    NodeJson {
        id,
        kind: node.kind(),
        name: node.name().to_string(),
        seq: node.seq(),
        completion: node.progress().completion,
        status: node.progress().status,
        target_date: node.target_date(),
        late: is_late(doc, id, today),
        children,
    }
}

pub fn stats_to_json(doc: &Document, id: NodeId) -> StatsJson {
    let progress = doc.progress(id);
    StatsJson {
        completion: progress.completion,
        features: progress.feature_count(),
        not_started: progress.kpi_count(Status::NotStarted),
        underway: progress.kpi_count(Status::Underway),
        complete: progress.kpi_count(Status::Complete),
        target_date: doc.target_date(id),
    }
}

pub fn node_detail_to_json(doc: &Document, id: NodeId, today: NaiveDate) -> NodeDetailJson {
    let node = doc.node(id);
    let milestones = milestone_names(doc, id)
        .into_iter()
        .zip(node.milestones())
        .map(|(name, m)| MilestoneJson {
            name,
            planned: m.planned,
            actual: m.actual,
            status: m.status,
        })
        .collect();
    NodeDetailJson {
        node: node_to_json(doc, id, Some(0), today),
        path: doc.path(id).into_iter().map(str::to_string).collect(),
        external_id: node.external_id().map(str::to_string),
        owner: node.owner().map(str::to_string),
        prefix: node.prefix().map(str::to_string),
        target_month: node.target_month(),
        milestones,
        work_package: work_package_of(doc, id),
        work_packages: node.work_packages().cloned(),
        stats: stats_to_json(doc, id),
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

pub fn status_char(status: Status) -> char {
    match status {
        Status::NotStarted => ' ',
        Status::Underway => '>',
        Status::Complete => 'x',
    }
}

/// Labels for a Feature's milestones, from its Aspect's definitions. Falls
/// back to numbered labels where no definition exists.
pub fn milestone_names(doc: &Document, feature: NodeId) -> Vec<String> {
    let defined = doc
        .enclosing(feature, NodeKind::Aspect)
        .and_then(|a| doc.node(a).aspect_info())
        .map(|info| info.milestones.as_slice())
        .unwrap_or_default();
    (0..doc.node(feature).milestones().len())
        .map(|i| match defined.get(i) {
            Some(info) => info.name.clone(),
            None => format!("Milestone {}", i + 1),
        })
        .collect()
}

/// Name column entry: status box and seq for Features, prefix for Subjects
fn node_label(doc: &Document, id: NodeId) -> String {
    let node = doc.node(id);
    match (node.seq(), node.prefix()) {
        (Some(seq), _) => format!(
            "[{}] {} {}",
            status_char(node.progress().status.unwrap_or_default()),
            seq,
            node.name()
        ),
        (None, Some(prefix)) => format!("{} ({})", node.name(), prefix),
        (None, None) => node.name().to_string(),
    }
}

/// One line for a node in `fdt tree`
pub fn format_tree_line(
    doc: &Document,
    id: NodeId,
    indent: usize,
    display: &DisplayConfig,
    today: NaiveDate,
) -> String {
    let label = format!("{}{}", "  ".repeat(indent), node_label(doc, id));
    let mut line = format!(
        "{} {:>3}%",
        fit_to_width(&label, display.name_width),
        doc.progress(id).completion
    );
    if display.show_dates {
        match doc.target_date(id) {
            Some(date) => line.push_str(&format!("  {}", date)),
            None => line.push_str(&" ".repeat(12)),
        }
    }
    line.push_str(&format!("  {}", id));
    if is_late(doc, id, today) {
        line.push_str("  LATE");
    }
    line
}

/// `id` and its subtree, one line per node
pub fn format_tree(
    doc: &Document,
    id: NodeId,
    depth: Option<usize>,
    display: &DisplayConfig,
    today: NaiveDate,
) -> Vec<String> {
    let mut lines = Vec::new();
    push_tree(doc, id, 0, depth, display, today, &mut lines);
    lines
}

fn push_tree(
    doc: &Document,
    id: NodeId,
    indent: usize,
    depth: Option<usize>,
    display: &DisplayConfig,
    today: NaiveDate,
    lines: &mut Vec<String>,
) {
    lines.push(format_tree_line(doc, id, indent, display, today));
    if depth == Some(0) {
        return;
    }
    for child in doc.children(id) {
        push_tree(doc, *child, indent + 1, depth.map(|d| d - 1), display, today, lines);
    }
}

fn format_milestone(name: &str, milestone: &Milestone) -> String {
    let actual = milestone
        .actual
        .map(|d| format!(" done {}", d))
        .unwrap_or_default();
    format!(
        "  [{}] {} (planned {}{})",
        status_char(milestone.status),
        name,
        milestone.planned,
        actual
    )
}

/// Detailed view for `fdt show`
pub fn format_node_detail(doc: &Document, id: NodeId, today: NaiveDate) -> Vec<String> {
    let node = doc.node(id);
    let mut lines = Vec::new();

    let seq = node.seq().map(|s| format!(" {}", s)).unwrap_or_default();
    lines.push(format!("{}{} {} ({})", node.kind(), seq, node.name(), id));
    lines.push(format!("path: {}", doc.path(id).join(" / ")));
    if let Some(ext) = node.external_id() {
        lines.push(format!("external id: {}", ext));
    }
    if let Some(owner) = node.owner() {
        lines.push(format!("owner: {}", owner));
    }
    if let Some(prefix) = node.prefix() {
        lines.push(format!("prefix: {}", prefix));
    }
    if let Some(month) = node.target_month() {
        lines.push(format!("target month: {}", month));
    }
    if let Some(package) = work_package_of(doc, id) {
        lines.push(format!("work package: {}", package));
    }

    lines.extend(format_stats(doc, id));
    if is_late(doc, id, today) {
        lines.push("late: yes".to_string());
    }

    if !node.milestones().is_empty() {
        lines.push(String::new());
        lines.push("milestones:".to_string());
        for (name, m) in milestone_names(doc, id).iter().zip(node.milestones()) {
            lines.push(format_milestone(name, m));
        }
    }

    if let Some(info) = node.aspect_info() {
        lines.push(String::new());
        lines.push(format!(
            "labels: {} / {} / {} / {}",
            info.subject_name, info.activity_name, info.feature_name, info.milestone_name
        ));
        lines.push("milestone definitions:".to_string());
        for m in &info.milestones {
            lines.push(format!("  {} (effort {})", m.name, m.effort));
        }
    }

    if let Some(packages) = node.work_packages() {
        if !packages.is_empty() {
            lines.push(String::new());
            lines.extend(format_work_packages(packages));
        }
    }

    lines
}

/// Completion and per-status Feature counts
pub fn format_stats(doc: &Document, id: NodeId) -> Vec<String> {
    let stats = stats_to_json(doc, id);
    let mut lines = vec![format!("completion: {}%", stats.completion)];
    if let Some(status) = doc.progress(id).status {
        lines.push(format!("status: {}", status));
    }
    if doc.kind(id) != NodeKind::Feature {
        lines.push(format!(
            "features: {} ({} not started, {} underway, {} complete)",
            stats.features, stats.not_started, stats.underway, stats.complete
        ));
    }
    if let Some(date) = stats.target_date {
        lines.push(format!("target: {}", date));
    }
    lines
}

pub fn format_work_packages(packages: &WorkPackages) -> Vec<String> {
    let mut lines = vec!["work packages:".to_string()];
    for (name, seqs) in packages {
        let list = seqs
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("  {}: {}", name, list));
    }
    lines
}
