use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{Document, NodeId, NodeKind};
use crate::ops::aggregate;

/// Structured result from `fdt check`, suitable for --json output.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    pub errors: Vec<CheckError>,
    pub warnings: Vec<CheckWarning>,
}

/// A violated document invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckError {
    /// A child's parent link does not point back at the node listing it
    #[serde(rename = "parent_mismatch")]
    ParentMismatch {
        node: NodeId,
        listed_under: NodeId,
        parent: Option<NodeId>,
    },
    /// A node is reachable twice from the root
    #[serde(rename = "cycle")]
    Cycle { node: NodeId },
    /// A child whose kind its parent may not hold
    #[serde(rename = "kind_violation")]
    KindViolation {
        parent: NodeId,
        child: NodeId,
        parent_kind: NodeKind,
        child_kind: NodeKind,
    },
    /// A Program holding both Programs and Projects
    #[serde(rename = "mixed_program")]
    MixedProgram { program: NodeId },
    /// Cached progress or target date differs from a fresh computation
    #[serde(rename = "stale_derived")]
    StaleDerived { node: NodeId },
    /// The sequence counter would hand out a number already in use
    #[serde(rename = "sequence_behind")]
    SequenceBehind { last: u32, max: u32 },
}

/// A validation warning (non-critical issue).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum CheckWarning {
    /// A work package lists a seq that no attached Feature carries
    #[serde(rename = "dangling_work_package_ref")]
    DanglingWorkPackageRef {
        project: NodeId,
        package: String,
        seq: u32,
    },
    /// A Feature's milestones do not line up with its Aspect's definitions
    #[serde(rename = "milestone_count_mismatch")]
    MilestoneCountMismatch {
        feature: NodeId,
        expected: usize,
        actual: usize,
    },
    /// Two attached Features share a sequence number, as after pasting
    /// without resequencing
    #[serde(rename = "duplicate_seq")]
    DuplicateSeq { seq: u32, nodes: Vec<NodeId> },
    /// Past its target date and not complete
    #[serde(rename = "late")]
    Late { node: NodeId, target: NaiveDate },
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckError::ParentMismatch {
                node,
                listed_under,
                parent,
            } => match parent {
                Some(p) => write!(f, "{} is listed under {} but points at {}", node, listed_under, p),
                None => write!(f, "{} is listed under {} but has no parent", node, listed_under),
            },
            CheckError::Cycle { node } => write!(f, "{} is reachable more than once", node),
            CheckError::KindViolation {
                parent_kind,
                child_kind,
                child,
                ..
            } => write!(f, "a {} cannot hold a {} ({})", parent_kind, child_kind, child),
            CheckError::MixedProgram { program } => {
                write!(f, "program {} holds both programs and projects", program)
            }
            CheckError::StaleDerived { node } => write!(f, "{} has stale progress", node),
            CheckError::SequenceBehind { last, max } => {
                write!(f, "sequence counter {} is behind feature {}", last, max)
            }
        }
    }
}

impl fmt::Display for CheckWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckWarning::DanglingWorkPackageRef {
                project,
                package,
                seq,
            } => write!(
                f,
                "work package '{}' of {} lists missing feature {}",
                package, project, seq
            ),
            CheckWarning::MilestoneCountMismatch {
                feature,
                expected,
                actual,
            } => write!(
                f,
                "{} has {} milestones, its aspect defines {}",
                feature, actual, expected
            ),
            CheckWarning::DuplicateSeq { seq, nodes } => {
                write!(f, "feature {} appears {} times", seq, nodes.len())
            }
            CheckWarning::Late { node, target } => write!(f, "{} is late (target {})", node, target),
        }
    }
}

// ---------------------------------------------------------------------------
// Main check entry point
// ---------------------------------------------------------------------------

/// Validate a document and return structured results.
///
/// Read-only. Checks performed:
/// 1. Parent links agree with child lists and the tree has no cycles
/// 2. Every child kind is allowed under its parent (and exclusivity holds)
/// 3. Feature sequence numbers are below the counter
/// 4. Cached derived values are current
/// 5. Warnings for dangling work-package refs, milestone mismatches, shared
///    sequence numbers and late Features
pub fn check_document(doc: &Document, exclusivity: bool, today: NaiveDate) -> CheckResult {
    let mut result = CheckResult::default();

    let reachable = check_structure(doc, exclusivity, &mut result);
    check_sequences(doc, &reachable, &mut result);

    // Derived values are only meaningful on a sound tree
    if result.errors.is_empty() {
        for id in &reachable {
            let (progress, target) = aggregate::expected(doc, *id);
            if *doc.progress(*id) != progress || doc.target_date(*id) != target {
                result.errors.push(CheckError::StaleDerived { node: *id });
            }
        }
    }

    check_work_packages(doc, &reachable, &mut result);
    check_features(doc, &reachable, today, &mut result);

    result.valid = result.errors.is_empty();
    result
}

// ---------------------------------------------------------------------------
// Structure
// ---------------------------------------------------------------------------

/// Walk from the root, reporting structural errors. Returns the nodes
/// reached, each once, in pre-order.
fn check_structure(doc: &Document, exclusivity: bool, result: &mut CheckResult) -> Vec<NodeId> {
    let mut seen = HashSet::new();
    let mut order = Vec::new();
    let mut stack = vec![doc.root()];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            result.errors.push(CheckError::Cycle { node: id });
            continue;
        }
        order.push(id);
        let kind = doc.kind(id);
        for child in doc.children(id) {
            let Some(child_node) = doc.get(*child) else {
                continue;
            };
            if child_node.parent() != Some(id) {
                result.errors.push(CheckError::ParentMismatch {
                    node: *child,
                    listed_under: id,
                    parent: child_node.parent(),
                });
            }
            if !kind.accepts(child_node.kind()) {
                result.errors.push(CheckError::KindViolation {
                    parent: id,
                    child: *child,
                    parent_kind: kind,
                    child_kind: child_node.kind(),
                });
            }
        }
        if exclusivity && kind == NodeKind::Program {
            let has = |k: NodeKind| {
                doc.children(id)
                    .iter()
                    .any(|c| doc.get(*c).is_some_and(|n| n.kind() == k))
            };
            if has(NodeKind::Program) && has(NodeKind::Project) {
                result.errors.push(CheckError::MixedProgram { program: id });
            }
        }
        for child in doc.children(id).iter().rev() {
            if doc.contains(*child) {
                stack.push(*child);
            }
        }
    }
    order
}

fn check_sequences(doc: &Document, reachable: &[NodeId], result: &mut CheckResult) {
    let mut by_seq: BTreeMap<u32, Vec<NodeId>> = BTreeMap::new();
    for id in reachable {
        if let Some(seq) = doc.node(*id).seq() {
            by_seq.entry(seq).or_default().push(*id);
        }
    }
    for (seq, nodes) in &by_seq {
        if nodes.len() > 1 {
            result.warnings.push(CheckWarning::DuplicateSeq {
                seq: *seq,
                nodes: nodes.clone(),
            });
        }
    }
    let max = doc.max_seq();
    let last = doc.sequence().last();
    if last < max {
        result.errors.push(CheckError::SequenceBehind { last, max });
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

fn check_work_packages(doc: &Document, reachable: &[NodeId], result: &mut CheckResult) {
    for project in reachable {
        let Some(packages) = doc.node(*project).work_packages() else {
            continue;
        };
        let present: HashSet<u32> = doc
            .features_under(*project)
            .into_iter()
            .filter_map(|f| doc.node(f).seq())
            .collect();
        for (package, seqs) in packages {
            for seq in seqs {
                if !present.contains(seq) {
                    result.warnings.push(CheckWarning::DanglingWorkPackageRef {
                        project: *project,
                        package: package.clone(),
                        seq: *seq,
                    });
                }
            }
        }
    }
}

fn check_features(doc: &Document, reachable: &[NodeId], today: NaiveDate, result: &mut CheckResult) {
    for id in reachable {
        if doc.kind(*id) != NodeKind::Feature {
            continue;
        }
        let expected = doc
            .enclosing(*id, NodeKind::Aspect)
            .and_then(|a| doc.node(a).aspect_info())
            .map_or(0, |info| info.milestones.len());
        let actual = doc.node(*id).milestones().len();
        if actual != expected {
            result.warnings.push(CheckWarning::MilestoneCountMismatch {
                feature: *id,
                expected,
                actual,
            });
        }
        if aggregate::is_late(doc, *id, today) {
            if let Some(target) = doc.target_date(*id) {
                result.warnings.push(CheckWarning::Late { node: *id, target });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
