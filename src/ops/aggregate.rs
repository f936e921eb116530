//! Bottom-up recomputation of derived Progress and target dates.
//!
//! Reads never recompute; every mutation path calls into this module
//! explicitly. All entry points are idempotent.

use chrono::NaiveDate;

use crate::model::{Document, Kpi, Milestone, NodeData, NodeId, NodeKind, Progress, Status};

/// Error type for aggregation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("parent chain from {0} does not terminate (cycle)")]
    CycleDetected(NodeId),
}

/// Recompute one node from its current children (or milestones, for a Feature)
pub fn recompute_node(doc: &mut Document, id: NodeId) {
    let (progress, target_date) = expected(doc, id);
    let node = doc.node_mut(id);
    node.progress = progress;
    node.target_date = target_date;
}

/// Recompute `id` and then every ancestor up to the root
pub fn recompute_upward(doc: &mut Document, id: NodeId) -> Result<(), AggregateError> {
    let chain = chain_to_root(doc, id)?;
    for node in chain {
        recompute_node(doc, node);
    }
    Ok(())
}

/// Recompute every node of the subtree rooted at `id`, children first
pub fn recompute_subtree(doc: &mut Document, id: NodeId) -> Result<(), AggregateError> {
    let order = doc.subtree(id);
    if order.len() > doc.len() {
        return Err(AggregateError::CycleDetected(id));
    }
    for node in order.into_iter().rev() {
        recompute_node(doc, node);
    }
    Ok(())
}

/// Recompute the subtree at `id`, then its ancestor chain
pub fn refresh(doc: &mut Document, id: NodeId) -> Result<(), AggregateError> {
    recompute_subtree(doc, id)?;
    match doc.parent(id) {
        Some(parent) => recompute_upward(doc, parent),
        None => Ok(()),
    }
}

/// Recompute the whole attached tree
pub fn recompute_all(doc: &mut Document) -> Result<(), AggregateError> {
    let root = doc.root();
    recompute_subtree(doc, root)
}

/// A Feature is late when any unfinished milestone was planned before
/// `today`. Any other node is late when its target date has passed and it is
/// not complete.
pub fn is_late(doc: &Document, id: NodeId, today: NaiveDate) -> bool {
    let node = doc.node(id);
    if node.kind() == NodeKind::Feature {
        return node
            .milestones()
            .iter()
            .any(|m| m.planned < today && !m.is_complete());
    }
    match node.target_date() {
        Some(target) => target < today && node.progress().completion < 100,
        None => false,
    }
}

/// The values `recompute_node` would store for `id`
pub(crate) fn expected(doc: &Document, id: NodeId) -> (Progress, Option<NaiveDate>) {
    let node = doc.node(id);
    let repeat = node.progress().repeat;
    match node.data() {
        NodeData::Feature { milestones, .. } => {
            let completion = feature_completion(doc, id, milestones);
            let status = feature_status(milestones);
            let progress = Progress {
                completion,
                kpi: kpi_with(|s| u32::from(s == status)),
                status: Some(status),
                repeat,
            };
            let target = milestones.iter().map(|m| m.planned).max();
            (progress, target)
        }
        _ => {
            let children = node.children();
            let completion = if children.is_empty() {
                0
            } else {
                let sum: u32 = children
                    .iter()
                    .map(|c| u32::from(doc.progress(*c).completion))
                    .sum();
                (sum / children.len() as u32) as u8
            };
            let kpi = kpi_with(|s| {
                children
                    .iter()
                    .map(|c| doc.progress(*c).kpi_count(s))
                    .sum()
            });
            let target = children.iter().filter_map(|c| doc.target_date(*c)).max();
            let progress = Progress {
                completion,
                kpi,
                status: None,
                repeat,
            };
            (progress, target)
        }
    }
}

/// Completed effort relative to the total effort declared by the owning
/// Aspect, as a floored percentage. Milestones without a definition at the
/// same index carry no weight.
fn feature_completion(doc: &Document, id: NodeId, milestones: &[Milestone]) -> u8 {
    let Some(info) = doc
        .enclosing(id, NodeKind::Aspect)
        .and_then(|a| doc.node(a).aspect_info())
    else {
        return 0;
    };
    let total = u64::from(info.total_effort());
    if total == 0 {
        return 0;
    }
    let completed: u64 = milestones
        .iter()
        .zip(&info.milestones)
        .filter(|(m, _)| m.is_complete())
        .map(|(_, def)| u64::from(def.effort))
        .sum();
    (completed * 100 / total).min(100) as u8
}

fn feature_status(milestones: &[Milestone]) -> Status {
    if !milestones.is_empty() && milestones.iter().all(|m| m.is_complete()) {
        Status::Complete
    } else if milestones.iter().any(|m| m.status != Status::NotStarted) {
        Status::Underway
    } else {
        Status::NotStarted
    }
}

fn kpi_with(mut count: impl FnMut(Status) -> u32) -> Vec<Kpi> {
    Status::ALL
        .into_iter()
        .map(|status| Kpi {
            status,
            count: count(status),
        })
        .collect()
}

/// `id` followed by its ancestors, or an error if the chain loops
fn chain_to_root(doc: &Document, id: NodeId) -> Result<Vec<NodeId>, AggregateError> {
    let mut chain = vec![id];
    let mut current = doc.parent(id);
    while let Some(node) = current {
        if chain.len() > doc.len() {
            return Err(AggregateError::CycleDetected(id));
        }
        chain.push(node);
        current = doc.parent(node);
    }
    Ok(chain)
}
