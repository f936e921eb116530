use chrono::NaiveDate;

use crate::model::{Document, Milestone, Node, NodeData, NodeError, NodeId};

/// One NotStarted milestone per definition of `aspect`, all planned for
/// `today`. Empty when there is no Aspect.
pub fn create_feature_milestones(
    doc: &Document,
    aspect: Option<NodeId>,
    today: NaiveDate,
) -> Vec<Milestone> {
    aspect
        .and_then(|a| doc.get(a))
        .and_then(|n| n.aspect_info())
        .map(|info| {
            info.milestones
                .iter()
                .map(|_| Milestone::planned(today))
                .collect()
        })
        .unwrap_or_default()
}

/// Bring a Feature's milestone list to `len` entries: extra entries are
/// dropped, missing ones are added NotStarted and planned for `today`
pub fn fit_milestones(milestones: &[Milestone], len: usize, today: NaiveDate) -> Vec<Milestone> {
    let mut fitted: Vec<Milestone> = milestones.iter().take(len).cloned().collect();
    fitted.resize(len, Milestone::planned(today));
    fitted
}

/// Deep-copy the subtree at `id` into new detached nodes and return the copy's
/// root. With `resequence`, copied Features get fresh sequence numbers;
/// otherwise they keep the originals and share them with the source.
pub fn clone_subtree(doc: &mut Document, id: NodeId, resequence: bool) -> Result<NodeId, NodeError> {
    doc.try_node(id)?;
    let order = doc.subtree(id);
    // Arena slots are appended in pre-order, so the copy of order[i] lands at
    // base + i
    let base = doc.len();
    let position = |old: NodeId| order.iter().position(|n| *n == old);

    let mut copies = Vec::with_capacity(order.len());
    for (i, old) in order.iter().enumerate() {
        let source = doc.node(*old);
        let mut data = source.data().clone();
        if resequence {
            if let NodeData::Feature { seq, .. } = &mut data {
                *seq = doc.sequence_mut().allocate();
            }
        }
        let source = doc.node(*old);
        let mut node = Node::new(source.name().to_string(), data);
        node.external_id = source.external_id.clone();
        node.progress = source.progress().clone();
        node.target_date = source.target_date();
        node.children = source
            .children()
            .iter()
            .filter_map(|c| position(*c).map(|p| NodeId(base + p)))
            .collect();
        node.parent = if i == 0 {
            None
        } else {
            source.parent().and_then(position).map(|p| NodeId(base + p))
        };
        copies.push(node);
    }
    for node in copies {
        doc.push_node(node);
    }
    Ok(NodeId(base))
}
