use chrono::NaiveDate;

use super::node::{Node, NodeData, NodeId, NodeKind};
use super::progress::Progress;
use crate::ops::relocate;

/// Error type for node and document operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NodeError {
    #[error("node name must not be empty")]
    EmptyName,
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
    #[error("a {parent} cannot hold a {child}")]
    KindMismatch { parent: NodeKind, child: NodeKind },
    #[error("{field} does not apply to a {kind}")]
    FieldNotApplicable { field: &'static str, kind: NodeKind },
    #[error("node {0} is already attached")]
    AlreadyAttached(NodeId),
    #[error("node {0} is not attached to a parent")]
    NotAttached(NodeId),
    #[error("the root node cannot be moved or removed")]
    RootImmutable,
    #[error("milestone {index} out of range ({len} milestones)")]
    MilestoneOutOfRange { index: usize, len: usize },
    #[error("no work package named {0:?}")]
    UnknownWorkPackage(String),
    #[error("work package {0:?} already exists")]
    DuplicateWorkPackage(String),
}

/// Allocates Feature sequence numbers. Owned by the document; seeded from the
/// highest sequence found on load so new Features never collide.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SequenceAllocator {
    last: u32,
}

impl SequenceAllocator {
    pub fn seeded(last: u32) -> Self {
        SequenceAllocator { last }
    }

    pub fn allocate(&mut self) -> u32 {
        self.last += 1;
        self.last
    }

    /// Make sure future allocations stay above `seq`
    pub fn observe(&mut self, seq: u32) {
        self.last = self.last.max(seq);
    }

    pub fn last(&self) -> u32 {
        self.last
    }
}

/// An FDD plan: an arena of nodes with a single root.
///
/// Nodes removed from the tree stay in the arena (detached) so that undo can
/// re-attach them under the same ids. Traversals start at the root and never
/// reach detached nodes.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    sequence: SequenceAllocator,
}

impl Document {
    /// New document with a Program root
    pub fn new(root_name: &str) -> Result<Self, NodeError> {
        Self::with_root(NodeKind::Program, root_name)
    }

    pub fn with_root(kind: NodeKind, root_name: &str) -> Result<Self, NodeError> {
        let mut doc = Document {
            nodes: Vec::new(),
            root: NodeId(0),
            sequence: SequenceAllocator::default(),
        };
        doc.root = doc.create_node(kind, root_name)?;
        Ok(doc)
    }

    /// Number of arena slots, detached nodes included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Borrow a node by id.
    ///
    /// # Panics
    /// If `id` did not come from this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub(crate) fn try_node(&self, id: NodeId) -> Result<&Node, NodeError> {
        self.get(id).ok_or(NodeError::UnknownNode(id))
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).name()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent()
    }

    pub fn progress(&self, id: NodeId) -> &Progress {
        self.node(id).progress()
    }

    pub fn target_date(&self, id: NodeId) -> Option<NaiveDate> {
        self.node(id).target_date()
    }

    pub fn sequence(&self) -> &SequenceAllocator {
        &self.sequence
    }

    pub(crate) fn sequence_mut(&mut self) -> &mut SequenceAllocator {
        &mut self.sequence
    }

    /// Position of `id` in its parent's child list
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|c| *c == id)
    }

    /// Parent, grandparent, ... up to the root. Stops after `len()` steps so a
    /// corrupted parent chain cannot loop forever.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.get(id).and_then(|n| n.parent),
            remaining: self.nodes.len(),
        }
    }

    /// True if `id` is the root or hangs below it
    pub fn is_attached(&self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        id == self.root || self.ancestors(id).any(|a| a == self.root)
    }

    /// Pre-order list of `id` and everything below it
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if out.len() > self.nodes.len() {
                break;
            }
            out.push(current);
            for child in self.children(current).iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Every node reachable from the root, pre-order
    pub fn walk(&self) -> Vec<NodeId> {
        self.subtree(self.root)
    }

    /// Features at or below `id`, in tree order
    pub fn features_under(&self, id: NodeId) -> Vec<NodeId> {
        self.subtree(id)
            .into_iter()
            .filter(|n| self.kind(*n) == NodeKind::Feature)
            .collect()
    }

    /// Names from the root down to `id`
    pub fn path(&self, id: NodeId) -> Vec<&str> {
        let mut names: Vec<&str> = self.ancestors(id).map(|a| self.name(a)).collect();
        names.reverse();
        names.push(self.name(id));
        names
    }

    /// Nearest node of `kind` at or above `id`
    pub fn enclosing(&self, id: NodeId, kind: NodeKind) -> Option<NodeId> {
        if self.kind(id) == kind {
            return Some(id);
        }
        self.ancestors(id).find(|a| self.kind(*a) == kind)
    }

    /// Attached Feature with the given sequence number
    pub fn find_feature(&self, seq: u32) -> Option<NodeId> {
        self.walk()
            .into_iter()
            .find(|id| self.node(*id).seq() == Some(seq))
    }

    /// Highest Feature sequence number anywhere in the arena
    pub fn max_seq(&self) -> u32 {
        self.nodes.iter().filter_map(|n| n.seq()).max().unwrap_or(0)
    }

    /// Create a detached node. Features take the next sequence number and
    /// Aspects start with the standard milestone definitions.
    pub fn create_node(&mut self, kind: NodeKind, name: &str) -> Result<NodeId, NodeError> {
        let name = validate_name(name)?;
        let seq = if kind == NodeKind::Feature {
            self.sequence.allocate()
        } else {
            0
        };
        Ok(self.push_node(Node::new(name, NodeData::empty(kind, seq))))
    }

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        if let Some(seq) = node.seq() {
            self.sequence.observe(seq);
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Attach a detached node under `parent`. Kind compatibility is enforced;
    /// type exclusivity is left to the hierarchy rules.
    pub(crate) fn attach(
        &mut self,
        child: NodeId,
        parent: NodeId,
        index: Option<usize>,
    ) -> Result<usize, NodeError> {
        let child_node = self.try_node(child)?;
        let child_kind = child_node.kind();
        if child == self.root {
            return Err(NodeError::RootImmutable);
        }
        if child_node.parent.is_some() {
            return Err(NodeError::AlreadyAttached(child));
        }
        let parent_kind = self.try_node(parent)?.kind();
        if !parent_kind.accepts(child_kind) {
            return Err(NodeError::KindMismatch {
                parent: parent_kind,
                child: child_kind,
            });
        }
        let applied = relocate::insert_clamped(&mut self.nodes[parent.0].children, child, index);
        self.nodes[child.0].parent = Some(parent);
        Ok(applied)
    }

    /// Detach `child` from its parent. Returns the former parent and index.
    pub(crate) fn detach(&mut self, child: NodeId) -> Result<(NodeId, usize), NodeError> {
        self.try_node(child)?;
        if child == self.root {
            return Err(NodeError::RootImmutable);
        }
        let parent = self.parent(child).ok_or(NodeError::NotAttached(child))?;
        let siblings = &mut self.nodes[parent.0].children;
        let index = siblings
            .iter()
            .position(|c| *c == child)
            .ok_or(NodeError::NotAttached(child))?;
        siblings.remove(index);
        self.nodes[child.0].parent = None;
        Ok((parent, index))
    }

    /// Move an attached node under `new_parent` (which may be its current
    /// parent) at `requested`. Returns the applied index.
    pub(crate) fn relocate(
        &mut self,
        child: NodeId,
        new_parent: NodeId,
        requested: Option<usize>,
    ) -> Result<usize, NodeError> {
        let child_kind = self.try_node(child)?.kind();
        let parent_kind = self.try_node(new_parent)?.kind();
        if child == self.root {
            return Err(NodeError::RootImmutable);
        }
        let old_parent = self.parent(child).ok_or(NodeError::NotAttached(child))?;
        if !parent_kind.accepts(child_kind) {
            return Err(NodeError::KindMismatch {
                parent: parent_kind,
                child: child_kind,
            });
        }

        let applied = if old_parent == new_parent {
            relocate::reorder(&mut self.nodes[new_parent.0].children, child, requested)
        } else {
            let mut source = std::mem::take(&mut self.nodes[old_parent.0].children);
            let applied = relocate::move_between(
                &mut source,
                &mut self.nodes[new_parent.0].children,
                child,
                requested,
            );
            self.nodes[old_parent.0].children = source;
            applied
        };
        self.nodes[child.0].parent = Some(new_parent);
        Ok(applied)
    }

    /// Rebuild parent links from child lists (after deserialization)
    pub(crate) fn relink(&mut self) {
        for node in &mut self.nodes {
            node.parent = None;
        }
        for i in 0..self.nodes.len() {
            let children = self.nodes[i].children.clone();
            for child in children {
                self.nodes[child.0].parent = Some(NodeId(i));
            }
        }
    }

    pub(crate) fn from_parts(nodes: Vec<Node>, root: NodeId) -> Self {
        let mut doc = Document {
            nodes,
            root,
            sequence: SequenceAllocator::default(),
        };
        let max = doc.max_seq();
        doc.sequence.observe(max);
        doc
    }
}

/// Trim and reject empty names
pub(crate) fn validate_name(name: &str) -> Result<String, NodeError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NodeError::EmptyName);
    }
    Ok(trimmed.to_string())
}

/// Iterator over a node's ancestors, nearest first
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
    remaining: usize,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.next?;
        self.next = self.doc.get(current).and_then(|n| n.parent);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("Root").unwrap();
        let project = doc.create_node(NodeKind::Project, "Proj").unwrap();
        doc.attach(project, doc.root(), None).unwrap();
        let aspect = doc.create_node(NodeKind::Aspect, "Asp").unwrap();
        doc.attach(aspect, project, None).unwrap();
        let subject = doc.create_node(NodeKind::Subject, "Sub").unwrap();
        doc.attach(subject, aspect, None).unwrap();
        (doc, project, aspect, subject)
    }

    #[test]
    fn new_document_has_program_root() {
        let doc = Document::new("Plan").unwrap();
        assert_eq!(doc.kind(doc.root()), NodeKind::Program);
        assert_eq!(doc.name(doc.root()), "Plan");
        assert!(doc.parent(doc.root()).is_none());
        assert!(doc.is_attached(doc.root()));
    }

    #[test]
    fn empty_root_name_rejected() {
        assert_eq!(Document::new("  ").unwrap_err(), NodeError::EmptyName);
    }

    #[test]
    fn create_node_trims_name_and_stays_detached() {
        let mut doc = Document::new("Root").unwrap();
        let id = doc.create_node(NodeKind::Project, "  Billing ").unwrap();
        assert_eq!(doc.name(id), "Billing");
        assert!(!doc.is_attached(id));
        assert!(doc.children(doc.root()).is_empty());
    }

    #[test]
    fn features_get_increasing_sequence_numbers() {
        let mut doc = Document::new("Root").unwrap();
        let a = doc.create_node(NodeKind::Feature, "A").unwrap();
        let b = doc.create_node(NodeKind::Feature, "B").unwrap();
        assert_eq!(doc.node(a).seq(), Some(1));
        assert_eq!(doc.node(b).seq(), Some(2));
        assert_eq!(doc.sequence().last(), 2);
    }

    #[test]
    fn attach_links_both_directions() {
        let (doc, project, aspect, subject) = chain();
        assert_eq!(doc.children(doc.root()), &[project]);
        assert_eq!(doc.parent(project), Some(doc.root()));
        assert_eq!(doc.parent(subject), Some(aspect));
        assert_eq!(doc.index_in_parent(subject), Some(0));
        assert_eq!(doc.path(subject), vec!["Root", "Proj", "Asp", "Sub"]);
    }

    #[test]
    fn attach_rejects_wrong_kind() {
        let (mut doc, project, _, _) = chain();
        let feature = doc.create_node(NodeKind::Feature, "F").unwrap();
        let err = doc.attach(feature, project, None).unwrap_err();
        assert_eq!(
            err,
            NodeError::KindMismatch {
                parent: NodeKind::Project,
                child: NodeKind::Feature
            }
        );
        assert!(!doc.is_attached(feature));
    }

    #[test]
    fn attach_twice_rejected() {
        let (mut doc, project, _, _) = chain();
        assert_eq!(
            doc.attach(project, doc.root(), None).unwrap_err(),
            NodeError::AlreadyAttached(project)
        );
    }

    #[test]
    fn detach_and_reattach_at_index() {
        let (mut doc, project, aspect, _) = chain();
        let second = doc.create_node(NodeKind::Aspect, "Second").unwrap();
        doc.attach(second, project, None).unwrap();

        let (parent, index) = doc.detach(aspect).unwrap();
        assert_eq!((parent, index), (project, 0));
        assert!(!doc.is_attached(aspect));
        assert_eq!(doc.children(project), &[second]);

        doc.attach(aspect, project, Some(index)).unwrap();
        assert_eq!(doc.children(project), &[aspect, second]);
    }

    #[test]
    fn root_cannot_be_detached() {
        let mut doc = Document::new("Root").unwrap();
        let root = doc.root();
        assert_eq!(doc.detach(root).unwrap_err(), NodeError::RootImmutable);
    }

    #[test]
    fn relocate_across_parents_updates_links() {
        let (mut doc, project, aspect, subject) = chain();
        let other = doc.create_node(NodeKind::Aspect, "Other").unwrap();
        doc.attach(other, project, None).unwrap();

        let idx = doc.relocate(subject, other, Some(5)).unwrap();
        assert_eq!(idx, 0);
        assert!(doc.children(aspect).is_empty());
        assert_eq!(doc.children(other), &[subject]);
        assert_eq!(doc.parent(subject), Some(other));
    }

    #[test]
    fn ancestors_walk_to_root() {
        let (doc, project, aspect, subject) = chain();
        let ancestors: Vec<_> = doc.ancestors(subject).collect();
        assert_eq!(ancestors, vec![aspect, project, doc.root()]);
        assert_eq!(doc.enclosing(subject, NodeKind::Project), Some(project));
        assert_eq!(doc.enclosing(aspect, NodeKind::Aspect), Some(aspect));
    }

    #[test]
    fn subtree_is_preorder() {
        let (mut doc, project, aspect, subject) = chain();
        let second = doc.create_node(NodeKind::Subject, "Sub2").unwrap();
        doc.attach(second, aspect, None).unwrap();
        assert_eq!(
            doc.subtree(project),
            vec![project, aspect, subject, second]
        );
    }

    #[test]
    fn sequence_allocator_observe_never_lowers() {
        let mut seq = SequenceAllocator::seeded(10);
        seq.observe(4);
        assert_eq!(seq.last(), 10);
        seq.observe(12);
        assert_eq!(seq.allocate(), 13);
    }
}
