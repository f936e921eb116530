//! Hierarchy rules: where a node may legally be placed.
//!
//! Every function here is a side-effect-free predicate. A rejection is a
//! plain `false`; callers check before mutating.

use crate::model::{Document, NodeId, NodeKind};

/// Can a new node of `kind` go under `parent`?
///
/// With `exclusivity`, a Program that already has Program children refuses
/// Projects and vice versa.
pub fn accepts_kind(doc: &Document, parent: NodeId, kind: NodeKind, exclusivity: bool) -> bool {
    let Some(parent_node) = doc.get(parent) else {
        return false;
    };
    let parent_kind = parent_node.kind();
    if !parent_kind.accepts(kind) {
        return false;
    }
    if exclusivity && parent_kind == NodeKind::Program {
        let has = |k: NodeKind| parent_node.children().iter().any(|c| doc.kind(*c) == k);
        match kind {
            NodeKind::Program if has(NodeKind::Project) => return false,
            NodeKind::Project if has(NodeKind::Program) => return false,
            _ => {}
        }
    }
    true
}

/// Kind compatibility (plus exclusivity when enabled) of `child` under `parent`
pub fn hierarchy_accepts(doc: &Document, parent: NodeId, child: NodeId, exclusivity: bool) -> bool {
    match doc.get(child) {
        Some(node) => accepts_kind(doc, parent, node.kind(), exclusivity),
        None => false,
    }
}

/// True if `ancestor` sits strictly above `node`
pub fn is_descendant(doc: &Document, node: NodeId, ancestor: NodeId) -> bool {
    doc.contains(node) && doc.ancestors(node).any(|a| a == ancestor)
}

/// Can `candidate` (with its subtree) be dropped under `new_parent`?
pub fn is_valid_reparent(
    doc: &Document,
    candidate: NodeId,
    new_parent: NodeId,
    exclusivity: bool,
) -> bool {
    if !doc.contains(candidate) || !doc.contains(new_parent) {
        return false;
    }
    if candidate == new_parent || candidate == doc.root() {
        return false;
    }
    if is_descendant(doc, new_parent, candidate) {
        return false;
    }
    hierarchy_accepts(doc, new_parent, candidate, exclusivity)
}

/// Can `source` be placed next to `reference`, under the reference's parent?
pub fn can_insert_sibling(
    doc: &Document,
    source: NodeId,
    reference: NodeId,
    exclusivity: bool,
) -> bool {
    if !doc.contains(source) || !doc.contains(reference) {
        return false;
    }
    if source == reference {
        return false;
    }
    let Some(parent) = doc.parent(reference) else {
        // Nothing can sit beside the root
        return false;
    };
    if is_descendant(doc, reference, source) {
        return false;
    }
    hierarchy_accepts(doc, parent, source, exclusivity)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        doc: Document,
        project: NodeId,
        aspect: NodeId,
        subject: NodeId,
        activity: NodeId,
        feature: NodeId,
    }

    fn fixture() -> Fixture {
        let mut doc = Document::new("Root").unwrap();
        let root = doc.root();
        let add = |doc: &mut Document, parent, kind, name| {
            let id = doc.create_node(kind, name).unwrap();
            doc.attach(id, parent, None).unwrap();
            id
        };
        let project = add(&mut doc, root, NodeKind::Project, "Proj");
        let aspect = add(&mut doc, project, NodeKind::Aspect, "Asp");
        let subject = add(&mut doc, aspect, NodeKind::Subject, "Sub");
        let activity = add(&mut doc, subject, NodeKind::Activity, "Act");
        let feature = add(&mut doc, activity, NodeKind::Feature, "Feat");
        Fixture {
            doc,
            project,
            aspect,
            subject,
            activity,
            feature,
        }
    }

    #[test]
    fn kind_compatibility() {
        let f = fixture();
        assert!(hierarchy_accepts(&f.doc, f.activity, f.feature, true));
        assert!(!hierarchy_accepts(&f.doc, f.subject, f.feature, true));
        assert!(!hierarchy_accepts(&f.doc, f.feature, f.activity, true));
        assert!(hierarchy_accepts(&f.doc, f.doc.root(), f.project, true));
    }

    #[test]
    fn exclusivity_blocks_mixed_program_children() {
        let mut f = fixture();
        let root = f.doc.root();
        // Root already holds a Project
        assert!(!accepts_kind(&f.doc, root, NodeKind::Program, true));
        assert!(accepts_kind(&f.doc, root, NodeKind::Program, false));

        let sub_program = f.doc.create_node(NodeKind::Program, "Sub").unwrap();
        let lone = f.doc.create_node(NodeKind::Program, "Lone").unwrap();
        f.doc.attach(lone, sub_program, None).unwrap();
        let stray = f.doc.create_node(NodeKind::Project, "Stray").unwrap();
        assert!(!hierarchy_accepts(&f.doc, sub_program, stray, true));
        assert!(hierarchy_accepts(&f.doc, sub_program, stray, false));
    }

    #[test]
    fn reparent_under_own_descendant_rejected() {
        let f = fixture();
        assert!(!is_valid_reparent(&f.doc, f.activity, f.feature, true));
        assert!(!is_valid_reparent(&f.doc, f.aspect, f.subject, false));
        assert!(!is_valid_reparent(&f.doc, f.project, f.activity, false));
    }

    #[test]
    fn every_descendant_is_an_invalid_target() {
        let f = fixture();
        for ancestor in f.doc.walk() {
            for descendant in f.doc.subtree(ancestor).into_iter().skip(1) {
                for exclusivity in [true, false] {
                    assert!(!is_valid_reparent(&f.doc, ancestor, descendant, exclusivity));
                }
            }
        }
    }

    #[test]
    fn reparent_onto_self_rejected() {
        let f = fixture();
        assert!(!is_valid_reparent(&f.doc, f.subject, f.subject, true));
        // Program under itself is kind-compatible but still a cycle
        let root = f.doc.root();
        assert!(!is_valid_reparent(&f.doc, root, root, false));
    }

    #[test]
    fn valid_reparent_between_siblings() {
        let mut f = fixture();
        let other = f.doc.create_node(NodeKind::Activity, "Other").unwrap();
        f.doc.attach(other, f.subject, None).unwrap();
        assert!(is_valid_reparent(&f.doc, f.feature, other, true));
    }

    #[test]
    fn root_cannot_be_reparented() {
        let mut f = fixture();
        let holder = f.doc.create_node(NodeKind::Program, "Holder").unwrap();
        assert!(!is_valid_reparent(&f.doc, f.doc.root(), holder, false));
    }

    #[test]
    fn insert_sibling_of_root_rejected() {
        let f = fixture();
        let root = f.doc.root();
        assert!(!can_insert_sibling(&f.doc, root, root, true));
        assert!(!can_insert_sibling(&f.doc, f.project, root, true));
    }

    #[test]
    fn insert_sibling_against_itself_rejected() {
        let mut f = fixture();
        assert!(!can_insert_sibling(&f.doc, f.feature, f.feature, true));
        let twin = f.doc.create_node(NodeKind::Feature, "Twin").unwrap();
        assert!(can_insert_sibling(&f.doc, twin, f.feature, true));
    }

    #[test]
    fn insert_sibling_requires_compatible_parent() {
        let mut f = fixture();
        let second = f.doc.create_node(NodeKind::Feature, "F2").unwrap();
        f.doc.attach(second, f.activity, None).unwrap();
        assert!(can_insert_sibling(&f.doc, second, f.feature, true));
        // A Subject cannot sit next to a Feature
        assert!(!can_insert_sibling(&f.doc, f.subject, f.feature, true));
    }

    #[test]
    fn lone_child_may_sit_beside_a_cousin() {
        let mut f = fixture();
        let other = f.doc.create_node(NodeKind::Activity, "Other").unwrap();
        f.doc.attach(other, f.subject, None).unwrap();
        let cousin = f.doc.create_node(NodeKind::Feature, "Cousin").unwrap();
        f.doc.attach(cousin, other, None).unwrap();
        // Both Features are the only child of their Activity
        assert!(can_insert_sibling(&f.doc, f.feature, cousin, true));
        assert!(can_insert_sibling(&f.doc, cousin, f.feature, true));
    }

    #[test]
    fn insert_sibling_below_itself_rejected() {
        let mut doc = Document::new("Root").unwrap();
        let outer = doc.create_node(NodeKind::Program, "Outer").unwrap();
        doc.attach(outer, doc.root(), None).unwrap();
        let inner = doc.create_node(NodeKind::Program, "Inner").unwrap();
        doc.attach(inner, outer, None).unwrap();
        let deepest = doc.create_node(NodeKind::Program, "Deepest").unwrap();
        doc.attach(deepest, inner, None).unwrap();

        // Outer beside Deepest would land inside its own subtree
        assert!(!can_insert_sibling(&doc, outer, deepest, false));
        // Deepest beside Inner is fine
        assert!(can_insert_sibling(&doc, deepest, inner, false));
    }
}
