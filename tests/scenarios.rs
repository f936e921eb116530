//! End-to-end editing scenarios through the public `Session` API.

use chrono::NaiveDate;
use fddtree::io::{DEFAULT_FILE, DocumentStore, JsonStore};
use fddtree::model::{Document, EditorConfig, NodeId, NodeKind, Progress, Status};
use fddtree::ops::check::{CheckWarning, check_document};
use fddtree::ops::rules;
use fddtree::session::{Edit, Session};
use fddtree::undo::StackOutcome;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

fn session() -> Session {
    Session::new(Document::new("P").unwrap(), EditorConfig::default())
}

fn add(s: &mut Session, parent: NodeId, kind: NodeKind, name: &str) -> NodeId {
    match s.add_child(parent, kind, name, None, today()).unwrap() {
        Edit::Applied(id) => id,
        Edit::Rejected(reason) => panic!("add {} rejected: {}", name, reason),
    }
}

/// Project > Aspect > Subject > Activity chain, returning the Activity
fn activity_chain(s: &mut Session, project: NodeId, name: &str) -> NodeId {
    let aspect = add(s, project, NodeKind::Aspect, "Aspect");
    let subject = add(s, aspect, NodeKind::Subject, "Subject");
    add(s, subject, NodeKind::Activity, name)
}

type Snapshot = Vec<(String, Progress, Option<NaiveDate>, Vec<NodeId>)>;

/// Every attached node's name, derived values and children, in pre-order
fn snapshot(s: &Session) -> Snapshot {
    let doc = s.document();
    doc.walk()
        .into_iter()
        .map(|id| {
            (
                doc.name(id).to_string(),
                doc.progress(id).clone(),
                doc.target_date(id),
                doc.children(id).to_vec(),
            )
        })
        .collect()
}

fn complete_all(s: &mut Session, feature: NodeId) {
    let count = s.document().node(feature).milestones().len();
    for i in 0..count {
        s.set_milestone_status(feature, i, Status::Complete, today())
            .unwrap();
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn root_completion_is_mean_of_projects() {
    let mut s = session();
    let root = s.document().root();
    let a = add(&mut s, root, NodeKind::Project, "A");
    let b = add(&mut s, root, NodeKind::Project, "B");
    let act = activity_chain(&mut s, b, "Build");
    let feature = add(&mut s, act, NodeKind::Feature, "F");
    complete_all(&mut s, feature);

    let doc = s.document();
    assert_eq!(doc.progress(a).completion, 0);
    assert_eq!(doc.progress(b).completion, 100);
    assert_eq!(doc.progress(root).completion, 50);
}

#[test]
fn move_feature_to_front_of_other_activity() {
    let mut s = session();
    let root = s.document().root();
    let project = add(&mut s, root, NodeKind::Project, "Core");
    let x = activity_chain(&mut s, project, "X");
    let y = {
        let subject = s.document().parent(x).unwrap();
        add(&mut s, subject, NodeKind::Activity, "Y")
    };
    add(&mut s, y, NodeKind::Feature, "Existing");
    let f1 = add(&mut s, x, NodeKind::Feature, "F1");
    let depth = s.history().undo_depth();

    let applied = s.move_node(f1, y, Some(0), today()).unwrap();
    assert_eq!(applied, Edit::Applied(0));
    let doc = s.document();
    assert!(!doc.children(x).contains(&f1));
    assert_eq!(doc.children(y)[0], f1);
    assert_eq!(s.history().undo_depth(), depth + 1);
}

#[test]
fn root_cannot_be_its_own_sibling() {
    let s = session();
    let doc = s.document();
    assert!(!rules::can_insert_sibling(doc, doc.root(), doc.root(), true));
}

#[test]
fn activity_cannot_move_under_its_feature() {
    let mut s = session();
    let root = s.document().root();
    let project = add(&mut s, root, NodeKind::Project, "Core");
    let act = activity_chain(&mut s, project, "Act");
    let feat = add(&mut s, act, NodeKind::Feature, "Feat");
    let parent_before = s.document().parent(act);
    let depth = s.history().undo_depth();

    assert!(!rules::is_valid_reparent(s.document(), act, feat, true));
    assert!(matches!(
        s.move_node(act, feat, None, today()).unwrap(),
        Edit::Rejected(_)
    ));
    assert_eq!(s.document().parent(act), parent_before);
    assert_eq!(s.document().parent(feat), Some(act));
    assert_eq!(s.history().undo_depth(), depth);
}

#[test]
fn undo_rename_restores_name_and_clears_dirty() {
    let mut s = session();
    let root = s.document().root();
    let project = add(&mut s, root, NodeKind::Project, "Core");
    let aspect = add(&mut s, project, NodeKind::Aspect, "Aspect");
    let subject = add(&mut s, aspect, NodeKind::Subject, "Old");
    s.mark_saved();
    assert!(!s.is_dirty());

    s.rename(subject, "New").unwrap();
    assert_eq!(s.document().name(subject), "New");
    assert!(s.is_dirty());

    let outcome = s.undo().unwrap();
    assert_eq!(
        outcome,
        StackOutcome::Applied("rename subject 'Old' to 'New'".to_string())
    );
    assert_eq!(s.document().name(subject), "Old");
    assert!(!s.is_dirty());
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn exclusivity_follows_first_child() {
    let mut s = session();
    let root = s.document().root();
    add(&mut s, root, NodeKind::Program, "Sub");
    let mut scratch = s.document().clone();
    let project = scratch.create_node(NodeKind::Project, "Loose").unwrap();
    assert!(!rules::hierarchy_accepts(&scratch, root, project, true));
    assert!(rules::hierarchy_accepts(&scratch, root, project, false));
    assert!(matches!(
        s.add_child(root, NodeKind::Project, "Mixed", None, today()).unwrap(),
        Edit::Rejected(_)
    ));
}

#[test]
fn completing_milestones_never_lowers_ancestors() {
    let mut s = session();
    let root = s.document().root();
    let project = add(&mut s, root, NodeKind::Project, "Core");
    let act = activity_chain(&mut s, project, "Act");
    let f1 = add(&mut s, act, NodeKind::Feature, "F1");
    let f2 = add(&mut s, act, NodeKind::Feature, "F2");

    let mut last: Vec<u8> = vec![0; 3];
    for feature in [f1, f2] {
        for i in 0..6 {
            s.set_milestone_status(feature, i, Status::Complete, today())
                .unwrap();
            let now: Vec<u8> = [act, project, root]
                .iter()
                .map(|id| s.document().progress(*id).completion)
                .collect();
            for (before, after) in last.iter().zip(&now) {
                assert!(after >= before, "completion dropped: {:?} -> {:?}", last, now);
            }
            last = now;
        }
    }
    assert_eq!(last, vec![100, 100, 100]);
}

#[test]
fn undo_all_then_redo_all_is_exact() {
    let mut s = session();
    let start = snapshot(&s);
    let root = s.document().root();
    let project = add(&mut s, root, NodeKind::Project, "Core");
    let x = activity_chain(&mut s, project, "X");
    let f = add(&mut s, x, NodeKind::Feature, "F");
    s.set_milestone_status(f, 1, Status::Underway, today()).unwrap();
    s.set_owner(f, Some("ana")).unwrap();
    let end = snapshot(&s);

    while s.can_undo() {
        s.undo().unwrap();
    }
    assert_eq!(snapshot(&s), start);
    assert_eq!(s.undo().unwrap(), StackOutcome::Unavailable);

    while s.can_redo() {
        s.redo().unwrap();
    }
    assert_eq!(snapshot(&s), end);
    assert_eq!(s.document().node(f).owner(), Some("ana"));
}

#[test]
fn cross_project_move_undo_redo_restores_both_chains() {
    let mut s = session();
    let root = s.document().root();
    let a = add(&mut s, root, NodeKind::Project, "A");
    let b = add(&mut s, root, NodeKind::Project, "B");
    let from = activity_chain(&mut s, a, "From");
    let to = activity_chain(&mut s, b, "To");
    let done = add(&mut s, from, NodeKind::Feature, "Done");
    add(&mut s, from, NodeKind::Feature, "Open");
    add(&mut s, to, NodeKind::Feature, "Waiting");
    complete_all(&mut s, done);
    let late = NaiveDate::from_ymd_opt(2025, 9, 30).unwrap();
    s.set_milestone_dates(done, 5, late, Some(today())).unwrap();

    let before = snapshot(&s);
    assert_eq!(s.document().target_date(a), Some(late));
    assert_eq!(s.document().progress(from).completion, 50);

    s.move_node(done, to, None, today()).unwrap();
    let after = snapshot(&s);
    let doc = s.document();
    assert_eq!(doc.progress(from).completion, 0);
    assert_eq!(doc.progress(to).completion, 50);
    assert_eq!(doc.target_date(a), Some(today()));
    assert_eq!(doc.target_date(b), Some(late));
    assert_eq!(doc.progress(b).kpi, doc.progress(to).kpi);

    s.undo().unwrap();
    assert_eq!(snapshot(&s), before);
    s.redo().unwrap();
    assert_eq!(snapshot(&s), after);
}

#[test]
fn paste_keeping_sequence_numbers_still_reloads() {
    let config = EditorConfig {
        resequence_on_paste: false,
        ..EditorConfig::default()
    };
    let mut s = Session::new(Document::new("P").unwrap(), config);
    let root = s.document().root();
    let project = add(&mut s, root, NodeKind::Project, "Core");
    let act = activity_chain(&mut s, project, "Act");
    let original = add(&mut s, act, NodeKind::Feature, "F");
    let copy = match s.paste(original, act, None, today()).unwrap() {
        Edit::Applied(id) => id,
        Edit::Rejected(reason) => panic!("paste rejected: {}", reason),
    };
    assert_eq!(
        s.document().node(copy).seq(),
        s.document().node(original).seq()
    );

    let result = check_document(s.document(), true, today());
    assert!(result.valid, "{:?}", result.errors);
    assert!(result
        .warnings
        .iter()
        .any(|w| matches!(w, CheckWarning::DuplicateSeq { seq: 1, .. })));

    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(DEFAULT_FILE);
    let store = JsonStore::default();
    store.save(s.document(), &path).unwrap();
    let loaded = store.load(&path).unwrap();
    assert_eq!(loaded.features_under(loaded.root()).len(), 2);
}
