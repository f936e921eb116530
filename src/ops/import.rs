use chrono::NaiveDate;

use crate::model::{Document, NodeData, NodeError, NodeId, NodeKind};
use crate::ops::node_ops::create_feature_milestones;

/// Error type for outline imports
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("no outline entries found in import text")]
    NoEntries,
    #[error("line {line}: indentation must be a multiple of two spaces")]
    BadIndent { line: usize },
    #[error("line {line}: entry is nested more than one level below the previous entry")]
    SkippedLevel { line: usize },
    #[error("line {line}: a {kind} cannot hold child entries")]
    TooDeep { line: usize, kind: NodeKind },
    #[error("line {line}: {source}")]
    Node { line: usize, source: NodeError },
    #[error(transparent)]
    Parent(#[from] NodeError),
}

/// Result of an outline import
#[derive(Debug)]
pub struct ImportResult {
    /// Detached top-level nodes, in outline order, ready to attach under the
    /// import parent
    pub roots: Vec<NodeId>,
    /// Total number of nodes created (including nested ones)
    pub total_count: usize,
}

/// One parsed outline line
struct Entry {
    line: usize,
    name: String,
    kind: NodeKind,
    /// Index of the enclosing entry
    parent: Option<usize>,
}

/// Parse an indented bullet outline into a detached forest whose kinds follow
/// the child typing below `parent`.
///
/// ```text
/// - Accounts           (Aspect, when importing under a Project)
///   - Statements       (Subject)
///     - Monthly run    (Activity)
///       - Print total  (Feature)
/// ```
///
/// Entries directly below a Program become Projects. Non-bullet lines
/// (headers, blank lines, prose) are skipped. Features get one milestone per
/// definition of their Aspect, planned for `today`. Nothing is created unless
/// the whole outline is valid.
pub fn import_outline(
    doc: &mut Document,
    parent: NodeId,
    text: &str,
    today: NaiveDate,
) -> Result<ImportResult, ImportError> {
    let parent_kind = doc.try_node(parent)?.kind();
    let entries = parse_outline(text, parent_kind)?;
    if entries.is_empty() {
        return Err(ImportError::NoEntries);
    }

    let mut ids: Vec<NodeId> = Vec::with_capacity(entries.len());
    let mut roots = Vec::new();
    for entry in &entries {
        let id = doc
            .create_node(entry.kind, &entry.name)
            .map_err(|source| ImportError::Node {
                line: entry.line,
                source,
            })?;
        match entry.parent {
            Some(p) => {
                doc.attach(id, ids[p], None)
                    .map_err(|source| ImportError::Node {
                        line: entry.line,
                        source,
                    })?;
            }
            None => roots.push(id),
        }
        ids.push(id);
    }

    let outer_aspect = doc.enclosing(parent, NodeKind::Aspect);
    for id in &ids {
        if doc.kind(*id) != NodeKind::Feature {
            continue;
        }
        let aspect = doc.enclosing(*id, NodeKind::Aspect).or(outer_aspect);
        let planned = create_feature_milestones(doc, aspect, today);
        if let NodeData::Feature { milestones, .. } = &mut doc.node_mut(*id).data {
            *milestones = planned;
        }
    }

    tracing::debug!(count = ids.len(), roots = roots.len(), "outline imported");
    Ok(ImportResult {
        roots,
        total_count: ids.len(),
    })
}

/// Validate the whole outline and assign kinds before anything is created
fn parse_outline(text: &str, parent_kind: NodeKind) -> Result<Vec<Entry>, ImportError> {
    let mut entries: Vec<Entry> = Vec::new();
    // Entry index of the most recent entry at each level
    let mut open: Vec<usize> = Vec::new();

    for (i, raw) in text.lines().enumerate() {
        let line = i + 1;
        let Some((indent, name)) = bullet(raw) else {
            continue;
        };
        if indent % 2 != 0 {
            return Err(ImportError::BadIndent { line });
        }
        let level = indent / 2;
        if level > open.len() {
            return Err(ImportError::SkippedLevel { line });
        }
        open.truncate(level);

        let parent = open.last().copied();
        let holder = parent.map_or(parent_kind, |p| entries[p].kind);
        let Some(kind) = child_kind(holder) else {
            return Err(ImportError::TooDeep { line, kind: holder });
        };
        if name.trim().is_empty() {
            return Err(ImportError::Node {
                line,
                source: NodeError::EmptyName,
            });
        }
        open.push(entries.len());
        entries.push(Entry {
            line,
            name: name.trim().to_string(),
            kind,
            parent,
        });
    }
    Ok(entries)
}

/// Leading-space count and text of a `- ` or `* ` bullet line
fn bullet(line: &str) -> Option<(usize, &str)> {
    let content = line.trim_start_matches(' ');
    let indent = line.len() - content.len();
    let rest = content
        .strip_prefix("- ")
        .or_else(|| content.strip_prefix("* "))
        .or_else(|| (content == "-" || content == "*").then_some(""))?;
    Some((indent, rest))
}

/// The kind an outline entry takes below `holder`. Programs hold Projects.
fn child_kind(holder: NodeKind) -> Option<NodeKind> {
    holder.child_kinds().last().copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn project_doc() -> (Document, NodeId) {
        let mut doc = Document::new("Root").unwrap();
        let project = doc.create_node(NodeKind::Project, "P").unwrap();
        doc.attach(project, doc.root(), None).unwrap();
        (doc, project)
    }

    fn full_outline_md() -> &'static str {
        "\
- Accounts
  - Statements
    - Monthly run
      - Print total
      - Email copy
  - Payments
- Reporting
"
    }

    fn outline_with_headers_md() -> &'static str {
        "\
# Plan outline

Some description text here.

- Accounts

- Reporting
"
    }

    // --- Kinds and nesting ---

    #[test]
    fn test_import_under_project_builds_aspects() {
        let (mut doc, project) = project_doc();
        let result = import_outline(&mut doc, project, full_outline_md(), today()).unwrap();

        assert_eq!(result.roots.len(), 2);
        assert_eq!(result.total_count, 7);
        let accounts = result.roots[0];
        assert_eq!(doc.kind(accounts), NodeKind::Aspect);
        assert!(!doc.is_attached(accounts));

        let names: Vec<_> = doc
            .subtree(accounts)
            .into_iter()
            .map(|n| (doc.kind(n), doc.name(n).to_string()))
            .collect();
        assert_eq!(
            names,
            vec![
                (NodeKind::Aspect, "Accounts".to_string()),
                (NodeKind::Subject, "Statements".to_string()),
                (NodeKind::Activity, "Monthly run".to_string()),
                (NodeKind::Feature, "Print total".to_string()),
                (NodeKind::Feature, "Email copy".to_string()),
                (NodeKind::Subject, "Payments".to_string()),
            ]
        );
    }

    #[test]
    fn test_import_features_get_milestones() {
        let (mut doc, project) = project_doc();
        let result = import_outline(&mut doc, project, full_outline_md(), today()).unwrap();
        let features = doc.features_under(result.roots[0]);
        assert_eq!(features.len(), 2);
        for f in features {
            assert_eq!(doc.node(f).milestones().len(), 6);
            assert_eq!(doc.node(f).milestones()[0].planned, today());
        }
    }

    #[test]
    fn test_import_under_activity_uses_outer_aspect() {
        let (mut doc, project) = project_doc();
        let aspect = doc.create_node(NodeKind::Aspect, "A").unwrap();
        doc.attach(aspect, project, None).unwrap();
        let subject = doc.create_node(NodeKind::Subject, "S").unwrap();
        doc.attach(subject, aspect, None).unwrap();
        let activity = doc.create_node(NodeKind::Activity, "Act").unwrap();
        doc.attach(activity, subject, None).unwrap();

        let result = import_outline(&mut doc, activity, "- One\n- Two\n", today()).unwrap();
        assert_eq!(result.roots.len(), 2);
        assert_eq!(doc.kind(result.roots[1]), NodeKind::Feature);
        assert_eq!(doc.node(result.roots[1]).milestones().len(), 6);
    }

    #[test]
    fn test_import_under_program_builds_projects() {
        let mut doc = Document::new("Root").unwrap();
        let root = doc.root();
        let result = import_outline(&mut doc, root, "- Billing\n  - Core\n", today()).unwrap();
        assert_eq!(doc.kind(result.roots[0]), NodeKind::Project);
        assert_eq!(doc.kind(doc.children(result.roots[0])[0]), NodeKind::Aspect);
    }

    #[test]
    fn test_import_skips_headers() {
        let (mut doc, project) = project_doc();
        let result = import_outline(&mut doc, project, outline_with_headers_md(), today()).unwrap();
        assert_eq!(result.total_count, 2);
    }

    // --- Errors ---

    #[test]
    fn test_import_empty_text() {
        let (mut doc, project) = project_doc();
        let before = doc.len();
        let err = import_outline(&mut doc, project, "# nothing\n", today()).unwrap_err();
        assert_eq!(err, ImportError::NoEntries);
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn test_import_too_deep_creates_nothing() {
        let (mut doc, project) = project_doc();
        let before = doc.len();
        let text = "- A\n  - S\n    - Act\n      - F\n        - Below feature\n";
        let err = import_outline(&mut doc, project, text, today()).unwrap_err();
        assert_eq!(
            err,
            ImportError::TooDeep {
                line: 5,
                kind: NodeKind::Feature
            }
        );
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn test_import_skipped_level() {
        let (mut doc, project) = project_doc();
        let err = import_outline(&mut doc, project, "- A\n    - Deep\n", today()).unwrap_err();
        assert_eq!(err, ImportError::SkippedLevel { line: 2 });
    }

    #[test]
    fn test_import_odd_indent() {
        let (mut doc, project) = project_doc();
        let err = import_outline(&mut doc, project, "- A\n - B\n", today()).unwrap_err();
        assert_eq!(err, ImportError::BadIndent { line: 2 });
    }

    #[test]
    fn test_import_blank_entry_name() {
        let (mut doc, project) = project_doc();
        let err = import_outline(&mut doc, project, "- A\n  -   \n", today()).unwrap_err();
        assert_eq!(
            err,
            ImportError::Node {
                line: 2,
                source: NodeError::EmptyName
            }
        );
    }
}
