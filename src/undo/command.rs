use crate::model::document::validate_name;
use crate::model::{
    AspectInfo, Document, Milestone, NodeData, NodeError, NodeId, NodeKind, WorkPackages,
    YearMonth,
};
use crate::ops::aggregate::{self, AggregateError};

/// Error type for applying or reverting a command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("node {node} is no longer where the command expects it")]
    Stale { node: NodeId },
}

/// Snapshot of the user-editable fields of one node.
///
/// Fields that do not apply to the node's kind are `None`/empty. Applying a
/// snapshot that sets one of them is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFields {
    pub name: String,
    pub owner: Option<String>,
    pub prefix: Option<String>,
    pub target_month: Option<YearMonth>,
    pub milestones: Vec<Milestone>,
    /// Work package of a Feature within its enclosing Project
    pub work_package: Option<String>,
}

impl NodeFields {
    pub fn capture(doc: &Document, id: NodeId) -> Result<Self, NodeError> {
        let node = doc.try_node(id)?;
        Ok(NodeFields {
            name: node.name().to_string(),
            owner: node.owner().map(str::to_string),
            prefix: node.prefix().map(str::to_string),
            target_month: node.target_month(),
            milestones: node.milestones().to_vec(),
            work_package: work_package_of(doc, id),
        })
    }

    /// Check every field against the node's kind without touching anything
    fn validate(&self, doc: &Document, id: NodeId) -> Result<(), NodeError> {
        let kind = doc.try_node(id)?.kind();
        validate_name(&self.name)?;
        let not_applicable = |field| Err(NodeError::FieldNotApplicable { field, kind });
        if self.owner.is_some() && !matches!(kind, NodeKind::Activity | NodeKind::Feature) {
            return not_applicable("owner");
        }
        if self.prefix.is_some() && kind != NodeKind::Subject {
            return not_applicable("prefix");
        }
        if self.target_month.is_some() && kind != NodeKind::Activity {
            return not_applicable("target month");
        }
        if !self.milestones.is_empty() && kind != NodeKind::Feature {
            return not_applicable("milestones");
        }
        if let Some(package) = &self.work_package {
            if kind != NodeKind::Feature {
                return not_applicable("work package");
            }
            let known = doc
                .enclosing(id, NodeKind::Project)
                .and_then(|p| doc.node(p).work_packages())
                .is_some_and(|wp| wp.contains_key(package));
            if !known {
                return Err(NodeError::UnknownWorkPackage(package.clone()));
            }
        }
        Ok(())
    }

    fn write(&self, doc: &mut Document, id: NodeId) -> Result<(), NodeError> {
        self.validate(doc, id)?;
        let previous_package = work_package_of(doc, id);
        let node = doc.node_mut(id);
        node.name = validate_name(&self.name)?;
        match &mut node.data {
            NodeData::Subject { prefix } => prefix.clone_from(&self.prefix),
            NodeData::Activity {
                owner,
                target_month,
            } => {
                owner.clone_from(&self.owner);
                *target_month = self.target_month;
            }
            NodeData::Feature {
                owner, milestones, ..
            } => {
                owner.clone_from(&self.owner);
                milestones.clone_from(&self.milestones);
            }
            NodeData::Program | NodeData::Project { .. } | NodeData::Aspect { .. } => {}
        }
        if previous_package != self.work_package {
            set_work_package(doc, id, self.work_package.as_deref());
        }
        Ok(())
    }
}

/// First work package of the enclosing Project that lists this Feature
pub fn work_package_of(doc: &Document, feature: NodeId) -> Option<String> {
    let seq = doc.node(feature).seq()?;
    let project = doc.enclosing(feature, NodeKind::Project)?;
    doc.node(project)
        .work_packages()?
        .iter()
        .find(|(_, seqs)| seqs.contains(&seq))
        .map(|(name, _)| name.clone())
}

fn set_work_package(doc: &mut Document, feature: NodeId, package: Option<&str>) {
    let Some(seq) = doc.node(feature).seq() else {
        return;
    };
    let Some(project) = doc.enclosing(feature, NodeKind::Project) else {
        return;
    };
    if let Some(packages) = work_packages_mut(doc, project) {
        for seqs in packages.values_mut() {
            seqs.retain(|s| *s != seq);
        }
        if let Some(seqs) = package.and_then(|name| packages.get_mut(name)) {
            seqs.push(seq);
        }
    }
}

fn work_packages_mut(doc: &mut Document, project: NodeId) -> Option<&mut WorkPackages> {
    match &mut doc.node_mut(project).data {
        NodeData::Project { work_packages } => Some(work_packages),
        _ => None,
    }
}

fn project_packages(doc: &mut Document, project: NodeId) -> Result<&mut WorkPackages, NodeError> {
    let kind = doc.try_node(project)?.kind();
    work_packages_mut(doc, project).ok_or(NodeError::FieldNotApplicable {
        field: "work packages",
        kind,
    })
}

/// One undoable edit. Each variant records exactly what it needs to apply
/// itself and to restore the prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Attach a detached node (new child, paste, import)
    Attach {
        node: NodeId,
        parent: NodeId,
        index: Option<usize>,
    },
    /// Detach a node with its subtree (delete)
    Detach {
        node: NodeId,
        parent: NodeId,
        index: usize,
    },
    /// Move within or across parents. `applied` is filled on first apply.
    Move {
        node: NodeId,
        from_parent: NodeId,
        from_index: usize,
        to_parent: NodeId,
        requested: Option<usize>,
        applied: Option<usize>,
    },
    Edit {
        node: NodeId,
        before: NodeFields,
        after: NodeFields,
    },
    EditAspectInfo {
        aspect: NodeId,
        before: AspectInfo,
        after: AspectInfo,
    },
    /// Replace only a Feature's milestone list. Unlike `Edit` it leaves
    /// work-package membership alone, so it can follow a move across Projects.
    SetMilestones {
        feature: NodeId,
        before: Vec<Milestone>,
        after: Vec<Milestone>,
    },
    AddWorkPackage {
        project: NodeId,
        name: String,
    },
    RenameWorkPackage {
        project: NodeId,
        from: String,
        to: String,
    },
    DeleteWorkPackage {
        project: NodeId,
        name: String,
        index: usize,
        seqs: Vec<u32>,
    },
    /// Replace a Project's whole work-package table (pruning)
    ReplaceWorkPackages {
        project: NodeId,
        before: WorkPackages,
        after: WorkPackages,
    },
    /// Applied in order, reverted in reverse, undone as one step
    Batch(Vec<Command>),
}

impl Command {
    /// Delete command for an attached node, recording where it sits now
    pub fn detach(doc: &Document, node: NodeId) -> Result<Command, NodeError> {
        let (parent, index) = position(doc, node)?;
        Ok(Command::Detach {
            node,
            parent,
            index,
        })
    }

    /// Move command for an attached node
    pub fn relocate(
        doc: &Document,
        node: NodeId,
        to_parent: NodeId,
        requested: Option<usize>,
    ) -> Result<Command, NodeError> {
        doc.try_node(to_parent)?;
        let (from_parent, from_index) = position(doc, node)?;
        Ok(Command::Move {
            node,
            from_parent,
            from_index,
            to_parent,
            requested,
            applied: None,
        })
    }

    /// Field edit built from the node's current state and a change
    pub fn edit(
        doc: &Document,
        node: NodeId,
        change: impl FnOnce(&mut NodeFields),
    ) -> Result<Command, NodeError> {
        let before = NodeFields::capture(doc, node)?;
        let mut after = before.clone();
        change(&mut after);
        after.validate(doc, node)?;
        Ok(Command::Edit {
            node,
            before,
            after,
        })
    }

    /// Short human-readable label, e.g. for an "Undo ..." menu entry
    pub fn describe(&self, doc: &Document) -> String {
        let label = |id: NodeId| match doc.get(id) {
            Some(n) => format!("{} '{}'", n.kind(), n.name()),
            None => id.to_string(),
        };
        match self {
            Command::Attach { node, .. } => format!("add {}", label(*node)),
            Command::Detach { node, .. } => format!("delete {}", label(*node)),
            Command::Move { node, .. } => format!("move {}", label(*node)),
            Command::Edit { node, before, after } => {
                if before.name != after.name {
                    format!("rename {} to '{}'", label(*node), after.name)
                } else {
                    format!("edit {}", label(*node))
                }
            }
            Command::EditAspectInfo { aspect, .. } => {
                format!("edit milestones of {}", label(*aspect))
            }
            Command::SetMilestones { feature, .. } => {
                format!("fit milestones of {}", label(*feature))
            }
            Command::AddWorkPackage { name, .. } => format!("add work package '{}'", name),
            Command::RenameWorkPackage { from, to, .. } => {
                format!("rename work package '{}' to '{}'", from, to)
            }
            Command::DeleteWorkPackage { name, .. } => format!("delete work package '{}'", name),
            Command::ReplaceWorkPackages { project, .. } => {
                format!("prune work packages of {}", label(*project))
            }
            Command::Batch(commands) => match commands.as_slice() {
                [single] => single.describe(doc),
                [first, ..] => format!("{} (+{} more)", first.describe(doc), commands.len() - 1),
                [] => "nothing".to_string(),
            },
        }
    }

    /// Perform the edit. On error the document is left as it was.
    pub fn apply(&mut self, doc: &mut Document) -> Result<(), CommandError> {
        match self {
            Command::Attach {
                node,
                parent,
                index,
            } => {
                doc.attach(*node, *parent, *index)?;
                aggregate::refresh(doc, *node)?;
            }
            Command::Detach {
                node,
                parent,
                index,
            } => {
                if doc.parent(*node) != Some(*parent) || doc.index_in_parent(*node) != Some(*index)
                {
                    return Err(CommandError::Stale { node: *node });
                }
                doc.detach(*node)?;
                aggregate::recompute_upward(doc, *parent)?;
            }
            Command::Move {
                node,
                from_parent,
                from_index,
                to_parent,
                requested,
                applied,
            } => {
                if doc.parent(*node) != Some(*from_parent)
                    || doc.index_in_parent(*node) != Some(*from_index)
                {
                    return Err(CommandError::Stale { node: *node });
                }
                *applied = Some(doc.relocate(*node, *to_parent, *requested)?);
                aggregate::recompute_upward(doc, *from_parent)?;
                aggregate::refresh(doc, *node)?;
            }
            Command::Edit { node, after, .. } => {
                after.write(doc, *node)?;
                aggregate::recompute_upward(doc, *node)?;
            }
            Command::EditAspectInfo { aspect, after, .. } => {
                set_aspect_info(doc, *aspect, after)?;
            }
            Command::SetMilestones { feature, after, .. } => {
                set_milestones(doc, *feature, after)?;
            }
            Command::AddWorkPackage { project, name } => {
                let packages = project_packages(doc, *project)?;
                if packages.contains_key(name.as_str()) {
                    return Err(NodeError::DuplicateWorkPackage(name.clone()).into());
                }
                packages.insert(name.clone(), Vec::new());
            }
            Command::RenameWorkPackage { project, from, to } => {
                rename_package(project_packages(doc, *project)?, from, to)?;
            }
            Command::DeleteWorkPackage {
                project,
                name,
                index,
                seqs,
            } => {
                let packages = project_packages(doc, *project)?;
                let (i, _, removed) = packages
                    .shift_remove_full(name.as_str())
                    .ok_or_else(|| NodeError::UnknownWorkPackage(name.clone()))?;
                *index = i;
                *seqs = removed;
            }
            Command::ReplaceWorkPackages { project, after, .. } => {
                project_packages(doc, *project)?.clone_from(after);
            }
            Command::Batch(commands) => {
                for i in 0..commands.len() {
                    if let Err(e) = commands[i].apply(doc) {
                        for done in commands[..i].iter().rev() {
                            done.revert(doc)?;
                        }
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    /// Restore the state from before `apply`
    pub fn revert(&self, doc: &mut Document) -> Result<(), CommandError> {
        match self {
            Command::Attach { node, parent, .. } => {
                doc.detach(*node)?;
                aggregate::recompute_upward(doc, *parent)?;
            }
            Command::Detach {
                node,
                parent,
                index,
            } => {
                doc.attach(*node, *parent, Some(*index))?;
                aggregate::refresh(doc, *node)?;
            }
            Command::Move {
                node,
                from_parent,
                from_index,
                to_parent,
                ..
            } => {
                if doc.parent(*node) != Some(*to_parent) {
                    return Err(CommandError::Stale { node: *node });
                }
                doc.relocate(*node, *from_parent, Some(*from_index))?;
                aggregate::recompute_upward(doc, *to_parent)?;
                aggregate::refresh(doc, *node)?;
            }
            Command::Edit { node, before, .. } => {
                before.write(doc, *node)?;
                aggregate::recompute_upward(doc, *node)?;
            }
            Command::EditAspectInfo { aspect, before, .. } => {
                set_aspect_info(doc, *aspect, before)?;
            }
            Command::SetMilestones { feature, before, .. } => {
                set_milestones(doc, *feature, before)?;
            }
            Command::AddWorkPackage { project, name } => {
                project_packages(doc, *project)?.shift_remove(name.as_str());
            }
            Command::RenameWorkPackage { project, from, to } => {
                rename_package(project_packages(doc, *project)?, to, from)?;
            }
            Command::DeleteWorkPackage {
                project,
                name,
                index,
                seqs,
            } => {
                let packages = project_packages(doc, *project)?;
                packages.shift_insert(*index, name.clone(), seqs.clone());
            }
            Command::ReplaceWorkPackages {
                project, before, ..
            } => {
                project_packages(doc, *project)?.clone_from(before);
            }
            Command::Batch(commands) => {
                for command in commands.iter().rev() {
                    command.revert(doc)?;
                }
            }
        }
        Ok(())
    }
}

/// Current parent and index of a movable node
fn position(doc: &Document, node: NodeId) -> Result<(NodeId, usize), NodeError> {
    doc.try_node(node)?;
    if node == doc.root() {
        return Err(NodeError::RootImmutable);
    }
    let parent = doc.parent(node).ok_or(NodeError::NotAttached(node))?;
    let index = doc
        .index_in_parent(node)
        .ok_or(NodeError::NotAttached(node))?;
    Ok((parent, index))
}

fn set_aspect_info(
    doc: &mut Document,
    aspect: NodeId,
    info: &AspectInfo,
) -> Result<(), CommandError> {
    let kind = doc.try_node(aspect)?.kind();
    match &mut doc.node_mut(aspect).data {
        NodeData::Aspect { info: current } => current.clone_from(info),
        _ => {
            return Err(NodeError::FieldNotApplicable {
                field: "milestone definitions",
                kind,
            }
            .into());
        }
    }
    aggregate::refresh(doc, aspect)?;
    Ok(())
}

fn set_milestones(
    doc: &mut Document,
    feature: NodeId,
    milestones: &[Milestone],
) -> Result<(), CommandError> {
    let kind = doc.try_node(feature)?.kind();
    match &mut doc.node_mut(feature).data {
        NodeData::Feature {
            milestones: current,
            ..
        } => *current = milestones.to_vec(),
        _ => {
            return Err(NodeError::FieldNotApplicable {
                field: "milestones",
                kind,
            }
            .into());
        }
    }
    aggregate::recompute_upward(doc, feature)?;
    Ok(())
}

/// Rename in place, keeping the package's position
fn rename_package(packages: &mut WorkPackages, from: &str, to: &str) -> Result<(), NodeError> {
    if from == to {
        return Ok(());
    }
    if packages.contains_key(to) {
        return Err(NodeError::DuplicateWorkPackage(to.to_string()));
    }
    let index = packages
        .get_index_of(from)
        .ok_or_else(|| NodeError::UnknownWorkPackage(from.to_string()))?;
    let seqs = packages.shift_remove(from).unwrap_or_default();
    packages.shift_insert(index, to.to_string(), seqs);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Status;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn add(doc: &mut Document, parent: NodeId, kind: NodeKind, name: &str) -> NodeId {
        let id = doc.create_node(kind, name).unwrap();
        doc.attach(id, parent, None).unwrap();
        id
    }

    fn plan() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new("Root").unwrap();
        let root = doc.root();
        let project = add(&mut doc, root, NodeKind::Project, "P");
        let aspect = add(&mut doc, project, NodeKind::Aspect, "A");
        let subject = add(&mut doc, aspect, NodeKind::Subject, "S");
        let activity = add(&mut doc, subject, NodeKind::Activity, "Act");
        let feature = add(&mut doc, activity, NodeKind::Feature, "F");
        (doc, project, activity, feature)
    }

    // -----------------------------------------------------------------------
    // Field edits
    // -----------------------------------------------------------------------

    #[test]
    fn edit_rejects_field_of_other_kind() {
        let (doc, project, ..) = plan();
        let err = Command::edit(&doc, project, |f| f.prefix = Some("X".into())).unwrap_err();
        assert_eq!(
            err,
            NodeError::FieldNotApplicable {
                field: "prefix",
                kind: NodeKind::Project
            }
        );
    }

    #[test]
    fn edit_rejects_blank_name() {
        let (doc, _, activity, _) = plan();
        let err = Command::edit(&doc, activity, |f| f.name = "   ".into()).unwrap_err();
        assert_eq!(err, NodeError::EmptyName);
    }

    #[test]
    fn edit_apply_and_revert_milestones() {
        let (mut doc, _, activity, feature) = plan();
        let day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut done = vec![Milestone::planned(day); 6];
        done[0].status = Status::Complete;
        let mut cmd = Command::edit(&doc, feature, |f| f.milestones = done.clone()).unwrap();
        cmd.apply(&mut doc).unwrap();
        assert_eq!(doc.progress(feature).completion, 1);
        assert_eq!(doc.target_date(activity), Some(day));

        cmd.revert(&mut doc).unwrap();
        assert!(doc.node(feature).milestones().is_empty());
        assert_eq!(doc.progress(feature).completion, 0);
        assert_eq!(doc.target_date(activity), None);
    }

    #[test]
    fn set_milestones_leaves_work_package_alone() {
        let (mut doc, project, activity, feature) = plan();
        Command::AddWorkPackage {
            project,
            name: "WP1".into(),
        }
        .apply(&mut doc)
        .unwrap();
        Command::edit(&doc, feature, |f| f.work_package = Some("WP1".into()))
            .unwrap()
            .apply(&mut doc)
            .unwrap();

        let day = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let mut after = vec![Milestone::planned(day); 2];
        after[0].status = Status::Complete;
        let mut cmd = Command::SetMilestones {
            feature,
            before: Vec::new(),
            after,
        };
        cmd.apply(&mut doc).unwrap();
        assert_eq!(doc.node(feature).milestones().len(), 2);
        assert_eq!(doc.target_date(activity), Some(day));
        assert_eq!(work_package_of(&doc, feature).as_deref(), Some("WP1"));

        cmd.revert(&mut doc).unwrap();
        assert!(doc.node(feature).milestones().is_empty());
        assert_eq!(doc.target_date(activity), None);
        assert_eq!(work_package_of(&doc, feature).as_deref(), Some("WP1"));
    }

    #[test]
    fn set_milestones_only_on_features() {
        let (mut doc, _, activity, _) = plan();
        let mut cmd = Command::SetMilestones {
            feature: activity,
            before: Vec::new(),
            after: Vec::new(),
        };
        assert_eq!(
            cmd.apply(&mut doc).unwrap_err(),
            CommandError::Node(NodeError::FieldNotApplicable {
                field: "milestones",
                kind: NodeKind::Activity
            })
        );
    }

    // -----------------------------------------------------------------------
    // Work packages
    // -----------------------------------------------------------------------

    #[test]
    fn work_package_membership_follows_edits() {
        let (mut doc, project, _, feature) = plan();
        let mut add_wp = Command::AddWorkPackage {
            project,
            name: "WP1".into(),
        };
        add_wp.apply(&mut doc).unwrap();

        let mut assign =
            Command::edit(&doc, feature, |f| f.work_package = Some("WP1".into())).unwrap();
        assign.apply(&mut doc).unwrap();
        assert_eq!(work_package_of(&doc, feature).as_deref(), Some("WP1"));

        assign.revert(&mut doc).unwrap();
        assert_eq!(work_package_of(&doc, feature), None);
    }

    #[test]
    fn unknown_work_package_rejected() {
        let (doc, _, _, feature) = plan();
        let err = Command::edit(&doc, feature, |f| f.work_package = Some("nope".into()))
            .unwrap_err();
        assert_eq!(err, NodeError::UnknownWorkPackage("nope".into()));
    }

    #[test]
    fn delete_work_package_restores_position_and_members() {
        let (mut doc, project, ..) = plan();
        for name in ["A", "B", "C"] {
            Command::AddWorkPackage {
                project,
                name: name.into(),
            }
            .apply(&mut doc)
            .unwrap();
        }
        if let NodeData::Project { work_packages } = &mut doc.node_mut(project).data {
            work_packages["B"].push(1);
        }
        let mut delete = Command::DeleteWorkPackage {
            project,
            name: "B".into(),
            index: 0,
            seqs: Vec::new(),
        };
        delete.apply(&mut doc).unwrap();
        let names: Vec<_> = doc.node(project).work_packages().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["A", "C"]);

        delete.revert(&mut doc).unwrap();
        let packages = doc.node(project).work_packages().unwrap();
        let names: Vec<_> = packages.keys().cloned().collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(packages["B"], vec![1]);
    }

    #[test]
    fn rename_work_package_keeps_order() {
        let (mut doc, project, ..) = plan();
        for name in ["A", "B"] {
            Command::AddWorkPackage {
                project,
                name: name.into(),
            }
            .apply(&mut doc)
            .unwrap();
        }
        let mut rename = Command::RenameWorkPackage {
            project,
            from: "A".into(),
            to: "Z".into(),
        };
        rename.apply(&mut doc).unwrap();
        let names: Vec<_> = doc.node(project).work_packages().unwrap().keys().cloned().collect();
        assert_eq!(names, vec!["Z", "B"]);

        let mut clash = Command::RenameWorkPackage {
            project,
            from: "Z".into(),
            to: "B".into(),
        };
        assert_eq!(
            clash.apply(&mut doc).unwrap_err(),
            CommandError::Node(NodeError::DuplicateWorkPackage("B".into()))
        );
    }

    #[test]
    fn work_packages_only_on_projects() {
        let (mut doc, _, activity, _) = plan();
        let mut cmd = Command::AddWorkPackage {
            project: activity,
            name: "X".into(),
        };
        assert!(matches!(
            cmd.apply(&mut doc),
            Err(CommandError::Node(NodeError::FieldNotApplicable { .. }))
        ));
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    #[test]
    fn stale_detach_is_refused() {
        let (mut doc, _, activity, feature) = plan();
        let mut cmd = Command::Detach {
            node: feature,
            parent: activity,
            index: 3,
        };
        assert_eq!(
            cmd.apply(&mut doc).unwrap_err(),
            CommandError::Stale { node: feature }
        );
        assert!(doc.is_attached(feature));
    }

    #[test]
    fn failed_batch_rolls_back() {
        let (mut doc, project, activity, feature) = plan();
        let extra = doc.create_node(NodeKind::Feature, "Extra").unwrap();
        let mut batch = Command::Batch(vec![
            Command::Attach {
                node: extra,
                parent: activity,
                index: None,
            },
            // Features cannot live under a Project
            Command::Attach {
                node: feature,
                parent: project,
                index: None,
            },
        ]);
        assert!(batch.apply(&mut doc).is_err());
        assert!(!doc.is_attached(extra));
        assert_eq!(doc.children(activity), &[feature]);
    }

    #[test]
    fn describe_names_the_node() {
        let (doc, _, activity, feature) = plan();
        let cmd = Command::detach(&doc, feature).unwrap();
        assert_eq!(cmd.describe(&doc), "delete feature 'F'");
        let rename = Command::edit(&doc, activity, |f| f.name = "Ship".into()).unwrap();
        assert_eq!(rename.describe(&doc), "rename activity 'Act' to 'Ship'");
    }
}
