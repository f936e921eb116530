//! The editing session: one document, its undo history and the editor
//! configuration. All collaborator-facing mutations go through here.

use chrono::NaiveDate;

use crate::model::{
    AspectInfo, Document, EditorConfig, NodeData, NodeError, NodeId, NodeKind, Status, YearMonth,
};
use crate::ops::import::{self, ImportError};
use crate::ops::node_ops::{clone_subtree, create_feature_milestones, fit_milestones};
use crate::ops::rules;
use crate::undo::{Command, CommandError, CommandStack, NodeFields, StackOutcome};

/// Outcome of an edit request that passed argument validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit<T = ()> {
    /// The edit was executed and recorded for undo
    Applied(T),
    /// The hierarchy rules refused it; nothing changed
    Rejected(String),
}

impl<T> Edit<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Edit::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Edit::Applied(value) => Some(value),
            Edit::Rejected(_) => None,
        }
    }
}

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl From<NodeError> for SessionError {
    fn from(e: NodeError) -> Self {
        SessionError::Command(CommandError::Node(e))
    }
}

/// Where `insert_as_sibling` puts the source relative to the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Before,
    After,
}

pub struct Session {
    doc: Document,
    stack: CommandStack,
    config: EditorConfig,
}

impl Session {
    pub fn new(doc: Document, config: EditorConfig) -> Self {
        let stack = CommandStack::with_limit(config.undo_limit);
        Session { doc, stack, config }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn into_document(self) -> Document {
        self.doc
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &CommandStack {
        &self.stack
    }

    fn exclusivity(&self) -> bool {
        self.config.program_exclusivity
    }

    fn execute(&mut self, command: Command) -> Result<String, CommandError> {
        self.stack.execute(&mut self.doc, command)
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Create a node of `kind` under `parent` at `index` (`None` appends).
    /// New Features get one milestone per definition of their Aspect.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        name: &str,
        index: Option<usize>,
        today: NaiveDate,
    ) -> Result<Edit<NodeId>, SessionError> {
        self.doc.try_node(parent)?;
        if !rules::accepts_kind(&self.doc, parent, kind, self.exclusivity()) {
            return Ok(Edit::Rejected(format!(
                "a {} cannot hold a {} here",
                self.doc.kind(parent),
                kind
            )));
        }
        let node = self.doc.create_node(kind, name)?;
        if kind == NodeKind::Feature {
            let aspect = self.doc.enclosing(parent, NodeKind::Aspect);
            let planned = create_feature_milestones(&self.doc, aspect, today);
            if let NodeData::Feature { milestones, .. } = &mut self.doc.node_mut(node).data {
                *milestones = planned;
            }
        }
        self.execute(Command::Attach {
            node,
            parent,
            index,
        })?;
        Ok(Edit::Applied(node))
    }

    /// Move `node` with its subtree under `new_parent` at `index`. Returns the
    /// index actually used. Features that land under an Aspect with a
    /// different number of milestone definitions are refitted in the same
    /// undo step.
    pub fn move_node(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        index: Option<usize>,
        today: NaiveDate,
    ) -> Result<Edit<usize>, SessionError> {
        self.doc.try_node(node)?;
        self.doc.try_node(new_parent)?;
        if !self.doc.is_attached(node) || !self.doc.is_attached(new_parent) {
            return Ok(Edit::Rejected("both nodes must be in the tree".into()));
        }
        // Reordering under the current parent never changes the child mix
        let same_parent = self.doc.parent(node) == Some(new_parent);
        if !same_parent && !rules::is_valid_reparent(&self.doc, node, new_parent, self.exclusivity())
        {
            return Ok(Edit::Rejected(format!(
                "cannot move {} under {}",
                self.doc.name(node),
                self.doc.name(new_parent)
            )));
        }
        self.relocate(node, new_parent, index, today)
    }

    /// Place `source` directly before or after `reference`, under the
    /// reference's parent. A detached source (e.g. a fresh copy) is attached.
    pub fn insert_as_sibling(
        &mut self,
        source: NodeId,
        reference: NodeId,
        side: Side,
        today: NaiveDate,
    ) -> Result<Edit<usize>, SessionError> {
        self.doc.try_node(source)?;
        self.doc.try_node(reference)?;
        if !self.doc.is_attached(reference)
            || !rules::can_insert_sibling(&self.doc, source, reference, self.exclusivity())
        {
            return Ok(Edit::Rejected(format!(
                "cannot place {} next to {}",
                self.doc.name(source),
                self.doc.name(reference)
            )));
        }
        let Some(parent) = self.doc.parent(reference) else {
            return Ok(Edit::Rejected("nothing can sit beside the root".into()));
        };
        let reference_index = self.doc.index_in_parent(reference).unwrap_or(0);
        let mut target = match side {
            Side::Before => reference_index,
            Side::After => reference_index + 1,
        };

        match self.doc.parent(source) {
            Some(current) => {
                // Indices are relative to the list after the source is removed
                if current == parent
                    && self.doc.index_in_parent(source).is_some_and(|i| i < target)
                {
                    target -= 1;
                }
                self.relocate(source, parent, Some(target), today)
            }
            None => {
                let attach = Command::Attach {
                    node: source,
                    parent,
                    index: Some(target),
                };
                let fits = self.milestone_fits(source, parent, today);
                self.execute_with(attach, fits)?;
                Ok(Edit::Applied(self.doc.index_in_parent(source).unwrap_or(target)))
            }
        }
    }

    fn relocate(
        &mut self,
        node: NodeId,
        parent: NodeId,
        index: Option<usize>,
        today: NaiveDate,
    ) -> Result<Edit<usize>, SessionError> {
        let command = Command::relocate(&self.doc, node, parent, index)?;
        let fits = self.milestone_fits(node, parent, today);
        self.execute_with(command, fits)?;
        let applied = self.doc.index_in_parent(node).unwrap_or(0);
        Ok(Edit::Applied(applied))
    }

    /// Milestone refits for the Features of `node` once it sits under
    /// `parent`. Empty when the destination has no Aspect above it or every
    /// Feature already matches.
    fn milestone_fits(&self, node: NodeId, parent: NodeId, today: NaiveDate) -> Vec<Command> {
        let len = match self.doc.kind(node) {
            NodeKind::Program | NodeKind::Project | NodeKind::Aspect => return Vec::new(),
            _ => self
                .doc
                .enclosing(parent, NodeKind::Aspect)
                .and_then(|a| self.doc.node(a).aspect_info())
                .map(|info| info.milestones.len()),
        };
        let Some(len) = len else {
            return Vec::new();
        };
        self.doc
            .features_under(node)
            .into_iter()
            .filter_map(|feature| {
                let current = self.doc.node(feature).milestones();
                (current.len() != len).then(|| Command::SetMilestones {
                    feature,
                    before: current.to_vec(),
                    after: fit_milestones(current, len, today),
                })
            })
            .collect()
    }

    /// Run `command` followed by `follow_ups` as one undo step
    fn execute_with(
        &mut self,
        command: Command,
        follow_ups: Vec<Command>,
    ) -> Result<String, CommandError> {
        if follow_ups.is_empty() {
            return self.execute(command);
        }
        let mut commands = Vec::with_capacity(follow_ups.len() + 1);
        commands.push(command);
        commands.extend(follow_ups);
        self.execute(Command::Batch(commands))
    }

    /// Detach `node` and its subtree. Work-package references to removed
    /// Features are left for `prune_work_packages`.
    pub fn delete(&mut self, node: NodeId) -> Result<Edit, SessionError> {
        self.doc.try_node(node)?;
        if node == self.doc.root() {
            return Ok(Edit::Rejected("the root cannot be deleted".into()));
        }
        if !self.doc.is_attached(node) {
            return Ok(Edit::Rejected(format!("{} is not in the tree", node)));
        }
        let command = Command::detach(&self.doc, node)?;
        self.execute(command)?;
        Ok(Edit::Applied(()))
    }

    /// Deep-copy `source` under `parent` at `index`. Copied Features are
    /// fitted to the destination Aspect's milestone definitions.
    pub fn paste(
        &mut self,
        source: NodeId,
        parent: NodeId,
        index: Option<usize>,
        today: NaiveDate,
    ) -> Result<Edit<NodeId>, SessionError> {
        let kind = self.doc.try_node(source)?.kind();
        self.doc.try_node(parent)?;
        if !rules::accepts_kind(&self.doc, parent, kind, self.exclusivity()) {
            return Ok(Edit::Rejected(format!(
                "a {} cannot hold a {} here",
                self.doc.kind(parent),
                kind
            )));
        }
        let copy = clone_subtree(&mut self.doc, source, self.config.resequence_on_paste)?;
        let attach = Command::Attach {
            node: copy,
            parent,
            index,
        };
        let fits = self.milestone_fits(copy, parent, today);
        self.execute_with(attach, fits)?;
        Ok(Edit::Applied(copy))
    }

    /// Parse an indented outline and attach its top-level entries under
    /// `parent`, as one undo step
    pub fn import_outline(
        &mut self,
        parent: NodeId,
        text: &str,
        today: NaiveDate,
    ) -> Result<Edit<Vec<NodeId>>, SessionError> {
        let parent_kind = self.doc.try_node(parent)?.kind();
        let accepted = parent_kind
            .child_kinds()
            .last()
            .is_some_and(|kind| rules::accepts_kind(&self.doc, parent, *kind, self.exclusivity()));
        if !accepted {
            return Ok(Edit::Rejected(format!(
                "a {} cannot hold imported entries here",
                parent_kind
            )));
        }
        let roots = import::import_outline(&mut self.doc, parent, text, today)?.roots;
        let attach = roots
            .iter()
            .map(|node| Command::Attach {
                node: *node,
                parent,
                index: None,
            })
            .collect();
        self.execute(Command::Batch(attach))?;
        Ok(Edit::Applied(roots))
    }

    // -----------------------------------------------------------------------
    // Fields
    // -----------------------------------------------------------------------

    pub fn rename(&mut self, node: NodeId, name: &str) -> Result<Edit, SessionError> {
        let name = name.to_string();
        self.edit(node, |f| f.name = name)
    }

    pub fn set_owner(&mut self, node: NodeId, owner: Option<&str>) -> Result<Edit, SessionError> {
        let owner = owner.map(|o| o.trim().to_string()).filter(|o| !o.is_empty());
        self.edit(node, |f| f.owner = owner)
    }

    pub fn set_prefix(&mut self, subject: NodeId, prefix: Option<&str>) -> Result<Edit, SessionError> {
        let prefix = prefix.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());
        self.edit(subject, |f| f.prefix = prefix)
    }

    pub fn set_target_month(
        &mut self,
        activity: NodeId,
        month: Option<YearMonth>,
    ) -> Result<Edit, SessionError> {
        self.edit(activity, |f| f.target_month = month)
    }

    /// Set one milestone's status. Completing records `today` as the actual
    /// date unless one is already set; any other status clears it.
    pub fn set_milestone_status(
        &mut self,
        feature: NodeId,
        index: usize,
        status: Status,
        today: NaiveDate,
    ) -> Result<Edit, SessionError> {
        self.check_milestone(feature, index)?;
        self.edit(feature, |f| {
            let milestone = &mut f.milestones[index];
            milestone.status = status;
            milestone.actual = match status {
                Status::Complete => milestone.actual.or(Some(today)),
                _ => None,
            };
        })
    }

    pub fn set_milestone_dates(
        &mut self,
        feature: NodeId,
        index: usize,
        planned: NaiveDate,
        actual: Option<NaiveDate>,
    ) -> Result<Edit, SessionError> {
        self.check_milestone(feature, index)?;
        self.edit(feature, |f| {
            f.milestones[index].planned = planned;
            f.milestones[index].actual = actual;
        })
    }

    fn check_milestone(&self, feature: NodeId, index: usize) -> Result<(), NodeError> {
        let node = self.doc.try_node(feature)?;
        if node.kind() != NodeKind::Feature {
            return Err(NodeError::FieldNotApplicable {
                field: "milestones",
                kind: node.kind(),
            });
        }
        let len = node.milestones().len();
        if index >= len {
            return Err(NodeError::MilestoneOutOfRange { index, len });
        }
        Ok(())
    }

    /// Replace an Aspect's milestone definitions. Features below it are
    /// resized to match in the same undo step.
    pub fn edit_aspect_info(
        &mut self,
        aspect: NodeId,
        info: AspectInfo,
        today: NaiveDate,
    ) -> Result<Edit, SessionError> {
        let node = self.doc.try_node(aspect)?;
        let Some(before) = node.aspect_info().cloned() else {
            return Err(NodeError::FieldNotApplicable {
                field: "milestone definitions",
                kind: node.kind(),
            }
            .into());
        };
        let len = info.milestones.len();
        let mut commands = vec![Command::EditAspectInfo {
            aspect,
            before,
            after: info,
        }];
        for feature in self.doc.features_under(aspect) {
            let current = self.doc.node(feature).milestones();
            if current.len() != len {
                commands.push(Command::SetMilestones {
                    feature,
                    before: current.to_vec(),
                    after: fit_milestones(current, len, today),
                });
            }
        }
        self.execute(Command::Batch(commands))?;
        Ok(Edit::Applied(()))
    }

    fn edit(
        &mut self,
        node: NodeId,
        change: impl FnOnce(&mut NodeFields),
    ) -> Result<Edit, SessionError> {
        let command = Command::edit(&self.doc, node, change)?;
        if let Command::Edit { before, after, .. } = &command {
            if before == after {
                return Ok(Edit::Applied(()));
            }
        }
        self.execute(command)?;
        Ok(Edit::Applied(()))
    }

    // -----------------------------------------------------------------------
    // Work packages
    // -----------------------------------------------------------------------

    /// Put a Feature into a work package of its Project (`None` removes it)
    pub fn assign_work_package(
        &mut self,
        feature: NodeId,
        package: Option<&str>,
    ) -> Result<Edit, SessionError> {
        let package = package.map(str::to_string);
        self.edit(feature, |f| f.work_package = package)
    }

    pub fn add_work_package(&mut self, project: NodeId, name: &str) -> Result<Edit, SessionError> {
        let name = crate::model::document::validate_name(name)?;
        self.execute(Command::AddWorkPackage { project, name })?;
        Ok(Edit::Applied(()))
    }

    pub fn rename_work_package(
        &mut self,
        project: NodeId,
        from: &str,
        to: &str,
    ) -> Result<Edit, SessionError> {
        let to = crate::model::document::validate_name(to)?;
        self.execute(Command::RenameWorkPackage {
            project,
            from: from.to_string(),
            to,
        })?;
        Ok(Edit::Applied(()))
    }

    pub fn delete_work_package(&mut self, project: NodeId, name: &str) -> Result<Edit, SessionError> {
        self.execute(Command::DeleteWorkPackage {
            project,
            name: name.to_string(),
            index: 0,
            seqs: Vec::new(),
        })?;
        Ok(Edit::Applied(()))
    }

    /// Drop work-package entries whose Feature is no longer below the
    /// Project. Returns how many entries were removed.
    pub fn prune_work_packages(&mut self) -> Result<Edit<usize>, SessionError> {
        let mut commands = Vec::new();
        let mut removed = 0;
        for project in self.doc.walk() {
            let Some(before) = self.doc.node(project).work_packages() else {
                continue;
            };
            let present: Vec<u32> = self
                .doc
                .features_under(project)
                .into_iter()
                .filter_map(|f| self.doc.node(f).seq())
                .collect();
            let mut after = before.clone();
            for seqs in after.values_mut() {
                let len = seqs.len();
                seqs.retain(|s| present.contains(s));
                removed += len - seqs.len();
            }
            if after != *before {
                commands.push(Command::ReplaceWorkPackages {
                    project,
                    before: before.clone(),
                    after,
                });
            }
        }
        if !commands.is_empty() {
            self.execute(Command::Batch(commands))?;
        }
        Ok(Edit::Applied(removed))
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn undo(&mut self) -> Result<StackOutcome, CommandError> {
        self.stack.undo(&mut self.doc)
    }

    pub fn redo(&mut self) -> Result<StackOutcome, CommandError> {
        self.stack.redo(&mut self.doc)
    }

    pub fn can_undo(&self) -> bool {
        self.stack.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.stack.can_redo()
    }

    pub fn mark_saved(&mut self) {
        self.stack.mark_saved();
    }

    pub fn is_dirty(&self) -> bool {
        self.stack.is_dirty()
    }
}
