//! Command-based undo/redo.
//!
//! Every mutation of a [`Document`] goes through a [`Command`] executed on a
//! [`CommandStack`]. The stack also tracks whether the document differs from
//! its last saved state.

pub mod command;

pub use command::{Command, CommandError, NodeFields, work_package_of};

use crate::model::Document;

/// Result of an undo or redo request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackOutcome {
    /// The command was reverted (undo) or re-applied (redo)
    Applied(String),
    /// Nothing to undo or redo
    Unavailable,
}

#[derive(Debug, Clone)]
struct Entry {
    command: Command,
    description: String,
}

/// Undo and redo history for one document
#[derive(Debug, Clone)]
pub struct CommandStack {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
    limit: Option<usize>,
    /// Undo depth matching the saved file; `None` once that state can no
    /// longer be reached by undo or redo
    saved: Option<usize>,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandStack {
    /// Unbounded history, clean
    pub fn new() -> Self {
        CommandStack {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: None,
            saved: Some(0),
        }
    }

    /// History that keeps at most `limit` undo steps
    pub fn with_limit(limit: Option<usize>) -> Self {
        CommandStack {
            limit,
            ..Self::new()
        }
    }

    /// Apply `command`, record it and clear the redo history. Returns its
    /// description. A failed command is not recorded.
    pub fn execute(
        &mut self,
        doc: &mut Document,
        mut command: Command,
    ) -> Result<String, CommandError> {
        let description = command.describe(doc);
        command.apply(doc)?;
        tracing::debug!(%description, depth = self.undo.len() + 1, "executed");

        if self.saved.is_some_and(|s| s > self.undo.len()) {
            // The saved state lived on the redo stack
            self.saved = None;
        }
        self.undo.push(Entry {
            command,
            description: description.clone(),
        });
        self.redo.clear();
        self.trim();
        Ok(description)
    }

    pub fn undo(&mut self, doc: &mut Document) -> Result<StackOutcome, CommandError> {
        let Some(entry) = self.undo.pop() else {
            return Ok(StackOutcome::Unavailable);
        };
        if let Err(e) = entry.command.revert(doc) {
            tracing::warn!(description = %entry.description, error = %e, "undo failed");
            self.undo.push(entry);
            return Err(e);
        }
        tracing::debug!(description = %entry.description, "undone");
        let description = entry.description.clone();
        self.redo.push(entry);
        Ok(StackOutcome::Applied(description))
    }

    pub fn redo(&mut self, doc: &mut Document) -> Result<StackOutcome, CommandError> {
        let Some(mut entry) = self.redo.pop() else {
            return Ok(StackOutcome::Unavailable);
        };
        if let Err(e) = entry.command.apply(doc) {
            tracing::warn!(description = %entry.description, error = %e, "redo failed");
            self.redo.push(entry);
            return Err(e);
        }
        tracing::debug!(description = %entry.description, "redone");
        let description = entry.description.clone();
        self.undo.push(entry);
        Ok(StackOutcome::Applied(description))
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    pub fn peek_undo_description(&self) -> Option<&str> {
        self.undo.last().map(|e| e.description.as_str())
    }

    pub fn peek_redo_description(&self) -> Option<&str> {
        self.redo.last().map(|e| e.description.as_str())
    }

    /// Record the current state as saved
    pub fn mark_saved(&mut self) {
        self.saved = Some(self.undo.len());
    }

    /// True unless the document is exactly at its last saved state
    pub fn is_dirty(&self) -> bool {
        self.saved != Some(self.undo.len())
    }

    /// Drop all history. The current state counts as saved.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
        self.saved = Some(0);
    }

    fn trim(&mut self) {
        let Some(limit) = self.limit else {
            return;
        };
        if self.undo.len() > limit {
            let excess = self.undo.len() - limit;
            self.undo.drain(..excess);
            self.saved = self.saved.and_then(|s| s.checked_sub(excess));
        }
    }
}
