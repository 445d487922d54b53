use std::sync::Arc;
use uuid::Uuid;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, IndexCommand};

/// Ordered, non-empty, immutable batch of commands.
///
/// The commands are copied into shared immutable storage on construction,
/// so the sender can neither observe nor cause mutation after handoff and
/// cloning the batch is cheap.
#[derive(Debug, Clone)]
pub struct CommandBatch {
    id: Option<Uuid>,
    commands: Arc<[IndexCommand]>,
}

impl CommandBatch {
    pub fn new(commands: Vec<IndexCommand>) -> Result<Self> {
        if commands.is_empty() {
            return Err(Error::validation("command batch must not be empty"));
        }
        Ok(CommandBatch {
            id: None,
            commands: commands.into(),
        })
    }

    /// Tag the batch so a redelivery is recognized and skipped.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn commands(&self) -> &[IndexCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Result of one command within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    Created,
    Updated,
    Unchanged,
    Deleted,
    StatusChanged,
    /// Delete or status update of a document the index does not hold.
    NotFound,
    /// Validation failed; the command was skipped.
    Failed(String),
}

impl CommandStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, CommandStatus::Failed(_))
    }

    pub fn is_change(&self) -> bool {
        matches!(
            self,
            CommandStatus::Created | CommandStatus::Updated | CommandStatus::Deleted | CommandStatus::StatusChanged
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub index: usize,      // Position in the batch
    pub doc_id: DocId,
    pub status: CommandStatus,
}

/// Per-command report of an applied batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub batch_id: Option<Uuid>,
    pub duplicate: bool,   // Batch id seen before, nothing applied
    pub results: Vec<CommandOutcome>,
}

impl BatchOutcome {
    pub fn duplicate(batch_id: Uuid) -> Self {
        BatchOutcome {
            batch_id: Some(batch_id),
            duplicate: true,
            results: Vec::new(),
        }
    }

    /// True when no command failed validation.
    pub fn is_success(&self) -> bool {
        !self.results.iter().any(|r| r.status.is_failure())
    }

    /// `(batch position, reason)` of every skipped command.
    pub fn failures(&self) -> Vec<(usize, &str)> {
        self.results
            .iter()
            .filter_map(|r| match &r.status {
                CommandStatus::Failed(reason) => Some((r.index, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn changed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_change()).count()
    }

    pub fn status_of(&self, index: usize) -> Option<&CommandStatus> {
        self.results.get(index).map(|r| &r.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    #[test]
    fn empty_batch_is_rejected() {
        assert_eq!(CommandBatch::new(Vec::new()).unwrap_err().kind, ErrorKind::Validation);
    }

    #[test]
    fn clones_share_commands() {
        let batch = CommandBatch::new(vec![IndexCommand::delete("a")]).unwrap();
        let copy = batch.clone();
        assert!(std::ptr::eq(batch.commands(), copy.commands()));
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn failures_are_listed_with_positions() {
        let outcome = BatchOutcome {
            batch_id: None,
            duplicate: false,
            results: vec![
                CommandOutcome { index: 0, doc_id: DocId::from("a"), status: CommandStatus::Created },
                CommandOutcome { index: 1, doc_id: DocId::from(""), status: CommandStatus::Failed("empty id".into()) },
            ],
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.failures(), vec![(1, "empty id")]);
        assert_eq!(outcome.changed_count(), 1);
    }
}
