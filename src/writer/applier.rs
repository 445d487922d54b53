use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::{Error, Result};
use crate::core::types::{DocId, DocumentMetadata, IndexCommand, Status};
use crate::index::inverted::{DocumentChange, InvertedIndex, Term};
use crate::parallel::indexer::ParallelIndexer;
use crate::writer::batch::{BatchOutcome, CommandBatch, CommandOutcome, CommandStatus};

/// A command that passed validation, with its fields already analyzed.
///
/// Applying a prepared command cannot fail, which is what keeps a document
/// from ever being half updated.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedCommand {
    Upsert {
        doc_id: DocId,
        metadata: DocumentMetadata,
        terms: HashMap<Term, u32>,
    },
    Delete {
        doc_id: DocId,
    },
    UpdateStatus {
        doc_id: DocId,
        status: Status,
    },
}

fn validate_doc_id(doc_id: &DocId) -> Result<()> {
    if !doc_id.is_valid() {
        return Err(Error::validation("document id must not be empty"));
    }
    Ok(())
}

/// Validate one command and analyze its fields.
pub fn prepare_command(analyzer: &Analyzer, command: &IndexCommand) -> Result<PreparedCommand> {
    match command {
        IndexCommand::Upsert { doc_id, schema_id, status, language, fields } => {
            validate_doc_id(doc_id)?;
            if !schema_id.is_valid() {
                return Err(Error::validation(format!("schema id '{}' is malformed", schema_id)));
            }
            if !language.is_valid() {
                return Err(Error::validation(format!("language tag '{}' is malformed", language)));
            }

            let mut texts = Vec::with_capacity(fields.len());
            for (name, value) in fields {
                if name.trim().is_empty() {
                    return Err(Error::validation("field name must not be empty"));
                }
                let text = value.indexable_text().ok_or_else(|| {
                    Error::validation(format!("field '{}' has an unparseable value", name))
                })?;
                texts.push(text);
            }

            Ok(PreparedCommand::Upsert {
                doc_id: doc_id.clone(),
                metadata: DocumentMetadata {
                    schema_id: schema_id.clone(),
                    status: *status,
                    language: language.clone(),
                },
                terms: analyzer.term_frequencies(texts.iter().map(String::as_str)),
            })
        }
        IndexCommand::Delete { doc_id } => {
            validate_doc_id(doc_id)?;
            Ok(PreparedCommand::Delete { doc_id: doc_id.clone() })
        }
        IndexCommand::UpdateStatus { doc_id, status } => {
            validate_doc_id(doc_id)?;
            Ok(PreparedCommand::UpdateStatus { doc_id: doc_id.clone(), status: *status })
        }
    }
}

/// Applies command batches, in batch order, to an inverted index.
pub struct CommandApplier {
    pub analyzer: Arc<Analyzer>,
    pub indexer: ParallelIndexer,
}

impl CommandApplier {
    pub fn new(analyzer: Arc<Analyzer>, parallel_threshold: usize) -> Self {
        CommandApplier {
            analyzer,
            indexer: ParallelIndexer::new(parallel_threshold),
        }
    }

    /// Apply `batch` to `index`.
    ///
    /// Malformed commands are reported and skipped; the rest of the batch
    /// still applies. A batch whose id was already applied is skipped whole.
    pub fn apply(&self, index: &mut InvertedIndex, batch: &CommandBatch) -> BatchOutcome {
        if let Some(id) = batch.id() {
            if index.is_batch_applied(&id) {
                debug!(target: "shardtext::applier", batch = %id, "Skipping redelivered batch");
                return BatchOutcome::duplicate(id);
            }
        }

        let prepared = self.indexer.prepare_batch(batch.commands(), &self.analyzer);

        let results: Vec<CommandOutcome> = prepared
            .into_iter()
            .zip(batch.commands())
            .enumerate()
            .map(|(position, (prepared, command))| {
                let status = match prepared {
                    Ok(prepared) => Self::apply_prepared(index, prepared),
                    Err(e) => CommandStatus::Failed(e.context),
                };
                CommandOutcome {
                    index: position,
                    doc_id: command.doc_id().clone(),
                    status,
                }
            })
            .collect();

        if let Some(id) = batch.id() {
            index.record_batch(id);
        }

        let outcome = BatchOutcome {
            batch_id: batch.id(),
            duplicate: false,
            results,
        };

        debug!(
            target: "shardtext::applier",
            commands = batch.len(),
            changed = outcome.changed_count(),
            failed = outcome.failures().len(),
            "Applied batch"
        );

        outcome
    }

    fn apply_prepared(index: &mut InvertedIndex, command: PreparedCommand) -> CommandStatus {
        match command {
            PreparedCommand::Upsert { doc_id, metadata, terms } => {
                match index.replace_document(doc_id, metadata, terms) {
                    DocumentChange::Created => CommandStatus::Created,
                    DocumentChange::Updated => CommandStatus::Updated,
                    DocumentChange::Unchanged => CommandStatus::Unchanged,
                }
            }
            PreparedCommand::Delete { doc_id } => match index.remove_document(&doc_id) {
                Some(_) => CommandStatus::Deleted,
                None => CommandStatus::NotFound,
            },
            PreparedCommand::UpdateStatus { doc_id, status } => match index.update_status(&doc_id, status) {
                Some(true) => CommandStatus::StatusChanged,
                Some(false) => CommandStatus::Unchanged,
                None => CommandStatus::NotFound,
            },
        }
    }
}
