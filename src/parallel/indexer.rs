use rayon::prelude::*;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::Result;
use crate::core::types::IndexCommand;
use crate::writer::applier::{prepare_command, PreparedCommand};

/// Validates and analyzes the commands of a batch, in parallel for large batches.
///
/// Preparation has no access to the index, so running it out of order is
/// safe; results are always returned in batch order.
pub struct ParallelIndexer {
    pub threshold: usize,
}

impl ParallelIndexer {
    pub fn new(threshold: usize) -> Self {
        ParallelIndexer { threshold }
    }

    pub fn prepare_batch(&self, commands: &[IndexCommand], analyzer: &Analyzer) -> Vec<Result<PreparedCommand>> {
        if commands.len() >= self.threshold.max(1) && commands.len() > 1 {
            commands
                .par_iter()
                .map(|command| prepare_command(analyzer, command))
                .collect()
        } else {
            // Sequential for small batches (avoid parallelization overhead)
            commands
                .iter()
                .map(|command| prepare_command(analyzer, command))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Status;

    #[test]
    fn parallel_and_sequential_agree() {
        let analyzer = Analyzer::default();
        let commands: Vec<IndexCommand> = (0..64)
            .map(|i| {
                IndexCommand::upsert(format!("doc-{}", i), "s1", Status::Published, "en")
                    .with_field("body", format!("entry {} of the catalogue", i))
            })
            .chain(std::iter::once(IndexCommand::delete("")))
            .collect();

        let parallel = ParallelIndexer::new(2).prepare_batch(&commands, &analyzer);
        let sequential = ParallelIndexer::new(usize::MAX).prepare_batch(&commands, &analyzer);

        assert_eq!(parallel.len(), commands.len());
        for (p, s) in parallel.iter().zip(&sequential) {
            match (p, s) {
                (Ok(p), Ok(s)) => assert_eq!(p, s),
                (Err(p), Err(s)) => assert_eq!(p.context, s.context),
                _ => panic!("parallel and sequential preparation disagree"),
            }
        }
        assert!(parallel.last().unwrap().is_err());
    }
}
