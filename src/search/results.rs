use std::collections::BinaryHeap;
use std::cmp::Ordering;
use crate::core::types::DocId;

/// One page of ranked matches
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResults {
    pub hits: Vec<ScoredDocument>,
    pub total_hits: usize,   // Matches after filtering, before paging
}

impl SearchResults {
    pub fn doc_ids(self) -> Vec<DocId> {
        self.hits.into_iter().map(|hit| hit.doc_id).collect()
    }
}

/// Document with relevance score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredDocument {
    pub doc_id: DocId,
    pub score: u64,   // Aggregate term frequency over the query terms
}

// Ordered by rank: `a < b` means `a` is listed before `b`.
// Higher score first, then ascending doc id.
impl Ord for ScoredDocument {
    fn cmp(&self, other: &Self) -> Ordering {
        other.score
            .cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

impl PartialOrd for ScoredDocument {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collects the best `k` documents, or all of them when unbounded.
pub struct TopKCollector {
    pub heap: BinaryHeap<ScoredDocument>,  // Max-heap on rank: the top is the worst kept
    pub k: Option<usize>,
    pub total_collected: usize,            // Track total documents processed
}

impl TopKCollector {
    pub fn new(k: Option<usize>) -> Self {
        let capacity = k.map(|k| k.saturating_add(1)).unwrap_or(0).min(4096);
        TopKCollector {
            heap: BinaryHeap::with_capacity(capacity),
            k,
            total_collected: 0,
        }
    }

    pub fn collect(&mut self, scored_doc: ScoredDocument) {
        self.total_collected += 1;

        match self.k {
            Some(0) => {}
            Some(k) if self.heap.len() >= k => {
                let better = self.heap.peek().is_some_and(|worst| scored_doc < *worst);
                if better {
                    self.heap.pop();
                    self.heap.push(scored_doc);
                }
            }
            _ => self.heap.push(scored_doc),
        }
    }

    /// Kept documents, best first.
    pub fn get_results(self) -> Vec<ScoredDocument> {
        self.heap.into_sorted_vec()
    }
}
