use std::sync::Arc;
use crate::analysis::analyzer::Analyzer;
use crate::core::error::Result;
use crate::core::types::DocId;
use crate::index::inverted::InvertedIndex;
use crate::index::posting::PostingList;
use crate::query::context::SearchContext;
use crate::query::parser::QueryParser;
use crate::search::results::{ScoredDocument, SearchResults, TopKCollector};

/// Read-only query execution over one tenant's index.
pub struct QueryEngine {
    pub parser: QueryParser,
    pub max_page_size: usize,
}

impl QueryEngine {
    pub fn new(analyzer: Arc<Analyzer>, max_page_size: usize) -> Self {
        QueryEngine {
            parser: QueryParser::new(analyzer),
            max_page_size,
        }
    }

    /// Ranked ids of documents containing every query term and passing the
    /// context filters. Only an invalid context is an error.
    pub fn search(&self, index: &InvertedIndex, query_text: &str, context: &SearchContext) -> Result<Vec<DocId>> {
        context.validate()?;
        Ok(self.execute(index, query_text, context).doc_ids())
    }

    /// Like `search`, with scores and the unpaged hit count. Assumes a validated context.
    /// A limit above `max_page_size` is clamped to it.
    pub fn execute(&self, index: &InvertedIndex, query_text: &str, context: &SearchContext) -> SearchResults {
        let Some(matched) = self.match_all_terms(index, query_text) else {
            return SearchResults::default();
        };

        let limit = context.page_limit(self.max_page_size);
        let k = limit.map(|limit| context.offset.saturating_add(limit));
        let mut collector = TopKCollector::new(k);

        for posting in matched.iter() {
            let admitted = index
                .metadata_for(&posting.doc_id)
                .is_some_and(|metadata| context.matches(metadata));
            if admitted {
                collector.collect(ScoredDocument {
                    doc_id: posting.doc_id.clone(),
                    score: posting.term_freq as u64,
                });
            }
        }

        let total_hits = collector.total_collected;
        let hits = collector
            .get_results()
            .into_iter()
            .skip(context.offset)
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        SearchResults { hits, total_hits }
    }

    /// Intersection of the query terms' postings, frequencies summed.
    /// `None` when the query has no terms or some term matches nothing.
    fn match_all_terms(&self, index: &InvertedIndex, query_text: &str) -> Option<PostingList> {
        let terms = self.parser.parse(query_text);
        if terms.is_empty() {
            return None;
        }

        let mut lists = Vec::with_capacity(terms.len());
        for term in &terms {
            lists.push(index.postings_for(term.as_str())?);
        }

        // Smallest list first keeps every intermediate result small
        lists.sort_by_key(|list| list.len());

        let (first, rest) = lists.split_first()?;
        let mut matched = (*first).clone();
        for list in rest {
            if matched.is_empty() {
                return None;
            }
            matched = matched.intersect(list);
        }

        Some(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use crate::core::types::{IndexCommand, Status};
    use crate::writer::applier::CommandApplier;
    use crate::writer::batch::CommandBatch;

    fn setup(commands: Vec<IndexCommand>) -> (InvertedIndex, QueryEngine) {
        let analyzer = Arc::new(Analyzer::default());
        let mut index = InvertedIndex::new(16);
        CommandApplier::new(analyzer.clone(), 256).apply(&mut index, &CommandBatch::new(commands).unwrap());
        (index, QueryEngine::new(analyzer, 100))
    }

    fn doc(id: &str, schema: &str, title: &str) -> IndexCommand {
        IndexCommand::upsert(id, schema, Status::Published, "en").with_field("title", title)
    }

    fn ids(result: Vec<DocId>) -> Vec<String> {
        result.into_iter().map(|d| d.0).collect()
    }

    #[test]
    fn requires_every_term() {
        let (index, engine) = setup(vec![
            doc("a", "s1", "Blue Whale"),
            doc("b", "s1", "Blue Sky"),
        ]);
        let ctx = SearchContext::new();
        assert_eq!(ids(engine.search(&index, "blue whale", &ctx).unwrap()), vec!["a"]);
        assert!(engine.search(&index, "whale sky", &ctx).unwrap().is_empty());
        assert!(engine.search(&index, "orca", &ctx).unwrap().is_empty());
        assert!(engine.search(&index, "  ?? ", &ctx).unwrap().is_empty());
    }

    #[test]
    fn ranks_by_aggregate_frequency_with_id_tie_break() {
        let (index, engine) = setup(vec![
            doc("c", "s1", "blue"),
            doc("a", "s1", "blue"),
            doc("b", "s1", "blue blue blue"),
        ]);
        let result = engine.search(&index, "blue", &SearchContext::new()).unwrap();
        assert_eq!(ids(result), vec!["b", "a", "c"]);
    }

    #[test]
    fn pages_after_ranking() {
        let (index, engine) = setup(vec![
            doc("a", "s1", "rust"),
            doc("b", "s1", "rust rust"),
            doc("c", "s1", "rust"),
            doc("d", "s1", "rust"),
        ]);
        let page = |offset, limit| {
            let ctx = SearchContext::new().with_offset(offset).with_limit(limit);
            ids(engine.search(&index, "rust", &ctx).unwrap())
        };
        assert_eq!(page(0, 2), vec!["b", "a"]);
        assert_eq!(page(2, 2), vec!["c", "d"]);
        assert_eq!(page(3, 5), vec!["d"]);
        assert!(page(10, 5).is_empty());

        let results = engine.execute(&index, "rust", &SearchContext::new().with_limit(1));
        assert_eq!(results.total_hits, 4);
        assert_eq!(results.hits.len(), 1);
    }

    #[test]
    fn oversized_limit_returns_one_full_page() {
        let (index, _) = setup((0..5).map(|i| doc(&format!("d{}", i), "s1", "tide")).collect());
        let engine = QueryEngine::new(Arc::new(Analyzer::default()), 3);
        let ctx = SearchContext::new().with_limit(1_000);
        assert_eq!(ids(engine.search(&index, "tide", &ctx).unwrap()), vec!["d0", "d1", "d2"]);
    }

    #[test]
    fn filters_by_schema_after_intersection() {
        let (index, engine) = setup(vec![
            doc("a", "s1", "Blue Whale"),
            doc("b", "s2", "Blue Whale"),
        ]);
        let ctx = SearchContext::new().with_schemas(["s2"]);
        assert_eq!(ids(engine.search(&index, "whale", &ctx).unwrap()), vec!["b"]);
    }

    #[test]
    fn invalid_context_is_rejected() {
        let (index, engine) = setup(vec![doc("a", "s1", "x")]);
        let err = engine.search(&index, "x", &SearchContext::new().with_limit(0)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Query);
    }
}
