use std::collections::HashSet;
use std::sync::Arc;
use crate::analysis::analyzer::Analyzer;
use crate::index::inverted::Term;

/// Turns query text into the distinct terms that must all match.
///
/// Uses the indexing analyzer, so every term a document was indexed under
/// can be produced from query text.
pub struct QueryParser {
    pub analyzer: Arc<Analyzer>,
}

impl QueryParser {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        QueryParser { analyzer }
    }

    /// Distinct terms in first-occurrence order; empty when nothing is searchable.
    pub fn parse(&self, query_text: &str) -> Vec<Term> {
        let mut seen = HashSet::new();
        self.analyzer
            .terms(query_text)
            .into_iter()
            .filter(|term| seen.insert(term.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupes_and_normalizes() {
        let parser = QueryParser::new(Arc::new(Analyzer::default()));
        let terms = parser.parse("Blue BLUE whale, blüe");
        assert_eq!(terms, vec![Term::from("blue"), Term::from("whale")]);
    }

    #[test]
    fn punctuation_only_query_has_no_terms() {
        let parser = QueryParser::new(Arc::new(Analyzer::default()));
        assert!(parser.parse("?!  --").is_empty());
        assert!(parser.parse("").is_empty());
    }
}
