use std::collections::HashMap;
use crate::analysis::filter::TokenFilter;
use crate::analysis::filters::ascii_folding::AsciiFoldingFilter;
use crate::analysis::filters::length::LengthFilter;
use crate::analysis::filters::lowercase::LowercaseFilter;
use crate::analysis::token::Token;
use crate::analysis::tokenizer::{StandardTokenizer, Tokenizer};
use crate::index::inverted::Term;

/// Text analysis pipeline.
///
/// The same analyzer must serve indexing and querying; a term is only
/// findable if the query side produces it byte for byte.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Lower-cased, diacritics-insensitive terms split on non-alphanumerics.
    pub fn standard(max_token_length: usize) -> Self {
        Analyzer::new("standard".to_string(), Box::new(StandardTokenizer))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(AsciiFoldingFilter))
            .add_filter(Box::new(LengthFilter::new(max_token_length)))
    }

    pub fn terms(&self, text: &str) -> Vec<Term> {
        self.analyze(text)
            .into_iter()
            .map(|token| Term::from(token.text))
            .collect()
    }

    /// Term frequencies summed over several texts (the fields of one document).
    pub fn term_frequencies<'a, I>(&self, texts: I) -> HashMap<Term, u32>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut freqs = HashMap::new();
        for text in texts {
            for token in self.analyze(text) {
                *freqs.entry(Term::from(token.text)).or_insert(0) += 1;
            }
        }
        freqs
    }
}

impl Clone for Analyzer {
    fn clone(&self) -> Self {
        Analyzer {
            tokenizer: self.tokenizer.clone_box(),
            filters: self.filters.iter().map(|f| f.clone_box()).collect(),
            name: self.name.clone(),
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::standard(255)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(terms: Vec<Term>) -> Vec<String> {
        terms.into_iter().map(|t| t.0).collect()
    }

    #[test]
    fn standard_pipeline_normalizes() {
        let analyzer = Analyzer::default();
        assert_eq!(
            strings(analyzer.terms("Crème BRÛLÉE, São-Paulo")),
            vec!["creme", "brulee", "sao", "paulo"]
        );
    }

    #[test]
    fn index_and_query_side_agree() {
        let analyzer = Analyzer::default();
        let cloned = analyzer.clone();
        for text in ["Blue Whale", "ÉCOLE d'été", "x86_64 rust-lang 2024", "", "  \t\n"] {
            assert_eq!(analyzer.terms(text), cloned.terms(text));
        }
    }

    #[test]
    fn drops_overlong_tokens() {
        let analyzer = Analyzer::standard(5);
        assert_eq!(strings(analyzer.terms("short enormous")), vec!["short"]);
    }

    #[test]
    fn counts_frequencies_across_fields() {
        let analyzer = Analyzer::default();
        let freqs = analyzer.term_frequencies(["Blue whale", "blue sky, BLUE sea"]);
        assert_eq!(freqs[&Term::from("blue")], 3);
        assert_eq!(freqs[&Term::from("whale")], 1);
        assert_eq!(freqs.len(), 4);
    }
}
