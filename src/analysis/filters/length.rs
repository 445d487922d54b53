use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Removes empty tokens and tokens longer than `max_length` bytes.
pub struct LengthFilter {
    pub max_length: usize,
}

impl LengthFilter {
    pub fn new(max_length: usize) -> Self {
        LengthFilter { max_length }
    }
}

impl TokenFilter for LengthFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .filter(|token| !token.text.is_empty() && token.text.len() <= self.max_length)
            .collect()
    }

    fn name(&self) -> &'static str {
        "length"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(LengthFilter {
            max_length: self.max_length,
        })
    }
}
