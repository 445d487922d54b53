use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

pub struct LowercaseFilter;

impl TokenFilter for LowercaseFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                if token.text.is_ascii() {
                    token.text.make_ascii_lowercase();
                } else {
                    token.text = token.text.to_lowercase();
                }
                token
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "lowercase"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(LowercaseFilter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_ascii_and_unicode() {
        let tokens = vec![
            Token::new("Whale".to_string(), 0, 0),
            Token::new("ÉCOLE".to_string(), 1, 6),
            Token::new("STRASSE".to_string(), 2, 13),
        ];
        let texts: Vec<String> = LowercaseFilter.filter(tokens).into_iter().map(|t| t.text).collect();
        assert_eq!(texts, vec!["whale", "école", "strasse"]);
    }
}
