use unicode_normalization::char::is_combining_mark;
use unicode_segmentation::UnicodeSegmentation;
use crate::analysis::token::Token;

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;

    fn clone_box(&self) -> Box<dyn Tokenizer>;
}

/// Standard Unicode tokenizer.
///
/// Words come from UAX #29 segmentation and are split again on every
/// character that is neither alphanumeric nor a combining mark, so `e-mail`
/// and `o'neil` yield two terms each.
#[derive(Clone, Default)]
pub struct StandardTokenizer;

fn is_term_char(c: char) -> bool {
    c.is_alphanumeric() || is_combining_mark(c)
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for (word_offset, word) in text.unicode_word_indices() {
            let mut start: Option<usize> = None;

            for (i, c) in word.char_indices() {
                match (is_term_char(c), start) {
                    (true, None) => start = Some(i),
                    (false, Some(s)) => {
                        tokens.push(Token::new(word[s..i].to_string(), position, word_offset + s));
                        position += 1;
                        start = None;
                    }
                    _ => {}
                }
            }

            if let Some(s) = start {
                tokens.push(Token::new(word[s..].to_string(), position, word_offset + s));
                position += 1;
            }
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }

    fn clone_box(&self) -> Box<dyn Tokenizer> {
        Box::new(StandardTokenizer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(tokens: Vec<Token>) -> Vec<String> {
        tokens.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_non_alphanumeric() {
        let tokens = StandardTokenizer.tokenize("Blue-Whale, o'neil 3.14!");
        assert_eq!(texts(tokens), vec!["Blue", "Whale", "o", "neil", "3", "14"]);
    }

    #[test]
    fn keeps_offsets_and_positions() {
        let tokens = StandardTokenizer.tokenize("  hello   world");
        assert_eq!(tokens[0], Token::new("hello".to_string(), 0, 2));
        assert_eq!(tokens[1], Token::new("world".to_string(), 1, 10));
    }

    #[test]
    fn keeps_combining_marks_with_their_base() {
        let decomposed = "cre\u{0300}me";
        assert_eq!(texts(StandardTokenizer.tokenize(decomposed)), vec![decomposed]);
    }

    #[test]
    fn punctuation_only_yields_nothing() {
        assert!(StandardTokenizer.tokenize(" ... --- !!! ").is_empty());
    }
}
