use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use crate::analysis::filter::TokenFilter;
use crate::analysis::token::Token;

/// Drops diacritics: canonical decomposition, then combining marks removed.
/// Latin letters with no decomposition (strokes, ligatures) are mapped
/// through a table.
pub struct AsciiFoldingFilter;

impl AsciiFoldingFilter {
    pub fn fold(text: &str) -> String {
        let mut folded = String::with_capacity(text.len());
        for c in text.nfd().filter(|c| !is_combining_mark(*c)) {
            match fold_letter(c) {
                Some(replacement) => folded.push_str(replacement),
                None => folded.push(c),
            }
        }
        folded
    }
}

fn fold_letter(c: char) -> Option<&'static str> {
    let replacement = match c {
        'ł' => "l",
        'Ł' => "L",
        'ø' => "o",
        'Ø' => "O",
        'đ' | 'ð' => "d",
        'Đ' | 'Ð' => "D",
        'ħ' => "h",
        'Ħ' => "H",
        'ı' => "i",
        'ŧ' => "t",
        'Ŧ' => "T",
        'ƀ' => "b",
        'ß' => "ss",
        'ẞ' => "SS",
        'æ' => "ae",
        'Æ' => "AE",
        'œ' => "oe",
        'Œ' => "OE",
        'þ' => "th",
        'Þ' => "TH",
        _ => return None,
    };
    Some(replacement)
}

impl TokenFilter for AsciiFoldingFilter {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token> {
        tokens.into_iter()
            .map(|mut token| {
                if !token.text.is_ascii() {
                    token.text = Self::fold(&token.text);
                }
                token
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "ascii_folding"
    }

    fn clone_box(&self) -> Box<dyn TokenFilter> {
        Box::new(AsciiFoldingFilter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_precomposed_and_decomposed_forms_alike() {
        assert_eq!(AsciiFoldingFilter::fold("crème"), "creme");
        assert_eq!(AsciiFoldingFilter::fold("cre\u{0300}me"), "creme");
        assert_eq!(AsciiFoldingFilter::fold("Zürich"), "Zurich");
        assert_eq!(AsciiFoldingFilter::fold("naïve"), "naive");
    }

    #[test]
    fn folds_letters_without_decomposition() {
        assert_eq!(AsciiFoldingFilter::fold("Søren"), "Soren");
        assert_eq!(AsciiFoldingFilter::fold("Łódź"), "Lodz");
        assert_eq!(AsciiFoldingFilter::fold("Đorđe"), "Dorde");
        assert_eq!(AsciiFoldingFilter::fold("Straße"), "Strasse");
        assert_eq!(AsciiFoldingFilter::fold("Encyclopædia"), "Encyclopaedia");
    }
}
