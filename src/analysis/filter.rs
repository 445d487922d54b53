use crate::analysis::token::Token;

/// One stage of the analysis pipeline.
///
/// Filters may rewrite or drop tokens but never reorder them, and must be
/// pure: query terms only match if they reproduce index-time output exactly.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<Token>) -> Vec<Token>;

    fn name(&self) -> &'static str;

    fn clone_box(&self) -> Box<dyn TokenFilter>;
}
