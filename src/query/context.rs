use std::collections::HashSet;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{DocumentMetadata, Language, SchemaId, Status};

/// Caller-supplied filters and paging for one search.
///
/// A `None` filter admits everything. Paging is applied after ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchContext {
    pub schema_ids: Option<HashSet<SchemaId>>,
    pub statuses: Option<HashSet<Status>>,
    pub languages: Option<HashSet<Language>>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schemas<I, S>(mut self, schema_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SchemaId>,
    {
        self.schema_ids = Some(schema_ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = Status>) -> Self {
        self.statuses = Some(statuses.into_iter().collect());
        self
    }

    pub fn with_languages<I, L>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<Language>,
    {
        self.languages = Some(languages.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Reject structurally invalid requests before any work is done.
    pub fn validate(&self) -> Result<()> {
        if self.limit == Some(0) {
            return Err(Error::query("limit must be greater than zero"));
        }

        if self.schema_ids.as_ref().is_some_and(HashSet::is_empty) {
            return Err(Error::query("schema filter must not be an empty set"));
        }
        if self.statuses.as_ref().is_some_and(HashSet::is_empty) {
            return Err(Error::query("status filter must not be an empty set"));
        }
        if let Some(languages) = &self.languages {
            if languages.is_empty() {
                return Err(Error::query("language filter must not be an empty set"));
            }
            if let Some(bad) = languages.iter().find(|l| !l.is_valid()) {
                return Err(Error::query(format!("language filter '{}' is malformed", bad)));
            }
        }

        Ok(())
    }

    /// The requested limit, clamped to `max_page_size`.
    pub fn page_limit(&self, max_page_size: usize) -> Option<usize> {
        self.limit.map(|limit| limit.min(max_page_size))
    }

    pub fn matches(&self, metadata: &DocumentMetadata) -> bool {
        self.schema_ids.as_ref().is_none_or(|s| s.contains(&metadata.schema_id))
            && self.statuses.as_ref().is_none_or(|s| s.contains(&metadata.status))
            && self.languages.as_ref().is_none_or(|l| l.contains(&metadata.language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;

    fn metadata(schema: &str, status: Status, language: &str) -> DocumentMetadata {
        DocumentMetadata {
            schema_id: SchemaId::from(schema),
            status,
            language: Language::from(language),
        }
    }

    #[test]
    fn default_context_is_valid_and_open() {
        let context = SearchContext::new();
        context.validate().unwrap();
        assert_eq!(context.page_limit(10), None);
        assert!(context.matches(&metadata("s1", Status::Draft, "de")));
    }

    #[test]
    fn invalid_contexts_are_query_errors() {
        let cases = [
            SearchContext::new().with_limit(0),
            SearchContext::new().with_schemas(Vec::<SchemaId>::new()),
            SearchContext::new().with_statuses([]),
            SearchContext::new().with_languages(["not a tag"]),
        ];
        for context in cases {
            assert_eq!(context.validate().unwrap_err().kind, ErrorKind::Query);
        }
    }

    #[test]
    fn oversized_limit_is_clamped() {
        let context = SearchContext::new().with_limit(11);
        context.validate().unwrap();
        assert_eq!(context.page_limit(10), Some(10));
        assert_eq!(SearchContext::new().with_limit(3).page_limit(10), Some(3));
    }

    #[test]
    fn filters_combine_with_and() {
        let context = SearchContext::new()
            .with_schemas(["s1", "s2"])
            .with_statuses([Status::Published])
            .with_languages(["en"]);

        assert!(context.matches(&metadata("s2", Status::Published, "en")));
        assert!(!context.matches(&metadata("s3", Status::Published, "en")));
        assert!(!context.matches(&metadata("s1", Status::Draft, "en")));
        assert!(!context.matches(&metadata("s1", Status::Published, "fr")));
    }
}
