use std::collections::BTreeMap;
use std::fmt;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

/// Tenant-scoped document identifier.
///
/// Ordering is lexicographic and is the ranking tie-break.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub String);

impl DocId {
    pub fn new(id: impl Into<String>) -> Self {
        DocId(id.into())
    }

    /// Random 128-bit id in hyphenated form.
    pub fn random() -> Self {
        DocId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.trim().is_empty() && !self.0.chars().any(char::is_control)
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        DocId(id.to_string())
    }
}

impl From<Uuid> for DocId {
    fn from(id: Uuid) -> Self {
        DocId(id.to_string())
    }
}

impl fmt::Display for DocId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Routing key of one logical index (one per application).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantKey(pub String);

impl TenantKey {
    pub fn new(key: impl Into<String>) -> Self {
        TenantKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && !self.0.chars().any(char::is_control)
    }
}

impl From<&str> for TenantKey {
    fn from(key: &str) -> Self {
        TenantKey(key.to_string())
    }
}

impl From<Uuid> for TenantKey {
    fn from(key: Uuid) -> Self {
        TenantKey(key.to_string())
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaId(pub String);

impl SchemaId {
    pub const MAX_LEN: usize = 128;

    pub fn new(id: impl Into<String>) -> Self {
        SchemaId(id.into())
    }

    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= Self::MAX_LEN
            && !self.0.chars().any(|c| c.is_whitespace() || c.is_control())
    }
}

impl From<&str> for SchemaId {
    fn from(id: &str) -> Self {
        SchemaId(id.to_string())
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    Published,
    Deleted,
}

/// BCP-47 style language tag, `iv` for invariant content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Language(pub String);

impl Language {
    pub const MAX_LEN: usize = 35;

    pub fn new(tag: impl Into<String>) -> Self {
        Language(tag.into())
    }

    pub fn invariant() -> Self {
        Language("iv".to_string())
    }

    pub fn is_valid(&self) -> bool {
        let tag = self.0.as_str();
        !tag.is_empty()
            && tag.len() <= Self::MAX_LEN
            && !tag.starts_with('-')
            && !tag.ends_with('-')
            && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    }
}

impl From<&str> for Language {
    fn from(tag: &str) -> Self {
        Language(tag.to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
}

impl FieldValue {
    /// Text form fed to the analyzer, or `None` if the value cannot be indexed.
    pub fn indexable_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(text) => Some(text.clone()),
            FieldValue::Number(n) if !n.is_finite() => None,
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            FieldValue::Number(n) => Some(n.to_string()),
            FieldValue::Date(date) => Some(date.format("%Y-%m-%d").to_string()),
            FieldValue::Boolean(b) => Some(b.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

/// The only per-document data kept by the index besides its terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub schema_id: SchemaId,
    pub status: Status,
    pub language: Language,
}

/// A content mutation, produced upstream in causal order per document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IndexCommand {
    Upsert {
        doc_id: DocId,
        schema_id: SchemaId,
        status: Status,
        language: Language,
        fields: BTreeMap<String, FieldValue>,
    },
    Delete {
        doc_id: DocId,
    },
    /// Publish/unpublish without touching the indexed terms.
    UpdateStatus {
        doc_id: DocId,
        status: Status,
    },
}

impl IndexCommand {
    pub fn upsert(
        doc_id: impl Into<DocId>,
        schema_id: impl Into<SchemaId>,
        status: Status,
        language: impl Into<Language>,
    ) -> Self {
        IndexCommand::Upsert {
            doc_id: doc_id.into(),
            schema_id: schema_id.into(),
            status,
            language: language.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder helper, no-op on non-upsert commands.
    pub fn with_field(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        if let IndexCommand::Upsert { fields, .. } = &mut self {
            fields.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn delete(doc_id: impl Into<DocId>) -> Self {
        IndexCommand::Delete { doc_id: doc_id.into() }
    }

    pub fn update_status(doc_id: impl Into<DocId>, status: Status) -> Self {
        IndexCommand::UpdateStatus { doc_id: doc_id.into(), status }
    }

    pub fn doc_id(&self) -> &DocId {
        match self {
            IndexCommand::Upsert { doc_id, .. }
            | IndexCommand::Delete { doc_id }
            | IndexCommand::UpdateStatus { doc_id, .. } => doc_id,
        }
    }
}

impl From<String> for DocId {
    fn from(id: String) -> Self {
        DocId(id)
    }
}

impl From<String> for SchemaId {
    fn from(id: String) -> Self {
        SchemaId(id)
    }
}

impl From<String> for Language {
    fn from(tag: String) -> Self {
        Language(tag)
    }
}
