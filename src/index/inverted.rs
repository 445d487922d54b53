use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use chrono::Utc;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DocId, DocumentMetadata, Status, TenantKey};
use crate::index::posting::{Posting, PostingList};
use crate::storage::snapshot::IndexSnapshot;

/// Normalized search term, as produced by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Term(pub String);

impl Term {
    pub fn new(text: &str) -> Self {
        Term(text.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Term {
    fn from(text: String) -> Self {
        Term(text)
    }
}

impl From<&str> for Term {
    fn from(text: &str) -> Self {
        Term::new(text)
    }
}

impl Borrow<str> for Term {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current state of one live document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    pub metadata: DocumentMetadata,
    pub terms: HashMap<Term, u32>,  // Term -> frequency, mirrors the postings
}

/// Effect of replacing a document's indexed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentChange {
    Created,
    Updated,
    Unchanged,
}

/// Inverted index of one tenant.
///
/// Two maps are kept in lockstep: term -> postings and doc -> terms. The
/// second one makes delete and replace proportional to the document's own
/// term count instead of a scan over the whole dictionary.
pub struct InvertedIndex {
    postings: HashMap<Term, PostingList>,
    documents: HashMap<DocId, DocumentEntry>,
    applied_batches: LruCache<Uuid, ()>,
    dirty: bool,
}

impl InvertedIndex {
    pub fn new(batch_history: usize) -> Self {
        InvertedIndex {
            postings: HashMap::new(),
            documents: HashMap::new(),
            applied_batches: LruCache::new(Self::history_capacity(batch_history)),
            dirty: false,
        }
    }

    fn history_capacity(batch_history: usize) -> NonZeroUsize {
        NonZeroUsize::new(batch_history).unwrap_or(NonZeroUsize::MIN)
    }

    /// Add or overwrite the posting of `doc_id` under `term`.
    ///
    /// Low-level: callers must keep the document's term map in sync, which
    /// `replace_document` does.
    pub fn add_posting(&mut self, term: Term, doc_id: DocId, term_freq: u32) {
        self.postings
            .entry(term)
            .or_default()
            .add_posting(Posting { doc_id, term_freq });
    }

    /// Remove a posting; the term entry is pruned with its last posting.
    pub fn remove_posting(&mut self, term: &str, doc_id: &DocId) -> Option<u32> {
        let list = self.postings.get_mut(term)?;
        let removed = list.remove_posting(doc_id);
        if list.is_empty() {
            self.postings.remove(term);
        }
        removed
    }

    pub fn postings_for(&self, term: &str) -> Option<&PostingList> {
        self.postings.get(term)
    }

    pub fn metadata_for(&self, doc_id: &DocId) -> Option<&DocumentMetadata> {
        self.documents.get(doc_id).map(|entry| &entry.metadata)
    }

    pub fn document(&self, doc_id: &DocId) -> Option<&DocumentEntry> {
        self.documents.get(doc_id)
    }

    /// Make `terms` the complete indexed state of `doc_id`.
    ///
    /// Only the difference against the previous term set is touched. An
    /// identical replacement leaves the index clean.
    pub fn replace_document(
        &mut self,
        doc_id: DocId,
        metadata: DocumentMetadata,
        terms: HashMap<Term, u32>,
    ) -> DocumentChange {
        let previous = match self.documents.remove(&doc_id) {
            Some(entry) if entry.metadata == metadata && entry.terms == terms => {
                self.documents.insert(doc_id, entry);
                return DocumentChange::Unchanged;
            }
            previous => previous,
        };

        let change = if let Some(previous) = &previous {
            for term in previous.terms.keys() {
                if !terms.contains_key(term) {
                    self.remove_posting(term.as_str(), &doc_id);
                }
            }
            DocumentChange::Updated
        } else {
            DocumentChange::Created
        };

        for (term, freq) in &terms {
            let unchanged = previous
                .as_ref()
                .and_then(|p| p.terms.get(term))
                .is_some_and(|old| old == freq);
            if !unchanged {
                self.add_posting(term.clone(), doc_id.clone(), *freq);
            }
        }

        self.documents.insert(doc_id, DocumentEntry { metadata, terms });
        self.dirty = true;
        change
    }

    /// Drop every posting of `doc_id` and its metadata.
    pub fn remove_document(&mut self, doc_id: &DocId) -> Option<DocumentMetadata> {
        let entry = self.documents.remove(doc_id)?;
        for term in entry.terms.keys() {
            self.remove_posting(term.as_str(), doc_id);
        }
        self.dirty = true;
        Some(entry.metadata)
    }

    /// `None` if the document is unknown, otherwise whether the status changed.
    pub fn update_status(&mut self, doc_id: &DocId, status: Status) -> Option<bool> {
        let entry = self.documents.get_mut(doc_id)?;
        if entry.metadata.status == status {
            return Some(false);
        }
        entry.metadata.status = status;
        self.dirty = true;
        Some(true)
    }

    pub fn clear(&mut self) {
        if !self.documents.is_empty() || !self.postings.is_empty() {
            self.dirty = true;
        }
        self.documents.clear();
        self.postings.clear();
    }

    pub fn is_batch_applied(&self, batch_id: &Uuid) -> bool {
        self.applied_batches.contains(batch_id)
    }

    pub fn record_batch(&mut self, batch_id: Uuid) {
        self.applied_batches.put(batch_id, ());
        self.dirty = true;
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Check that both maps describe the same postings and that no term is dead.
    pub fn verify(&self) -> Result<()> {
        for (term, list) in &self.postings {
            if list.is_empty() {
                return Err(Error::new(ErrorKind::InvalidState, format!("Term '{}' has no postings", term)));
            }
            for posting in list.iter() {
                let freq = self.documents
                    .get(&posting.doc_id)
                    .and_then(|entry| entry.terms.get(term));
                if freq != Some(&posting.term_freq) {
                    return Err(Error::new(
                        ErrorKind::InvalidState,
                        format!("Posting '{}' -> {} has no matching document term", term, posting.doc_id),
                    ));
                }
            }
        }

        for (doc_id, entry) in &self.documents {
            for (term, freq) in &entry.terms {
                let listed = self.postings.get(term).and_then(|list| list.term_freq(doc_id));
                if listed != Some(*freq) {
                    return Err(Error::new(
                        ErrorKind::InvalidState,
                        format!("Document {} term '{}' is missing from postings", doc_id, term),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Serializable copy of the whole index, sorted for stable output.
    pub fn to_snapshot(&self, tenant: &TenantKey) -> IndexSnapshot {
        let mut postings: Vec<(Term, Vec<Posting>)> = self.postings
            .iter()
            .map(|(term, list)| (term.clone(), list.postings.clone()))
            .collect();
        postings.sort_by(|a, b| a.0.cmp(&b.0));

        let mut documents: Vec<(DocId, DocumentMetadata)> = self.documents
            .iter()
            .map(|(doc_id, entry)| (doc_id.clone(), entry.metadata.clone()))
            .collect();
        documents.sort_by(|a, b| a.0.cmp(&b.0));

        // LruCache iterates most recent first; snapshots keep oldest first
        let applied_batches = self.applied_batches
            .iter()
            .map(|(id, _)| *id)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        IndexSnapshot {
            tenant: tenant.clone(),
            saved_at: Utc::now(),
            postings,
            documents,
            applied_batches,
        }
    }

    /// Rebuild an index from a snapshot, rejecting inconsistent content.
    pub fn from_snapshot(snapshot: IndexSnapshot, batch_history: usize) -> Result<Self> {
        let mut index = InvertedIndex::new(batch_history);

        for (doc_id, metadata) in snapshot.documents {
            index.documents.insert(doc_id, DocumentEntry {
                metadata,
                terms: HashMap::new(),
            });
        }

        for (term, postings) in snapshot.postings {
            if postings.is_empty() {
                return Err(Error::persistence(format!("Snapshot term '{}' has no postings", term)));
            }
            for posting in &postings {
                let entry = index.documents.get_mut(&posting.doc_id).ok_or_else(|| {
                    Error::persistence(format!(
                        "Snapshot posting '{}' references unknown document {}",
                        term, posting.doc_id
                    ))
                })?;
                entry.terms.insert(term.clone(), posting.term_freq);
            }
            index.postings.insert(term, PostingList::from_postings(postings));
        }

        for batch_id in snapshot.applied_batches {
            index.applied_batches.put(batch_id, ());
        }

        index.verify().map_err(|e| Error::persistence(e.context))?;
        Ok(index)
    }
}
