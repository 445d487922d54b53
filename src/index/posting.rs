use serde::{Deserialize, Serialize};
use crate::core::types::DocId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub term_freq: u32,       // Term frequency in document
}

/// Posting list for a term
/// Note: Sorted by doc_id, which gives merge intersection and a stable iteration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    pub postings: Vec<Posting>,  // Sorted by doc_id
}

impl PostingList {
    pub fn new() -> Self {
        PostingList {
            postings: Vec::new(),
        }
    }

    /// Build from postings in any order; the last entry for a doc id wins.
    pub fn from_postings(mut postings: Vec<Posting>) -> Self {
        postings.sort_by(|a, b| a.doc_id.cmp(&b.doc_id));
        postings.dedup_by(|later, earlier| {
            if later.doc_id == earlier.doc_id {
                earlier.term_freq = later.term_freq;
                true
            } else {
                false
            }
        });
        PostingList { postings }
    }

    /// Insert or overwrite the posting for `posting.doc_id`.
    pub fn add_posting(&mut self, posting: Posting) {
        match self.postings.binary_search_by(|p| p.doc_id.cmp(&posting.doc_id)) {
            Ok(pos) => {
                self.postings[pos] = posting;
            }
            Err(pos) => {
                self.postings.insert(pos, posting);
            }
        }
    }

    /// Returns the removed term frequency, if the document was listed.
    pub fn remove_posting(&mut self, doc_id: &DocId) -> Option<u32> {
        match self.postings.binary_search_by(|p| p.doc_id.cmp(doc_id)) {
            Ok(pos) => Some(self.postings.remove(pos).term_freq),
            Err(_) => None,
        }
    }

    pub fn term_freq(&self, doc_id: &DocId) -> Option<u32> {
        self.postings
            .binary_search_by(|p| p.doc_id.cmp(doc_id))
            .ok()
            .map(|pos| self.postings[pos].term_freq)
    }

    pub fn contains(&self, doc_id: &DocId) -> bool {
        self.term_freq(doc_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Posting> {
        self.postings.iter()
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn doc_freq(&self) -> u32 {
        self.postings.len() as u32
    }

    pub fn total_freq(&self) -> u64 {
        self.postings.iter().map(|p| p.term_freq as u64).sum()
    }

    /// Intersect two posting lists (linear merge).
    /// Frequencies of matching documents are summed.
    pub fn intersect(&self, other: &PostingList) -> PostingList {
        let mut result = Vec::new();
        let mut i = 0;
        let mut j = 0;

        while i < self.postings.len() && j < other.postings.len() {
            let left = &self.postings[i];
            let right = &other.postings[j];

            match left.doc_id.cmp(&right.doc_id) {
                std::cmp::Ordering::Equal => {
                    result.push(Posting {
                        doc_id: left.doc_id.clone(),
                        term_freq: left.term_freq.saturating_add(right.term_freq),
                    });
                    i += 1;
                    j += 1;
                }
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
            }
        }

        PostingList { postings: result }
    }
}
