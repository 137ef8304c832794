//! Content-hash duplicate detection.
//!
//! Hashes are taken over the normalized text (case-folded, whitespace
//! collapsed), so a PDF re-exported with different line breaks collides with
//! the first upload. The flip side: two distinct documents whose extracted text
//! differs only in case or spacing are also reported as duplicates.

use crate::models::DuplicateOutcome;
use crate::text;
use std::collections::HashMap;

pub fn normalize_text(text: &str) -> String {
    text::normalize(text)
}

/// Hex blake3 digest of the normalized text.
pub fn content_hash(text: &str) -> String {
    blake3::hash(normalize_text(text).as_bytes())
        .to_hex()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub id: i64,
    pub filename: String,
}

/// content hash -> owning document.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    entries: HashMap<String, IndexEntry>,
}

impl DuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (String, i64, String)>) -> Self {
        let mut index = Self::new();
        for (hash, id, filename) in entries {
            index.insert(hash, id, filename);
        }
        index
    }

    pub fn get(&self, hash: &str) -> Option<&IndexEntry> {
        self.entries.get(hash)
    }

    /// Keeps the first owner of a hash; returns false if it was already taken.
    pub fn insert(&mut self, hash: String, id: i64, filename: String) -> bool {
        if self.entries.contains_key(&hash) {
            return false;
        }
        self.entries.insert(hash, IndexEntry { id, filename });
        true
    }

    pub fn remove_id(&mut self, id: i64) -> bool {
        let before = self.entries.len();
        self.entries.retain(|_, e| e.id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn check_hash(&self, hash: &str) -> DuplicateOutcome {
        match self.get(hash) {
            Some(entry) => DuplicateOutcome::Duplicate {
                existing_id: entry.id,
                existing_filename: entry.filename.clone(),
            },
            None => DuplicateOutcome::Unique,
        }
    }
}

pub fn check_duplicate(text: &str, index: &DuplicateIndex) -> DuplicateOutcome {
    index.check_hash(&content_hash(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(text: &str, id: i64, filename: &str) -> DuplicateIndex {
        DuplicateIndex::from_entries([(content_hash(text), id, filename.to_string())])
    }

    #[test]
    fn whitespace_and_case_differences_collide() {
        let first = "Quarterly Report\r\n\r\nRevenue grew  by 12% in Q3.";
        let second = "quarterly report\nrevenue grew by 12% in q3.";
        let index = index_with(first, 7, "report.pdf");
        assert_eq!(
            check_duplicate(second, &index),
            DuplicateOutcome::Duplicate {
                existing_id: 7,
                existing_filename: "report.pdf".to_string()
            }
        );
    }

    #[test]
    fn single_word_difference_is_unique() {
        let a = "The tenant shall pay rent monthly.";
        let b = "The tenant shall pay rent weekly.";
        let mut index = DuplicateIndex::new();
        assert_eq!(check_duplicate(a, &index), DuplicateOutcome::Unique);
        index.insert(content_hash(a), 1, "a.txt".into());
        assert_eq!(check_duplicate(b, &index), DuplicateOutcome::Unique);
    }

    #[test]
    fn formatting_only_variants_are_reported_as_duplicates() {
        // Distinct files whose text differs only in layout still collide.
        let memo = "TO: ALL STAFF\nThe office is closed Friday.";
        let email = "To: all staff   the office is closed friday.";
        let index = index_with(memo, 3, "memo.txt");
        assert!(matches!(
            check_duplicate(email, &index),
            DuplicateOutcome::Duplicate { existing_id: 3, .. }
        ));
        // Punctuation is not normalized away.
        let punctuated = "To: all staff. The office is closed Friday.";
        assert_eq!(check_duplicate(punctuated, &index), DuplicateOutcome::Unique);
    }

    #[test]
    fn first_owner_wins_and_removal_frees_hash() {
        let hash = content_hash("same");
        let mut index = DuplicateIndex::new();
        assert!(index.insert(hash.clone(), 1, "one.txt".into()));
        assert!(!index.insert(hash.clone(), 2, "two.txt".into()));
        assert_eq!(index.get(&hash).unwrap().id, 1);
        assert!(index.remove_id(1));
        assert!(index.is_empty());
        assert!(!index.remove_id(1));
    }

    #[test]
    fn hash_is_stable_hex() {
        let h = content_hash("Hello   World");
        assert_eq!(h, content_hash("hello world"));
        assert_eq!(h.len(), 64);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
