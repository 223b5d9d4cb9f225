//! Tag to thread-id mapping for a single batch.
//!
//! The ingestion endpoint groups events by "thread", a logical execution
//! context. Each distinct tag seen in a batch becomes one thread entry.

use std::collections::HashMap;

use serde::Serialize;

/// A logical thread announced in the `threads` array of an envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ThreadEntry {
    /// Batch-local identifier referenced by events.
    pub id: String,
    /// The tag this thread was derived from.
    pub name: String,
}

/// Resolves tags to sequential thread ids, deduplicated per batch.
#[derive(Clone, Debug, Default)]
pub struct ThreadRegistry {
    index: HashMap<String, usize>,
    entries: Vec<ThreadEntry>,
}

impl ThreadRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the thread id for `tag`, registering it on first sight.
    ///
    /// Ids are allocated sequentially starting at `"1"` in first-seen order.
    pub fn resolve(&mut self, tag: &str) -> &str {
        let position = match self.index.get(tag) {
            Some(&position) => position,
            None => {
                let position = self.entries.len();
                self.entries.push(ThreadEntry {
                    id: (position + 1).to_string(),
                    name: tag.to_owned(),
                });
                self.index.insert(tag.to_owned(), position);
                position
            }
        };
        &self.entries[position].id
    }

    /// Entries in first-seen order.
    pub fn entries(&self) -> &[ThreadEntry] {
        &self.entries
    }

    /// Number of distinct tags registered.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no tag has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the entries out, leaving the registry empty.
    pub fn take_entries(&mut self) -> Vec<ThreadEntry> {
        self.index.clear();
        std::mem::take(&mut self.entries)
    }

    /// Forget every registered tag.
    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }
}
