use std::sync::Arc;

use tracing::warn;

use crate::error::StoreError;
use crate::storage::PersistentStore;

pub const RECENT_SEARCHES_KEY: &str = "recentSearches";
pub const DEFAULT_CAPACITY: usize = 4;

/// Most-recent-first search history with a fixed capacity.
///
/// A term that is already in the log stays where it is; resubmitting it does
/// not move it to the front.
pub struct RecentSearchLog {
    store: Arc<PersistentStore>,
    entries: Vec<String>,
    capacity: usize,
    write_error: Option<StoreError>,
}

impl RecentSearchLog {
    pub fn open(store: Arc<PersistentStore>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let stored: Vec<String> = store.get(RECENT_SEARCHES_KEY, Vec::new());
        let mut entries: Vec<String> = Vec::new();
        for term in stored.iter().map(|term| term.trim()) {
            if entries.len() == capacity {
                break;
            }
            if !term.is_empty() && !entries.iter().any(|entry| entry == term) {
                entries.push(term.to_string());
            }
        }
        Self {
            store,
            entries,
            capacity,
            write_error: None,
        }
    }

    pub fn entries(&self) -> &[String] {
        self.entries.as_slice()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true when the term was added.
    pub fn record(&mut self, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() || self.entries.iter().any(|entry| entry == term) {
            return false;
        }
        self.entries.insert(0, term.to_string());
        self.entries.truncate(self.capacity);
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.persist();
    }

    pub fn take_write_error(&mut self) -> Option<StoreError> {
        self.write_error.take()
    }

    fn persist(&mut self) {
        match self.store.set(RECENT_SEARCHES_KEY, &self.entries) {
            Ok(()) => self.write_error = None,
            Err(err) => {
                warn!(key = RECENT_SEARCHES_KEY, error = %err, "recent searches kept in memory only");
                self.write_error = Some(err);
            }
        }
    }
}
