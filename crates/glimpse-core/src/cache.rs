use std::collections::VecDeque;
use std::sync::Mutex;

use glimpse_types::HistoryEntry;

use crate::error::CoreError;

/// Persistence boundary for translation history
pub trait HistoryStore: Send + Sync {
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError>;
    fn save(&self, entries: &[HistoryEntry]) -> Result<(), CoreError>;
}

/// Bounded, ordered history of recognized/translated pairs.
///
/// Oldest first. Never holds more than `capacity` entries and never holds two
/// consecutive entries with the same source text.
#[derive(Debug, Clone)]
pub struct TranslationCache {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl TranslationCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Restore from persisted entries, keeping the newest `capacity`
    pub fn with_entries(capacity: usize, entries: impl IntoIterator<Item = HistoryEntry>) -> Self {
        let mut cache = Self::new(capacity);
        for entry in entries {
            cache.push(entry);
        }
        cache
    }

    /// Exact-text lookup. The newest matching entry wins.
    pub fn lookup(&self, source_text: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.source_text == source_text)
            .map(|e| e.translated_text.as_str())
    }

    /// Append a pair unless the newest entry has the same source text.
    /// Returns whether anything was appended.
    pub fn record(&mut self, source_text: &str, translated_text: &str) -> bool {
        self.push(HistoryEntry::new(source_text, translated_text))
    }

    fn push(&mut self, entry: HistoryEntry) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self
            .entries
            .back()
            .is_some_and(|last| last.source_text == entry.source_text)
        {
            return false;
        }
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        true
    }

    /// Frozen copy handed to a capture worker
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            entries: self.entries.iter().cloned().collect(),
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Read-only view of the cache at dispatch time
#[derive(Debug, Clone, Default)]
pub struct CacheSnapshot {
    entries: Vec<HistoryEntry>,
}

impl CacheSnapshot {
    pub fn lookup(&self, source_text: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.source_text == source_text)
            .map(|e| e.translated_text.as_str())
    }

    /// Oldest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

/// History kept in memory only
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    pub fn new(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .map_err(|e| CoreError::History(e.to_string()))
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), CoreError> {
        let mut stored = self
            .entries
            .lock()
            .map_err(|e| CoreError::History(e.to_string()))?;
        *stored = entries.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_duplicates_suppressed() {
        let mut cache = TranslationCache::new(20);
        assert!(cache.record("a", "A"));
        assert!(!cache.record("a", "A2"));
        assert!(cache.record("b", "B"));
        // Only the immediately preceding entry is compared
        assert!(cache.record("a", "A3"));

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.lookup("a"), Some("A3"));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = TranslationCache::new(3);
        for i in 0..5 {
            cache.record(&format!("src{i}"), &format!("dst{i}"));
        }
        let sources: Vec<_> = cache.entries().into_iter().map(|e| e.source_text).collect();
        assert_eq!(sources, vec!["src2", "src3", "src4"]);
        assert_eq!(cache.lookup("src0"), None);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let mut cache = TranslationCache::new(0);
        assert!(!cache.record("a", "A"));
        assert!(cache.is_empty());
        assert_eq!(cache.lookup("a"), None);

        let cache = TranslationCache::with_entries(0, vec![HistoryEntry::new("b", "B")]);
        assert!(cache.is_empty());
        assert!(cache.snapshot().entries().is_empty());
    }

    #[test]
    fn test_snapshot_is_frozen() {
        let mut cache = TranslationCache::new(5);
        cache.record("hello", "bonjour");
        let snapshot = cache.snapshot();

        cache.record("bye", "au revoir");
        cache.clear();

        assert_eq!(snapshot.lookup("hello"), Some("bonjour"));
        assert_eq!(snapshot.lookup("bye"), None);
        assert_eq!(snapshot.entries().len(), 1);
    }

    #[test]
    fn test_restore_keeps_newest_and_dedupes() {
        let entries = vec![
            HistoryEntry::new("a", "A"),
            HistoryEntry::new("b", "B"),
            HistoryEntry::new("b", "B"),
            HistoryEntry::new("c", "C"),
        ];
        let cache = TranslationCache::with_entries(2, entries);
        let sources: Vec<_> = cache.entries().into_iter().map(|e| e.source_text).collect();
        assert_eq!(sources, vec!["b", "c"]);
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryHistoryStore::default();
        store.save(&[HistoryEntry::new("x", "y")]).unwrap();
        assert_eq!(store.load().unwrap(), vec![HistoryEntry::new("x", "y")]);
    }
}
