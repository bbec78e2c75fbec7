use std::fs;
use std::path::{Path, PathBuf};

use glimpse_core::{CoreError, HistoryStore};
use glimpse_types::HistoryEntry;

/// Translation history kept as a JSON array on disk
pub struct JsonHistoryStore {
    path: PathBuf,
    limit: usize,
}

impl JsonHistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonHistoryStore {
    /// Newest `limit` valid entries, oldest first. Malformed entries are skipped.
    fn load(&self) -> Result<Vec<HistoryEntry>, CoreError> {
        if !self.path.exists() {
            tracing::info!("[HISTORY] No history file at {}", self.path.display());
            return Ok(Vec::new());
        }

        let data = fs::read_to_string(&self.path).map_err(|e| history_error(&self.path, e))?;
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&data).map_err(|e| history_error(&self.path, e))?;

        let mut entries: Vec<HistoryEntry> = raw
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<HistoryEntry>(value) {
                Ok(entry) if !entry.source_text.is_empty() => Some(entry),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("[HISTORY] Skipping invalid entry: {e}");
                    None
                }
            })
            .collect();

        if entries.len() > self.limit {
            entries.drain(..entries.len() - self.limit);
        }
        tracing::info!("[HISTORY] Loaded {} entries", entries.len());
        Ok(entries)
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<(), CoreError> {
        if entries.is_empty() {
            if self.path.exists() {
                fs::remove_file(&self.path).map_err(|e| history_error(&self.path, e))?;
                tracing::info!("[HISTORY] History empty, removed {}", self.path.display());
            }
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| history_error(parent, e))?;
        }
        let start = entries.len().saturating_sub(self.limit);
        let json = serde_json::to_string_pretty(&entries[start..])
            .map_err(|e| history_error(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| history_error(&self.path, e))?;
        tracing::debug!("[HISTORY] Saved {} entries", entries.len() - start);
        Ok(())
    }
}

fn history_error(path: &Path, e: impl std::fmt::Display) -> CoreError {
    CoreError::History(format!("{}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir, limit: usize) -> JsonHistoryStore {
        JsonHistoryStore::new(dir.path().join("nested").join("history.json"), limit)
    }

    #[test]
    fn test_missing_file_is_empty_history() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(&dir, 20).load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 20);
        let entries = vec![
            HistoryEntry::new("Hallo", "Hello"),
            HistoryEntry::new("Welt", "World"),
        ];

        store.save(&entries).unwrap();

        assert_eq!(store.load().unwrap(), entries);
    }

    #[test]
    fn test_load_keeps_newest_and_skips_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 2);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"[
                {"source_text": "one", "translated_text": "1"},
                {"source_text": "two"},
                {"source_text": "", "translated_text": "blank"},
                {"source_text": "three", "translated_text": "3"},
                {"source_text": "four", "translated_text": "4"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            store.load().unwrap(),
            vec![
                HistoryEntry::new("three", "3"),
                HistoryEntry::new("four", "4")
            ]
        );
    }

    #[test]
    fn test_empty_history_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 20);
        store.save(&[HistoryEntry::new("a", "b")]).unwrap();
        assert!(store.path().exists());

        store.save(&[]).unwrap();

        assert!(!store.path().exists());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir, 20);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(CoreError::History(_))));
    }
}
