use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Failed to read history {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("History file {path} is not a JSON array of strings: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write history {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Titles already pushed, in the order they were pushed. Append-only.
///
/// The loaded list is kept as-is, repeats included, so a save never drops
/// entries written by someone else.
#[derive(Debug, Clone, Default)]
pub struct History {
    titles: Vec<String>,
    index: HashSet<String>,
}

impl History {
    pub fn from_titles(titles: Vec<String>) -> Self {
        let index = titles.iter().cloned().collect();
        Self { titles, index }
    }

    pub fn contains(&self, title: &str) -> bool {
        self.index.contains(title)
    }

    /// Returns false if the title was already present.
    pub fn push(&mut self, title: String) -> bool {
        if !self.index.insert(title.clone()) {
            return false;
        }
        self.titles.push(title);
        true
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Number of distinct titles.
    pub fn distinct(&self) -> usize {
        self.index.len()
    }
}

/// JSON-array file holding the pushed-title history.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load history. A missing file is an empty history.
    pub fn load(&self) -> Result<History, HistoryError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(History::default()),
            Err(source) => {
                return Err(HistoryError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.trim().is_empty() {
            return Ok(History::default());
        }
        let titles: Vec<String> =
            serde_json::from_str(&raw).map_err(|source| HistoryError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        let history = History::from_titles(titles);
        if history.distinct() < history.len() {
            tracing::warn!(
                "History {} has {} duplicate title(s); keeping them as stored",
                self.path.display(),
                history.len() - history.distinct()
            );
        }
        Ok(history)
    }

    /// Rewrite the whole file. Writes to a sibling temp file and renames it
    /// over the target so a crash never leaves a truncated history.
    pub fn save(&self, history: &History) -> Result<(), HistoryError> {
        let write_err = |source| HistoryError::Write {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(history.titles()).map_err(|e| {
            HistoryError::Write {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            }
        })?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, &self.path).map_err(write_err)?;
        Ok(())
    }

    /// Add a title and persist immediately.
    pub fn append(&self, history: &mut History, title: &str) -> Result<(), HistoryError> {
        if history.push(title.to_string()) {
            self.save(history)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::new(tmp.path().join("pushed_history.json"));
        assert!(store.load().unwrap().titles().is_empty());
    }

    #[test]
    fn test_append_persists_immediately() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::new(tmp.path().join("state").join("history.json"));
        let mut history = store.load().unwrap();

        store.append(&mut history, "Paper A").unwrap();
        let reloaded = store.load().unwrap();
        assert!(reloaded.contains("Paper A"));

        store.append(&mut history, "具身智能 Paper B").unwrap();
        let reloaded = store.load().unwrap();
        assert_eq!(reloaded.titles(), &["Paper A", "具身智能 Paper B"]);
    }

    #[test]
    fn test_append_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::new(tmp.path().join("history.json"));
        let mut history = History::default();
        store.append(&mut history, "Paper A").unwrap();
        store.append(&mut history, "Paper A").unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[test]
    fn test_file_is_readable_json_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let store = HistoryStore::new(&path);
        let mut history = History::default();
        store.append(&mut history, "Dexterous Hands").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["Dexterous Hands"]);
        assert!(!tmp.path().join("history.json.tmp").exists());
    }

    #[test]
    fn test_loads_existing_file_in_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, r#"["B", "A", "B"]"#).unwrap();
        let history = HistoryStore::new(&path).load().unwrap();
        assert_eq!(history.titles(), &["B", "A", "B"]);
        assert_eq!(history.distinct(), 2);
        assert!(history.contains("A"));
        assert!(!history.contains("C"));
    }

    #[test]
    fn test_append_keeps_duplicate_entries_on_disk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, r#"["B", "A", "B"]"#).unwrap();
        let store = HistoryStore::new(&path);
        let mut history = store.load().unwrap();

        store.append(&mut history, "B").unwrap();
        store.append(&mut history, "C").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["B", "A", "B", "C"]);
    }

    #[test]
    fn test_corrupt_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, r#"{"titles": []}"#).unwrap();
        let err = HistoryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, HistoryError::Corrupt { .. }));
    }
}
