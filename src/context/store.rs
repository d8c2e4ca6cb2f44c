//! Bounded store of recently written workspace files
//!
//! Entries are keyed by workspace-relative path and ordered by the time they
//! were last written. When a new path would push the store past its capacity,
//! the entry with the oldest write time is evicted first.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

/// Default number of files kept in context
pub const DEFAULT_MAX_FILES: usize = 5;

/// Default per-file character cap
pub const DEFAULT_MAX_FILE_CHARS: usize = 10_000;

/// A cached workspace file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// File content, truncated to the store's character cap
    pub content: String,
    /// Character count of `content` (after truncation)
    pub size: usize,
    /// When the entry was last written
    pub modified: DateTime<Utc>,
}

/// Result of an upsert
#[derive(Debug, Clone)]
pub struct Upserted {
    /// The entry now stored under the path
    pub file: Arc<TrackedFile>,
    /// Path evicted to make room, if any
    pub evicted: Option<String>,
}

/// Bounded, write-time-ordered map from path to [`TrackedFile`]
///
/// Entries are replaced whole behind an `Arc`, so readers never observe a
/// partially updated file.
#[derive(Debug)]
pub struct ContextStore {
    max_files: usize,
    max_file_chars: usize,
    files: RwLock<HashMap<String, Arc<TrackedFile>>>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILES, DEFAULT_MAX_FILE_CHARS)
    }
}

impl ContextStore {
    /// Create an empty store
    ///
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(max_files: usize, max_file_chars: usize) -> Self {
        Self {
            max_files: max_files.max(1),
            max_file_chars,
            files: RwLock::new(HashMap::new()),
        }
    }

    /// Maximum number of tracked files
    #[must_use]
    pub const fn max_files(&self) -> usize {
        self.max_files
    }

    /// Per-file character cap
    #[must_use]
    pub const fn max_file_chars(&self) -> usize {
        self.max_file_chars
    }

    /// Insert or replace the file at `path`
    ///
    /// Content over the character cap is cut and suffixed with an omission
    /// marker. Inserting a new path into a full store first evicts the oldest
    /// existing entry; equal timestamps evict the lexicographically smallest
    /// path. The incoming file is never the one evicted, even when `now` is
    /// older than every stored entry (a wall clock stepping backwards), so
    /// the file just written always stays in context.
    pub fn upsert(
        &self,
        path: impl Into<String>,
        raw_content: &str,
        now: DateTime<Utc>,
    ) -> Upserted {
        let path = path.into();
        let content = truncate_content(raw_content, self.max_file_chars);
        let file = Arc::new(TrackedFile {
            size: content.chars().count(),
            content,
            modified: now,
        });

        let mut files = self.write();
        let evicted = if !files.contains_key(&path) && files.len() >= self.max_files {
            let oldest = files
                .iter()
                .min_by(|(a_path, a), (b_path, b)| {
                    a.modified.cmp(&b.modified).then_with(|| a_path.cmp(b_path))
                })
                .map(|(p, _)| p.clone());
            if let Some(ref oldest) = oldest {
                files.remove(oldest);
            }
            oldest
        } else {
            None
        };
        files.insert(path, Arc::clone(&file));
        drop(files);

        Upserted { file, evicted }
    }

    /// Remove the entry at `path`, returning it if it was tracked
    pub fn remove(&self, path: &str) -> Option<Arc<TrackedFile>> {
        self.write().remove(path)
    }

    /// Entries ordered by write time, most recent first
    ///
    /// Equal timestamps are ordered by ascending path.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(String, Arc<TrackedFile>)> {
        let mut entries: Vec<(String, Arc<TrackedFile>)> = self
            .read()
            .iter()
            .map(|(path, file)| (path.clone(), Arc::clone(file)))
            .collect();
        entries.sort_by(|(a_path, a), (b_path, b)| {
            b.modified.cmp(&a.modified).then_with(|| a_path.cmp(b_path))
        });
        entries
    }

    /// Currently tracked paths
    #[must_use]
    pub fn keys(&self) -> BTreeSet<String> {
        self.read().keys().cloned().collect()
    }

    /// Look up a single entry
    #[must_use]
    pub fn get(&self, path: &str) -> Option<Arc<TrackedFile>> {
        self.read().get(path).cloned()
    }

    /// Number of tracked files
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether nothing is tracked yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<TrackedFile>>> {
        self.files.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<TrackedFile>>> {
        self.files.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cut `raw` to `max_chars` characters, appending an omission marker
#[must_use]
pub fn truncate_content(raw: &str, max_chars: usize) -> String {
    let Some((cut, _)) = raw.char_indices().nth(max_chars) else {
        return raw.to_string();
    };
    let omitted = raw[cut..].chars().count();
    format!("{}\n\n... (truncated, {omitted} more chars)", &raw[..cut])
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn truncate_keeps_short_content() {
        assert_eq!(truncate_content("fn main() {}", 100), "fn main() {}");
        assert_eq!(truncate_content("abc", 3), "abc");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let out = truncate_content("héllo wörld", 5);
        assert_eq!(out, "héllo\n\n... (truncated, 6 more chars)");
    }

    #[test]
    fn update_does_not_evict_itself() {
        let store = ContextStore::new(2, 100);
        store.upsert("a.py", "1", at(1));
        store.upsert("b.py", "2", at(2));
        let out = store.upsert("a.py", "3", at(3));

        assert!(out.evicted.is_none());
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("a.py").unwrap().content, "3");
    }

    #[test]
    fn equal_timestamps_evict_smallest_path() {
        let store = ContextStore::new(2, 100);
        store.upsert("b.py", "", at(1));
        store.upsert("a.py", "", at(1));
        let out = store.upsert("c.py", "", at(2));

        assert_eq!(out.evicted.as_deref(), Some("a.py"));
        assert_eq!(store.keys().into_iter().collect::<Vec<_>>(), ["b.py", "c.py"]);
    }

    #[test]
    fn backdated_write_is_kept_and_evicts_oldest_existing() {
        let store = ContextStore::new(2, 100);
        store.upsert("a.py", "", at(10));
        store.upsert("b.py", "", at(20));
        let out = store.upsert("c.py", "", at(5));

        assert_eq!(out.evicted.as_deref(), Some("a.py"));
        assert!(store.get("c.py").is_some());
        assert_eq!(store.keys().into_iter().collect::<Vec<_>>(), ["b.py", "c.py"]);
    }

    #[test]
    fn size_reflects_stored_content() {
        let store = ContextStore::new(5, 4);
        let out = store.upsert("x.rs", "abcdef", at(0));
        assert_eq!(out.file.size, out.file.content.chars().count());
    }

    #[test]
    fn remove_drops_entry() {
        let store = ContextStore::default();
        store.upsert("a.go", "package main", at(0));
        assert!(store.remove("a.go").is_some());
        assert!(store.remove("a.go").is_none());
        assert!(store.is_empty());
    }
}
