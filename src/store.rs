//! ファイル内容のキャッシュ
//!
//! Every path is read from disk at most once per build. Failed reads are
//! cached too, so a missing include reports the same error to every job.

use std::collections::HashMap;
use std::io;
use std::path::{
    Path,
    PathBuf,
};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;

/// A cached read failure.
#[derive(Error, Debug, Clone)]
#[error("Failed to read {}: {source}", path.display())]
pub struct ContentError {
    /// File that failed to load.
    pub path: PathBuf,
    /// Underlying error, shared by every reader.
    #[source]
    pub source: Arc<io::Error>,
}

/// Result of one cached read.
pub type Entry = Result<Arc<str>, ContentError>;

/// パス → 内容 (またはエラー) のキャッシュ
#[derive(Debug, Default)]
pub struct ContentStore {
    /// Keyed by the path exactly as requested.
    entries: RwLock<HashMap<PathBuf, Entry>>,
}

impl ContentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the content of `path`, reading it on the first request.
    ///
    /// # Errors
    /// Returns the (cached) [`ContentError`] if the file could not be read.
    pub async fn get(&self, path: &Path) -> Entry {
        if let Some(entry) = self.entries.read().await.get(path) {
            return entry.clone();
        }

        let mut entries = self.entries.write().await;
        // 別タスクが先に読み込んだ可能性がある
        if let Some(entry) = entries.get(path) {
            return entry.clone();
        }

        tracing::debug!(path = %path.display(), "Reading file");
        let entry = tokio::fs::read_to_string(path).await.map(Arc::from).map_err(|source| {
            ContentError { path: path.to_path_buf(), source: Arc::new(source) }
        });
        entries.insert(path.to_path_buf(), entry.clone());
        entry
    }

    /// Number of cached paths, successful or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether nothing has been loaded yet.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use googletest::prelude::*;
    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn content_is_read_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.inc");
        std::fs::write(&path, "first").unwrap();
        let store = ContentStore::new();

        let first = store.get(&path).await.unwrap();
        std::fs::write(&path, "second").unwrap();
        let second = store.get(&path).await.unwrap();

        assert_that!(&*first, eq("first"));
        assert_that!(&*second, eq("first"));
        assert_that!(store.len().await, eq(1));
    }

    #[tokio::test]
    async fn read_errors_are_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.inc");
        let store = ContentStore::new();

        let first = store.get(&path).await.unwrap_err();
        std::fs::write(&path, "now it exists").unwrap();
        let second = store.get(&path).await.unwrap_err();

        assert_eq!(first.path, path);
        assert_that!(Arc::ptr_eq(&first.source, &second.source), eq(true));
        assert_that!(first.source.kind(), eq(io::ErrorKind::NotFound));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_share_one_entry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("shared.html");
        std::fs::write(&path, "shared").unwrap();
        let store = Arc::new(ContentStore::new());

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let store = Arc::clone(&store);
                let path = path.clone();
                tokio::spawn(async move { store.get(&path).await.unwrap() })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_that!(store.len().await, eq(1));
        assert_that!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])), eq(true));
    }

    #[rstest]
    fn error_message_names_the_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gone.html");
        let store = ContentStore::new();

        let error = tokio_test::block_on(store.get(&path)).unwrap_err();

        assert_that!(error.to_string(), contains_substring("gone.html"));
        assert_that!(tokio_test::block_on(store.is_empty()), eq(false));
    }
}
