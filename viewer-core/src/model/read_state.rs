//! src/model/read_state.rs
//! ============================================================================
//! # ReadStateStore: Session Read Tracking
//!
//! Holds the set of read paths and the last-read pointer for the session.
//! Both are kept in *relative* form only; the tree view converts its
//! qualified keys before asking. The set only grows, and each mark is
//! persisted through the [`ReadStatusSink`] without waiting on the result.

use std::sync::Arc;

use ahash::AHashSet;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::traits::{ReadStatusSink, ReadStatusSource};
use crate::error::ViewerError;

/// Treat an explicit JSON `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Most recent mark reported by the read-status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastRead {
    #[serde(default)]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Wire shape of `GET /api/read-status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub paths: Vec<String>,

    #[serde(rename = "lastRead", default, skip_serializing_if = "Option::is_none")]
    pub last_read: Option<LastRead>,
}

impl ReadStatus {
    /// The last-read path, treating an empty path as "none".
    pub fn last_read_path(&self) -> Option<&str> {
        self.last_read
            .as_ref()
            .map(|last| last.path.as_str())
            .filter(|path| !path.is_empty())
    }
}

/// Read set plus last-read pointer, both relative.
#[derive(Default)]
pub struct ReadStateStore {
    read_set: AHashSet<String>,
    last_read: Option<String>,
    sink: Option<Arc<dyn ReadStatusSink>>,
}

impl std::fmt::Debug for ReadStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadStateStore")
            .field("read_set", &self.read_set.len())
            .field("last_read", &self.last_read)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl ReadStateStore {
    /// Store that persists every mark through `sink`.
    pub fn new(sink: Arc<dyn ReadStatusSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    /// Fetch read-status once and replace the current state with it.
    pub async fn load(&mut self, source: &dyn ReadStatusSource) -> Result<(), ViewerError> {
        let status = source.read_status().await?;
        self.hydrate(status);
        Ok(())
    }

    /// Replace the current state entirely. No merge with what was there.
    pub fn hydrate(&mut self, status: ReadStatus) {
        let last_read = status.last_read_path().map(str::to_owned);
        self.read_set = status.paths.into_iter().collect();
        self.last_read = last_read;

        info!(
            marker = "READ_STATUS_HYDRATED",
            read = self.read_set.len(),
            last_read = ?self.last_read,
            "Read status hydrated"
        );
    }

    /// Mark `path` as read and make it the last-read file.
    ///
    /// Persistence runs as a detached task; the returned handle exists for
    /// callers (tests) that want to observe it. A failed persist is logged and
    /// the in-memory state stays as it is.
    pub fn mark_read(&mut self, path: &str) -> Option<JoinHandle<()>> {
        let inserted = self.read_set.insert(path.to_owned());
        self.last_read = Some(path.to_owned());
        debug!(path, inserted, "Marked as read");

        let sink = self.sink.clone()?;
        let path = path.to_owned();
        Some(tokio::spawn(async move {
            if let Err(e) = sink.mark_read(&path).await {
                warn!(
                    marker = "MARK_READ_PERSIST_FAILED",
                    path = %path,
                    error = %e,
                    "Error marking as read"
                );
            }
        }))
    }

    pub fn is_read(&self, path: &str) -> bool {
        self.read_set.contains(path)
    }

    pub fn is_last_read(&self, path: &str) -> bool {
        self.last_read.as_deref() == Some(path)
    }

    pub fn last_read(&self) -> Option<&str> {
        self.last_read.as_deref()
    }

    pub fn read_count(&self) -> usize {
        self.read_set.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;

    fn status(paths: &[&str], last: Option<&str>) -> ReadStatus {
        ReadStatus {
            paths: paths.iter().map(|p| p.to_string()).collect(),
            last_read: last.map(|p| LastRead {
                path: p.to_string(),
                timestamp: None,
            }),
        }
    }

    #[test]
    fn test_hydrate_replaces_state() {
        let mut store = ReadStateStore::default();
        store.hydrate(status(&["a.md", "b.txt"], Some("b.txt")));
        assert!(store.is_read("a.md"));
        assert!(store.is_last_read("b.txt"));

        store.hydrate(status(&["c.md"], None));
        assert!(!store.is_read("a.md"));
        assert!(store.is_read("c.md"));
        assert_eq!(store.last_read(), None);
    }

    #[test]
    fn test_empty_last_read_path_is_none() {
        let mut store = ReadStateStore::default();
        store.hydrate(status(&[], Some("")));
        assert_eq!(store.last_read(), None);
    }

    #[test]
    fn test_null_paths_and_zero_timestamp_parse() {
        let raw = r#"{"paths":null,"lastRead":{"path":"","timestamp":"0001-01-01T00:00:00Z"}}"#;
        let parsed: ReadStatus = serde_json::from_str(raw).unwrap();
        assert!(parsed.paths.is_empty());
        assert_eq!(parsed.last_read_path(), None);

        let raw = r#"{"paths":["a.md"],"lastRead":{"path":"a.md"}}"#;
        let parsed: ReadStatus = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.paths, vec!["a.md".to_string()]);
        assert_eq!(parsed.last_read_path(), Some("a.md"));
    }

    #[tokio::test]
    async fn test_mark_read_is_idempotent_and_moves_last_read() {
        let backend = Arc::new(FakeBackend::default());
        let mut store = ReadStateStore::new(backend.clone());

        for path in ["a.md", "b.md", "a.md"] {
            if let Some(handle) = store.mark_read(path) {
                handle.await.unwrap();
            }
            assert!(store.is_read(path));
            assert!(store.is_last_read(path));
        }

        assert_eq!(store.read_count(), 2);
        assert_eq!(backend.marked(), vec!["a.md", "b.md", "a.md"]);
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_state() {
        let backend = Arc::new(FakeBackend::default().failing_marks());
        let mut store = ReadStateStore::new(backend);

        let handle = store.mark_read("a.md").expect("sink configured");
        handle.await.unwrap();

        assert!(store.is_read("a.md"));
        assert_eq!(store.last_read(), Some("a.md"));
    }

    #[tokio::test]
    async fn test_load_from_source() {
        let backend = FakeBackend::default().with_status(status(&["x.txt"], Some("x.txt")));
        let mut store = ReadStateStore::default();
        store.load(&backend).await.unwrap();
        assert!(store.is_read("x.txt"));
        assert!(store.is_last_read("x.txt"));
    }
}
