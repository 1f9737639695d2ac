//! src/backend/local.rs
//! ============================================================================
//! # LocalBackend: Serving a Course Directory Without a Server
//!
//! Implements the same four endpoints as the course server directly against
//! a directory on disk:
//!
//! - the tree is walked with `walkdir` on the blocking pool, sorted by name
//! - read-status lives in a small JSON ledger of `path -> read_at`
//! - content paths resolve below the root and never escape it

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::backend::traits::{ContentSource, ReadStatusSink, ReadStatusSource, TreeSource};
use crate::error::ViewerError;
use crate::model::read_state::{LastRead, ReadStatus};
use crate::model::tree_model::TreeDescription;

/// Persistent read ledger. Order is oldest mark first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadLedger {
    #[serde(default)]
    pub read: IndexMap<String, DateTime<Utc>>,
}

impl ReadLedger {
    /// Insert or refresh `path`; a refreshed path moves to the end.
    pub fn mark(&mut self, path: &str, at: DateTime<Utc>) {
        self.read.shift_remove(path);
        self.read.insert(path.to_owned(), at);
    }

    /// Newest mark. Ties go to the later entry.
    pub fn last_read(&self) -> Option<(&str, DateTime<Utc>)> {
        self.read
            .iter()
            .max_by_key(|(_, at)| **at)
            .map(|(path, at)| (path.as_str(), *at))
    }

    pub fn to_status(&self) -> ReadStatus {
        ReadStatus {
            paths: self.read.keys().cloned().collect(),
            last_read: self.last_read().map(|(path, at)| LastRead {
                path: path.to_owned(),
                timestamp: Some(at),
            }),
        }
    }
}

/// Extensions normalized to lowercase without the leading dot.
#[derive(Debug, Clone, Default)]
pub struct HiddenExtensions(Vec<String>);

impl HiddenExtensions {
    pub fn new<S: AsRef<str>>(exts: &[S]) -> Self {
        Self(
            exts.iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        )
    }

    pub fn hides(&self, name: &str) -> bool {
        let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.0.iter().any(|hidden| hidden.eq_ignore_ascii_case(ext))
    }
}

pub struct LocalBackend {
    root: PathBuf,
    hidden: HiddenExtensions,
    state_file: Option<PathBuf>,
    ledger: Arc<Mutex<ReadLedger>>,
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("root", &self.root)
            .field("hidden", &self.hidden)
            .field("state_file", &self.state_file)
            .finish()
    }
}

impl LocalBackend {
    /// Open `root` and load the ledger from `state_file` if it exists. With no
    /// state file, marks last for the session only.
    pub async fn open(
        root: PathBuf,
        hidden: HiddenExtensions,
        state_file: Option<PathBuf>,
    ) -> Result<Self, ViewerError> {
        let meta = tokio::fs::metadata(&root)
            .await
            .map_err(|_| ViewerError::NotFound(root.clone()))?;
        if !meta.is_dir() {
            return Err(ViewerError::invalid_path(
                root.display().to_string(),
                "course root is not a directory",
            ));
        }

        let ledger = match &state_file {
            Some(path) => load_ledger(path).await?,
            None => ReadLedger::default(),
        };
        info!(
            marker = "LOCAL_BACKEND_OPENED",
            root = %root.display(),
            read = ledger.read.len(),
            "Local backend opened"
        );

        Ok(Self {
            root,
            hidden,
            state_file,
            ledger: Arc::new(Mutex::new(ledger)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a relative content path onto the root, refusing anything that
    /// would leave it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, ViewerError> {
        let relative = Path::new(path);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => {
                    return Err(ViewerError::invalid_path(path, "escapes the course root"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(ViewerError::invalid_path(path, "absolute path"));
                }
            }
        }
        Ok(self.root.join(relative))
    }

    async fn persist(&self, ledger: &ReadLedger) -> Result<(), ViewerError> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(ledger)?;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), "Read ledger saved");
        Ok(())
    }
}

async fn load_ledger(path: &Path) -> Result<ReadLedger, ViewerError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(serde_json::from_str(&text)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ReadLedger::default()),
        Err(e) => Err(e.into()),
    }
}

/// Build the nested description of `root`. The root node's path is its own
/// name; every descendant's path is relative to the root.
pub fn scan_tree(root: &Path, hidden: &HiddenExtensions) -> Result<TreeDescription, ViewerError> {
    let root_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string());

    let mut top = TreeDescription::folder(root_name.clone(), Vec::new());
    top.path = Some(root_name);
    // Open folders from the root down to the current entry's parent.
    let mut stack: Vec<TreeDescription> = vec![top];

    // Linked folders are walked like real ones; link cycles surface as errors.
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !hidden.hides(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        while stack.len() > entry.depth() {
            close_folder(&mut stack);
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let relative = entry
            .path()
            .strip_prefix(root)
            .map(|p| {
                p.components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .map_err(|_| ViewerError::invalid_path(entry.path().display().to_string(), "outside root"))?;

        if entry.file_type().is_dir() {
            let mut folder = TreeDescription::folder(name, Vec::new());
            folder.path = Some(relative);
            stack.push(folder);
        } else if let Some(parent) = stack.last_mut() {
            parent.children.push(TreeDescription::file(name, relative));
        }
    }

    while stack.len() > 1 {
        close_folder(&mut stack);
    }
    stack
        .pop()
        .ok_or_else(|| ViewerError::Other("tree scan lost its root".into()))
}

fn close_folder(stack: &mut Vec<TreeDescription>) {
    if let Some(done) = stack.pop()
        && let Some(parent) = stack.last_mut()
    {
        parent.children.push(done);
    }
}

#[async_trait]
impl ReadStatusSource for LocalBackend {
    async fn read_status(&self) -> Result<ReadStatus, ViewerError> {
        Ok(self.ledger.lock().await.to_status())
    }
}

#[async_trait]
impl ReadStatusSink for LocalBackend {
    #[instrument(level = "debug", skip(self))]
    async fn mark_read(&self, path: &str) -> Result<(), ViewerError> {
        let mut ledger = self.ledger.lock().await;
        ledger.mark(path, Utc::now());
        self.persist(&ledger).await
    }
}

#[async_trait]
impl TreeSource for LocalBackend {
    async fn tree(&self) -> Result<TreeDescription, ViewerError> {
        let root = self.root.clone();
        let hidden = self.hidden.clone();
        info!(root = %root.display(), "Building file tree");
        tokio::task::spawn_blocking(move || scan_tree(&root, &hidden))
            .await
            .map_err(|e| ViewerError::Other(format!("tree scan task failed: {e}")))?
    }
}

#[async_trait]
impl ContentSource for LocalBackend {
    fn content_url(&self, path: &str) -> String {
        self.root.join(path).display().to_string()
    }

    async fn fetch_text(&self, path: &str) -> Result<String, ViewerError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ViewerError::NotFound(full)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn course() -> TempDir {
        let dir = tempfile::Builder::new().prefix("course").tempdir().unwrap();
        let root = dir.path();
        std::fs::write(root.join("b.md"), "# B").unwrap();
        std::fs::write(root.join("a.md"), "# A").unwrap();
        std::fs::write(root.join("a.SRT"), "1\n00:00").unwrap();
        std::fs::create_dir_all(root.join("sub/deep")).unwrap();
        std::fs::write(root.join("sub/clip.mp4"), b"\0\0").unwrap();
        std::fs::write(root.join("sub/deep/notes.txt"), "n").unwrap();
        std::fs::create_dir(root.join("empty")).unwrap();
        dir
    }

    fn names(desc: &TreeDescription) -> Vec<&str> {
        desc.children.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn test_scan_tree_sorted_with_relative_paths() {
        let dir = course();
        let tree = scan_tree(dir.path(), &HiddenExtensions::new(&[".srt"])).unwrap();
        let root_name = dir.path().file_name().unwrap().to_string_lossy();

        assert_eq!(tree.path.as_deref(), Some(root_name.as_ref()));
        assert_eq!(names(&tree), vec!["a.md", "b.md", "empty", "sub"]);

        let sub = &tree.children[3];
        assert!(sub.is_dir);
        assert_eq!(sub.path.as_deref(), Some("sub"));
        assert_eq!(names(sub), vec!["clip.mp4", "deep"]);
        assert_eq!(sub.children[0].path.as_deref(), Some("sub/clip.mp4"));
        assert_eq!(
            sub.children[1].children[0].path.as_deref(),
            Some("sub/deep/notes.txt")
        );
        assert!(tree.children[2].children.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_tree_follows_linked_folders() {
        let dir = course();
        let shared = TempDir::new().unwrap();
        std::fs::write(shared.path().join("extra.md"), "# Extra").unwrap();
        std::os::unix::fs::symlink(shared.path(), dir.path().join("linked")).unwrap();

        let tree = scan_tree(dir.path(), &HiddenExtensions::new(&[".srt"])).unwrap();
        let linked = tree
            .children
            .iter()
            .find(|c| c.name == "linked")
            .expect("linked folder listed");
        assert!(linked.is_dir);
        assert_eq!(names(linked), vec!["extra.md"]);
        assert_eq!(linked.children[0].path.as_deref(), Some("linked/extra.md"));
    }

    #[test]
    fn test_hidden_extensions_normalize() {
        let hidden = HiddenExtensions::new(&["SRT", ".vtt", ""]);
        assert!(hidden.hides("a.srt"));
        assert!(hidden.hides("b.VTT"));
        assert!(!hidden.hides("c.md"));
        assert!(!hidden.hides("Makefile"));
    }

    #[test]
    fn test_ledger_last_read_is_newest() {
        let mut ledger = ReadLedger::default();
        let t = |s| Utc.timestamp_opt(s, 0).unwrap();
        ledger.mark("a.md", t(10));
        ledger.mark("b.md", t(20));
        assert_eq!(ledger.last_read().map(|(p, _)| p), Some("b.md"));

        ledger.mark("a.md", t(30));
        let status = ledger.to_status();
        assert_eq!(status.paths, vec!["b.md", "a.md"]);
        assert_eq!(status.last_read_path(), Some("a.md"));
    }

    #[tokio::test]
    async fn test_marks_persist_across_reopen() {
        let dir = course();
        let state = dir.path().join(".state/read.json");

        let backend = LocalBackend::open(
            dir.path().to_path_buf(),
            HiddenExtensions::default(),
            Some(state.clone()),
        )
        .await
        .unwrap();
        backend.mark_read("a.md").await.unwrap();
        backend.mark_read("sub/clip.mp4").await.unwrap();

        let reopened = LocalBackend::open(dir.path().to_path_buf(), HiddenExtensions::default(), Some(state))
            .await
            .unwrap();
        let status = reopened.read_status().await.unwrap();
        assert_eq!(status.paths, vec!["a.md", "sub/clip.mp4"]);
        assert_eq!(status.last_read_path(), Some("sub/clip.mp4"));
    }

    #[tokio::test]
    async fn test_fetch_text_and_path_escape() {
        let dir = course();
        let backend = LocalBackend::open(dir.path().to_path_buf(), HiddenExtensions::default(), None)
            .await
            .unwrap();

        assert_eq!(backend.fetch_text("a.md").await.unwrap(), "# A");
        assert!(matches!(
            backend.fetch_text("../etc/passwd").await,
            Err(ViewerError::InvalidPath { .. })
        ));
        assert!(matches!(
            backend.fetch_text("missing.md").await,
            Err(ViewerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_open_rejects_missing_root() {
        let dir = course();
        let missing = dir.path().join("nope");
        let err = LocalBackend::open(missing, HiddenExtensions::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::NotFound(_)));
    }
}
