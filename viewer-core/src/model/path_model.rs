//! src/model/path_model.rs
//! ============================================================================
//! # PathModel: Relative vs. Root-Qualified Paths
//!
//! The read-status endpoint speaks *relative* paths (`sub/b.mp4`), while the
//! rendered tree is keyed by *qualified* paths that start with the root
//! folder's name (`course/sub/b.mp4`). The root is not part of any protocol:
//! it is discovered from the first folder of the most recent render, so every
//! conversion has to tolerate "no root yet".

use compact_str::CompactString;
use smallvec::SmallVec;

/// Path separator used by both path forms.
pub const SEPARATOR: char = '/';

/// Ancestor prefixes of a qualified path, shortest first.
pub type AncestorChain = SmallVec<[String; 8]>;

/// Join a relative path onto `root`.
///
/// An empty root (not yet discovered) yields the relative path itself so the
/// result never starts with a dangling separator.
pub fn qualify(relative: &str, root: &str) -> String {
    if root.is_empty() {
        return relative.to_owned();
    }
    if relative.is_empty() {
        return root.to_owned();
    }
    format!("{root}{SEPARATOR}{relative}")
}

/// Strip a single leading `root/` prefix.
///
/// Paths that are not under `root` come back unchanged and are treated as
/// already relative. An empty root makes this the identity.
pub fn relativize<'a>(qualified: &'a str, root: &str) -> &'a str {
    if root.is_empty() {
        return qualified;
    }
    qualified
        .strip_prefix(root)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(qualified)
}

/// Every prefix of `qualified` cut at a separator boundary, from the first
/// segment up to (but excluding) the final leaf.
///
/// `course/sub/b.mp4` yields `["course", "course/sub"]`.
pub fn ancestor_chain(qualified: &str) -> AncestorChain {
    let mut chain = AncestorChain::new();
    if qualified.is_empty() {
        return chain;
    }

    for (idx, ch) in qualified.char_indices() {
        if ch == SEPARATOR && idx > 0 {
            chain.push(qualified[..idx].to_owned());
        }
    }
    chain
}

/// Cached root for one render of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathModel {
    root: Option<CompactString>,
}

impl PathModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the discovered root. Called on every render.
    pub fn set_root(&mut self, root: Option<&str>) {
        self.root = root.map(CompactString::new);
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn qualify(&self, relative: &str) -> String {
        qualify(relative, self.root().unwrap_or_default())
    }

    pub fn relativize<'a>(&self, qualified: &'a str) -> &'a str {
        relativize(qualified, self.root().unwrap_or_default())
    }
}
