//! src/model/tree_model.rs
//! ============================================================================
//! # TreeModel: Immutable Course Tree
//!
//! Built once per tree load from the nested description returned by the tree
//! source. Children keep the order the source gave them.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::path_model::SEPARATOR;
use crate::model::read_state::null_as_default;

/// Wire shape of `GET /api/tree`, recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeDescription {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    pub is_dir: bool,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<TreeDescription>,
}

impl TreeDescription {
    pub fn folder(name: impl Into<String>, children: Vec<TreeDescription>) -> Self {
        Self {
            name: name.into(),
            path: None,
            is_dir: true,
            children,
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: Some(path.into()),
            is_dir: false,
            children: Vec::new(),
        }
    }
}

/// One folder or file of the loaded tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: CompactString,
    pub is_dir: bool,
    /// Folders only, in source order.
    pub children: Vec<TreeNode>,
    /// Files only: the relative path used to fetch content.
    pub content_path: Option<String>,
}

impl TreeNode {
    /// Recursive construction. A file without a `path` falls back to the
    /// relative path spelled by its ancestors' names.
    pub fn build(description: &TreeDescription) -> Self {
        Self::build_at(description, "", true)
    }

    fn build_at(description: &TreeDescription, parent_relative: &str, is_root: bool) -> Self {
        let relative = if is_root {
            String::new()
        } else if parent_relative.is_empty() {
            description.name.clone()
        } else {
            format!("{parent_relative}{SEPARATOR}{}", description.name)
        };

        if description.is_dir {
            let children = description
                .children
                .iter()
                .map(|child| Self::build_at(child, &relative, false))
                .collect();

            Self {
                name: CompactString::new(&description.name),
                is_dir: true,
                children,
                content_path: None,
            }
        } else {
            let content_path = description
                .path
                .clone()
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| {
                    if relative.is_empty() {
                        description.name.clone()
                    } else {
                        relative
                    }
                });

            Self {
                name: CompactString::new(&description.name),
                is_dir: false,
                children: Vec::new(),
                content_path: Some(content_path),
            }
        }
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.iter().find(|child| child.name == name)
    }
}

/// Owner of one loaded tree.
#[derive(Debug, Clone)]
pub struct TreeModel {
    root: TreeNode,
}

impl TreeModel {
    pub fn build(description: &TreeDescription) -> Self {
        let root = TreeNode::build(description);
        debug!(root = %root.name, "Tree model built");
        Self { root }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Lookup by qualified path (`root/sub/file`).
    pub fn find(&self, qualified: &str) -> Option<&TreeNode> {
        let mut segments = qualified.split(SEPARATOR);
        if segments.next()? != self.root.name.as_str() {
            return None;
        }
        segments.try_fold(&self.root, |node, segment| node.child(segment))
    }
}
