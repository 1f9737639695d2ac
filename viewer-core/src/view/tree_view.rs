//! src/view/tree_view.rs
//! ============================================================================
//! # TreeView: Rendered Sidebar Nodes
//!
//! Turns a [`TreeNode`] into an arena of interactive nodes, one per tree
//! node, each keyed by its qualified path. Presentation state lives in a
//! per-node [`ClassSet`] (`expanded`, `read`, `last-read`, `selected`); the
//! sidebar painter only ever reads these classes.
//!
//! Clicks come back out as [`TreeEvent`]s so the coordinator, not the view,
//! decides what a file selection triggers.

use compact_str::CompactString;
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::model::path_model::{PathModel, SEPARATOR, ancestor_chain};
use crate::model::read_state::ReadStateStore;
use crate::model::tree_model::TreeNode;

pub type NodeId = usize;

/// Presentation classes a rendered node can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeClass {
    Expanded = 1,
    Read = 2,
    LastRead = 4,
    Selected = 8,
}

impl NodeClass {
    #[inline]
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Bit set of [`NodeClass`]es. Setting a class twice is a no-op.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ClassSet(u8);

impl ClassSet {
    #[inline]
    pub const fn contains(self, class: NodeClass) -> bool {
        self.0 & class.bits() != 0
    }

    #[inline]
    pub fn insert(&mut self, class: NodeClass) {
        self.0 |= class.bits();
    }

    #[inline]
    pub fn remove(&mut self, class: NodeClass) {
        self.0 &= !class.bits();
    }

    #[inline]
    pub fn set(&mut self, class: NodeClass, on: bool) {
        if on {
            self.insert(class);
        } else {
            self.remove(class);
        }
    }
}

/// Children of a rendered folder. Only materialized for non-empty folders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildContainer {
    pub nodes: Vec<NodeId>,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Folder { children: Option<ChildContainer> },
    File { content_path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNode {
    /// Qualified path, the node's addressable key.
    pub key: String,
    pub name: CompactString,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub kind: NodeKind,
    pub classes: ClassSet,
}

impl RenderedNode {
    pub fn is_folder(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { .. })
    }

    /// Folders with at least one child can be expanded.
    pub fn is_expandable(&self) -> bool {
        matches!(self.kind, NodeKind::Folder { children: Some(_) })
    }

    pub fn has(&self, class: NodeClass) -> bool {
        self.classes.contains(class)
    }
}

/// What a click on a node label means to the rest of the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEvent {
    FolderToggled { key: String, expanded: bool },
    FileSelected { key: String, content_path: String },
}

/// Comparable snapshot of every node's presentation.
pub type Presentation = Vec<(String, ClassSet, Option<bool>)>;

#[derive(Debug, Default)]
pub struct TreeView {
    nodes: Vec<RenderedNode>,
    keys: IndexMap<String, NodeId>,
    top: Vec<NodeId>,
    paths: PathModel,
}

impl TreeView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was rendered with one node per tree node.
    pub fn render(&mut self, root: &TreeNode) {
        self.nodes.clear();
        self.keys.clear();
        self.top.clear();
        self.paths.set_root(None);

        let id = self.render_node(root, None, "", 0);
        self.top.push(id);
        self.discover_root();

        debug!(
            marker = "TREE_RENDERED",
            nodes = self.nodes.len(),
            root = ?self.paths.root(),
            "Tree rendered"
        );
    }

    fn render_node(
        &mut self,
        node: &TreeNode,
        parent: Option<NodeId>,
        parent_key: &str,
        depth: usize,
    ) -> NodeId {
        let key = if parent_key.is_empty() {
            node.name.to_string()
        } else {
            format!("{parent_key}{SEPARATOR}{}", node.name)
        };

        let id = self.nodes.len();
        let kind = if node.is_dir {
            NodeKind::Folder { children: None }
        } else {
            NodeKind::File {
                content_path: node.content_path.clone().unwrap_or_default(),
            }
        };

        self.nodes.push(RenderedNode {
            key: key.clone(),
            name: node.name.clone(),
            depth,
            parent,
            kind,
            classes: ClassSet::default(),
        });
        // first node wins on duplicate names
        self.keys.entry(key.clone()).or_insert(id);

        if node.is_dir && !node.children.is_empty() {
            let children: Vec<NodeId> = node
                .children
                .iter()
                .map(|child| self.render_node(child, Some(id), &key, depth + 1))
                .collect();

            self.nodes[id].kind = NodeKind::Folder {
                children: Some(ChildContainer {
                    nodes: children,
                    visible: false,
                }),
            };
        }

        id
    }

    /// Root is the key of the first rendered folder, if any.
    fn discover_root(&mut self) {
        let root = self
            .nodes
            .iter()
            .find(|node| node.is_folder())
            .map(|node| node.key.clone());
        self.paths.set_root(root.as_deref());
    }

    /// Sync `read` / `last-read` classes of every file node with `store`.
    ///
    /// Classes are assigned, not accumulated, so repeated calls converge and a
    /// previous last-read node loses its class when the pointer moves.
    pub fn apply_read_overlay(&mut self, store: &ReadStateStore) {
        self.discover_root();

        let paths = &self.paths;
        for node in &mut self.nodes {
            if let NodeKind::File { .. } = node.kind {
                let relative = paths.relativize(&node.key);
                node.classes.set(NodeClass::Read, store.is_read(relative));
                node.classes
                    .set(NodeClass::LastRead, store.is_last_read(relative));
            }
        }
        trace!(read = store.read_count(), "Read overlay applied");
    }

    /// Expand every rendered ancestor folder of `qualified`. Ancestors that
    /// are not rendered (yet) are skipped.
    pub fn expand(&mut self, qualified: &str) {
        for prefix in ancestor_chain(qualified) {
            if let Some(&id) = self.keys.get(prefix.as_str()) {
                self.set_expanded(id, true);
            }
        }
    }

    fn set_expanded(&mut self, id: NodeId, expanded: bool) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if let NodeKind::Folder { children } = &mut node.kind {
            node.classes.set(NodeClass::Expanded, expanded);
            if let Some(container) = children {
                container.visible = expanded;
            }
        }
    }

    /// Flip one folder. Returns the new state, or `None` for files.
    pub fn toggle(&mut self, id: NodeId) -> Option<bool> {
        let node = self.nodes.get(id)?;
        if !node.is_folder() {
            return None;
        }
        let expanded = !node.has(NodeClass::Expanded);
        self.set_expanded(id, expanded);
        Some(expanded)
    }

    /// Make `id` the single selected file. Folders cannot be selected.
    pub fn select(&mut self, id: NodeId) -> bool {
        match self.nodes.get(id) {
            Some(node) if !node.is_folder() => {}
            _ => return false,
        }

        for node in &mut self.nodes {
            node.classes.remove(NodeClass::Selected);
        }
        self.nodes[id].classes.insert(NodeClass::Selected);
        true
    }

    /// Label click: folders toggle, files select and announce themselves.
    pub fn click(&mut self, id: NodeId) -> Option<TreeEvent> {
        let node = self.nodes.get(id)?;
        let key = node.key.clone();

        match &node.kind {
            NodeKind::Folder { .. } => {
                let expanded = self.toggle(id)?;
                Some(TreeEvent::FolderToggled { key, expanded })
            }
            NodeKind::File { content_path } => {
                let content_path = content_path.clone();
                self.select(id);
                Some(TreeEvent::FileSelected { key, content_path })
            }
        }
    }

    pub fn click_key(&mut self, key: &str) -> Option<TreeEvent> {
        let id = self.lookup(key)?;
        self.click(id)
    }

    /// Node ids currently shown, in display order.
    pub fn visible_rows(&self) -> Vec<NodeId> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeId> = self.top.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            rows.push(id);
            if let NodeKind::Folder {
                children: Some(container),
            } = &self.nodes[id].kind
            {
                if container.visible {
                    stack.extend(container.nodes.iter().rev().copied());
                }
            }
        }
        rows
    }

    pub fn node(&self, id: NodeId) -> Option<&RenderedNode> {
        self.nodes.get(id)
    }

    pub fn lookup(&self, key: &str) -> Option<NodeId> {
        self.keys.get(key).copied()
    }

    pub fn selected(&self) -> Option<&RenderedNode> {
        self.nodes.iter().find(|node| node.has(NodeClass::Selected))
    }

    /// Keys of all nodes carrying `class`, in render order.
    pub fn keys_with(&self, class: NodeClass) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|node| node.has(class))
            .map(|node| node.key.as_str())
            .collect()
    }

    pub fn count_with(&self, class: NodeClass) -> usize {
        self.nodes.iter().filter(|node| node.has(class)).count()
    }

    pub fn file_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_folder()).count()
    }

    pub fn path_model(&self) -> &PathModel {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn presentation(&self) -> Presentation {
        self.nodes
            .iter()
            .map(|node| {
                let visible = match &node.kind {
                    NodeKind::Folder {
                        children: Some(container),
                    } => Some(container.visible),
                    _ => None,
                };
                (node.key.clone(), node.classes, visible)
            })
            .collect()
    }
}
