//! The cache tree itself: an id-keyed arena with parent back-links.
//!
//! The tree is plain data. All locking, fetching and notification lives in
//! [`crate::sync::TreeSynchronizer`], which is the only writer.

use std::collections::HashMap;

use crate::node::{NodeId, TreeNode, VisualState};
use crate::path::{NodePath, PathSegment};

/// Where `insert_child` places the new node among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Append,
    /// Case-insensitive label order.
    Sorted,
}

/// Arena of cached nodes plus the ordered list of application roots.
#[derive(Debug, Default)]
pub struct CacheTree {
    nodes: HashMap<NodeId, TreeNode>,
    roots: Vec<NodeId>,
    next: u64,
}

impl CacheTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(&id)
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Resolved children of a node, or `None` when unresolved or unknown.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.nodes.get(&id)?.children.as_deref()
    }

    /// Walks a path down from the application roots. Fails when any level
    /// on the way is missing or not yet resolved.
    #[must_use]
    pub fn find(&self, path: &NodePath) -> Option<NodeId> {
        let mut current = self
            .roots
            .iter()
            .copied()
            .find(|id| self.nodes.get(id).is_some_and(|n| n.app == path.app))?;
        for segment in &path.segments {
            let child_ids = self.nodes.get(&current)?.children.as_deref()?;
            current = child_ids.iter().copied().find(|id| {
                self.nodes
                    .get(id)
                    .is_some_and(|n| n.kind == segment.kind && n.local_value == segment.value)
            })?;
        }
        Some(current)
    }

    /// Rebuilds the path of a node from its parent links.
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> Option<NodePath> {
        let mut node = self.nodes.get(&id)?;
        let app = node.app;
        let mut segments = Vec::new();
        while let Some(parent) = node.parent {
            segments.push(PathSegment {
                kind: node.kind,
                value: node.local_value.clone(),
            });
            node = self.nodes.get(&parent)?;
        }
        segments.reverse();
        Some(NodePath { app, segments })
    }

    /// Replaces the whole forest of application roots.
    pub fn set_roots(&mut self, nodes: Vec<TreeNode>) -> Vec<NodeId> {
        self.nodes.clear();
        self.roots.clear();
        let ids: Vec<NodeId> = nodes.into_iter().map(|n| self.alloc(n)).collect();
        self.roots = ids.clone();
        ids
    }

    /// Replaces the resolved children of `parent`, dropping any previous
    /// descendants. Returns the new child ids, or `None` when the parent is
    /// no longer in the tree.
    pub fn set_children(&mut self, parent: NodeId, nodes: Vec<TreeNode>) -> Option<Vec<NodeId>> {
        if !self.nodes.contains_key(&parent) {
            return None;
        }
        self.clear_children(parent);
        let mut ids = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            node.parent = Some(parent);
            ids.push(self.alloc(node));
        }
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children = Some(ids.clone());
        }
        Some(ids)
    }

    /// Drops all descendants of a node and marks it unresolved again.
    pub fn clear_children(&mut self, id: NodeId) {
        let old = match self.nodes.get_mut(&id) {
            Some(node) => node.children.take(),
            None => return,
        };
        for child in old.unwrap_or_default() {
            self.drop_subtree(child);
        }
    }

    /// Swaps in a fresh node value at an existing position. Parent link and
    /// sibling order are preserved; descendants are dropped and the node
    /// starts out unresolved.
    pub fn replace_node(&mut self, id: NodeId, template: TreeNode) -> bool {
        let Some(existing) = self.nodes.get(&id) else {
            return false;
        };
        let parent = existing.parent;
        self.clear_children(id);
        let mut node = template;
        node.parent = parent;
        node.children = None;
        self.nodes.insert(id, node);
        true
    }

    /// Removes a node and its subtree, unlinking it from its parent (or
    /// from the root list).
    pub fn remove_node(&mut self, id: NodeId) {
        let parent = match self.nodes.get(&id) {
            Some(node) => node.parent,
            None => return,
        };
        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    if let Some(children) = parent.children.as_mut() {
                        children.retain(|c| *c != id);
                    }
                }
            }
            None => self.roots.retain(|r| *r != id),
        }
        self.drop_subtree(id);
    }

    /// Inserts one node under a resolved parent. Returns `None` when the
    /// parent is missing or has never been resolved; inserting into an
    /// unresolved collection would fabricate cache state.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        node: TreeNode,
        position: InsertPosition,
    ) -> Option<NodeId> {
        self.nodes.get(&parent)?.children.as_ref()?;
        let mut node = node;
        node.parent = Some(parent);
        let label = node.label.to_lowercase();
        let id = self.alloc(node);

        let index = {
            let children = self.nodes.get(&parent)?.children.as_ref()?;
            match position {
                InsertPosition::Append => children.len(),
                InsertPosition::Sorted => children
                    .iter()
                    .position(|c| {
                        self.nodes
                            .get(c)
                            .is_some_and(|n| n.label.to_lowercase() > label)
                    })
                    .unwrap_or(children.len()),
            }
        };
        if let Some(children) = self
            .nodes
            .get_mut(&parent)
            .and_then(|n| n.children.as_mut())
        {
            children.insert(index, id);
        }
        Some(id)
    }

    pub fn set_visual(&mut self, id: NodeId, state: VisualState) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.visual = state;
                true
            }
            None => false,
        }
    }

    /// Number of live nodes, roots included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                if let Some(children) = node.children {
                    stack.extend(children);
                }
            }
        }
    }
}
