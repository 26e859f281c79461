//! Arena-backed pre-render geometry tree.
//!
//! Mirrors the shape of imported CAD-like detector descriptions: a node
//! carries a name and a *volume*, and the volume carries the child nodes
//! and the visibility attribute bitmask. Children are owned exclusively by
//! their parent's child list; the parent back-reference is a non-owning
//! arena id, so no ownership cycles exist.
//!
//! Detaching a node removes it from its parent's child list but keeps its
//! arena slot - ids handed out earlier never dangle within one pipeline
//! run, the subtree is merely unreachable from the root.

use crate::attributes::GeoAttributes;
use crate::walk::PathTree;

/// Id of a node in a [`GeoTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoNodeId(usize);

/// The volume part of a node: children plus the attribute bitmask consumed
/// by the external tree-to-mesh converter.
#[derive(Debug, Clone, Default)]
pub struct GeoVolume {
    /// Child node ids, in order.
    pub children: Vec<GeoNodeId>,
    /// Visibility attribute bits.
    pub attributes: GeoAttributes,
}

/// One node of the pre-render geometry tree.
#[derive(Debug, Clone)]
pub struct GeoNode {
    /// Node name (one path segment).
    pub name: String,
    /// The nested volume holding children and attributes.
    pub volume: GeoVolume,
    /// Non-owning back-reference to the parent, `None` for the root and for
    /// detached nodes.
    pub parent: Option<GeoNodeId>,
}

/// Arena-backed tree of [`GeoNode`]s.
#[derive(Debug, Clone)]
pub struct GeoTree {
    nodes: Vec<GeoNode>,
    root: GeoNodeId,
}

impl GeoTree {
    /// Create a tree containing only a root node.
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        let root = GeoNode {
            name: root_name.to_string(),
            volume: GeoVolume::default(),
            parent: None,
        };
        Self {
            nodes: vec![root],
            root: GeoNodeId(0),
        }
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> GeoNodeId {
        self.root
    }

    /// Borrow a node.
    #[must_use]
    pub fn node(&self, id: GeoNodeId) -> &GeoNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: GeoNodeId) -> &mut GeoNode {
        &mut self.nodes[id.0]
    }

    /// Total number of arena slots, including detached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty (it never is - the root always exists).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a child with default attributes under `parent`.
    pub fn add_child(&mut self, parent: GeoNodeId, name: &str) -> GeoNodeId {
        self.add_child_with_attributes(parent, name, GeoAttributes::default())
    }

    /// Append a child with the given attribute bits under `parent`.
    pub fn add_child_with_attributes(
        &mut self,
        parent: GeoNodeId,
        name: &str,
        attributes: GeoAttributes,
    ) -> GeoNodeId {
        let id = GeoNodeId(self.nodes.len());
        self.nodes.push(GeoNode {
            name: name.to_string(),
            volume: GeoVolume {
                children: Vec::new(),
                attributes,
            },
            parent: Some(parent),
        });
        self.nodes[parent.0].volume.children.push(id);
        id
    }

    /// Detach a node from its parent's child list.
    ///
    /// Fails softly: a node without a resolvable parent (the root, or an
    /// already-detached node) produces a warning and `false` so that large
    /// batch edits stay resilient to imperfect input trees.
    pub fn detach(&mut self, id: GeoNodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent else {
            tracing::warn!(
                node = %self.nodes[id.0].name,
                "cannot detach a node without a parent"
            );
            return false;
        };

        let children = &mut self.nodes[parent.0].volume.children;
        match children.iter().position(|&child| child == id) {
            Some(index) => {
                children.remove(index);
                self.nodes[id.0].parent = None;
                true
            }
            None => {
                tracing::warn!(
                    node = %self.nodes[id.0].name,
                    "node is missing from its parent's child list"
                );
                false
            }
        }
    }

    /// Clear a node's own child list, returning how many children were
    /// dropped.
    pub fn clear_children(&mut self, id: GeoNodeId) -> usize {
        let dropped = self.nodes[id.0].volume.children.len();
        self.nodes[id.0].volume.children.clear();
        dropped
    }

    /// Whether `id` is still reachable from the root by walking the tree
    /// downward.
    #[must_use]
    pub fn is_reachable(&self, id: GeoNodeId) -> bool {
        let mut found = false;
        crate::walk::walk(
            self,
            self.root,
            &crate::walk::WalkOptions::default(),
            &mut |_, node, _, _| {
                if node == id {
                    found = true;
                    return false;
                }
                !found
            },
        );
        found
    }
}

impl PathTree for GeoTree {
    type Id = GeoNodeId;

    fn root(&self) -> GeoNodeId {
        self.root
    }

    fn node_name(&self, id: GeoNodeId) -> &str {
        &self.nodes[id.0].name
    }

    fn child_ids(&self, id: GeoNodeId) -> &[GeoNodeId] {
        &self.nodes[id.0].volume.children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_detach() {
        let mut tree = GeoTree::new("world");
        let a = tree.add_child(tree.root(), "a");
        let b = tree.add_child(tree.root(), "b");
        assert_eq!(tree.node(tree.root()).volume.children, [a, b]);

        assert!(tree.detach(a));
        assert_eq!(tree.node(tree.root()).volume.children, [b]);
        assert!(tree.node(a).parent.is_none());
        assert!(!tree.is_reachable(a));
        assert!(tree.is_reachable(b));
    }

    #[test]
    fn test_detach_root_is_a_noop() {
        let mut tree = GeoTree::new("world");
        assert!(!tree.detach(tree.root()));
        assert!(tree.is_reachable(tree.root()));
    }

    #[test]
    fn test_detach_twice_is_a_noop() {
        let mut tree = GeoTree::new("world");
        let a = tree.add_child(tree.root(), "a");
        assert!(tree.detach(a));
        assert!(!tree.detach(a));
    }

    #[test]
    fn test_clear_children() {
        let mut tree = GeoTree::new("world");
        let a = tree.add_child(tree.root(), "a");
        tree.add_child(a, "x");
        tree.add_child(a, "y");

        assert_eq!(tree.clear_children(a), 2);
        assert!(tree.node(a).volume.children.is_empty());
        assert!(tree.is_reachable(a));
    }
}
