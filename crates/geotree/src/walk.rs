//! Generic depth-first traversal over hierarchical geometry trees.
//!
//! Two isomorphic tree shapes exist in the pipeline: the pre-render
//! [`GeoTree`](crate::GeoTree) and the post-render scene tree. Both expose
//! their structure through the [`PathTree`] trait so the walker - and
//! everything built on it, like [`find_nodes`](crate::find_nodes) - is
//! written once.

use crate::wildcard::wildcard_match;

/// Structural access to an arena-backed tree of named nodes.
///
/// Node identity is a cheap copyable id (an index into the owning arena).
/// Parent back-references, where a tree has them, are deliberately not part
/// of this trait: traversal only ever moves downward.
pub trait PathTree {
    /// Arena id of a node.
    type Id: Copy + Eq;

    /// The root node id.
    fn root(&self) -> Self::Id;

    /// The node's own name (one path segment).
    fn node_name(&self, id: Self::Id) -> &str;

    /// Ids of the node's children, in order.
    fn child_ids(&self, id: Self::Id) -> &[Self::Id];
}

/// Options controlling a walk.
#[derive(Debug, Clone)]
pub struct WalkOptions<'a> {
    /// Maximum depth to descend to, relative to the start node (0 = start
    /// node only).
    pub max_level: usize,
    /// Optional wildcard pattern gating whether the callback fires for a
    /// node. Filtering never affects whether descent continues.
    pub pattern: Option<&'a str>,
}

impl Default for WalkOptions<'_> {
    fn default() -> Self {
        Self {
            max_level: usize::MAX,
            pattern: None,
        }
    }
}

impl<'a> WalkOptions<'a> {
    /// Options with a depth bound and no pattern.
    #[must_use]
    pub fn bounded(max_level: usize) -> Self {
        Self {
            max_level,
            pattern: None,
        }
    }

    /// Options with a pattern filter and no depth bound.
    #[must_use]
    pub fn filtered(pattern: &'a str) -> Self {
        Self {
            max_level: usize::MAX,
            pattern: Some(pattern),
        }
    }
}

/// Pre-order depth-first walk starting at `start`.
///
/// The callback receives the tree, the node id, the slash-joined full path
/// from the start node, and the depth level. Returning `false` skips the
/// node's children (the node itself still counts as visited).
///
/// Returns the total number of nodes visited, for diagnostics.
pub fn walk<T, F>(tree: &T, start: T::Id, options: &WalkOptions<'_>, callback: &mut F) -> usize
where
    T: PathTree,
    F: FnMut(&T, T::Id, &str, usize) -> bool,
{
    walk_inner(tree, start, options, callback, 0, "")
}

fn walk_inner<T, F>(
    tree: &T,
    id: T::Id,
    options: &WalkOptions<'_>,
    callback: &mut F,
    level: usize,
    parent_path: &str,
) -> usize
where
    T: PathTree,
    F: FnMut(&T, T::Id, &str, usize) -> bool,
{
    let full_path = join_path(parent_path, tree.node_name(id));
    let mut visited = 1;

    let mut descend = true;
    if options
        .pattern
        .is_none_or(|pattern| wildcard_match(&full_path, pattern))
    {
        descend = callback(tree, id, &full_path, level);
    }

    if descend && level < options.max_level {
        for &child in tree.child_ids(id) {
            visited += walk_inner(tree, child, options, callback, level + 1, &full_path);
        }
    }

    visited
}

/// Mutable variant of [`walk`].
///
/// Each node's child id list is snapshotted before descending, so the
/// callback may detach the current node or clear its children without
/// corrupting the traversal. Mutations that reach *sideways or downward
/// past the current node* (sibling removal, sub-level pruning) are still
/// unsafe mid-walk and must be deferred by the caller.
pub fn walk_mut<T, F>(tree: &mut T, start: T::Id, options: &WalkOptions<'_>, callback: &mut F) -> usize
where
    T: PathTree,
    F: FnMut(&mut T, T::Id, &str, usize) -> bool,
{
    walk_mut_inner(tree, start, options, callback, 0, "")
}

fn walk_mut_inner<T, F>(
    tree: &mut T,
    id: T::Id,
    options: &WalkOptions<'_>,
    callback: &mut F,
    level: usize,
    parent_path: &str,
) -> usize
where
    T: PathTree,
    F: FnMut(&mut T, T::Id, &str, usize) -> bool,
{
    let full_path = join_path(parent_path, tree.node_name(id));
    let mut visited = 1;

    let mut descend = true;
    if options
        .pattern
        .is_none_or(|pattern| wildcard_match(&full_path, pattern))
    {
        descend = callback(tree, id, &full_path, level);
    }

    if descend && level < options.max_level {
        // Snapshot after the callback, so children removed by it (or by
        // nested rules it ran) are no longer visited.
        let children: Vec<T::Id> = tree.child_ids(id).to_vec();
        for child in children {
            visited += walk_mut_inner(tree, child, options, callback, level + 1, &full_path);
        }
    }

    visited
}

fn join_path(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{parent_path}/{name}")
    }
}
