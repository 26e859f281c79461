//! Search and diagnostic helpers built on the generic walker.

use crate::error::{Error, Result};
use crate::walk::{PathTree, WalkOptions, walk};

/// A node found by a search, together with its slash-joined full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundNode<Id> {
    /// Arena id of the node.
    pub id: Id,
    /// Full path from the search start node.
    pub path: String,
}

/// Collect all nodes under `start` whose full path matches `pattern`.
pub fn find_nodes<T: PathTree>(tree: &T, start: T::Id, pattern: &str) -> Vec<FoundNode<T::Id>> {
    find_nodes_bounded(tree, start, pattern, usize::MAX)
}

/// [`find_nodes`] with a depth bound.
pub fn find_nodes_bounded<T: PathTree>(
    tree: &T,
    start: T::Id,
    pattern: &str,
    max_level: usize,
) -> Vec<FoundNode<T::Id>> {
    let mut matches = Vec::new();
    let options = WalkOptions {
        max_level,
        pattern: Some(pattern),
    };
    walk(tree, start, &options, &mut |_, id, path, _| {
        matches.push(FoundNode {
            id,
            path: path.to_string(),
        });
        true
    });
    matches
}

/// Find the single node matching `pattern` within `max_level` levels.
///
/// Returns `Ok(None)` when nothing matches and an error when the pattern is
/// ambiguous (matches more than one node).
pub fn find_single_node<T: PathTree>(
    tree: &T,
    start: T::Id,
    pattern: &str,
    max_level: usize,
) -> Result<Option<T::Id>> {
    let matches = find_nodes_bounded(tree, start, pattern, max_level);
    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0].id)),
        count => Err(Error::MultipleMatches {
            pattern: pattern.to_string(),
            count,
        }),
    }
}

/// Collect the nodes sitting exactly `level` levels below `start`
/// (level 0 = `start` itself). Descent stops at matching nodes, so their
/// subtrees are not entered.
pub fn nodes_at_level<T: PathTree>(tree: &T, start: T::Id, level: usize) -> Vec<FoundNode<T::Id>> {
    let mut selected = Vec::new();
    walk(
        tree,
        start,
        &WalkOptions::bounded(level),
        &mut |_, id, path, node_level| {
            if node_level == level {
                selected.push(FoundNode {
                    id,
                    path: path.to_string(),
                });
                return false;
            }
            true
        },
    );
    selected
}

/// Log the per-branch node counts of a tree's top level and return the
/// total node count. Diagnostics only.
pub fn analyze_tree<T: PathTree>(tree: &T) -> usize {
    let branches = nodes_at_level(tree, tree.root(), 1);
    let mut total = 1;
    for branch in &branches {
        let count = walk(tree, branch.id, &WalkOptions::default(), &mut |_, _, _, _| true);
        tracing::info!(nodes = count, path = %branch.path, "geometry branch");
        total += count;
    }
    tracing::info!(branches = branches.len(), total, "geometry tree analyzed");
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::GeoTree;

    /// world -> { DRICH_5 -> { cooling_0, mirror_1 }, EcalBarrel_7 -> crystal_0 }
    fn sample_tree() -> GeoTree {
        let mut tree = GeoTree::new("world");
        let drich = tree.add_child(tree.root(), "DRICH_5");
        tree.add_child(drich, "cooling_0");
        tree.add_child(drich, "mirror_1");
        let ecal = tree.add_child(tree.root(), "EcalBarrel_7");
        tree.add_child(ecal, "crystal_0");
        tree
    }

    #[test]
    fn test_find_nodes_matches_full_paths() {
        let tree = sample_tree();
        let found = find_nodes(&tree, tree.root(), "*/cooling*");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, "world/DRICH_5/cooling_0");
    }

    #[test]
    fn test_find_nodes_never_matches_bare_names() {
        let tree = sample_tree();
        // "cooling_0" alone is not a full path from the root.
        assert!(find_nodes(&tree, tree.root(), "cooling_0").is_empty());
    }

    #[test]
    fn test_find_single_node() {
        let tree = sample_tree();
        let id = find_single_node(&tree, tree.root(), "*/DRICH*", 1)
            .unwrap()
            .unwrap();
        assert_eq!(tree.node(id).name, "DRICH_5");

        assert_eq!(find_single_node(&tree, tree.root(), "*/Hcal*", 1).unwrap(), None);

        let err = find_single_node(&tree, tree.root(), "*/*", 1).unwrap_err();
        assert!(matches!(err, Error::MultipleMatches { count: 2, .. }));
    }

    #[test]
    fn test_nodes_at_level() {
        let tree = sample_tree();
        let level1 = nodes_at_level(&tree, tree.root(), 1);
        assert_eq!(level1.len(), 2);

        let level2 = nodes_at_level(&tree, tree.root(), 2);
        let paths: Vec<_> = level2.iter().map(|n| n.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "world/DRICH_5/cooling_0",
                "world/DRICH_5/mirror_1",
                "world/EcalBarrel_7/crystal_0"
            ]
        );
    }

    #[test]
    fn test_analyze_counts_every_node() {
        let tree = sample_tree();
        assert_eq!(analyze_tree(&tree), 6);
    }
}
