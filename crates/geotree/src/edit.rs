//! Two-pass edit-rule engine for pre-render geometry trees.
//!
//! Rules pair a wildcard path pattern with an action. A single walk applies
//! everything that is safe to do in place (node removal, child clearing,
//! attribute bit changes); actions that would corrupt the traversal -
//! sibling removal and sub-level pruning act on parts of the tree the walk
//! has not finished visiting - are collected as intents and applied in a
//! second pass once the walk has completed.

use serde::{Deserialize, Serialize};

use crate::attributes::GeoAttr;
use crate::navigate::nodes_at_level;
use crate::tree::{GeoNodeId, GeoTree};
use crate::walk::{WalkOptions, walk_mut};
use crate::wildcard::wildcard_match;

/// What an [`EditRule`] does to a matched node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditAction {
    /// Leave the node alone.
    #[default]
    Nothing,
    /// Detach the node from its parent.
    Remove,
    /// Remove all siblings, leaving only the matched node under its parent.
    RemoveSiblings,
    /// Clear the node's own child list.
    RemoveChildren,
    /// Remove every node exactly `prune_sub_level` levels below the match.
    RemoveBySubLevel,
    /// Set an attribute bit on the node's volume.
    SetBit,
    /// Clear an attribute bit on the node's volume.
    UnsetBit,
    /// Toggle an attribute bit on the node's volume.
    ToggleBit,
}

/// One editing rule: a path pattern, an action, and action parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditRule {
    /// Wildcard pattern matched against the full ancestor-joined path.
    pub pattern: String,
    /// The action to apply on a match.
    pub action: EditAction,
    /// Attribute bit for the bit actions.
    pub bit: Option<GeoAttr>,
    /// Relative level for [`EditAction::RemoveBySubLevel`].
    pub prune_sub_level: Option<usize>,
    /// Rules applied to the matched node's subtree before this rule's own
    /// action runs.
    pub children_rules: Vec<EditRule>,
    /// Depth bound for `children_rules`.
    pub children_rules_max_level: Option<usize>,
}

impl EditRule {
    /// A rule with a pattern and an action.
    #[must_use]
    pub fn new(pattern: &str, action: EditAction) -> Self {
        Self {
            pattern: pattern.to_string(),
            action,
            ..Self::default()
        }
    }

    /// A bit-manipulation rule.
    #[must_use]
    pub fn with_bit(pattern: &str, action: EditAction, bit: GeoAttr) -> Self {
        Self {
            pattern: pattern.to_string(),
            action,
            bit: Some(bit),
            ..Self::default()
        }
    }
}

/// Structured counts of what a rule application changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditCounts {
    /// Nodes detached from the tree (including whole removed subtree roots,
    /// counted once each).
    pub removed: usize,
    /// Children dropped by [`EditAction::RemoveChildren`].
    pub children_cleared: usize,
    /// Attribute bits set, cleared or toggled.
    pub bits_changed: usize,
}

impl std::ops::AddAssign for EditCounts {
    fn add_assign(&mut self, other: Self) {
        self.removed += other.removed;
        self.children_cleared += other.children_cleared;
        self.bits_changed += other.bits_changed;
    }
}

struct DeferredEdit {
    node: GeoNodeId,
    path: String,
    rule: EditRule,
}

/// Apply `rules` to the subtree under `start`, unbounded depth.
///
/// For each visited node every rule whose pattern matches the node's full
/// path executes in list order, unless an earlier rule already removed the
/// node. Nested `children_rules` recurse into the matched node first.
pub fn edit_nodes(tree: &mut GeoTree, start: GeoNodeId, rules: &[EditRule]) -> EditCounts {
    edit_nodes_bounded(tree, start, rules, usize::MAX)
}

/// [`edit_nodes`] with a traversal depth bound.
pub fn edit_nodes_bounded(
    tree: &mut GeoTree,
    start: GeoNodeId,
    rules: &[EditRule],
    max_level: usize,
) -> EditCounts {
    let mut counts = EditCounts::default();
    let mut deferred: Vec<DeferredEdit> = Vec::new();

    // Pass 1: one walk, applying what is safe in place and queuing the rest.
    walk_mut(
        tree,
        start,
        &WalkOptions::bounded(max_level),
        &mut |tree, id, path, _level| {
            for rule in rules {
                if !wildcard_match(path, &rule.pattern) {
                    continue;
                }

                if !rule.children_rules.is_empty() {
                    counts += edit_nodes_bounded(
                        tree,
                        id,
                        &rule.children_rules,
                        rule.children_rules_max_level.unwrap_or(usize::MAX),
                    );
                }

                match rule.action {
                    EditAction::Remove => {
                        if tree.detach(id) {
                            counts.removed += 1;
                        }
                        // The subtree is now orphaned, stop recursing into it.
                        return false;
                    }
                    EditAction::RemoveChildren => {
                        counts.children_cleared += tree.clear_children(id);
                        return false;
                    }
                    EditAction::RemoveSiblings | EditAction::RemoveBySubLevel => {
                        deferred.push(DeferredEdit {
                            node: id,
                            path: path.to_string(),
                            rule: rule.clone(),
                        });
                    }
                    EditAction::SetBit => {
                        if let Some(bit) = rule.bit {
                            tree.node_mut(id).volume.attributes.set(bit);
                            counts.bits_changed += 1;
                        }
                    }
                    EditAction::UnsetBit => {
                        if let Some(bit) = rule.bit {
                            tree.node_mut(id).volume.attributes.unset(bit);
                            counts.bits_changed += 1;
                        }
                    }
                    EditAction::ToggleBit => {
                        if let Some(bit) = rule.bit {
                            tree.node_mut(id).volume.attributes.toggle(bit);
                            counts.bits_changed += 1;
                        }
                    }
                    EditAction::Nothing => {}
                }
            }
            true
        },
    );

    // Pass 2: the queued intents, now that the walk cannot be corrupted.
    for item in deferred {
        match item.rule.action {
            EditAction::RemoveSiblings => {
                counts.removed += remove_siblings(tree, item.node, &item.path);
            }
            EditAction::RemoveBySubLevel => {
                let Some(level) = item.rule.prune_sub_level else {
                    tracing::warn!(
                        path = %item.path,
                        "RemoveBySubLevel rule without pruneSubLevel, skipping"
                    );
                    continue;
                };
                for target in nodes_at_level(tree, item.node, level) {
                    if tree.detach(target.id) {
                        counts.removed += 1;
                    }
                }
            }
            _ => {}
        }
    }

    counts
}

/// Replace the parent's child list with the matched node alone. Returns how
/// many siblings were dropped.
fn remove_siblings(tree: &mut GeoTree, node: GeoNodeId, path: &str) -> usize {
    let Some(parent) = tree.node(node).parent else {
        tracing::warn!(path, "cannot remove siblings of a node without a parent");
        return 0;
    };
    let siblings: Vec<GeoNodeId> = tree
        .node(parent)
        .volume
        .children
        .iter()
        .copied()
        .filter(|&child| child != node)
        .collect();
    for &sibling in &siblings {
        tree.node_mut(sibling).parent = None;
    }
    tree.node_mut(parent).volume.children = vec![node];
    siblings.len()
}
