//! Rule-based pruning and editing of hierarchical detector geometry trees.
//!
//! Imported detector descriptions routinely carry tens of thousands of
//! nodes - far more than an interactive viewer can render. This crate holds
//! the pre-render half of the simplification machinery: a wildcard path
//! matcher, a generic depth-first tree walker, and a two-pass edit-rule
//! engine that removes, prunes, and re-flags nodes before they are handed
//! to the tree-to-mesh converter.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives; one pipeline run
//!   owns its tree exclusively
//! - **Resilient**: A bad rule or a malformed branch degrades to a warning,
//!   never aborts a batch edit
//! - **Generic traversal**: The walker is written once against the
//!   [`PathTree`] trait and reused by the post-render scene crate

pub mod attributes;
pub mod edit;
mod error;
pub mod navigate;
pub mod tree;
pub mod walk;
pub mod wildcard;

pub use attributes::{GeoAttr, GeoAttributes};
pub use edit::{EditAction, EditCounts, EditRule, edit_nodes, edit_nodes_bounded};
pub use error::{Error, Result};
pub use navigate::{FoundNode, analyze_tree, find_nodes, find_single_node, nodes_at_level};
pub use tree::{GeoNode, GeoNodeId, GeoTree, GeoVolume};
pub use walk::{PathTree, WalkOptions, walk, walk_mut};
pub use wildcard::wildcard_match;
