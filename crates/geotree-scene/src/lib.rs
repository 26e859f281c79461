//! Post-render scene styling, geometry merging and the two-stage
//! simplification pipeline.
//!
//! After the pre-render tree has been pruned (see the `geotree` crate) and
//! converted to renderable geometry, this crate consolidates thousands of
//! small meshes into merged buffers, recolors and re-materials detectors
//! according to declarative rule sets, and generates edge outlines that
//! restore the visual definition lost when many parts fuse into one mesh.
//!
//! # Design principles
//!
//! - **Partial success over total failure**: A bad rule or a merge that
//!   finds nothing degrades to a warning or a skipped detector, never an
//!   aborted pipeline
//! - **In-place mutation**: The engine consumes and mutates externally
//!   supplied tree graphs and returns structured counts for logging
//! - **Single-threaded**: One pipeline run owns its trees for the run's
//!   duration; cancellation is cooperative and coarse

pub mod config;
mod error;
pub mod material;
pub mod merge;
pub mod mesh;
pub mod outline;
pub mod pipeline;
pub mod scene;
pub mod style;

pub use config::rule_sets_from_json;
pub use error::{GeometryError, Result};
pub use material::Material;
pub use merge::{MergeOutcome, dispose_sources, merge_branch, merge_list};
pub use mesh::{MeshGeometry, Primitive};
pub use outline::{OutlineOptions, create_outline};
pub use pipeline::{
    CancelToken, DetectorTuning, GeoStage, PipelineReport, SceneStage, SimplificationPipeline,
};
pub use scene::{SceneNode, SceneNodeId, SceneTree};
pub use style::{
    DetectorRuleSet, StyleCounts, StyleRule, Subdetector, apply_style_rule,
    match_rules_to_detectors,
};
