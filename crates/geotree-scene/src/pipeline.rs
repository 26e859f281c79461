//! Two-stage scene simplification.
//!
//! Stage A prunes and re-flags the pre-render geometry tree before an
//! external converter turns it into renderable meshes. Stage B styles the
//! post-render tree the converter produced. The split is structural: bit
//! flags only mean something to the converter, while merging and outlining
//! need real geometry that does not exist until after conversion.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use geotree::{
    EditAction, EditCounts, EditRule, GeoAttr, GeoTree, analyze_tree, find_single_node,
    nodes_at_level,
};

use crate::config::rule_sets_from_json;
use crate::scene::SceneTree;
use crate::style::{
    DetectorRuleSet, StyleCounts, Subdetector, apply_style_rule, match_rules_to_detectors,
};

/// Cooperative cancellation flag, checked between whole-detector steps.
/// Cancellation latency is bounded by one detector's processing cost.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the run holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Aggregated counts of what a pipeline run changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineReport {
    /// Top-level detectors removed by the denylist.
    pub detectors_pruned: usize,
    /// Detectors that received fine tuning or styling.
    pub detectors_processed: usize,
    /// Detectors skipped because of an error or cancellation.
    pub detectors_skipped: usize,
    /// Pre-render edit counts.
    pub edits: EditCounts,
    /// Post-render styling counts.
    pub style: StyleCounts,
}

impl std::ops::AddAssign for PipelineReport {
    fn add_assign(&mut self, other: Self) {
        self.detectors_pruned += other.detectors_pruned;
        self.detectors_processed += other.detectors_processed;
        self.detectors_skipped += other.detectors_skipped;
        self.edits += other.edits;
        self.style += other.style;
    }
}

/// Per-detector fine tuning: a top-level name glob bound to edit rules.
#[derive(Debug, Clone)]
pub struct DetectorTuning {
    /// Glob matched against top-level detector paths.
    pub name_pattern: String,
    /// Edit rules applied to the matched detector, one at a time.
    pub edit_rules: Vec<EditRule>,
}

impl DetectorTuning {
    #[must_use]
    pub fn new(name_pattern: &str, edit_rules: Vec<EditRule>) -> Self {
        Self {
            name_pattern: name_pattern.to_string(),
            edit_rules,
        }
    }
}

/// Stage A: pre-render geometry tree pruning and attribute tuning.
#[derive(Debug, Clone, Default)]
pub struct GeoStage {
    /// Top-level detectors whose name starts with any of these are removed
    /// outright.
    pub remove_prefixes: Vec<String>,
    /// Per-detector rule catalogue.
    pub tunings: Vec<DetectorTuning>,
}

impl GeoStage {
    /// The stock catalogue for the ePIC detector geometry.
    #[must_use]
    pub fn epic_default() -> Self {
        let remove_prefixes = [
            "Lumi",
            "B1",
            "B2",
            "Q2",
            "ForwardOffM",
            "Forward",
            "Backward",
            "Vacuum",
            "SweeperMag",
            "AnalyzerMag",
            "ZDC",
            "HcalFarForward",
            "InnerTrackingSupport",
        ]
        .map(String::from)
        .to_vec();

        let tunings = vec![
            DetectorTuning::new(
                "*/EcalBarrelScFi*",
                vec![
                    EditRule::new("*/fiber_grid*", EditAction::Remove),
                    EditRule::with_bit("*", EditAction::SetBit, GeoAttr::VisDaughters),
                    EditRule::with_bit("*/*layer*", EditAction::SetBit, GeoAttr::VisThis),
                    EditRule::with_bit("*/*layer*", EditAction::UnsetBit, GeoAttr::VisNone),
                    EditRule::with_bit("*/*layer*", EditAction::UnsetBit, GeoAttr::VisDaughters),
                ],
            ),
            DetectorTuning::new(
                "*/EcalBarrelTracker*",
                vec![
                    EditRule::with_bit("*", EditAction::SetBit, GeoAttr::VisDaughters),
                    EditRule::new("*/stave*", EditAction::RemoveChildren),
                    EditRule::with_bit("*/stave*", EditAction::SetBit, GeoAttr::VisThis),
                    EditRule::with_bit("*/stave*", EditAction::UnsetBit, GeoAttr::VisNone),
                    EditRule::with_bit("*/stave*", EditAction::UnsetBit, GeoAttr::VisDaughters),
                ],
            ),
            DetectorTuning::new(
                "*/EcalBarrelImaging*",
                vec![
                    EditRule::new("*/stav*", EditAction::RemoveChildren),
                    EditRule::with_bit("*", EditAction::SetBit, GeoAttr::VisDaughters),
                ],
            ),
            DetectorTuning::new(
                "*/DRICH*",
                vec![EditRule::new("*/DRICH_cooling*", EditAction::RemoveSiblings)],
            ),
            DetectorTuning::new(
                "*/DIRC*",
                vec![
                    EditRule::new("*/Envelope_box*", EditAction::RemoveChildren),
                    EditRule::with_bit("*/Envelope_box*", EditAction::SetBit, GeoAttr::VisThis),
                    EditRule::with_bit("*/Envelope_box*", EditAction::UnsetBit, GeoAttr::VisNone),
                    EditRule::with_bit(
                        "*/Envelope_box*",
                        EditAction::UnsetBit,
                        GeoAttr::VisDaughters,
                    ),
                    EditRule::new("*/Envelope_lens_vol*", EditAction::Remove),
                ],
            ),
            DetectorTuning::new(
                "*/EcalEndcapN*",
                vec![EditRule::new("*/crystal*", EditAction::RemoveSiblings)],
            ),
            DetectorTuning::new(
                "*/EcalEndcapP_*",
                vec![
                    EditRule::with_bit(
                        "*/EcalEndcapP_layer1_0*",
                        EditAction::UnsetBit,
                        GeoAttr::VisDaughters,
                    ),
                    EditRule::new("*/EcalEndcapP_layer1_0*", EditAction::RemoveChildren),
                ],
            ),
            DetectorTuning::new(
                "*/LFHCAL_*",
                vec![
                    EditRule::new("*/LFHCAL_8M*", EditAction::RemoveChildren),
                    EditRule::with_bit("*/LFHCAL_8M*", EditAction::SetBit, GeoAttr::VisThis),
                    EditRule::with_bit("*/LFHCAL_8M*", EditAction::UnsetBit, GeoAttr::VisNone),
                    EditRule::with_bit(
                        "*/LFHCAL_8M*",
                        EditAction::UnsetBit,
                        GeoAttr::VisDaughters,
                    ),
                    EditRule::new("*/LFHCAL_4M*", EditAction::RemoveChildren),
                    EditRule::with_bit("*/LFHCAL_4M*", EditAction::SetBit, GeoAttr::VisThis),
                    EditRule::with_bit("*/LFHCAL_4M*", EditAction::UnsetBit, GeoAttr::VisNone),
                    EditRule::with_bit(
                        "*/LFHCAL_4M*",
                        EditAction::UnsetBit,
                        GeoAttr::VisDaughters,
                    ),
                ],
            ),
            DetectorTuning::new(
                "*/HcalEndcapPInsert_23*",
                vec![EditRule::new("*/*layer*slice1_*", EditAction::RemoveSiblings)],
            ),
            DetectorTuning::new(
                "*/HcalBarrel*",
                vec![
                    EditRule::new("*/Tile*", EditAction::Remove),
                    EditRule::new("*/ChimneyTile*", EditAction::Remove),
                ],
            ),
            DetectorTuning::new(
                "*/EndcapTOF*",
                vec![
                    EditRule::new("*/suppbar*", EditAction::Remove),
                    EditRule::new("*/component_hyb*", EditAction::Remove),
                ],
            ),
            DetectorTuning::new(
                "*/VertexBarrelSubAssembly*",
                vec![
                    EditRule::new("*/biasing*", EditAction::Remove),
                    EditRule::new("*/readout*", EditAction::Remove),
                    EditRule::new("*/backbone*", EditAction::Remove),
                ],
            ),
            DetectorTuning::new(
                "*/BarrelTOF*",
                vec![
                    EditRule::new("*/component_sensor*", EditAction::Remove),
                    EditRule::new("*/component_ASIC*", EditAction::Remove),
                    EditRule::new("*/cooling*", EditAction::Remove),
                ],
            ),
        ];

        Self {
            remove_prefixes,
            tunings,
        }
    }

    /// Remove denylisted top-level detectors, then apply the per-detector
    /// rule catalogue.
    pub fn run(&self, tree: &mut GeoTree, cancel: &CancelToken) -> PipelineReport {
        let mut report = PipelineReport {
            detectors_pruned: self.prune_top_level(tree),
            ..PipelineReport::default()
        };

        for tuning in &self.tunings {
            if cancel.is_cancelled() {
                tracing::info!("geometry stage cancelled");
                report.detectors_skipped += 1;
                continue;
            }
            let detector = match find_single_node(tree, tree.root(), &tuning.name_pattern, 1) {
                Ok(Some(id)) => id,
                Ok(None) => continue,
                Err(error) => {
                    tracing::warn!(%error, pattern = %tuning.name_pattern, "skipping tuning");
                    report.detectors_skipped += 1;
                    continue;
                }
            };
            // One rule at a time, matching how the catalogue was authored:
            // each rule sees the effects of the previous one.
            for rule in &tuning.edit_rules {
                report.edits += geotree::edit_nodes(tree, detector, std::slice::from_ref(rule));
            }
            report.detectors_processed += 1;
            tracing::debug!(pattern = %tuning.name_pattern, "tuned detector");
        }

        analyze_tree(tree);
        report
    }

    fn prune_top_level(&self, tree: &mut GeoTree) -> usize {
        let denylisted: Vec<_> = nodes_at_level(tree, tree.root(), 1)
            .into_iter()
            .filter(|found| {
                let name = tree.node(found.id).name.as_str();
                self.remove_prefixes
                    .iter()
                    .any(|prefix| name.starts_with(prefix.as_str()))
            })
            .collect();

        let mut removed = 0;
        for found in denylisted {
            if tree.detach(found.id) {
                tracing::debug!(path = %found.path, "removed denylisted detector");
                removed += 1;
            }
        }
        removed
    }
}

/// Stage B: post-render styling of detector branches.
#[derive(Debug, Clone, Default)]
pub struct SceneStage {
    /// Rule sets, matched against detectors in order.
    pub rule_sets: Vec<DetectorRuleSet>,
}

impl SceneStage {
    #[must_use]
    pub fn new(rule_sets: Vec<DetectorRuleSet>) -> Self {
        Self { rule_sets }
    }

    /// Build a stage from raw JSON rule configuration.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self::new(rule_sets_from_json(value))
    }

    /// Match rule sets to detectors and apply each detector's rules in
    /// order. A failed merge skips that rule with a warning and keeps
    /// going; an already-styled branch is never styled twice.
    pub fn run(
        &self,
        tree: &mut SceneTree,
        detectors: &[Subdetector],
        cancel: &CancelToken,
    ) -> PipelineReport {
        let mut report = PipelineReport::default();

        for (index, rules) in match_rules_to_detectors(&self.rule_sets, detectors) {
            if cancel.is_cancelled() {
                tracing::info!("scene stage cancelled");
                report.detectors_skipped += 1;
                continue;
            }
            let detector = &detectors[index];
            if !tree.is_reachable(detector.node) {
                tracing::warn!(name = %detector.name, "detector branch is no longer in the tree");
                report.detectors_skipped += 1;
                continue;
            }

            tree.clear_rule_flags(detector.node);
            for rule in rules {
                match apply_style_rule(tree, detector.node, rule) {
                    Ok(counts) => report.style += counts,
                    Err(error) => {
                        tracing::warn!(%error, name = %detector.name, "skipping styling rule");
                    }
                }
            }
            report.detectors_processed += 1;
            tracing::debug!(name = %detector.name, rules = rules.len(), "styled detector");
        }
        report
    }
}

/// The full two-stage pipeline.
///
/// The stages run at different times against different trees: the caller
/// converts the pruned geometry tree to a renderable one in between.
#[derive(Debug, Clone, Default)]
pub struct SimplificationPipeline {
    pub geo_stage: GeoStage,
    pub scene_stage: SceneStage,
}

impl SimplificationPipeline {
    #[must_use]
    pub fn new(geo_stage: GeoStage, scene_stage: SceneStage) -> Self {
        Self {
            geo_stage,
            scene_stage,
        }
    }

    /// Stage A. Run before converting the geometry tree to meshes.
    pub fn process_geometry(&self, tree: &mut GeoTree, cancel: &CancelToken) -> PipelineReport {
        self.geo_stage.run(tree, cancel)
    }

    /// Stage B. Run on the converted, renderable tree.
    pub fn process_scene(
        &self,
        tree: &mut SceneTree,
        detectors: &[Subdetector],
        cancel: &CancelToken,
    ) -> PipelineReport {
        self.scene_stage.run(tree, detectors, cancel)
    }
}
