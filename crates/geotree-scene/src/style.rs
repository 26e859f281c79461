//! Declarative styling rules for the post-render tree.
//!
//! A rule set binds one or more detector-name globs to an ordered list of
//! styling rules. Each rule can merge matched branches, recolor or swap
//! materials, and generate edge outlines. Rule sets are assigned to
//! detectors exclusively and in order, so a trailing `"*"` set acts as a
//! catch-all for everything earlier sets did not claim.

use geotree::{EditAction, EditRule, GeoAttr, find_nodes, wildcard_match};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::material::{Material, parse_color};
use crate::merge::{MergeOutcome, dispose_sources, merge_branch, merge_list};
use crate::outline::{OutlineOptions, create_outline};
use crate::scene::{SceneNodeId, SceneTree};

/// One styling rule for meshes under a detector branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleRule {
    /// Path globs selecting nodes under the detector branch. Empty means
    /// the whole branch.
    #[serde(alias = "pattern", deserialize_with = "deserialize_patterns")]
    pub patterns: Vec<String>,
    /// Merge matched geometry into one mesh.
    pub merge: bool,
    /// Name for the merged node; defaults to `<branch>_merged`.
    pub new_name: Option<String>,
    /// Detach source meshes after a pattern merge.
    pub delete_origins: bool,
    /// Prune geometry-less groups after the rule runs.
    pub cleanup_nodes: bool,
    /// Generate edge outlines for the affected meshes.
    pub outline: bool,
    /// Dihedral angle in degrees above which outline edges are kept.
    pub outline_threshold_angle: f32,
    /// Outline color override.
    #[serde(deserialize_with = "deserialize_opt_color")]
    pub outline_color: Option<u32>,
    /// When styling without merging, also style every descendant mesh of a
    /// matched node. Defaults to true when `merge` is off and patterns are
    /// present.
    pub apply_to_descendants: Option<bool>,
    /// Material to assign to the affected meshes.
    pub material: Option<Material>,
    /// Color to assign to the affected meshes.
    #[serde(deserialize_with = "deserialize_opt_color")]
    pub color: Option<u32>,
    /// Pre-render edit action; rules carrying one also feed the Geo stage.
    pub action: Option<EditAction>,
    /// Attribute bit for pre-render bit actions.
    pub geo_bit: Option<GeoAttr>,
}

impl Default for StyleRule {
    fn default() -> Self {
        Self {
            patterns: Vec::new(),
            merge: true,
            new_name: None,
            delete_origins: true,
            cleanup_nodes: true,
            outline: true,
            outline_threshold_angle: 40.0,
            outline_color: None,
            apply_to_descendants: None,
            material: None,
            color: None,
            action: None,
            geo_bit: None,
        }
    }
}

impl StyleRule {
    fn apply_to_descendants(&self) -> bool {
        self.apply_to_descendants
            .unwrap_or(!self.merge && !self.patterns.is_empty())
    }

    fn merged_name(&self, tree: &SceneTree, branch: SceneNodeId) -> String {
        match &self.new_name {
            Some(name) => name.clone(),
            None => format!("{}_merged", tree.node(branch).name),
        }
    }
}

/// A named rule set: detector-name globs bound to an ordered rule list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorRuleSet {
    /// Detector-name globs this set applies to.
    pub names: Vec<String>,
    /// Singular form of `names`; both are honored when present together.
    pub name: Option<String>,
    /// Styling rules, applied in order.
    pub rules: Vec<StyleRule>,
}

impl DetectorRuleSet {
    /// The union of `names` and `name`. Declaring both is tolerated as
    /// likely operator error.
    #[must_use]
    pub fn matcher_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        if let Some(name) = &self.name {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Pre-render edit rules derived from rules that carry an `action`,
    /// one per pattern.
    #[must_use]
    pub fn as_geo_rules(&self) -> Vec<EditRule> {
        let mut geo_rules = Vec::new();
        for rule in &self.rules {
            let Some(action) = rule.action else { continue };
            for pattern in &rule.patterns {
                geo_rules.push(EditRule {
                    pattern: pattern.clone(),
                    action,
                    bit: rule.geo_bit,
                    ..EditRule::default()
                });
            }
        }
        geo_rules
    }
}

/// A named top-level detector branch of the post-render tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subdetector {
    /// Root node of the detector's branch.
    pub node: SceneNodeId,
    /// Display name.
    pub name: String,
    /// Name in the source geometry file, the subject of rule matching.
    pub source_geometry_name: String,
}

/// Assign rule sets to detectors, at most one set per detector.
///
/// Rule sets are processed in order against a shrinking pool of unassigned
/// detectors, so earlier, more specific sets claim their detectors before a
/// trailing `"*"` catch-all sees the rest. Returns `(detector index, rules)`
/// pairs in assignment order.
#[must_use]
pub fn match_rules_to_detectors<'a>(
    rule_sets: &'a [DetectorRuleSet],
    detectors: &[Subdetector],
) -> Vec<(usize, &'a [StyleRule])> {
    let mut unassigned: Vec<usize> = (0..detectors.len()).collect();
    let mut assignments = Vec::new();

    for rule_set in rule_sets {
        for name in rule_set.matcher_names() {
            unassigned.retain(|&index| {
                if wildcard_match(&detectors[index].source_geometry_name, name) {
                    assignments.push((index, rule_set.rules.as_slice()));
                    false
                } else {
                    true
                }
            });
        }
    }
    assignments
}

/// Counts of what one styling rule changed, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleCounts {
    /// Source meshes folded into merged buffers.
    pub merged: usize,
    /// Meshes recolored, re-materialed or otherwise touched.
    pub styled: usize,
    /// Outline nodes created.
    pub outlined: usize,
}

impl std::ops::AddAssign for StyleCounts {
    fn add_assign(&mut self, other: Self) {
        self.merged += other.merged;
        self.styled += other.styled;
        self.outlined += other.outlined;
    }
}

/// Apply one styling rule to the branch under `branch`.
///
/// # Errors
///
/// Merge failures ([`crate::GeometryError`]) propagate so the caller can
/// skip this detector and continue with the next.
pub fn apply_style_rule(
    tree: &mut SceneTree,
    branch: SceneNodeId,
    rule: &StyleRule,
) -> Result<StyleCounts> {
    let mut counts = StyleCounts::default();

    let targets = if rule.merge {
        let outcome = merge_matching(tree, branch, rule)?;
        counts.merged = outcome.consumed.len();
        vec![outcome.merged]
    } else {
        collect_unmerged_targets(tree, branch, rule)
    };

    for &target in &targets {
        if let Some(color) = rule.color {
            tree.node_mut(target)
                .material
                .get_or_insert_with(Material::default)
                .color = color;
        }
        if let Some(material) = &rule.material {
            tree.node_mut(target).material = Some(material.clone());
        }
        if rule.outline {
            let options = OutlineOptions {
                threshold_angle: rule.outline_threshold_angle,
                color: rule.outline_color.unwrap_or(OutlineOptions::default().color),
                material: None,
            };
            create_outline(tree, target, &options)?;
            counts.outlined += 1;
        }
        tree.node_mut(target).rules_applied = true;
    }
    counts.styled = targets.len();

    if rule.cleanup_nodes {
        tree.prune_empty_groups(branch);
    }
    Ok(counts)
}

/// Merge per the rule: the whole branch when no patterns are given,
/// otherwise every mesh under the pattern-matched nodes.
fn merge_matching(
    tree: &mut SceneTree,
    branch: SceneNodeId,
    rule: &StyleRule,
) -> Result<MergeOutcome> {
    let name = rule.merged_name(tree, branch);
    if rule.patterns.is_empty() {
        return merge_branch(tree, branch, &name, rule.material.clone());
    }

    let mut sources: Vec<SceneNodeId> = Vec::new();
    for pattern in &rule.patterns {
        for matched in find_nodes(tree, branch, pattern) {
            for mesh in tree.descendant_meshes(matched.id) {
                if !sources.contains(&mesh) {
                    sources.push(mesh);
                }
            }
        }
    }
    let outcome = merge_list(tree, &sources, branch, &name, rule.material.clone())?;
    if rule.delete_origins {
        dispose_sources(tree, &outcome.consumed);
    }
    Ok(outcome)
}

/// Collect the meshes a non-merging rule should style. Nodes in branches
/// already claimed by an earlier rule are skipped; matched nodes are flagged
/// right after collection so a child matching the same pattern is not
/// styled a second time.
fn collect_unmerged_targets(
    tree: &mut SceneTree,
    branch: SceneNodeId,
    rule: &StyleRule,
) -> Vec<SceneNodeId> {
    let mut targets: Vec<SceneNodeId> = Vec::new();

    if rule.patterns.is_empty() {
        for mesh in tree.descendant_meshes(branch) {
            if !tree.is_in_styled_branch(mesh) {
                targets.push(mesh);
            }
        }
        return targets;
    }

    let apply_to_descendants = rule.apply_to_descendants();
    for pattern in &rule.patterns {
        for matched in find_nodes(tree, branch, pattern) {
            if tree.is_in_styled_branch(matched.id) {
                continue;
            }
            if apply_to_descendants {
                for mesh in tree.descendant_meshes(matched.id) {
                    if !targets.contains(&mesh) {
                        targets.push(mesh);
                    }
                }
            } else if tree.node(matched.id).geometry.is_some() && !targets.contains(&matched.id) {
                targets.push(matched.id);
            }
            tree.node_mut(matched.id).rules_applied = true;
        }
    }
    targets
}

fn deserialize_patterns<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(pattern) => vec![pattern],
        OneOrMany::Many(patterns) => patterns,
    })
}

fn deserialize_opt_color<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    parse_color(&value)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid color value: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MeshGeometry, Primitive};
    use glam::Vec3;

    fn unit_triangle() -> MeshGeometry {
        MeshGeometry::triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2])
    }

    fn detector(source_name: &str) -> Subdetector {
        let mut tree = SceneTree::new("scene");
        let node = tree.add_group(tree.root(), source_name);
        Subdetector {
            node,
            name: source_name.to_string(),
            source_geometry_name: source_name.to_string(),
        }
    }

    #[test]
    fn test_match_assigns_each_detector_at_most_once() {
        let detectors = vec![
            detector("DRICH_5"),
            detector("EcalBarrelImaging_12"),
            detector("HcalEndcapN_20"),
        ];
        let rule_sets = vec![
            DetectorRuleSet {
                names: vec!["DRICH*".to_string(), "Ecal*".to_string()],
                ..DetectorRuleSet::default()
            },
            DetectorRuleSet {
                name: Some("*".to_string()),
                rules: vec![StyleRule::default()],
                ..DetectorRuleSet::default()
            },
        ];

        let assignments = match_rules_to_detectors(&rule_sets, &detectors);
        let indices: Vec<usize> = assignments.iter().map(|(index, _)| *index).collect();
        assert_eq!(indices, [0, 1, 2]);

        // The catch-all only received what the first set left unclaimed.
        assert!(assignments[0].1.is_empty());
        assert!(assignments[1].1.is_empty());
        assert_eq!(assignments[2].1.len(), 1);
    }

    #[test]
    fn test_match_tolerates_name_and_names_together() {
        let detectors = vec![detector("DRICH_5"), detector("DIRC_14")];
        let rule_sets = vec![DetectorRuleSet {
            names: vec!["DRICH*".to_string()],
            name: Some("DIRC*".to_string()),
            ..DetectorRuleSet::default()
        }];

        let assignments = match_rules_to_detectors(&rule_sets, &detectors);
        assert_eq!(assignments.len(), 2);
    }

    #[test]
    fn test_unmatched_detectors_get_no_assignment() {
        let detectors = vec![detector("DRICH_5")];
        let rule_sets = vec![DetectorRuleSet {
            names: vec!["Ecal*".to_string()],
            ..DetectorRuleSet::default()
        }];
        assert!(match_rules_to_detectors(&rule_sets, &detectors).is_empty());
    }

    #[test]
    fn test_merge_rule_collapses_branch() {
        let mut tree = SceneTree::new("scene");
        let branch = tree.add_group(tree.root(), "DRICH");
        tree.add_mesh(
            branch,
            "a",
            unit_triangle(),
            Some(Material::with_color(0x0000_00ff)),
        );
        tree.add_mesh(branch, "b", unit_triangle(), None);

        let rule = StyleRule {
            outline: false,
            ..StyleRule::default()
        };
        let counts = apply_style_rule(&mut tree, branch, &rule).unwrap();

        assert_eq!(counts.merged, 2);
        assert_eq!(counts.styled, 1);
        assert_eq!(counts.outlined, 0);
        assert_eq!(tree.node(branch).children.len(), 1);
        let merged = tree.node(branch).children[0];
        assert_eq!(tree.node(merged).name, "DRICH_merged");
    }

    #[test]
    fn test_merge_with_patterns_only_takes_matches() {
        let mut tree = SceneTree::new("scene");
        let branch = tree.add_group(tree.root(), "DRICH");
        let mirrors = tree.add_group(branch, "mirrors");
        tree.add_mesh(
            mirrors,
            "mirror_0",
            unit_triangle(),
            Some(Material::default()),
        );
        tree.add_mesh(
            mirrors,
            "mirror_1",
            unit_triangle(),
            Some(Material::default()),
        );
        let cooling = tree.add_mesh(branch, "cooling", unit_triangle(), Some(Material::default()));

        let rule = StyleRule {
            patterns: vec!["*/mirrors".to_string()],
            new_name: Some("mirrors_merged".to_string()),
            outline: false,
            ..StyleRule::default()
        };
        let counts = apply_style_rule(&mut tree, branch, &rule).unwrap();

        assert_eq!(counts.merged, 2);
        assert!(tree.is_reachable(cooling));
        // The emptied mirrors group was pruned away.
        assert!(!tree.is_reachable(mirrors));
    }

    #[test]
    fn test_color_rule_without_merge() {
        let mut tree = SceneTree::new("scene");
        let branch = tree.add_group(tree.root(), "DRICH");
        let a = tree.add_mesh(
            branch,
            "a",
            unit_triangle(),
            Some(Material::with_color(0x0011_1111)),
        );
        let b = tree.add_mesh(branch, "b", unit_triangle(), None);

        let rule = StyleRule {
            merge: false,
            outline: false,
            color: Some(0x00ab_cdef),
            ..StyleRule::default()
        };
        let counts = apply_style_rule(&mut tree, branch, &rule).unwrap();

        assert_eq!(counts.styled, 2);
        assert_eq!(tree.node(a).material.as_ref().unwrap().color, 0x00ab_cdef);
        assert_eq!(tree.node(b).material.as_ref().unwrap().color, 0x00ab_cdef);
        assert!(tree.node(a).rules_applied);
    }

    #[test]
    fn test_catch_all_skips_already_styled_meshes() {
        let mut tree = SceneTree::new("scene");
        let branch = tree.add_group(tree.root(), "DRICH");
        let styled = tree.add_mesh(branch, "styled", unit_triangle(), None);
        let fresh = tree.add_mesh(branch, "fresh", unit_triangle(), None);
        tree.node_mut(styled).rules_applied = true;

        let rule = StyleRule {
            merge: false,
            outline: false,
            color: Some(0x00ff_0000),
            ..StyleRule::default()
        };
        apply_style_rule(&mut tree, branch, &rule).unwrap();

        assert!(tree.node(styled).material.is_none());
        assert_eq!(
            tree.node(fresh).material.as_ref().unwrap().color,
            0x00ff_0000
        );
    }

    // A group and its child mesh share a name and both match the pattern.
    // The rule must outline the mesh once: styling the group claims the
    // branch, so the mesh's own match is skipped, and the later catch-all
    // skips the whole flagged branch.
    #[test]
    fn test_shared_name_produces_one_outline() {
        let mut tree = SceneTree::new("scene");
        let branch = tree.add_group(tree.root(), "beampipe");
        let group = tree.add_group(branch, "v_upstream_coating");
        tree.add_mesh(group, "v_upstream_coating", unit_triangle(), None);
        tree.add_mesh(branch, "other_pipe", unit_triangle(), None);

        let specific = StyleRule {
            patterns: vec!["**/v_upstream*".to_string()],
            merge: false,
            outline: true,
            ..StyleRule::default()
        };
        let catch_all = StyleRule {
            merge: false,
            outline: true,
            ..StyleRule::default()
        };
        let mut counts = apply_style_rule(&mut tree, branch, &specific).unwrap();
        counts += apply_style_rule(&mut tree, branch, &catch_all).unwrap();

        // One outline for the shared-name branch, one for the other pipe.
        assert_eq!(counts.outlined, 2);
        assert_eq!(count_line_nodes(&tree, group), 1);
        assert_eq!(count_line_nodes(&tree, branch), 2);
    }

    fn count_line_nodes(tree: &SceneTree, start: SceneNodeId) -> usize {
        let mut lines = 0;
        geotree::walk(
            tree,
            start,
            &geotree::WalkOptions::default(),
            &mut |tree: &SceneTree, id, _, _| {
                if let Some(geometry) = &tree.node(id).geometry {
                    if geometry.primitive == Primitive::Lines {
                        lines += 1;
                    }
                }
                true
            },
        );
        lines
    }

    #[test]
    fn test_rule_deserializes_with_defaults_and_aliases() {
        let rule: StyleRule = serde_json::from_str(
            r#"{ "pattern": "*/cooling*", "color": "0xff00ff", "merge": false }"#,
        )
        .unwrap();
        assert_eq!(rule.patterns, ["*/cooling*"]);
        assert_eq!(rule.color, Some(0x00ff_00ff));
        assert!(!rule.merge);
        assert!(rule.outline);
        assert!(rule.delete_origins);
        assert!((rule.outline_threshold_angle - 40.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_as_geo_rules_expands_patterns() {
        let rule_set = DetectorRuleSet {
            names: vec!["DRICH*".to_string()],
            rules: vec![StyleRule {
                patterns: vec!["*/a".to_string(), "*/b".to_string()],
                action: Some(EditAction::SetBit),
                geo_bit: Some(GeoAttr::VisNone),
                ..StyleRule::default()
            }],
            ..DetectorRuleSet::default()
        };
        let geo_rules = rule_set.as_geo_rules();
        assert_eq!(geo_rules.len(), 2);
        assert_eq!(geo_rules[0].pattern, "*/a");
        assert_eq!(geo_rules[0].action, EditAction::SetBit);
        assert_eq!(geo_rules[0].bit, Some(GeoAttr::VisNone));
    }
}
