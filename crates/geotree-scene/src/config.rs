//! Tolerant parsing of rule-set configuration.
//!
//! Rule files are hand-edited JSON and arrive with the usual operator
//! mistakes. A malformed item degrades to a warning plus a partial rule
//! set; parsing never fails outright.

use serde_json::Value;

use crate::material::Material;
use crate::style::{DetectorRuleSet, StyleRule};

/// Convert a raw JSON value into typed rule sets.
///
/// Degrades gracefully: a non-array top level yields an empty list, an item
/// without a `rules` array yields an empty set, an unparsable rule is
/// skipped and an unparsable embedded material is dropped from its rule,
/// each with one warning.
#[must_use]
pub fn rule_sets_from_json(value: &Value) -> Vec<DetectorRuleSet> {
    let Some(items) = value.as_array() else {
        tracing::warn!("rule configuration top level is not an array, ignoring it");
        return Vec::new();
    };

    items
        .iter()
        .map(|item| {
            let Some(rules) = item.get("rules").and_then(Value::as_array) else {
                tracing::warn!(item = %item, "rule set without a rules array");
                return DetectorRuleSet::default();
            };

            DetectorRuleSet {
                names: item
                    .get("names")
                    .and_then(Value::as_array)
                    .map(|names| {
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                name: item.get("name").and_then(Value::as_str).map(str::to_string),
                rules: rules.iter().filter_map(rule_from_json).collect(),
            }
        })
        .collect()
}

fn rule_from_json(value: &Value) -> Option<StyleRule> {
    let mut value = value.clone();

    // Materials are embedded as serialized objects; a bad one loses only
    // the material, not the whole rule.
    let material = take_material(&mut value);

    match serde_json::from_value::<StyleRule>(value) {
        Ok(mut rule) => {
            if rule.material.is_none() {
                rule.material = material;
            }
            Some(rule)
        }
        Err(error) => {
            tracing::warn!(%error, "skipping unparsable styling rule");
            None
        }
    }
}

fn take_material(value: &mut Value) -> Option<Material> {
    let Some(object) = value.as_object_mut() else {
        return None;
    };
    let raw = object
        .remove("materialJson")
        .or_else(|| object.remove("material"))?;

    match serde_json::from_value::<Material>(raw) {
        Ok(material) => Some(material),
        Err(error) => {
            tracing::warn!(%error, "dropping unparsable material from styling rule");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_array_top_level_yields_empty() {
        assert!(rule_sets_from_json(&json!({ "rules": [] })).is_empty());
        assert!(rule_sets_from_json(&json!("nope")).is_empty());
    }

    #[test]
    fn test_parses_names_rules_and_hex_colors() {
        let value = json!([
            {
                "names": ["DRICH*", "RICHEndcap*"],
                "rules": [
                    { "patterns": ["*/mirror*"], "color": "0xdddddd", "merge": false },
                    { "pattern": "*/cooling*", "color": 16711680 }
                ]
            },
            {
                "name": "*",
                "rules": [ { "merge": true, "outline": true } ]
            }
        ]);

        let rule_sets = rule_sets_from_json(&value);
        assert_eq!(rule_sets.len(), 2);
        assert_eq!(rule_sets[0].names, ["DRICH*", "RICHEndcap*"]);
        assert_eq!(rule_sets[0].rules.len(), 2);
        assert_eq!(rule_sets[0].rules[0].color, Some(0x00dd_dddd));
        assert_eq!(rule_sets[0].rules[1].patterns, ["*/cooling*"]);
        assert_eq!(rule_sets[0].rules[1].color, Some(0x00ff_0000));
        assert_eq!(rule_sets[1].name.as_deref(), Some("*"));
    }

    #[test]
    fn test_item_without_rules_degrades_to_empty_set() {
        let value = json!([ { "names": ["DRICH*"] } ]);
        let rule_sets = rule_sets_from_json(&value);
        assert_eq!(rule_sets.len(), 1);
        assert!(rule_sets[0].rules.is_empty());
    }

    #[test]
    fn test_embedded_material_is_parsed() {
        let value = json!([
            {
                "name": "DRICH*",
                "rules": [
                    { "material": { "name": "glass", "color": "0x88ccff", "opacity": 0.5, "transparent": true } }
                ]
            }
        ]);

        let rule_sets = rule_sets_from_json(&value);
        let material = rule_sets[0].rules[0].material.as_ref().unwrap();
        assert_eq!(material.name, "glass");
        assert_eq!(material.color, 0x0088_ccff);
        assert!(material.transparent);
    }

    #[test]
    fn test_bad_material_drops_only_the_material() {
        let value = json!([
            {
                "name": "DRICH*",
                "rules": [ { "color": 255, "material": { "color": ["not", "a", "color"] } } ]
            }
        ]);

        let rule_sets = rule_sets_from_json(&value);
        let rule = &rule_sets[0].rules[0];
        assert!(rule.material.is_none());
        assert_eq!(rule.color, Some(255));
    }

    #[test]
    fn test_bad_rule_is_skipped_but_siblings_survive() {
        let value = json!([
            {
                "name": "*",
                "rules": [
                    { "color": "teal" },
                    { "color": 255 }
                ]
            }
        ]);

        let rule_sets = rule_sets_from_json(&value);
        assert_eq!(rule_sets[0].rules.len(), 1);
        assert_eq!(rule_sets[0].rules[0].color, Some(255));
    }
}
