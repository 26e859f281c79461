//! Simple render material, deserializable from embedded rule configuration.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// A render material, the subset of properties the styling rules touch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Material {
    /// Material name, informational only.
    pub name: String,
    /// Base color as `0xRRGGBB`.
    #[serde(deserialize_with = "deserialize_color")]
    pub color: u32,
    /// Opacity in `[0, 1]`.
    pub opacity: f32,
    /// Whether the material renders with alpha blending.
    pub transparent: bool,
    /// Wireframe rendering flag.
    pub wireframe: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            color: 0x00ff_ffff,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
        }
    }
}

impl Material {
    /// A plain material with the given color.
    #[must_use]
    pub fn with_color(color: u32) -> Self {
        Self {
            color,
            ..Self::default()
        }
    }
}

/// Accept a color either as a number or as a hex string (`"0xabcdef"`,
/// `"#abcdef"` or bare hex digits).
fn deserialize_color<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    parse_color(&value).ok_or_else(|| D::Error::custom(format!("invalid color value: {value}")))
}

/// Parse a color from a JSON value: integer, or hex string with optional
/// `0x`/`#` prefix.
#[must_use]
pub fn parse_color(value: &serde_json::Value) -> Option<u32> {
    match value {
        serde_json::Value::Number(number) => number.as_u64().and_then(|n| u32::try_from(n).ok()),
        serde_json::Value::String(text) => {
            let digits = text
                .strip_prefix("0x")
                .or_else(|| text.strip_prefix("0X"))
                .or_else(|| text.strip_prefix('#'))
                .unwrap_or(text);
            u32::from_str_radix(digits, 16).ok()
        }
        _ => None,
    }
}
