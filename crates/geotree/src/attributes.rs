//! Visibility attribute bits carried by geometry volumes.
//!
//! The external tree-to-mesh converter reads these flags to decide which
//! volumes become renderable meshes. The bit layout follows the imported
//! CAD-like format, so round-tripping a tree preserves its flags.

use serde::{Deserialize, Serialize};

/// A single attribute bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeoAttr {
    /// The volume's visibility attributes are overridden.
    #[serde(alias = "kVisOverride")]
    VisOverride,
    /// The volume is invisible, as are its daughters.
    #[serde(alias = "kVisNone")]
    VisNone,
    /// This volume itself is visible.
    #[serde(alias = "kVisThis")]
    VisThis,
    /// All leaves below this volume are visible.
    #[serde(alias = "kVisDaughters")]
    VisDaughters,
    /// First-level daughters are visible.
    #[serde(alias = "kVisOneLevel")]
    VisOneLevel,
    /// Attributes have been streamed from file.
    #[serde(alias = "kVisStreamed")]
    VisStreamed,
    /// Attributes changed after the geometry was closed.
    #[serde(alias = "kVisTouched")]
    VisTouched,
    /// The volume is currently visible on screen.
    #[serde(alias = "kVisOnScreen")]
    VisOnScreen,
    /// All containers are visible.
    #[serde(alias = "kVisContainers")]
    VisContainers,
    /// Only this volume is visible.
    #[serde(alias = "kVisOnly")]
    VisOnly,
    /// Only a given branch is visible.
    #[serde(alias = "kVisBranch")]
    VisBranch,
    /// Raytracing flag.
    #[serde(alias = "kVisRaytrace")]
    VisRaytrace,
}

impl GeoAttr {
    /// The bitmask value of this attribute.
    #[must_use]
    pub const fn mask(self) -> u32 {
        match self {
            Self::VisOverride => 1 << 0,
            Self::VisNone => 1 << 1,
            Self::VisThis => 1 << 2,
            Self::VisDaughters => 1 << 3,
            Self::VisOneLevel => 1 << 4,
            Self::VisStreamed => 1 << 5,
            Self::VisTouched => 1 << 6,
            Self::VisOnScreen => 1 << 7,
            Self::VisContainers => 1 << 12,
            Self::VisOnly => 1 << 13,
            Self::VisBranch => 1 << 14,
            Self::VisRaytrace => 1 << 15,
        }
    }
}

/// The attribute bitmask of one volume.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoAttributes(u32);

impl GeoAttributes {
    /// Wrap raw bits as imported from file.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Whether `attr` is set.
    #[must_use]
    pub const fn test(self, attr: GeoAttr) -> bool {
        self.0 & attr.mask() != 0
    }

    /// Set `attr`.
    pub fn set(&mut self, attr: GeoAttr) {
        self.0 |= attr.mask();
    }

    /// Clear `attr`.
    pub fn unset(&mut self, attr: GeoAttr) {
        self.0 &= !attr.mask();
    }

    /// Flip `attr`. Only the low 24 bits participate, matching the imported
    /// format's convention.
    pub fn toggle(&mut self, attr: GeoAttr) {
        self.0 ^= attr.mask() & 0x00ff_ffff;
    }
}
