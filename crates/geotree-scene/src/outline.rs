//! Edge outlines for merged meshes.
//!
//! Merging erases the visual boundaries between parts. An outline is a
//! line-segment mesh of the sharp and boundary edges of a source mesh,
//! attached as a sibling so it inherits the same placement.

use glam::Mat4;

use crate::error::{GeometryError, Result};
use crate::material::Material;
use crate::scene::{SceneNodeId, SceneTree};

/// Options for [`create_outline`].
#[derive(Debug, Clone)]
pub struct OutlineOptions {
    /// Line color as `0xRRGGBB`.
    pub color: u32,
    /// Dihedral angle in degrees above which an edge is kept.
    pub threshold_angle: f32,
    /// Full material override; when set, `color` is ignored.
    pub material: Option<Material>,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            color: 0x0055_5555,
            threshold_angle: 40.0,
            material: None,
        }
    }
}

/// Build a line mesh of the sharp edges of `mesh` and attach it next to it.
///
/// The outline node is named `<mesh>_outline` and is attached to the mesh's
/// parent with the mesh's own local transform, so both render in the same
/// place. A parentless mesh gets the outline as a child with an identity
/// transform instead. The outline is flagged as rule-handled so catch-all
/// styling rules leave it alone.
///
/// # Errors
///
/// [`GeometryError::NoGeometriesFound`] when the node carries no geometry.
pub fn create_outline(
    tree: &mut SceneTree,
    mesh: SceneNodeId,
    options: &OutlineOptions,
) -> Result<SceneNodeId> {
    let Some(geometry) = &tree.node(mesh).geometry else {
        return Err(GeometryError::NoGeometriesFound {
            path: tree.path_of(mesh),
        });
    };
    let edges = geometry.extract_edges(options.threshold_angle);
    let material = options
        .material
        .clone()
        .unwrap_or_else(|| Material::with_color(options.color));
    let name = format!("{}_outline", tree.node(mesh).name);

    let outline = match tree.node(mesh).parent {
        Some(parent) => {
            let transform = tree.node(mesh).transform;
            tree.add_mesh_with_transform(parent, &name, transform, edges, Some(material))
        }
        None => tree.add_mesh_with_transform(mesh, &name, Mat4::IDENTITY, edges, Some(material)),
    };
    tree.node_mut(outline).rules_applied = true;
    Ok(outline)
}
