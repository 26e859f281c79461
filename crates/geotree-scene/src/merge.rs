//! Merging many small meshes into one buffer.
//!
//! Detector branches routinely hold thousands of tiny meshes that share a
//! material. Fusing them into a single geometry collapses as many draw
//! calls into one. World transforms are baked into the merged buffer and
//! the result is re-expressed in its parent's local space, so the merged
//! node renders exactly where the sources did.

use glam::Mat4;

use crate::error::{GeometryError, Result};
use crate::material::Material;
use crate::mesh::MeshGeometry;
use crate::scene::{SceneNodeId, SceneTree};

/// Result of a merge operation.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The newly attached merged mesh node.
    pub merged: SceneNodeId,
    /// Material assigned to the merged node.
    pub material: Material,
    /// Source mesh nodes whose geometry was folded in.
    pub consumed: Vec<SceneNodeId>,
    /// The node the merged mesh was attached under.
    pub parent: SceneNodeId,
}

/// Merge every triangle mesh under `branch` into a single mesh attached to
/// `branch`, then detach the sources.
///
/// When `material` is `None` the material of the first source mesh that
/// carries one is used.
///
/// # Errors
///
/// [`GeometryError::NoGeometriesFound`] when the branch holds no triangle
/// meshes, [`GeometryError::NoMaterial`] when no material was given and no
/// source carries one.
pub fn merge_branch(
    tree: &mut SceneTree,
    branch: SceneNodeId,
    name: &str,
    material: Option<Material>,
) -> Result<MergeOutcome> {
    let sources = tree.descendant_meshes(branch);
    let outcome = merge_into(tree, branch, &sources, name, material)?;
    dispose_sources(tree, &outcome.consumed);
    Ok(outcome)
}

/// Merge an explicit list of mesh nodes into a single mesh attached to
/// `parent`. The sources are left in place; callers dispose of them with
/// [`dispose_sources`] once nothing else references their geometry.
///
/// # Errors
///
/// Same failure modes as [`merge_branch`].
pub fn merge_list(
    tree: &mut SceneTree,
    sources: &[SceneNodeId],
    parent: SceneNodeId,
    name: &str,
    material: Option<Material>,
) -> Result<MergeOutcome> {
    merge_into(tree, parent, sources, name, material)
}

fn merge_into(
    tree: &mut SceneTree,
    parent: SceneNodeId,
    sources: &[SceneNodeId],
    name: &str,
    material: Option<Material>,
) -> Result<MergeOutcome> {
    let consumed: Vec<SceneNodeId> = sources
        .iter()
        .copied()
        .filter(|&id| tree.node(id).geometry.is_some())
        .collect();
    if consumed.is_empty() {
        return Err(GeometryError::NoGeometriesFound {
            path: tree.path_of(parent),
        });
    }

    let material = match material.or_else(|| {
        consumed
            .iter()
            .find_map(|&id| tree.node(id).material.clone())
    }) {
        Some(material) => material,
        None => {
            return Err(GeometryError::NoMaterial {
                path: tree.path_of(parent),
            });
        }
    };

    // Bake each source's world transform into a copy of its geometry so
    // the parts line up in a shared space.
    let mut parts = Vec::with_capacity(consumed.len());
    for &id in &consumed {
        let world = tree.world_transform(id);
        if let Some(geometry) = &tree.node(id).geometry {
            let mut part = geometry.clone();
            part.apply_transform(&world);
            parts.push(part);
        }
    }
    let mut merged = MeshGeometry::concat(&parts);

    // Re-express the merged buffer in the parent's local space, otherwise
    // the parent's own transform would be applied twice.
    let parent_world = tree.world_transform(parent);
    merged.apply_transform(&parent_world.inverse());

    tracing::debug!(
        name,
        sources = consumed.len(),
        vertices = merged.vertex_count(),
        "merged meshes"
    );

    let merged = tree.add_mesh_with_transform(
        parent,
        name,
        Mat4::IDENTITY,
        merged,
        Some(material.clone()),
    );
    tree.node_mut(merged).rules_applied = true;

    Ok(MergeOutcome {
        merged,
        material,
        consumed,
        parent,
    })
}

/// Detach merged-away source meshes and any parent group each one leaves
/// empty behind it.
pub fn dispose_sources(tree: &mut SceneTree, sources: &[SceneNodeId]) {
    for &id in sources {
        let parent = tree.node(id).parent;
        tree.detach_quiet(id);
        if let Some(parent) = parent {
            if tree.node(parent).children.is_empty() && tree.node(parent).geometry.is_none() {
                tree.detach_quiet(parent);
            }
        }
    }
}
