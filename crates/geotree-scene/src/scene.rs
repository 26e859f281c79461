//! Arena-backed post-render scene tree.
//!
//! The isomorphic counterpart of the pre-render `GeoTree`: nodes carry a
//! name, a local transform, and optionally geometry and a material. The
//! same arena-id conventions apply - children are owned by their parent's
//! child list, the parent back-reference is non-owning, and detached nodes
//! keep their arena slot but become unreachable from the root.

use geotree::PathTree;
use glam::Mat4;

use crate::material::Material;
use crate::mesh::MeshGeometry;

/// Id of a node in a [`SceneTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SceneNodeId(usize);

/// One node of the post-render scene tree.
#[derive(Debug, Clone)]
pub struct SceneNode {
    /// Node name (one path segment).
    pub name: String,
    /// Non-owning back-reference to the parent.
    pub parent: Option<SceneNodeId>,
    /// Child node ids, in order.
    pub children: Vec<SceneNodeId>,
    /// Transform relative to the parent.
    pub transform: Mat4,
    /// Renderable geometry, if this node is a mesh.
    pub geometry: Option<MeshGeometry>,
    /// Material, if assigned.
    pub material: Option<Material>,
    /// Visibility flag.
    pub visible: bool,
    /// Set once a styling rule has handled this node; later catch-all rules
    /// skip flagged nodes and whole flagged branches.
    pub rules_applied: bool,
}

/// Arena-backed tree of [`SceneNode`]s.
#[derive(Debug, Clone)]
pub struct SceneTree {
    nodes: Vec<SceneNode>,
    root: SceneNodeId,
}

impl SceneTree {
    /// Create a tree containing only a root group.
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        let root = SceneNode {
            name: root_name.to_string(),
            parent: None,
            children: Vec::new(),
            transform: Mat4::IDENTITY,
            geometry: None,
            material: None,
            visible: true,
            rules_applied: false,
        };
        Self {
            nodes: vec![root],
            root: SceneNodeId(0),
        }
    }

    /// The root node id.
    #[must_use]
    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    /// Borrow a node.
    #[must_use]
    pub fn node(&self, id: SceneNodeId) -> &SceneNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: SceneNodeId) -> &mut SceneNode {
        &mut self.nodes[id.0]
    }

    /// Append an empty group under `parent`.
    pub fn add_group(&mut self, parent: SceneNodeId, name: &str) -> SceneNodeId {
        self.add_node(parent, name, Mat4::IDENTITY, None, None)
    }

    /// Append an empty group with a local transform.
    pub fn add_group_with_transform(
        &mut self,
        parent: SceneNodeId,
        name: &str,
        transform: Mat4,
    ) -> SceneNodeId {
        self.add_node(parent, name, transform, None, None)
    }

    /// Append a mesh node under `parent`.
    pub fn add_mesh(
        &mut self,
        parent: SceneNodeId,
        name: &str,
        geometry: MeshGeometry,
        material: Option<Material>,
    ) -> SceneNodeId {
        self.add_node(parent, name, Mat4::IDENTITY, Some(geometry), material)
    }

    /// Append a mesh node with a local transform.
    pub fn add_mesh_with_transform(
        &mut self,
        parent: SceneNodeId,
        name: &str,
        transform: Mat4,
        geometry: MeshGeometry,
        material: Option<Material>,
    ) -> SceneNodeId {
        self.add_node(parent, name, transform, Some(geometry), material)
    }

    fn add_node(
        &mut self,
        parent: SceneNodeId,
        name: &str,
        transform: Mat4,
        geometry: Option<MeshGeometry>,
        material: Option<Material>,
    ) -> SceneNodeId {
        let id = SceneNodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            parent: Some(parent),
            children: Vec::new(),
            transform,
            geometry,
            material,
            visible: true,
            rules_applied: false,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// World transform of a node: the product of all local transforms from
    /// the root down to it.
    #[must_use]
    pub fn world_transform(&self, id: SceneNodeId) -> Mat4 {
        let mut matrix = self.nodes[id.0].transform;
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            matrix = self.nodes[parent.0].transform * matrix;
            current = self.nodes[parent.0].parent;
        }
        matrix
    }

    /// Slash-joined path of a node from the root.
    #[must_use]
    pub fn path_of(&self, id: SceneNodeId) -> String {
        let mut segments = vec![self.nodes[id.0].name.as_str()];
        let mut current = self.nodes[id.0].parent;
        while let Some(parent) = current {
            segments.push(self.nodes[parent.0].name.as_str());
            current = self.nodes[parent.0].parent;
        }
        segments.reverse();
        segments.join("/")
    }

    /// Detach a node from its parent's child list, with a warning when the
    /// parent cannot be resolved.
    pub fn detach(&mut self, id: SceneNodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent else {
            tracing::warn!(
                node = %self.nodes[id.0].name,
                "cannot detach a node without a parent"
            );
            return false;
        };
        self.remove_child_link(parent, id)
    }

    /// Detach without warning on a missing parent; used by cleanup passes
    /// where hitting the root is expected.
    pub fn detach_quiet(&mut self, id: SceneNodeId) -> bool {
        match self.nodes[id.0].parent {
            Some(parent) => self.remove_child_link(parent, id),
            None => false,
        }
    }

    fn remove_child_link(&mut self, parent: SceneNodeId, id: SceneNodeId) -> bool {
        let children = &mut self.nodes[parent.0].children;
        match children.iter().position(|&child| child == id) {
            Some(index) => {
                children.remove(index);
                self.nodes[id.0].parent = None;
                true
            }
            None => {
                tracing::warn!(
                    node = %self.nodes[id.0].name,
                    "node is missing from its parent's child list"
                );
                false
            }
        }
    }

    /// Whether `id` can still be reached from the root via parent links.
    #[must_use]
    pub fn is_reachable(&self, id: SceneNodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current.0].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Ids of all geometry-bearing triangle meshes in the subtree under
    /// `start` (including `start` itself), in pre-order.
    #[must_use]
    pub fn descendant_meshes(&self, start: SceneNodeId) -> Vec<SceneNodeId> {
        let mut meshes = Vec::new();
        geotree::walk(
            self,
            start,
            &geotree::WalkOptions::default(),
            &mut |tree: &Self, id, _, _| {
                if let Some(geometry) = &tree.node(id).geometry {
                    if geometry.primitive == crate::mesh::Primitive::Triangles {
                        meshes.push(id);
                    }
                }
                true
            },
        );
        meshes
    }

    /// Recursively remove branches that carry no geometry anywhere below
    /// them. Removing nodes left empty after merging speeds up rendering.
    /// The `start` node itself is kept.
    pub fn prune_empty_groups(&mut self, start: SceneNodeId) {
        let children: Vec<SceneNodeId> = self.nodes[start.0].children.clone();
        for child in children {
            self.prune_empty_child(child);
        }
    }

    fn prune_empty_child(&mut self, id: SceneNodeId) {
        let children: Vec<SceneNodeId> = self.nodes[id.0].children.clone();
        for child in children {
            self.prune_empty_child(child);
        }
        if self.nodes[id.0].children.is_empty() && self.nodes[id.0].geometry.is_none() {
            self.detach_quiet(id);
        }
    }

    /// Clear the `rules_applied` flags in the subtree under `start`.
    /// Called before processing a new rule set for a detector.
    pub fn clear_rule_flags(&mut self, start: SceneNodeId) {
        geotree::walk_mut(
            self,
            start,
            &geotree::WalkOptions::default(),
            &mut |tree: &mut Self, id, _, _| {
                tree.node_mut(id).rules_applied = false;
                true
            },
        );
    }

    /// Whether the node or any of its ancestors has been handled by a
    /// styling rule already. Hierarchical: styling a branch claims its
    /// whole subtree.
    #[must_use]
    pub fn is_in_styled_branch(&self, id: SceneNodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if self.nodes[node.0].rules_applied {
                return true;
            }
            current = self.nodes[node.0].parent;
        }
        false
    }
}

impl PathTree for SceneTree {
    type Id = SceneNodeId;

    fn root(&self) -> SceneNodeId {
        self.root
    }

    fn node_name(&self, id: SceneNodeId) -> &str {
        &self.nodes[id.0].name
    }

    fn child_ids(&self, id: SceneNodeId) -> &[SceneNodeId] {
        &self.nodes[id.0].children
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Primitive;
    use glam::Vec3;

    fn unit_triangle() -> MeshGeometry {
        MeshGeometry::triangles(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            vec![0, 1, 2],
        )
    }

    #[test]
    fn test_world_transform_chains_to_root() {
        let mut tree = SceneTree::new("scene");
        let group = tree.add_group_with_transform(
            tree.root(),
            "group",
            Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        );
        let mesh = tree.add_mesh_with_transform(
            group,
            "mesh",
            Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0)),
            unit_triangle(),
            None,
        );

        let world = tree.world_transform(mesh);
        assert_eq!(world.transform_point3(Vec3::ZERO), Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_path_of() {
        let mut tree = SceneTree::new("scene");
        let group = tree.add_group(tree.root(), "DRICH");
        let mesh = tree.add_mesh(group, "mirror", unit_triangle(), None);
        assert_eq!(tree.path_of(mesh), "scene/DRICH/mirror");
    }

    #[test]
    fn test_descendant_meshes_skips_groups_and_lines() {
        let mut tree = SceneTree::new("scene");
        let group = tree.add_group(tree.root(), "group");
        let mesh = tree.add_mesh(group, "mesh", unit_triangle(), None);
        let mut lines = unit_triangle();
        lines.primitive = Primitive::Lines;
        tree.add_mesh(group, "mesh_outline", lines, None);

        assert_eq!(tree.descendant_meshes(tree.root()), [mesh]);
    }

    #[test]
    fn test_prune_empty_groups() {
        let mut tree = SceneTree::new("scene");
        let keep = tree.add_group(tree.root(), "keep");
        tree.add_mesh(keep, "mesh", unit_triangle(), None);
        let empty_outer = tree.add_group(tree.root(), "empty_outer");
        tree.add_group(empty_outer, "empty_inner");

        tree.prune_empty_groups(tree.root());

        // The nested empty chain collapses bottom-up; the mesh branch stays.
        assert!(!tree.is_reachable(empty_outer));
        assert!(tree.is_reachable(keep));
    }

    #[test]
    fn test_styled_branch_is_hierarchical() {
        let mut tree = SceneTree::new("scene");
        let group = tree.add_group(tree.root(), "group");
        let mesh = tree.add_mesh(group, "mesh", unit_triangle(), None);

        assert!(!tree.is_in_styled_branch(mesh));
        tree.node_mut(group).rules_applied = true;
        assert!(tree.is_in_styled_branch(mesh));

        tree.clear_rule_flags(tree.root());
        assert!(!tree.is_in_styled_branch(mesh));
    }
}
