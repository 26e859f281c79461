//! Renderable buffer geometry: transform baking, concatenation and edge
//! extraction.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};

/// Primitive topology of a [`MeshGeometry`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Primitive {
    /// Triangle list.
    #[default]
    Triangles,
    /// Line-segment list (pairs of positions).
    Lines,
}

/// A buffer geometry: positions, optional normals, optional indices.
///
/// When `indices` is empty the positions form an unindexed soup of
/// triangles (or line segments, depending on `primitive`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    /// Vertex positions.
    pub positions: Vec<Vec3>,
    /// Vertex normals; either empty or the same length as `positions`.
    pub normals: Vec<Vec3>,
    /// Index buffer; empty for unindexed geometry.
    pub indices: Vec<u32>,
    /// Primitive topology.
    pub primitive: Primitive,
}

impl MeshGeometry {
    /// A triangle geometry from positions and indices, with normals left
    /// empty.
    #[must_use]
    pub fn triangles(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            indices,
            primitive: Primitive::Triangles,
        }
    }

    /// Number of vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles (0 for line geometry).
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        match self.primitive {
            Primitive::Triangles if self.indices.is_empty() => self.positions.len() / 3,
            Primitive::Triangles => self.indices.len() / 3,
            Primitive::Lines => 0,
        }
    }

    /// Bake a transform into the geometry: positions by the full matrix,
    /// normals by the normal matrix (inverse transpose of the upper 3x3).
    pub fn apply_transform(&mut self, matrix: &Mat4) {
        for position in &mut self.positions {
            *position = matrix.transform_point3(*position);
        }
        if !self.normals.is_empty() {
            let normal_matrix = Mat3::from_mat4(*matrix).inverse().transpose();
            for normal in &mut self.normals {
                *normal = (normal_matrix * *normal).normalize_or_zero();
            }
        }
    }

    /// Concatenate geometries into one buffer, offsetting indices.
    ///
    /// All parts are expected to share the first part's primitive topology.
    /// Normals are kept only if every part carries them.
    #[must_use]
    pub fn concat(parts: &[MeshGeometry]) -> MeshGeometry {
        let mut merged = MeshGeometry {
            primitive: parts.first().map(|p| p.primitive).unwrap_or_default(),
            ..MeshGeometry::default()
        };
        let keep_normals = parts.iter().all(|p| p.normals.len() == p.positions.len());

        for part in parts {
            let offset = u32::try_from(merged.positions.len()).unwrap_or(u32::MAX);
            merged
                .indices
                .extend(part.indices.iter().map(|&index| index + offset));
            merged.positions.extend_from_slice(&part.positions);
            if keep_normals {
                merged.normals.extend_from_slice(&part.normals);
            }
        }
        merged
    }

    /// Extract sharp and boundary edges as line-segment geometry.
    ///
    /// An edge between two triangles is emitted when the dihedral angle
    /// between their faces exceeds `threshold_angle_deg`; edges bordering a
    /// single triangle (boundary edges) are always emitted. Vertices are
    /// welded by quantized position, so duplicated vertices along seams do
    /// not produce spurious edges.
    #[must_use]
    pub fn extract_edges(&self, threshold_angle_deg: f32) -> MeshGeometry {
        let threshold_dot = threshold_angle_deg.to_radians().cos();

        // Weld vertices by quantized position (4 decimal digits).
        let quantize = |v: Vec3| -> [i64; 3] {
            [
                (f64::from(v.x) * 1e4).round() as i64,
                (f64::from(v.y) * 1e4).round() as i64,
                (f64::from(v.z) * 1e4).round() as i64,
            ]
        };
        let mut canonical: HashMap<[i64; 3], u32> = HashMap::new();
        let mut canonical_of = |index: u32, positions: &[Vec3]| -> u32 {
            let key = quantize(positions[index as usize]);
            *canonical.entry(key).or_insert(index)
        };

        struct EdgeInfo {
            normal: Vec3,
            a: u32,
            b: u32,
            faces: u32,
            sharp: bool,
        }
        let mut edges: HashMap<(u32, u32), EdgeInfo> = HashMap::new();

        let index_at = |i: usize| -> u32 {
            if self.indices.is_empty() {
                u32::try_from(i).unwrap_or(u32::MAX)
            } else {
                self.indices[i]
            }
        };
        let index_count = if self.indices.is_empty() {
            self.positions.len()
        } else {
            self.indices.len()
        };

        for triangle in 0..index_count / 3 {
            let raw = [
                index_at(triangle * 3),
                index_at(triangle * 3 + 1),
                index_at(triangle * 3 + 2),
            ];
            let [p0, p1, p2] = raw.map(|i| self.positions[i as usize]);
            let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();

            for corner in 0..3 {
                let a_raw = raw[corner];
                let b_raw = raw[(corner + 1) % 3];
                let a = canonical_of(a_raw, &self.positions);
                let b = canonical_of(b_raw, &self.positions);
                if a == b {
                    continue;
                }
                let key = (a.min(b), a.max(b));
                match edges.get_mut(&key) {
                    Some(info) => {
                        info.faces += 1;
                        if normal.dot(info.normal) <= threshold_dot {
                            info.sharp = true;
                        }
                    }
                    None => {
                        edges.insert(
                            key,
                            EdgeInfo {
                                normal,
                                a: a_raw,
                                b: b_raw,
                                faces: 1,
                                sharp: false,
                            },
                        );
                    }
                }
            }
        }

        let mut lines = MeshGeometry {
            primitive: Primitive::Lines,
            ..MeshGeometry::default()
        };
        let mut sorted: Vec<_> = edges.into_iter().collect();
        sorted.sort_by_key(|(key, _)| *key);
        for (_, info) in sorted {
            if info.faces == 1 || info.sharp {
                lines.positions.push(self.positions[info.a as usize]);
                lines.positions.push(self.positions[info.b as usize]);
            }
        }
        lines
    }
}
