//! Triangle mesh representation for the built scene.
//!
//! A [`Mesh`] is the output of geometry assembly: a single triangle index
//! buffer split into per-material [`SubMesh`] ranges, with normals always
//! recomputed from the final indices.

use bytemuck::{Pod, Zeroable};
use xof_math::{Aabb, Vec3};

/// A contiguous range of [`Mesh::indices`] drawn with one material.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubMesh {
    /// Index into the owning mesh's material list
    pub material_index: usize,

    /// First index in the index buffer
    pub index_start: usize,

    /// Number of indices (a multiple of 3)
    pub index_count: usize,
}

impl SubMesh {
    pub fn triangle_count(&self) -> usize {
        self.index_count / 3
    }

    pub fn index_range(&self) -> std::ops::Range<usize> {
        self.index_start..self.index_start + self.index_count
    }
}

/// Interleaved vertex layout for upload to a GPU vertex buffer.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// A triangulated mesh with per-material index ranges.
#[derive(Clone, Debug)]
pub struct Mesh {
    /// Vertex positions
    pub positions: Vec<Vec3>,

    /// Per-vertex normals
    pub normals: Option<Vec<Vec3>>,

    /// One [u, v] per vertex, only present when the count matches
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Triangle indices (every 3 indices form a triangle)
    pub indices: Vec<u32>,

    /// Material ranges covering `indices` without gaps or overlap
    pub submeshes: Vec<SubMesh>,

    /// Axis-aligned bounding box
    pub bounds: Aabb,
}

impl Mesh {
    /// Create a mesh with a single submesh spanning every index.
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        let submeshes = vec![SubMesh {
            material_index: 0,
            index_start: 0,
            index_count: indices.len(),
        }];
        Self::with_submeshes(positions, indices, submeshes)
    }

    pub fn with_submeshes(positions: Vec<Vec3>, indices: Vec<u32>, submeshes: Vec<SubMesh>) -> Self {
        let bounds = Aabb::from_point_cloud(&positions);
        Self {
            positions,
            normals: None,
            uvs: None,
            indices,
            submeshes,
            bounds,
        }
    }

    /// Attach UVs if there is exactly one per vertex. Returns whether they
    /// were attached.
    pub fn set_uvs(&mut self, uvs: Vec<[f32; 2]>) -> bool {
        if uvs.len() != self.positions.len() {
            log::debug!(
                "UV count ({}) doesn't match vertex count ({}), dropping UVs",
                uvs.len(),
                self.positions.len()
            );
            return false;
        }
        self.uvs = Some(uvs);
        true
    }

    /// Compute smooth vertex normals by averaging face normals.
    ///
    /// Replaces any existing normals. Vertices not used by any triangle get
    /// an up vector.
    pub fn compute_normals(&mut self) {
        let vertex_count = self.positions.len();
        let mut normals = vec![Vec3::ZERO; vertex_count];

        for face in self.indices.chunks_exact(3) {
            let i0 = face[0] as usize;
            let i1 = face[1] as usize;
            let i2 = face[2] as usize;

            if i0 >= vertex_count || i1 >= vertex_count || i2 >= vertex_count {
                continue;
            }

            let p0 = self.positions[i0];
            let edge1 = self.positions[i1] - p0;
            let edge2 = self.positions[i2] - p0;
            let face_normal = edge2.cross(edge1); // clockwise front faces

            normals[i0] += face_normal;
            normals[i1] += face_normal;
            normals[i2] += face_normal;
        }

        for normal in &mut normals {
            *normal = normal.try_normalize().unwrap_or(Vec3::Y);
        }

        self.normals = Some(normals);
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    pub fn has_uvs(&self) -> bool {
        self.uvs.is_some()
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Vec3 {
        self.bounds.centroid()
    }

    /// Diagonal length of the bounding box.
    pub fn size(&self) -> f32 {
        self.bounds.extent().length()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Indices belonging to one submesh.
    pub fn submesh_indices(&self, submesh: &SubMesh) -> &[u32] {
        &self.indices[submesh.index_range()]
    }

    /// Interleave positions, normals, and UVs into GPU vertices.
    /// Missing normals or UVs are zero-filled.
    pub fn gpu_vertices(&self) -> Vec<GpuVertex> {
        (0..self.positions.len())
            .map(|i| GpuVertex {
                position: self.positions[i].to_array(),
                normal: self
                    .normals
                    .as_ref()
                    .and_then(|n| n.get(i))
                    .map_or([0.0; 3], |n| n.to_array()),
                uv: self.uvs.as_ref().and_then(|uv| uv.get(i)).copied().unwrap_or([0.0; 2]),
            })
            .collect()
    }

    /// Raw vertex bytes ready for a vertex buffer.
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.gpu_vertices()).to_vec()
    }

    /// Raw index bytes ready for an index buffer.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Mesh {
        let positions = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        Mesh::new(positions, vec![0, 1, 2])
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = triangle();

        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.submeshes.len(), 1);
        assert_eq!(mesh.submeshes[0].index_count, 3);
        assert!(!mesh.has_normals());
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = triangle();
        mesh.compute_normals();

        // Clockwise 0,1,2 viewed from +Z faces -Z
        let normals = mesh.normals.as_ref().unwrap();
        for normal in normals {
            assert!((normal.z + 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_unused_vertex_gets_up_normal() {
        let mut mesh = triangle();
        mesh.positions.push(Vec3::new(5.0, 5.0, 5.0));
        mesh.compute_normals();
        assert_eq!(mesh.normals.as_ref().unwrap()[3], Vec3::Y);
    }

    #[test]
    fn test_bounds_computation() {
        let positions = vec![
            Vec3::new(-1.0, -2.0, -3.0),
            Vec3::new(4.0, 5.0, 6.0),
            Vec3::new(0.0, 0.0, 0.0),
        ];
        let mesh = Mesh::new(positions, vec![0, 1, 2]);

        assert!((mesh.bounds.min() - Vec3::new(-1.0, -2.0, -3.0)).length() < 0.001);
        assert!((mesh.bounds.max() - Vec3::new(4.0, 5.0, 6.0)).length() < 0.001);
    }

    #[test]
    fn test_uvs_require_matching_count() {
        let mut mesh = triangle();
        assert!(!mesh.set_uvs(vec![[0.0, 0.0]; 2]));
        assert!(!mesh.has_uvs());

        assert!(mesh.set_uvs(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]));
        assert!(mesh.has_uvs());
    }

    #[test]
    fn test_gpu_vertices() {
        let mut mesh = triangle();
        mesh.compute_normals();
        mesh.set_uvs(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);

        let vertices = mesh.gpu_vertices();
        assert_eq!(vertices.len(), 3);
        assert_eq!(vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(vertices[2].uv, [0.0, 1.0]);
        assert_eq!(mesh.vertex_bytes().len(), 3 * std::mem::size_of::<GpuVertex>());
        assert_eq!(mesh.index_bytes().len(), 12);
    }

    #[test]
    fn test_submesh_indices() {
        let positions = vec![Vec3::ZERO; 4];
        let submeshes = vec![
            SubMesh {
                material_index: 0,
                index_start: 0,
                index_count: 3,
            },
            SubMesh {
                material_index: 1,
                index_start: 3,
                index_count: 3,
            },
        ];
        let mesh = Mesh::with_submeshes(positions, vec![0, 1, 2, 0, 2, 3], submeshes);

        assert_eq!(mesh.submesh_indices(&mesh.submeshes[1]), &[0, 2, 3]);
        assert_eq!(mesh.submeshes[1].triangle_count(), 1);
    }
}
