//! Geometry assembly: polygon triangulation and material regrouping.
//!
//! Turns a parsed [`XMesh`] into a renderable [`Mesh`]. Polygons are fan
//! triangulated, then triangles are regrouped so each material's triangles
//! form one contiguous range of the index buffer.

use std::collections::BTreeMap;

use thiserror::Error;

use super::types::{MaterialId, XMesh};
use crate::mesh::{Mesh, SubMesh};

/// Errors raised while assembling geometry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Mesh '{mesh}': face {face} references vertex {index}, but only {vertex_count} vertices exist")]
    VertexIndexOutOfRange {
        mesh: String,
        face: usize,
        index: u32,
        vertex_count: usize,
    },
}

/// Result type for geometry assembly.
pub type GeometryResult<T> = Result<T, GeometryError>;

/// A triangle produced by fan triangulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triangle {
    pub indices: [u32; 3],
    /// Index of the polygon this triangle came from
    pub face: usize,
}

/// Fan-triangulate polygons: `(v0, vi, vi+1)` for `i` in `1..n-1`.
///
/// Faces with fewer than 3 vertices produce nothing.
pub fn triangulate(faces: &[Vec<u32>]) -> Vec<Triangle> {
    let mut triangles = Vec::new();

    for (face, indices) in faces.iter().enumerate() {
        if indices.len() < 3 {
            continue;
        }
        let v0 = indices[0];
        for pair in indices[1..].windows(2) {
            triangles.push(Triangle {
                indices: [v0, pair[0], pair[1]],
                face,
            });
        }
    }

    triangles
}

/// Material assigned to a submesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialSlot {
    /// A material from the parsed document
    Parsed(MaterialId),
    /// Synthesized default for meshes without materials
    Default,
}

/// An assembled mesh and the material of each of its submeshes.
///
/// `materials[i]` belongs to the submesh whose `material_index` is `i`.
#[derive(Clone, Debug)]
pub struct AssembledMesh {
    pub mesh: Mesh,
    pub materials: Vec<MaterialSlot>,
}

/// Build a triangle mesh from a parsed mesh.
///
/// Returns `Ok(None)` for meshes with no vertices or no faces. Any vertex
/// index outside the position list is an error.
pub fn assemble(source: &XMesh) -> GeometryResult<Option<AssembledMesh>> {
    if source.is_degenerate() {
        return Ok(None);
    }

    let vertex_count = source.positions.len();
    let triangles = triangulate(&source.faces);

    for triangle in &triangles {
        if let Some(&index) = triangle.indices.iter().find(|&&i| i as usize >= vertex_count) {
            return Err(GeometryError::VertexIndexOutOfRange {
                mesh: source.name.clone(),
                face: triangle.face,
                index,
                vertex_count,
            });
        }
    }

    // Triangles per clamped material index; BTreeMap keeps ascending order
    let mut buckets: BTreeMap<usize, Vec<&Triangle>> = BTreeMap::new();
    for triangle in &triangles {
        buckets
            .entry(source.face_material(triangle.face))
            .or_default()
            .push(triangle);
    }

    let (indices, submeshes, materials) = if source.materials.is_empty() || buckets.len() <= 1 {
        single_material(source, &triangles, &buckets)
    } else {
        regroup(source, &buckets)
    };

    log::debug!(
        "Assembled mesh '{}': {} triangles, {} submeshes",
        source.name,
        indices.len() / 3,
        submeshes.len()
    );

    let mut mesh = Mesh::with_submeshes(source.positions.clone(), indices, submeshes);
    if let Some(uvs) = &source.uvs {
        mesh.set_uvs(uvs.clone());
    }
    mesh.compute_normals();

    Ok(Some(AssembledMesh { mesh, materials }))
}

type Grouped = (Vec<u32>, Vec<SubMesh>, Vec<MaterialSlot>);

/// One submesh over the triangles in their original order.
fn single_material(
    source: &XMesh,
    triangles: &[Triangle],
    buckets: &BTreeMap<usize, Vec<&Triangle>>,
) -> Grouped {
    let slot = match source.materials.as_slice() {
        [] => MaterialSlot::Default,
        materials => {
            let index = buckets.keys().next().copied().unwrap_or(0);
            MaterialSlot::Parsed(materials[index])
        }
    };

    let indices: Vec<u32> = triangles.iter().flat_map(|t| t.indices).collect();
    let submesh = SubMesh {
        material_index: 0,
        index_start: 0,
        index_count: indices.len(),
    };
    (indices, vec![submesh], vec![slot])
}

/// One contiguous block per material index, ascending.
fn regroup(source: &XMesh, buckets: &BTreeMap<usize, Vec<&Triangle>>) -> Grouped {
    let mut indices = Vec::new();
    let mut submeshes = Vec::with_capacity(buckets.len());
    let mut materials = Vec::with_capacity(buckets.len());

    for (&material, triangles) in buckets {
        let index_start = indices.len();
        indices.extend(triangles.iter().flat_map(|t| t.indices));

        submeshes.push(SubMesh {
            material_index: materials.len(),
            index_start,
            index_count: indices.len() - index_start,
        });
        materials.push(MaterialSlot::Parsed(source.materials[material]));
    }

    (indices, submeshes, materials)
}
