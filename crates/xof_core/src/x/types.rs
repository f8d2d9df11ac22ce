//! `.X` parse tree types.
//!
//! These types represent the parsed document before assembly into the
//! renderer-facing scene graph. Materials live in a per-document arena
//! and are referred to by [`MaterialId`], so two materials with identical
//! fields declared in different places stay distinct.

use serde::{Deserialize, Serialize};
use xof_math::{Vec3, Vec4};

use super::header::XHeader;

/// Handle to a material in [`XDocument::materials`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// A parsed `Material` block.
#[derive(Clone, Debug, PartialEq)]
pub struct XMaterial {
    /// Material name (empty for anonymous inline materials)
    pub name: String,

    /// Diffuse color with alpha
    pub diffuse: Vec4,

    /// Specular exponent
    pub specular_power: f32,

    /// Specular color
    pub specular: Vec3,

    /// Emissive color
    pub emissive: Vec3,

    /// Texture reference as written in `TextureFilename`
    pub texture_reference: Option<String>,

    /// Locator filled in by the texture resolution pass
    pub texture_locator: Option<String>,
}

impl XMaterial {
    /// Specular power given to padding and fallback materials.
    pub const DEFAULT_SPECULAR_POWER: f32 = 16.0;

    /// Flat light-gray material used for padding and untextured meshes.
    pub fn fallback() -> Self {
        Self {
            name: String::new(),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular_power: Self::DEFAULT_SPECULAR_POWER,
            specular: Vec3::ZERO,
            emissive: Vec3::ZERO,
            texture_reference: None,
            texture_locator: None,
        }
    }

    pub fn has_texture(&self) -> bool {
        self.texture_reference.is_some()
    }
}

/// A parsed `Mesh` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XMesh {
    /// Mesh name (may be empty)
    pub name: String,

    /// Vertex positions
    pub positions: Vec<Vec3>,

    /// Polygons as vertex index lists. Indices are not range-checked here.
    pub faces: Vec<Vec<u32>>,

    /// Texture coordinates from `MeshTextureCoords`
    pub uvs: Option<Vec<[f32; 2]>>,

    /// Materials from `MeshMaterialList`, in declaration order
    pub materials: Vec<MaterialId>,

    /// Material index per face. May be shorter than `faces`; missing
    /// entries mean material 0.
    pub face_materials: Vec<usize>,
}

impl XMesh {
    /// Material slot for `face`, clamped into `[0, materials.len() - 1]`.
    pub fn face_material(&self, face: usize) -> usize {
        let index = self.face_materials.get(face).copied().unwrap_or(0);
        index.min(self.materials.len().saturating_sub(1))
    }

    /// True when there is nothing to build (no vertices or no faces).
    pub fn is_degenerate(&self) -> bool {
        self.positions.is_empty() || self.faces.is_empty()
    }
}

/// A parsed `Frame` block.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct XFrame {
    pub name: String,

    /// `FrameTransformMatrix` values, row-major
    pub transform: Option<[f32; 16]>,

    pub children: Vec<XFrame>,

    pub meshes: Vec<XMesh>,
}

impl XFrame {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Depth-first search for a frame by name (including `self`).
    pub fn find(&self, name: &str) -> Option<&XFrame> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(name))
    }

    /// Number of meshes in this frame and all descendants.
    pub fn mesh_count(&self) -> usize {
        self.meshes.len() + self.children.iter().map(XFrame::mesh_count).sum::<usize>()
    }

    /// Visit every mesh in depth-first order.
    pub fn for_each_mesh<'a>(&'a self, f: &mut impl FnMut(&'a XMesh)) {
        for mesh in &self.meshes {
            f(mesh);
        }
        for child in &self.children {
            child.for_each_mesh(f);
        }
    }
}

/// A non-fatal problem found while importing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// `{ name }` inside a material list named no known material
    UnresolvedMaterial { name: String },

    /// No texture candidate exists under the resource root
    TextureNotFound { material: String, reference: String },

    /// Mesh skipped because it has no vertices or no faces
    DegenerateMesh { mesh: String },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnresolvedMaterial { name } => {
                write!(f, "material reference '{}' does not name a known material", name)
            }
            Diagnostic::TextureNotFound { material, reference } => {
                write!(f, "texture '{}' for material '{}' was not found", reference, material)
            }
            Diagnostic::DegenerateMesh { mesh } => {
                write!(f, "mesh '{}' has no vertices or faces", mesh)
            }
        }
    }
}

/// A fully parsed `.X` document.
#[derive(Clone, Debug)]
pub struct XDocument {
    pub header: XHeader,

    /// Synthetic root holding top-level frames and meshes
    pub root: XFrame,

    /// Material arena indexed by [`MaterialId`]
    pub materials: Vec<XMaterial>,

    /// Problems found during parsing
    pub diagnostics: Vec<Diagnostic>,
}

impl XDocument {
    pub fn material(&self, id: MaterialId) -> &XMaterial {
        &self.materials[id.0]
    }

    pub fn material_mut(&mut self, id: MaterialId) -> &mut XMaterial {
        &mut self.materials[id.0]
    }

    /// Materials reachable from meshes, in first-use order, without repeats.
    pub fn used_materials(&self) -> Vec<MaterialId> {
        let mut seen = std::collections::HashSet::new();
        let mut used = Vec::new();
        self.root.for_each_mesh(&mut |mesh| {
            for &id in &mesh.materials {
                if seen.insert(id) {
                    used.push(id);
                }
            }
        });
        used
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_material_clamps() {
        let mesh = XMesh {
            faces: vec![vec![0, 1, 2]; 4],
            materials: vec![MaterialId(0), MaterialId(1)],
            face_materials: vec![0, 1, 7],
            ..Default::default()
        };

        assert_eq!(mesh.face_material(0), 0);
        assert_eq!(mesh.face_material(1), 1);
        // Out of range clamps to the last material
        assert_eq!(mesh.face_material(2), 1);
        // Missing entries default to material 0
        assert_eq!(mesh.face_material(3), 0);
    }

    #[test]
    fn test_face_material_without_materials() {
        let mesh = XMesh {
            face_materials: vec![3],
            ..Default::default()
        };
        assert_eq!(mesh.face_material(0), 0);
    }

    #[test]
    fn test_frame_find_and_count() {
        let mut root = XFrame::new("");
        let mut body = XFrame::new("Body");
        body.meshes.push(XMesh::default());
        let mut arm = XFrame::new("Arm");
        arm.meshes.push(XMesh::default());
        body.children.push(arm);
        root.children.push(body);
        root.meshes.push(XMesh::default());

        assert_eq!(root.mesh_count(), 3);
        assert!(root.find("Arm").is_some());
        assert!(root.find("Leg").is_none());
    }

    #[test]
    fn test_diagnostic_serializes_with_kind_tag() {
        let diagnostic = Diagnostic::UnresolvedMaterial {
            name: "skin".to_string(),
        };
        let json = serde_json::to_string(&diagnostic).unwrap();
        assert_eq!(json, r#"{"kind":"unresolved_material","name":"skin"}"#);
    }
}
