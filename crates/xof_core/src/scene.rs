//! Built scene types handed to the host renderer.
//!
//! The scene is flat: transform nodes, meshes, materials, and textures are
//! separate lists, with parent links expressed as node indices. Meshes and
//! materials are shared through `Arc` so one material instance can back
//! many submeshes.

use std::sync::Arc;

use xof_math::{mat4_from_row_major, Aabb, Mat4, Mat4Ext, Quat, Vec3};

use crate::mesh::Mesh;
use crate::x::XMaterial;

/// A Phong-style material as described by `.X` files.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name (empty for anonymous materials)
    pub name: String,

    /// Diffuse color (RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Opacity from the diffuse alpha (0=transparent, 1=opaque)
    pub opacity: f32,

    /// Specular exponent
    pub specular_power: f32,

    /// Specular color
    pub specular_color: Vec3,

    /// Emissive color (RGB, for light-emitting surfaces)
    pub emissive_color: Vec3,

    /// Resolved locator of the diffuse texture
    pub diffuse_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self::from_x(&XMaterial::fallback())
    }
}

impl Material {
    /// Create a material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_color: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse_color,
            ..Default::default()
        }
    }

    /// Convert a parsed material. Only a resolved locator becomes a texture.
    pub fn from_x(material: &XMaterial) -> Self {
        Self {
            name: material.name.clone(),
            diffuse_color: material.diffuse.truncate(),
            opacity: material.diffuse.w,
            specular_power: material.specular_power,
            specular_color: material.specular,
            emissive_color: material.emissive,
            diffuse_texture: material.texture_locator.clone(),
        }
    }

    pub fn has_textures(&self) -> bool {
        self.diffuse_texture.is_some()
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive_color.length_squared() > 0.0
    }

    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

/// Transform components that can be composed into a matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,

    /// Rotation (as quaternion)
    pub rotation: Quat,

    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform with only translation.
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Decompose a 4x4 matrix into translation, rotation, and scale.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Decompose a `FrameTransformMatrix` (16 floats, row-major).
    pub fn from_row_major(values: &[f32; 16]) -> Self {
        Self::from_matrix(mat4_from_row_major(values))
    }

    /// Order: Scale -> Rotate -> Translate (SRT)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// A node of the frame hierarchy.
#[derive(Clone, Debug)]
pub struct TransformNode {
    /// Index in [`Scene::nodes`]
    pub id: usize,

    pub name: String,

    /// Parent node; `None` for top-level frames
    pub parent: Option<usize>,

    /// Local transform relative to the parent
    pub transform: Transform,
}

/// A built mesh placed in the hierarchy.
#[derive(Clone, Debug)]
pub struct SceneMesh {
    /// Index in [`Scene::meshes`]
    pub id: usize,

    pub name: String,

    /// Enclosing frame's node; `None` for top-level meshes
    pub parent: Option<usize>,

    /// Shared geometry
    pub mesh: Arc<Mesh>,

    /// One material per submesh `material_index`
    pub materials: Vec<Arc<Material>>,
}

impl SceneMesh {
    /// Material drawn for the submesh at `submesh` in `mesh.submeshes`.
    pub fn submesh_material(&self, submesh: usize) -> Option<&Arc<Material>> {
        let index = self.mesh.submeshes.get(submesh)?.material_index;
        self.materials.get(index)
    }
}

/// A texture referenced by at least one material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SceneTexture {
    /// Reference as written in the file
    pub reference: String,

    /// Resolved locator
    pub locator: String,
}

/// A complete imported scene.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    /// Scene name (usually from filename)
    pub name: String,

    pub nodes: Vec<TransformNode>,

    pub meshes: Vec<Arc<SceneMesh>>,

    /// Materials instantiated for meshes, without duplicates
    pub materials: Vec<Arc<Material>>,

    /// Textures used by `materials`, one per distinct locator
    pub textures: Vec<Arc<SceneTexture>>,
}

impl Scene {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a transform node and return its ID.
    pub fn add_node(&mut self, name: impl Into<String>, parent: Option<usize>, transform: Transform) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TransformNode {
            id,
            name: name.into(),
            parent,
            transform,
        });
        id
    }

    /// Add a mesh and return its ID.
    pub fn add_mesh(
        &mut self,
        name: impl Into<String>,
        parent: Option<usize>,
        mesh: Arc<Mesh>,
        materials: Vec<Arc<Material>>,
    ) -> usize {
        let id = self.meshes.len();
        self.meshes.push(Arc::new(SceneMesh {
            id,
            name: name.into(),
            parent,
            mesh,
            materials,
        }));
        id
    }

    pub fn add_material(&mut self, material: Arc<Material>) -> usize {
        let id = self.materials.len();
        self.materials.push(material);
        id
    }

    /// Add a texture unless one with the same locator exists.
    pub fn add_texture(&mut self, reference: impl Into<String>, locator: impl Into<String>) -> Arc<SceneTexture> {
        let locator = locator.into();
        if let Some(existing) = self.textures.iter().find(|t| t.locator == locator) {
            return existing.clone();
        }
        let texture = Arc::new(SceneTexture {
            reference: reference.into(),
            locator,
        });
        self.textures.push(texture.clone());
        texture
    }

    /// First node with the given name.
    pub fn find_node(&self, name: &str) -> Option<&TransformNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// First mesh with the given name.
    pub fn find_mesh(&self, name: &str) -> Option<&Arc<SceneMesh>> {
        self.meshes.iter().find(|mesh| mesh.name == name)
    }

    /// Direct children of a node.
    pub fn children_of(&self, node: usize) -> impl Iterator<Item = &TransformNode> {
        self.nodes.iter().filter(move |n| n.parent == Some(node))
    }

    /// Node-to-world matrix, composing local transforms up to the root.
    pub fn world_matrix(&self, node: usize) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = self.nodes.get(node);
        while let Some(n) = current {
            matrix = n.transform.to_matrix() * matrix;
            current = n.parent.and_then(|p| self.nodes.get(p));
        }
        matrix
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn total_triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.mesh.triangle_count()).sum()
    }

    pub fn total_vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.mesh.vertex_count()).sum()
    }

    /// World-space bounding box of every mesh.
    pub fn world_bounds(&self) -> Aabb {
        self.meshes.iter().fold(Aabb::empty(), |acc, scene_mesh| {
            let matrix = scene_mesh
                .parent
                .map_or(Mat4::IDENTITY, |node| self.world_matrix(node));
            Aabb::surrounding(&acc, &matrix.transform_aabb(&scene_mesh.mesh.bounds))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xof_math::Vec4;

    fn triangle() -> Arc<Mesh> {
        Arc::new(Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]))
    }

    #[test]
    fn test_scene_creation() {
        let mut scene = Scene::new("test");

        let root = scene.add_node("Root", None, Transform::default());
        let child = scene.add_node("Child", Some(root), Transform::from_translation(Vec3::X));
        scene.add_mesh("tri", Some(child), triangle(), vec![Arc::new(Material::default())]);
        scene.add_mesh("loose", None, triangle(), vec![]);

        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.mesh_count(), 2);
        assert_eq!(scene.total_triangle_count(), 2);
        assert_eq!(scene.total_vertex_count(), 6);
        assert_eq!(scene.children_of(root).count(), 1);
        assert_eq!(scene.find_mesh("tri").unwrap().parent, Some(child));
        assert!(scene.find_node("Missing").is_none());
    }

    #[test]
    fn test_transform_matrix_roundtrip() {
        let transform = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 2.0, 2.0),
        };

        let matrix = transform.to_matrix();
        let recovered = Transform::from_matrix(matrix);

        assert!((recovered.translation - transform.translation).length() < 0.001);
        assert!((recovered.scale - transform.scale).length() < 0.001);
    }

    #[test]
    fn test_transform_from_row_major() {
        #[rustfmt::skip]
        let values = [
            2.0, 0.0, 0.0, 0.0,
            0.0, 2.0, 0.0, 0.0,
            0.0, 0.0, 2.0, 0.0,
            4.0, 5.0, 6.0, 1.0,
        ];
        let transform = Transform::from_row_major(&values);
        assert!((transform.translation - Vec3::new(4.0, 5.0, 6.0)).length() < 0.001);
        assert!((transform.scale - Vec3::splat(2.0)).length() < 0.001);
    }

    #[test]
    fn test_world_matrix_and_bounds() {
        let mut scene = Scene::new("bounds");
        let root = scene.add_node("Root", None, Transform::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        let child = scene.add_node("Child", Some(root), Transform::from_translation(Vec3::new(0.0, 5.0, 0.0)));
        scene.add_mesh("tri", Some(child), triangle(), vec![]);

        let origin = scene.world_matrix(child).transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(10.0, 5.0, 0.0)).length() < 0.001);

        let bounds = scene.world_bounds();
        assert!((bounds.min() - Vec3::new(10.0, 5.0, 0.0)).length() < 0.001);
        assert!((bounds.max() - Vec3::new(11.0, 6.0, 0.0)).length() < 0.001);
    }

    #[test]
    fn test_empty_scene_bounds() {
        assert!(Scene::new("empty").world_bounds().is_empty());
    }

    #[test]
    fn test_material_from_x() {
        let parsed = XMaterial {
            name: "Glass".to_string(),
            diffuse: Vec4::new(0.2, 0.4, 0.6, 0.5),
            specular_power: 50.0,
            specular: Vec3::ONE,
            emissive: Vec3::ZERO,
            texture_reference: Some("glass.png".to_string()),
            texture_locator: None,
        };

        let material = Material::from_x(&parsed);
        assert_eq!(material.diffuse_color, Vec3::new(0.2, 0.4, 0.6));
        assert!(material.is_transparent());
        assert!(!material.is_emissive());
        // Unresolved references leave the material untextured
        assert!(!material.has_textures());
    }

    #[test]
    fn test_textures_deduplicated_by_locator() {
        let mut scene = Scene::new("tex");
        let a = scene.add_texture("a.bmp", "root/a.png");
        let b = scene.add_texture("a.png", "root/a.png");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(scene.textures.len(), 1);
    }

    #[test]
    fn test_submesh_material() {
        let mut scene = Scene::new("sub");
        let red = Arc::new(Material::new("red", Vec3::X));
        scene.add_mesh("tri", None, triangle(), vec![red.clone()]);

        let mesh = &scene.meshes[0];
        assert!(Arc::ptr_eq(mesh.submesh_material(0).unwrap(), &red));
        assert!(mesh.submesh_material(1).is_none());
    }
}
