//! Scene loader plugin contract.
//!
//! A host runtime keeps a registry of loaders and picks one by extension or
//! by sniffing the content. [`XFileLoader`] is the `.X` implementation.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::header::has_x_header;
use super::loader::{import_x, ImportOptions, LoadResult};
use super::types::Diagnostic;
use crate::mesh::Mesh;
use crate::scene::{Material, SceneMesh, SceneTexture, TransformNode};
use crate::texture::ResourceProbe;

/// Output categories a scene loader can populate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SceneCategory {
    Meshes,
    TransformNodes,
    Materials,
    Textures,
    ParticleSystems,
    Skeletons,
    AnimationGroups,
    Lights,
    SpriteManagers,
    Geometries,
}

impl SceneCategory {
    pub const ALL: [SceneCategory; 10] = [
        SceneCategory::Meshes,
        SceneCategory::TransformNodes,
        SceneCategory::Materials,
        SceneCategory::Textures,
        SceneCategory::ParticleSystems,
        SceneCategory::Skeletons,
        SceneCategory::AnimationGroups,
        SceneCategory::Lights,
        SceneCategory::SpriteManagers,
        SceneCategory::Geometries,
    ];
}

/// Categorized output of an import.
#[derive(Clone, Debug, Default)]
pub struct ImportResult {
    pub meshes: Vec<Arc<SceneMesh>>,
    pub transform_nodes: Vec<TransformNode>,
    pub materials: Vec<Arc<Material>>,
    pub textures: Vec<Arc<SceneTexture>>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportResult {
    /// Number of items in a category. Categories `.X` never produces are
    /// always empty.
    pub fn category_len(&self, category: SceneCategory) -> usize {
        match category {
            SceneCategory::Meshes => self.meshes.len(),
            SceneCategory::TransformNodes => self.transform_nodes.len(),
            SceneCategory::Materials => self.materials.len(),
            SceneCategory::Textures => self.textures.len(),
            SceneCategory::ParticleSystems
            | SceneCategory::Skeletons
            | SceneCategory::AnimationGroups
            | SceneCategory::Lights
            | SceneCategory::SpriteManagers
            | SceneCategory::Geometries => 0,
        }
    }

    /// Geometry of every mesh, for hosts that want it separately.
    pub fn geometries(&self) -> impl Iterator<Item = &Arc<Mesh>> {
        self.meshes.iter().map(|m| &m.mesh)
    }
}

/// A scene format the host can load.
pub trait SceneLoaderPlugin: Send + Sync {
    /// Format name shown to users.
    fn name(&self) -> &str;

    /// File extensions handled, lowercase with the leading dot.
    fn extensions(&self) -> &[&str];

    /// True if `content` looks like this format.
    fn can_direct_load(&self, content: &str) -> bool;

    /// Import `content`, resolving resources under `root`.
    fn import<'a>(&'a self, content: &'a str, root: &'a str) -> BoxFuture<'a, LoadResult<ImportResult>>;

    /// True if `path` ends with one of [`Self::extensions`], ignoring case.
    fn handles_extension(&self, path: &str) -> bool {
        let path = path.to_ascii_lowercase();
        self.extensions().iter().any(|ext| path.ends_with(ext))
    }
}

/// `.X` loader plugin.
pub struct XFileLoader {
    options: ImportOptions,
    probe: Option<Arc<dyn ResourceProbe>>,
}

impl XFileLoader {
    const EXTENSIONS: &'static [&'static str] = &[".x"];

    /// Loader without a probe (best-effort texture resolution).
    pub fn new() -> Self {
        Self {
            options: ImportOptions::default(),
            probe: None,
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ResourceProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }
}

impl Default for XFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneLoaderPlugin for XFileLoader {
    fn name(&self) -> &str {
        "DirectX"
    }

    fn extensions(&self) -> &[&str] {
        Self::EXTENSIONS
    }

    fn can_direct_load(&self, content: &str) -> bool {
        has_x_header(content)
    }

    fn import<'a>(&'a self, content: &'a str, root: &'a str) -> BoxFuture<'a, LoadResult<ImportResult>> {
        async move {
            let probe = self.probe.as_deref();
            let imported = import_x(content, "", root, &self.options, probe).await?;
            let scene = imported.scene;

            Ok(ImportResult {
                meshes: scene.meshes,
                transform_nodes: scene.nodes,
                materials: scene.materials,
                textures: scene.textures,
                diagnostics: imported.diagnostics,
            })
        }
        .boxed()
    }
}
