//! High-level `.X` scene loading.
//!
//! Runs the whole pipeline: header check, parse, texture resolution, and
//! scene building. Parsing and assembly are synchronous; only texture
//! probing suspends, and materials are resolved one after another.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{assemble, GeometryError, MaterialSlot};
use super::header::{FormatError, XHeader};
use super::parser::{parse_x_with_options, ParseError, ParseOptions};
use super::types::{Diagnostic, MaterialId, XDocument, XFrame, XMesh};
use crate::scene::{Material, Scene, Transform};
use crate::texture::{FsProbe, ResourceProbe, TextureResolution, TextureResolver, DEFAULT_FALLBACK_EXTENSIONS};

/// Errors that can occur during `.X` loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    #[error("Parse error: {0}")]
    Parse(ParseError),

    #[error("Geometry error: {0}")]
    Geometry(#[from] GeometryError),
}

impl From<ParseError> for LoadError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Format(format) => LoadError::Format(format),
            other => LoadError::Parse(other),
        }
    }
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Import settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Extensions tried after a texture reference's own extension
    pub fallback_extensions: Vec<String>,

    /// Fail on `{ name }` references to unknown materials
    pub strict_material_references: bool,

    /// Probe texture candidates when a probe is available. When off, the
    /// first candidate is used as-is.
    pub probe_textures: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            fallback_extensions: DEFAULT_FALLBACK_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            strict_material_references: false,
            probe_textures: true,
        }
    }
}

impl ImportOptions {
    pub fn with_fallback_extensions(mut self, extensions: Vec<String>) -> Self {
        self.fallback_extensions = extensions;
        self
    }

    pub fn with_strict_material_references(mut self, strict: bool) -> Self {
        self.strict_material_references = strict;
        self
    }

    pub fn with_probe_textures(mut self, probe: bool) -> Self {
        self.probe_textures = probe;
        self
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            strict_material_references: self.strict_material_references,
        }
    }
}

/// A loaded scene with everything that went wrong along the way.
#[derive(Clone, Debug)]
pub struct ImportedScene {
    pub header: XHeader,
    pub scene: Scene,
    /// Non-fatal problems, in the order they were found
    pub diagnostics: Vec<Diagnostic>,
}

/// Load an `.X` file and return the built scene.
///
/// Textures are looked up next to the file on the local file system.
///
/// # Example
///
/// ```ignore
/// use xof_core::x::load_x;
///
/// let scene = load_x("tiny.x")?;
/// println!("Loaded {} meshes", scene.mesh_count());
/// ```
pub fn load_x<P: AsRef<Path>>(path: P) -> LoadResult<Scene> {
    Ok(load_x_with_options(path, &ImportOptions::default())?.scene)
}

/// Load an `.X` file with explicit options, keeping the diagnostics.
pub fn load_x_with_options<P: AsRef<Path>>(path: P, options: &ImportOptions) -> LoadResult<ImportedScene> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let root = path
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unnamed");

    pollster::block_on(import_x(&content, name, &root, options, Some(&FsProbe)))
}

/// Load `.X` content from a string (useful for testing).
///
/// No probing happens: texture references resolve to their first candidate
/// under `root`.
pub fn load_x_from_string(content: &str, name: &str, root: &str) -> LoadResult<Scene> {
    let imported = pollster::block_on(import_x(content, name, root, &ImportOptions::default(), None))?;
    Ok(imported.scene)
}

/// Parse `content` and build a scene.
///
/// `root` is the locator texture references are resolved against. Without
/// a `probe`, texture resolution runs in best-effort mode.
pub async fn import_x(
    content: &str,
    name: &str,
    root: &str,
    options: &ImportOptions,
    probe: Option<&dyn ResourceProbe>,
) -> LoadResult<ImportedScene> {
    let mut doc = parse_x_with_options(content, options.parse_options())?;
    let mut diagnostics = std::mem::take(&mut doc.diagnostics);

    let mut resolver =
        TextureResolver::new(root).with_fallback_extensions(options.fallback_extensions.clone());
    if let Some(probe) = probe.filter(|_| options.probe_textures) {
        resolver = resolver.with_probe(probe);
    }
    resolve_textures(&mut doc, &resolver, &mut diagnostics).await;

    let mut builder = SceneBuilder::new(name, &doc);
    builder.process_root(&doc.root)?;
    let scene = builder.finish(&mut diagnostics);

    log::info!(
        "Loaded '{}': {} nodes, {} meshes, {} materials, {} textures, {} diagnostics",
        name,
        scene.node_count(),
        scene.mesh_count(),
        scene.material_count(),
        scene.textures.len(),
        diagnostics.len()
    );

    Ok(ImportedScene {
        header: doc.header,
        scene,
        diagnostics,
    })
}

/// Resolve textures of every material a mesh uses, sequentially.
async fn resolve_textures(doc: &mut XDocument, resolver: &TextureResolver<'_>, diagnostics: &mut Vec<Diagnostic>) {
    for id in doc.used_materials() {
        let material = doc.material_mut(id);
        if let TextureResolution::NotFound = resolver.resolve_material(material).await {
            let reference = material.texture_reference.clone().unwrap_or_default();
            log::warn!(
                "Texture '{}' for material '{}' not found under '{}'",
                reference,
                material.name,
                resolver.root()
            );
            diagnostics.push(Diagnostic::TextureNotFound {
                material: material.name.clone(),
                reference,
            });
        }
    }
}

/// Internal builder for constructing a Scene from a parsed document.
struct SceneBuilder<'d> {
    doc: &'d XDocument,
    scene: Scene,
    /// Instantiated materials keyed by parse-time identity
    material_cache: HashMap<MaterialId, Arc<Material>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'d> SceneBuilder<'d> {
    fn new(name: &str, doc: &'d XDocument) -> Self {
        Self {
            doc,
            scene: Scene::new(name),
            material_cache: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// The synthetic root has no node of its own.
    fn process_root(&mut self, root: &XFrame) -> LoadResult<()> {
        for mesh in &root.meshes {
            self.process_mesh(mesh, None)?;
        }
        for child in &root.children {
            self.process_frame(child, None)?;
        }
        Ok(())
    }

    fn process_frame(&mut self, frame: &XFrame, parent: Option<usize>) -> LoadResult<()> {
        let transform = frame
            .transform
            .as_ref()
            .map(Transform::from_row_major)
            .unwrap_or_default();
        let node = self.scene.add_node(frame.name.clone(), parent, transform);
        log::debug!("Frame '{}' -> node {}", frame.name, node);

        for mesh in &frame.meshes {
            self.process_mesh(mesh, Some(node))?;
        }
        for child in &frame.children {
            self.process_frame(child, Some(node))?;
        }
        Ok(())
    }

    fn process_mesh(&mut self, source: &XMesh, parent: Option<usize>) -> LoadResult<()> {
        let Some(assembled) = assemble(source)? else {
            log::warn!("Skipping mesh '{}' with no vertices or faces", source.name);
            self.diagnostics.push(Diagnostic::DegenerateMesh {
                mesh: source.name.clone(),
            });
            return Ok(());
        };

        let materials = assembled
            .materials
            .iter()
            .map(|&slot| self.instantiate(slot))
            .collect();

        self.scene
            .add_mesh(source.name.clone(), parent, Arc::new(assembled.mesh), materials);
        Ok(())
    }

    /// Built material for a slot. Parsed materials are created once per
    /// identity; each default slot gets its own instance.
    fn instantiate(&mut self, slot: MaterialSlot) -> Arc<Material> {
        let id = match slot {
            MaterialSlot::Default => {
                let material = Arc::new(Material::default());
                self.scene.add_material(material.clone());
                return material;
            }
            MaterialSlot::Parsed(id) => id,
        };

        if let Some(material) = self.material_cache.get(&id) {
            return material.clone();
        }

        let parsed = self.doc.material(id);
        let material = Arc::new(Material::from_x(parsed));
        if let (Some(reference), Some(locator)) = (&parsed.texture_reference, &parsed.texture_locator) {
            self.scene.add_texture(reference.clone(), locator.clone());
        }

        self.scene.add_material(material.clone());
        self.material_cache.insert(id, material.clone());
        material
    }

    fn finish(self, diagnostics: &mut Vec<Diagnostic>) -> Scene {
        diagnostics.extend(self.diagnostics);
        self.scene
    }
}
