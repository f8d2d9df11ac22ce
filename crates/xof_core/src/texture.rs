//! Texture reference resolution for materials.
//!
//! `.X` files name textures loosely: Windows separators, wrong extensions
//! (a `.bmp` reference converted to `.png` on disk), or paths relative to
//! the model file. The [`TextureResolver`] turns such a reference into a
//! locator under a resource root by probing a list of candidates through an
//! injected [`ResourceProbe`].

use std::path::Path;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::x::XMaterial;

/// Raster extensions tried after a reference's own extension.
pub const DEFAULT_FALLBACK_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "bmp", "tga", "dds", "gif", "webp"];

/// Metadata returned by a successful probe. Only presence matters for
/// resolution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Size in bytes
    pub size: u64,
}

/// Existence check for a resolved locator.
pub trait ResourceProbe: Send + Sync {
    /// `Some` if a resource exists at `locator`.
    fn probe<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Option<ResourceInfo>>;
}

/// Probe backed by the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsProbe;

impl ResourceProbe for FsProbe {
    fn probe<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Option<ResourceInfo>> {
        async move {
            let metadata = std::fs::metadata(Path::new(locator)).ok()?;
            metadata.is_file().then(|| ResourceInfo {
                size: metadata.len(),
            })
        }
        .boxed()
    }
}

/// Outcome of resolving one material's texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureResolution {
    /// The material has no texture reference
    NoTexture,
    /// Locator written to the material
    Resolved(String),
    /// No candidate exists; the material stays untextured
    NotFound,
}

/// Maps raw texture references to locators under a resource root.
pub struct TextureResolver<'p> {
    /// Root that relative references are resolved against
    root: String,

    /// Existence check; `None` means best-effort mode
    probe: Option<&'p dyn ResourceProbe>,

    /// Extensions tried after the reference's own extension
    fallback_extensions: Vec<String>,
}

impl<'p> TextureResolver<'p> {
    /// Create a best-effort resolver (no probing).
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            probe: None,
            fallback_extensions: DEFAULT_FALLBACK_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    /// Probe candidates with `probe` instead of trusting the first one.
    pub fn with_probe(mut self, probe: &'p dyn ResourceProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_fallback_extensions(mut self, extensions: Vec<String>) -> Self {
        self.fallback_extensions = extensions;
        self
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn is_probing(&self) -> bool {
        self.probe.is_some()
    }

    /// Resolve `material.texture_reference` into `material.texture_locator`.
    ///
    /// When nothing is found the locator is cleared, leaving the material
    /// untextured.
    pub async fn resolve_material(&self, material: &mut XMaterial) -> TextureResolution {
        let Some(reference) = material.texture_reference.as_deref() else {
            return TextureResolution::NoTexture;
        };

        match self.resolve(reference).await {
            Some(locator) => {
                material.texture_locator = Some(locator.clone());
                TextureResolution::Resolved(locator)
            }
            None => {
                material.texture_locator = None;
                TextureResolution::NotFound
            }
        }
    }

    /// Resolve a raw reference. Candidates are probed in order and the first
    /// hit wins.
    pub async fn resolve(&self, reference: &str) -> Option<String> {
        if is_data_uri(reference) || has_scheme(reference) {
            return Some(reference.to_string());
        }

        let normalized = normalize_separators(reference);
        let candidates = candidate_paths(&normalized, &self.fallback_extensions);

        let Some(probe) = self.probe else {
            return candidates.first().map(|c| join_locator(&self.root, c));
        };

        for candidate in &candidates {
            let locator = join_locator(&self.root, candidate);
            log::debug!("Probing texture candidate: {}", locator);
            if probe.probe(&locator).await.is_some() {
                return Some(locator);
            }
        }

        None
    }
}

fn is_data_uri(reference: &str) -> bool {
    reference
        .get(..5)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// `scheme://...` where scheme is `ALPHA *(ALPHA / DIGIT / "+" / "-" / ".")`.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn normalize_separators(reference: &str) -> String {
    reference.replace('\\', "/")
}

/// Split `dir/name.ext` into (`dir/name`, `ext`). No extension if the last
/// dot is in a directory component or starts the file name.
fn split_extension(path: &str) -> Option<(&str, &str)> {
    let file_start = path.rfind('/').map_or(0, |i| i + 1);
    let dot = path[file_start..].rfind('.')? + file_start;
    if dot == file_start || dot + 1 == path.len() {
        return None;
    }
    Some((&path[..dot], &path[dot + 1..]))
}

/// The reference itself, then its stem with the original extension and each
/// fallback extension, without duplicates.
pub fn candidate_paths(reference: &str, fallback_extensions: &[String]) -> Vec<String> {
    let mut candidates = vec![reference.to_string()];

    if let Some((stem, extension)) = split_extension(reference) {
        let extensions = std::iter::once(extension).chain(fallback_extensions.iter().map(String::as_str));
        for ext in extensions {
            let candidate = format!("{}.{}", stem, ext);
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

/// Resolve `path` against `root`. Absolute paths ignore the root.
fn join_locator(root: &str, path: &str) -> String {
    if root.is_empty() || is_absolute(path) {
        return path.to_string();
    }
    format!("{}/{}", root.trim_end_matches(&['/', '\\'][..]), path)
}

fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    let drive = bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'/';
    path.starts_with('/') || drive
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Probe that knows a fixed set of locators and records every query.
    #[derive(Default)]
    struct MockProbe {
        existing: HashSet<String>,
        queries: Mutex<Vec<String>>,
    }

    impl MockProbe {
        fn with_files(files: &[&str]) -> Self {
            Self {
                existing: files.iter().map(|f| f.to_string()).collect(),
                queries: Mutex::new(Vec::new()),
            }
        }

        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    impl ResourceProbe for MockProbe {
        fn probe<'a>(&'a self, locator: &'a str) -> BoxFuture<'a, Option<ResourceInfo>> {
            async move {
                self.queries.lock().unwrap().push(locator.to_string());
                self.existing
                    .contains(locator)
                    .then_some(ResourceInfo { size: 1 })
            }
            .boxed()
        }
    }

    fn textured(reference: &str) -> XMaterial {
        XMaterial {
            name: "mat".to_string(),
            texture_reference: Some(reference.to_string()),
            ..XMaterial::fallback()
        }
    }

    #[test]
    fn test_best_effort_returns_first_candidate() {
        let resolver = TextureResolver::new("models/robot");
        let locator = pollster::block_on(resolver.resolve("tex.tga"));
        assert_eq!(locator.as_deref(), Some("models/robot/tex.tga"));
    }

    #[test]
    fn test_best_effort_without_root() {
        let resolver = TextureResolver::new("");
        let locator = pollster::block_on(resolver.resolve("tex.tga"));
        assert_eq!(locator.as_deref(), Some("tex.tga"));
    }

    #[test]
    fn test_backslashes_normalized() {
        let resolver = TextureResolver::new("root/");
        let locator = pollster::block_on(resolver.resolve("textures\\body.bmp"));
        assert_eq!(locator.as_deref(), Some("root/textures/body.bmp"));
    }

    #[test]
    fn test_data_uri_and_scheme_pass_through() {
        let probe = MockProbe::default();
        let resolver = TextureResolver::new("root").with_probe(&probe);

        let data = "data:image/png;base64,AAAA";
        assert_eq!(pollster::block_on(resolver.resolve(data)).as_deref(), Some(data));

        let url = "https://cdn.example.com/a\\b.png";
        assert_eq!(pollster::block_on(resolver.resolve(url)).as_deref(), Some(url));

        assert!(probe.queries().is_empty());
    }

    #[test]
    fn test_candidate_order() {
        let fallback: Vec<String> = ["png", "bmp"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            candidate_paths("dir/face.bmp", &fallback),
            vec!["dir/face.bmp", "dir/face.png"]
        );
        assert_eq!(
            candidate_paths("face.JPG", &fallback),
            vec!["face.JPG", "face.png", "face.bmp"]
        );
        assert_eq!(candidate_paths("dir.v2/face", &fallback), vec!["dir.v2/face"]);
        assert_eq!(candidate_paths(".hidden", &fallback), vec![".hidden"]);
    }

    #[test]
    fn test_probe_stops_at_first_hit() {
        let probe = MockProbe::with_files(&["root/skin.jpg", "root/skin.bmp"]);
        let resolver = TextureResolver::new("root").with_probe(&probe);

        let locator = pollster::block_on(resolver.resolve("skin.tga"));
        assert_eq!(locator.as_deref(), Some("root/skin.jpg"));
        assert_eq!(
            probe.queries(),
            vec!["root/skin.tga", "root/skin.png", "root/skin.jpg"]
        );
    }

    #[test]
    fn test_resolve_material_sets_locator() {
        let probe = MockProbe::with_files(&["root/skin.png"]);
        let resolver = TextureResolver::new("root").with_probe(&probe);

        let mut material = textured("skin.png");
        let result = pollster::block_on(resolver.resolve_material(&mut material));

        assert_eq!(result, TextureResolution::Resolved("root/skin.png".to_string()));
        assert_eq!(material.texture_locator.as_deref(), Some("root/skin.png"));
    }

    #[test]
    fn test_resolve_material_not_found() {
        let probe = MockProbe::default();
        let resolver = TextureResolver::new("root").with_probe(&probe);

        let mut material = textured("gone.png");
        let result = pollster::block_on(resolver.resolve_material(&mut material));

        assert_eq!(result, TextureResolution::NotFound);
        assert!(material.texture_locator.is_none());
        // Reference kept for diagnostics
        assert_eq!(material.texture_reference.as_deref(), Some("gone.png"));
        // "png" is both the own and the first fallback extension
        assert_eq!(probe.queries().len(), DEFAULT_FALLBACK_EXTENSIONS.len());
    }

    #[test]
    fn test_resolve_material_without_reference() {
        let resolver = TextureResolver::new("root");
        let mut material = XMaterial::fallback();
        let result = pollster::block_on(resolver.resolve_material(&mut material));
        assert_eq!(result, TextureResolution::NoTexture);
    }

    #[test]
    fn test_absolute_reference_ignores_root() {
        let resolver = TextureResolver::new("root");
        assert_eq!(
            pollster::block_on(resolver.resolve("C:\\art\\a.png")).as_deref(),
            Some("C:/art/a.png")
        );
        assert_eq!(
            pollster::block_on(resolver.resolve("/srv/a.png")).as_deref(),
            Some("/srv/a.png")
        );
    }

    #[test]
    fn test_fs_probe() {
        let dir = std::env::temp_dir().join(format!("xof_fs_probe_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("tex.png");
        std::fs::write(&file, [0u8; 8]).unwrap();

        let found = pollster::block_on(FsProbe.probe(file.to_str().unwrap()));
        assert_eq!(found, Some(ResourceInfo { size: 8 }));

        // Directories are not textures
        assert!(pollster::block_on(FsProbe.probe(dir.to_str().unwrap())).is_none());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
