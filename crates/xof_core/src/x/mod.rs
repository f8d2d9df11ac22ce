//! DirectX `.X` support.
//!
//! This module parses text `.X` files and converts them to the crate's
//! scene representation.
//!
//! ## Supported
//!
//! - `Frame` hierarchies with `FrameTransformMatrix`
//! - `Mesh` with polygon faces, `MeshTextureCoords`, `MeshMaterialList`
//! - `Material` with `TextureFilename`, inline or referenced by name
//!
//! ## Not Supported
//!
//! - Binary and compressed files (`bin `, `tzip`, `bzip`), rejected with
//!   [`FormatError::UnsupportedFormat`]
//! - Skinning, animation sets, and user templates (skipped)
//! - Parsed `MeshNormals` (normals are always recomputed)
//!
//! # Example
//!
//! ```ignore
//! use xof_core::x::load_x;
//!
//! let scene = load_x("path/to/tiny.x")?;
//! println!("Loaded {} meshes, {} materials",
//!     scene.mesh_count(),
//!     scene.material_count());
//! ```

mod geometry;
mod header;
mod lexer;
mod loader;
mod parser;
mod plugin;
mod types;

pub use geometry::*;
pub use header::*;
pub use lexer::*;
pub use loader::*;
pub use parser::*;
pub use plugin::*;
pub use types::*;
