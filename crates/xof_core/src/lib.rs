//! XOF Core - DirectX `.X` scene import.
//!
//! This crate provides:
//!
//! - **`.X` support**: header check, tokenizer, parser, and geometry assembly
//! - **Scene types**: `Scene`, `SceneMesh`, `TransformNode`, `Material`, `Mesh`
//! - **Texture resolution**: candidate probing through `ResourceProbe`
//!
//! # Example
//!
//! ```ignore
//! use xof_core::x::load_x;
//!
//! let scene = load_x("tiny.x")?;
//! println!("Loaded {} meshes, {} triangles",
//!     scene.mesh_count(),
//!     scene.total_triangle_count());
//! ```

pub mod mesh;
pub mod scene;
pub mod texture;
pub mod x;

// Re-export commonly used types
pub use mesh::{GpuVertex, Mesh, SubMesh};
pub use scene::{Material, Scene, SceneMesh, SceneTexture, Transform, TransformNode};
pub use texture::{FsProbe, ResourceInfo, ResourceProbe, TextureResolver};
pub use x::{import_x, load_x, load_x_from_string, ImportOptions, LoadError, XFileLoader};
