// Re-export glam for convenience
pub use glam::*;

// XOF math types
mod aabb;
mod interval;
mod transform;

pub use aabb::Aabb;
pub use interval::Interval;
pub use transform::{mat4_from_row_major, Mat4Ext};
