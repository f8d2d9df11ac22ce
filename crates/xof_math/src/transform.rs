// Transform utilities for Mat4
//
// DirectX stores matrices row-major for row vectors (`v * M`), so the
// translation lives in elements 12..15. Reading the same 16 floats
// column-major gives the equivalent column-vector matrix glam expects.

use glam::{Mat4, Vec3};
use crate::Aabb;

/// Build a glam matrix from 16 floats in DirectX row-major order.
pub fn mat4_from_row_major(values: &[f32; 16]) -> Mat4 {
    Mat4::from_cols_array(values)
}

/// Extension trait for Mat4 to provide additional transform utilities
pub trait Mat4Ext {
    /// The 16 floats of this matrix in DirectX row-major order.
    fn to_row_major(&self) -> [f32; 16];

    /// Transform an axis-aligned bounding box.
    /// Computes the bounding box of all 8 transformed corners.
    fn transform_aabb(&self, aabb: &Aabb) -> Aabb;
}

impl Mat4Ext for Mat4 {
    fn to_row_major(&self) -> [f32; 16] {
        self.to_cols_array()
    }

    fn transform_aabb(&self, aabb: &Aabb) -> Aabb {
        if aabb.is_empty() {
            return Aabb::empty();
        }
        aabb.corners()
            .iter()
            .fold(Aabb::empty(), |acc, &corner| acc.include(self.transform_point3(corner)))
    }
}
