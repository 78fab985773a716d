//! Math type re-exports and transform helpers.
//!
//! This module re-exports types from `glam` and adds the few point/matrix
//! helpers that realization needs on top of them.

pub use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use rayon::prelude::*;

/// Tolerance used to decide whether a transform can be skipped.
pub const IDENTITY_EPSILON: f32 = 1e-6;

/// Element count below which point loops stay on the calling thread.
pub const PARALLEL_GRAIN: usize = 1024;

/// True if `m` equals the identity matrix within [`IDENTITY_EPSILON`].
#[inline]
pub fn is_identity(m: &Mat4) -> bool {
    m.abs_diff_eq(Mat4::IDENTITY, IDENTITY_EPSILON)
}

/// Transform `src` points by `transform` into `dst`.
///
/// `src` and `dst` must have the same length. Large inputs are split across
/// the rayon pool.
pub fn transform_points(src: &[Vec3], transform: &Mat4, dst: &mut [Vec3]) {
    debug_assert_eq!(src.len(), dst.len());
    if is_identity(transform) {
        dst.copy_from_slice(src);
        return;
    }
    dst.par_iter_mut()
        .with_min_len(PARALLEL_GRAIN)
        .zip(src.par_iter())
        .for_each(|(d, s)| *d = transform.transform_point3(*s));
}

/// Matrix that carries normals through `transform`.
///
/// Inverse transpose of the linear part. Singular transforms fall back to the
/// linear part itself.
pub fn normal_matrix(transform: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*transform);
    if linear.determinant().abs() <= f32::EPSILON {
        linear
    } else {
        linear.inverse().transpose()
    }
}

/// Transform `src` normals by `transform` into `dst`, renormalizing.
///
/// Translation is ignored. Zero-length results stay zero.
pub fn transform_normals(src: &[Vec3], transform: &Mat4, dst: &mut [Vec3]) {
    debug_assert_eq!(src.len(), dst.len());
    if is_identity(transform) {
        dst.copy_from_slice(src);
        return;
    }
    let matrix = normal_matrix(transform);
    dst.par_iter_mut()
        .with_min_len(PARALLEL_GRAIN)
        .zip(src.par_iter())
        .for_each(|(d, s)| *d = (matrix * *s).normalize_or_zero());
}
