//! Geometry containers.
//!
//! - [`Mesh`] - Polygon meshes with offset-encoded faces
//! - [`PointCloud`] - Unconnected points
//! - [`Curves`] - Curves with offset-encoded control points
//! - [`Volume`] / [`EditData`] - Opaque pass-through payloads
//! - [`Instances`] - Transformed references to other geometry
//! - [`GeometrySet`] - At most one component of each kind

use glam::Vec3;

pub mod curves;
pub mod geometry_set;
pub mod instances;
pub mod mesh;
pub mod point_cloud;
pub mod volume;

// Re-export container types
pub use curves::{Curves, CurvesParams};
pub use geometry_set::{ComponentKind, GeometrySet};
pub use instances::{InstanceReference, Instances};
pub use mesh::{Mesh, MeshParams};
pub use point_cloud::PointCloud;
pub use volume::{EditData, Volume};

/// Builtin name of the per-element normal override on meshes and curves.
pub const CUSTOM_NORMAL: &str = "custom_normal";

/// Axis-aligned bounds of a point set, None when empty.
pub(crate) fn bounds(points: &[Vec3]) -> Option<(Vec3, Vec3)> {
    let first = *points.first()?;
    Some(
        points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p))),
    )
}
