//! Unconnected points.

use glam::Vec3;

use crate::attribute::{AttrDomain, AttributeAccessor, AttributeStorage, DomainMapping};
use crate::scene::MaterialKey;

/// Builtin name of the per-point radius attribute.
pub const RADIUS: &str = "radius";

/// Radius of points realized from clouds without a radius attribute.
pub const DEFAULT_POINT_RADIUS: f32 = 0.01;

/// Point cloud.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloud {
    /// Point positions.
    pub positions: Vec<Vec3>,
    /// Generic attributes, all on the point domain.
    pub attributes: AttributeStorage,
    /// Material slots.
    pub materials: Vec<Option<MaterialKey>>,
}

impl PointCloud {
    /// Create empty point cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a point cloud from positions.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// Get number of points.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Stored radii, if the cloud has a float radius layer.
    pub fn radii(&self) -> Option<&[f32]> {
        self.attributes.typed::<f32>(RADIUS, AttrDomain::Point)
    }

    /// Axis-aligned bounds of all points.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        super::bounds(&self.positions)
    }
}

impl AttributeAccessor for PointCloud {
    fn attributes(&self) -> &AttributeStorage {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeStorage {
        &mut self.attributes
    }

    fn domain_size(&self, domain: AttrDomain) -> Option<usize> {
        (domain == AttrDomain::Point).then_some(self.num_points())
    }

    fn domain_mapping(&self, _from: AttrDomain, _to: AttrDomain) -> Option<DomainMapping> {
        None
    }
}
