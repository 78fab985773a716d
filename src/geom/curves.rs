//! Curves with offset-encoded control points.

use glam::Vec3;

use crate::attribute::{AttrDomain, AttributeAccessor, AttributeStorage, DomainMapping};
use crate::scene::MaterialKey;
use crate::util::{Error, Result};

/// Builtin point radius attribute.
pub const RADIUS: &str = "radius";
/// Builtin left Bezier handle attribute.
pub const HANDLE_LEFT: &str = "handle_left";
/// Builtin right Bezier handle attribute.
pub const HANDLE_RIGHT: &str = "handle_right";
/// Builtin NURBS weight attribute.
pub const NURBS_WEIGHT: &str = "nurbs_weight";
/// Builtin per-curve evaluation resolution attribute.
pub const RESOLUTION: &str = "resolution";

/// Radius and NURBS weight of points that had none.
pub const DEFAULT_CURVE_RADIUS: f32 = 1.0;
pub const DEFAULT_NURBS_WEIGHT: f32 = 1.0;
/// Resolution of curves that had none.
pub const DEFAULT_RESOLUTION: i32 = 12;
/// Custom normal of points that had none. Never transformed.
pub const DEFAULT_CURVE_NORMAL: Vec3 = Vec3::Z;

/// Non-attribute settings carried over from source curves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurvesParams {
    /// Material slots.
    pub materials: Vec<Option<MaterialKey>>,
    /// UV map on the surface mesh that curves are attached to.
    pub surface_uv_map: Option<String>,
}

/// Set of curves.
///
/// Curve `c` spans points `offsets[c]..offsets[c + 1]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Curves {
    /// Control point positions.
    pub positions: Vec<Vec3>,
    /// Curve start offsets into the point arrays, one more than the curve count.
    pub offsets: Vec<u32>,
    /// Generic and builtin (radius, handles, weights, resolution) attributes.
    pub attributes: AttributeStorage,
    /// Non-attribute settings.
    pub params: CurvesParams,
}

impl Curves {
    /// Create empty curves.
    pub fn new() -> Self {
        Self {
            offsets: vec![0],
            ..Default::default()
        }
    }

    /// Create curves from positions and per-curve point counts.
    pub fn from_sizes(positions: Vec<Vec3>, sizes: &[u32]) -> Result<Self> {
        let mut offsets = Vec::with_capacity(sizes.len() + 1);
        offsets.push(0_u32);
        let mut total = 0_u32;
        for &size in sizes {
            total = total
                .checked_add(size)
                .ok_or_else(|| Error::topology("Curve point count overflow"))?;
            offsets.push(total);
        }
        if total as usize != positions.len() {
            return Err(Error::topology(format!(
                "Curve sizes add up to {total}, got {} positions",
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            offsets,
            ..Default::default()
        })
    }

    /// Get number of control points.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.positions.len()
    }

    /// Get number of curves.
    #[inline]
    pub fn num_curves(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() && self.num_curves() == 0
    }

    /// Point range of curve `c`.
    #[inline]
    pub fn points_range(&self, c: usize) -> std::ops::Range<usize> {
        self.offsets[c] as usize..self.offsets[c + 1] as usize
    }

    /// Axis-aligned bounds of all control points.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        super::bounds(&self.positions)
    }

    fn curve_points(&self) -> impl Iterator<Item = (u32, u32)> + Clone + '_ {
        (0..self.num_curves()).flat_map(move |c| self.points_range(c).map(move |p| (c as u32, p as u32)))
    }
}

impl AttributeAccessor for Curves {
    fn attributes(&self) -> &AttributeStorage {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeStorage {
        &mut self.attributes
    }

    fn domain_size(&self, domain: AttrDomain) -> Option<usize> {
        match domain {
            AttrDomain::Point => Some(self.num_points()),
            AttrDomain::Curve => Some(self.num_curves()),
            _ => None,
        }
    }

    fn domain_mapping(&self, from: AttrDomain, to: AttrDomain) -> Option<DomainMapping> {
        match (from, to) {
            (AttrDomain::Point, AttrDomain::Curve) => {
                Some(DomainMapping::from_pairs(self.num_curves(), self.curve_points()))
            }
            (AttrDomain::Curve, AttrDomain::Point) => Some(DomainMapping::from_pairs(
                self.num_points(),
                self.curve_points().map(|(c, p)| (p, c)),
            )),
            _ => None,
        }
    }
}
