//! Opaque payloads that are passed through realization but never merged.

use glam::Vec3;

/// Volume grid data. Realization keeps the first volume it meets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Volume {
    pub name: String,
    /// Edge length of one voxel.
    pub voxel_size: f32,
    /// Names of the grids stored in the volume.
    pub grids: Vec<String>,
}

/// Edit hints attached to a geometry by deformation tools.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EditData {
    /// Positions before deformation, if recorded.
    pub original_positions: Option<Vec<Vec3>>,
    /// Name of the tool that produced the hints.
    pub source: String,
}
