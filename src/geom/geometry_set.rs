//! Bundle of at most one component of each geometry kind.

use std::sync::Arc;

use super::{EditData, Instances};
use crate::scene::{CurvesKey, MeshKey, PointCloudKey, VolumeKey};

/// Geometry component kinds, in the order realization visits them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Mesh,
    PointCloud,
    Instances,
    Volume,
    Curves,
    EditData,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 6] = [
        Self::Mesh,
        Self::PointCloud,
        Self::Instances,
        Self::Volume,
        Self::Curves,
        Self::EditData,
    ];
}

/// Geometry set.
///
/// Heavy geometry lives in a [`GeometryStore`](crate::scene::GeometryStore)
/// and is referenced by key, so cloning a set is cheap and several sets may
/// share one mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GeometrySet {
    pub mesh: Option<MeshKey>,
    pub point_cloud: Option<PointCloudKey>,
    pub instances: Option<Arc<Instances>>,
    pub volume: Option<VolumeKey>,
    pub curves: Option<CurvesKey>,
    pub edit_data: Option<Arc<EditData>>,
}

impl GeometrySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_mesh(key: MeshKey) -> Self {
        Self {
            mesh: Some(key),
            ..Default::default()
        }
    }

    pub fn from_point_cloud(key: PointCloudKey) -> Self {
        Self {
            point_cloud: Some(key),
            ..Default::default()
        }
    }

    pub fn from_curves(key: CurvesKey) -> Self {
        Self {
            curves: Some(key),
            ..Default::default()
        }
    }

    pub fn from_instances(instances: Instances) -> Self {
        Self {
            instances: Some(Arc::new(instances)),
            ..Default::default()
        }
    }

    pub fn with_mesh(mut self, key: MeshKey) -> Self {
        self.mesh = Some(key);
        self
    }

    pub fn with_point_cloud(mut self, key: PointCloudKey) -> Self {
        self.point_cloud = Some(key);
        self
    }

    pub fn with_curves(mut self, key: CurvesKey) -> Self {
        self.curves = Some(key);
        self
    }

    pub fn with_volume(mut self, key: VolumeKey) -> Self {
        self.volume = Some(key);
        self
    }

    pub fn with_edit_data(mut self, edit_data: EditData) -> Self {
        self.edit_data = Some(Arc::new(edit_data));
        self
    }

    /// True if the set holds an instances component.
    pub fn has_instances(&self) -> bool {
        self.instances.is_some()
    }

    /// True if the set holds the given component kind.
    pub fn has(&self, kind: ComponentKind) -> bool {
        match kind {
            ComponentKind::Mesh => self.mesh.is_some(),
            ComponentKind::PointCloud => self.point_cloud.is_some(),
            ComponentKind::Instances => self.instances.is_some(),
            ComponentKind::Volume => self.volume.is_some(),
            ComponentKind::Curves => self.curves.is_some(),
            ComponentKind::EditData => self.edit_data.is_some(),
        }
    }

    /// Present component kinds in realization order.
    pub fn component_kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        ComponentKind::ALL.into_iter().filter(|k| self.has(*k))
    }

    pub fn is_empty(&self) -> bool {
        self.component_kinds().next().is_none()
    }
}
