//! # geo-realize
//!
//! Realization of nested geometry instances.
//!
//! A [`GeometrySet`](geom::GeometrySet) may place other geometry through
//! instances, which can in turn reference objects, collections or further
//! nested sets. Realizing flattens that tree into one mesh, one point cloud and
//! one curves geometry with all elements transformed into place, attributes
//! unified across sources and stable per-point ids.
//!
//! ## Modules
//!
//! - [`util`] - Errors, math re-exports, slice helpers
//! - [`attribute`] - Typed attribute layers with domain adaptation
//! - [`geom`] - Geometry containers (Mesh, PointCloud, Curves, Instances)
//! - [`scene`] - Arena store for geometry, objects and collections
//! - [`realize`] - The realization pass itself
//!
//! ## Example
//!
//! ```ignore
//! use geo_realize::prelude::*;
//!
//! let mut store = GeometryStore::new();
//! let mesh = store.add_mesh(Mesh::from_polygons(positions, &[&[0, 1, 2]])?);
//!
//! let mut instances = Instances::new();
//! let handle = instances.add_reference(InstanceReference::GeometrySet(GeometrySet::from_mesh(mesh)));
//! instances.add_instance(handle, Mat4::IDENTITY)?;
//! instances.add_instance(handle, Mat4::from_translation(Vec3::X))?;
//!
//! let result = realize_instances(&mut store, GeometrySet::from_instances(instances), &RealizeOptions::default())?;
//! ```

pub mod attribute;
pub mod geom;
pub mod realize;
pub mod scene;
pub mod util;

// Re-export commonly used types
pub use realize::{realize_instances, realize_instances_with_depth, RealizeOptions, RealizeResult, VariedDepthOptions};
pub use util::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::attribute::{AttrDomain, AttrType, AttrValue, AttributeAccessor, AttributeArray, AttributeFilter};
    pub use crate::geom::*;
    pub use crate::realize::{realize_instances, realize_instances_with_depth, RealizeOptions, RealizeResult, VariedDepthOptions};
    pub use crate::scene::{Collection, GeometryStore, Material, Object};
    pub use crate::util::{Error, Mat4, Result, Vec2, Vec3, Vec4};
}
