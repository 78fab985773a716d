//! Scene storage.
//!
//! Geometries, materials, objects and collections live in slot-map arenas
//! inside a [`GeometryStore`] and are referenced by typed keys. Geometry sets
//! and instance references only hold keys, so sharing one mesh between many
//! instances costs nothing.
//!
//! ## Key Concepts
//!
//! - **Object**: geometry set plus an object-to-world transform
//! - **Collection**: objects and child collections with an instance offset
//!
//! ## Example
//!
//! ```ignore
//! use geo_realize::prelude::*;
//!
//! let mut store = GeometryStore::new();
//! let mesh = store.add_mesh(Mesh::from_polygons(positions, &[&[0, 1, 2]])?);
//! let object = store.add_object(Object::new("tri", GeometrySet::from_mesh(mesh)));
//! let collection = store.add_collection(Collection::new("set").with_objects([object]));
//! ```

mod object;

pub use object::{Collection, Material, Object};

use indexmap::IndexSet;
use slotmap::SlotMap;

use crate::geom::{Curves, Mesh, PointCloud, Volume};
use crate::util::{Error, Result};

slotmap::new_key_type! {
    /// Key of a [`Mesh`] in a [`GeometryStore`].
    pub struct MeshKey;
    /// Key of a [`PointCloud`] in a [`GeometryStore`].
    pub struct PointCloudKey;
    /// Key of a [`Curves`] in a [`GeometryStore`].
    pub struct CurvesKey;
    /// Key of a [`Volume`] in a [`GeometryStore`].
    pub struct VolumeKey;
    /// Key of a [`Material`] in a [`GeometryStore`].
    pub struct MaterialKey;
    /// Key of an [`Object`] in a [`GeometryStore`].
    pub struct ObjectKey;
    /// Key of a [`Collection`] in a [`GeometryStore`].
    pub struct CollectionKey;
}

/// Arena owning all geometry and scene data.
#[derive(Debug, Default)]
pub struct GeometryStore {
    meshes: SlotMap<MeshKey, Mesh>,
    point_clouds: SlotMap<PointCloudKey, PointCloud>,
    curves: SlotMap<CurvesKey, Curves>,
    volumes: SlotMap<VolumeKey, Volume>,
    materials: SlotMap<MaterialKey, Material>,
    objects: SlotMap<ObjectKey, Object>,
    collections: SlotMap<CollectionKey, Collection>,
}

macro_rules! store_accessors {
    ($field:ident, $ty:ty, $key:ty, $add:ident, $get:ident, $get_mut:ident, $require:ident, $what:literal) => {
        pub fn $add(&mut self, value: $ty) -> $key {
            self.$field.insert(value)
        }

        pub fn $get(&self, key: $key) -> Option<&$ty> {
            self.$field.get(key)
        }

        pub fn $get_mut(&mut self, key: $key) -> Option<&mut $ty> {
            self.$field.get_mut(key)
        }

        /// Like the plain getter but reports a missing key as an error.
        pub fn $require(&self, key: $key) -> Result<&$ty> {
            self.$field
                .get(key)
                .ok_or_else(|| Error::MissingGeometry(format!("{} {:?}", $what, key)))
        }
    };
}

impl GeometryStore {
    pub fn new() -> Self {
        Self::default()
    }

    store_accessors!(meshes, Mesh, MeshKey, add_mesh, mesh, mesh_mut, require_mesh, "mesh");
    store_accessors!(
        point_clouds,
        PointCloud,
        PointCloudKey,
        add_point_cloud,
        point_cloud,
        point_cloud_mut,
        require_point_cloud,
        "point cloud"
    );
    store_accessors!(curves, Curves, CurvesKey, add_curves, curves, curves_mut, require_curves, "curves");
    store_accessors!(volumes, Volume, VolumeKey, add_volume, volume, volume_mut, require_volume, "volume");
    store_accessors!(
        materials,
        Material,
        MaterialKey,
        add_material,
        material,
        material_mut,
        require_material,
        "material"
    );
    store_accessors!(objects, Object, ObjectKey, add_object, object, object_mut, require_object, "object");
    store_accessors!(
        collections,
        Collection,
        CollectionKey,
        add_collection,
        collection,
        collection_mut,
        require_collection,
        "collection"
    );

    /// Objects of `key` and all of its child collections.
    ///
    /// A collection lists its own objects before those of its children. Each
    /// object appears once even if several child collections contain it.
    pub fn collection_objects_recursive(&self, key: CollectionKey) -> Result<Vec<ObjectKey>> {
        let mut objects = IndexSet::new();
        let mut open = Vec::new();
        self.collect_objects(key, &mut objects, &mut open)?;
        Ok(objects.into_iter().collect())
    }

    fn collect_objects(
        &self,
        key: CollectionKey,
        objects: &mut IndexSet<ObjectKey>,
        open: &mut Vec<CollectionKey>,
    ) -> Result<()> {
        let collection = self.require_collection(key)?;
        if open.contains(&key) {
            return Err(Error::CyclicInstancing(format!("collection '{}'", collection.name)));
        }
        open.push(key);
        objects.extend(collection.objects.iter().copied());
        for &child in &collection.children {
            self.collect_objects(child, objects, open)?;
        }
        open.pop();
        Ok(())
    }
}
