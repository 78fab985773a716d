//! Objects, collections and materials.

use glam::{Mat4, Vec3};

use super::{CollectionKey, ObjectKey};
use crate::geom::GeometrySet;

/// Shading material. Realization only tracks identity, not contents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Material {
    pub name: String,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Scene object with evaluated geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub name: String,
    /// Object space to world space.
    pub object_to_world: Mat4,
    /// Evaluated geometry in object space.
    pub geometry: GeometrySet,
}

impl Object {
    pub fn new(name: impl Into<String>, geometry: GeometrySet) -> Self {
        Self {
            name: name.into(),
            object_to_world: Mat4::IDENTITY,
            geometry,
        }
    }

    pub fn with_transform(mut self, object_to_world: Mat4) -> Self {
        self.object_to_world = object_to_world;
        self
    }
}

/// Named group of objects and child collections.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    pub name: String,
    /// Subtracted from member positions when the collection is instanced.
    pub instance_offset: Vec3,
    pub objects: Vec<ObjectKey>,
    pub children: Vec<CollectionKey>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_offset(mut self, instance_offset: Vec3) -> Self {
        self.instance_offset = instance_offset;
        self
    }

    pub fn with_objects(mut self, objects: impl IntoIterator<Item = ObjectKey>) -> Self {
        self.objects.extend(objects);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = CollectionKey>) -> Self {
        self.children.extend(children);
        self
    }
}
