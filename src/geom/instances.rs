//! Instances: transformed references to other geometry.

use glam::Mat4;

use super::GeometrySet;
use crate::attribute::{AttrDomain, AttributeAccessor, AttributeStorage, DomainMapping};
use crate::scene::{CollectionKey, ObjectKey};
use crate::util::{Error, Result};

/// Builtin name of the stable instance id attribute.
pub const INSTANCE_ID: &str = "id";

/// What an instance places into the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum InstanceReference {
    /// Placeholder that realizes to nothing.
    #[default]
    None,
    /// An object's evaluated geometry.
    Object(ObjectKey),
    /// All objects of a collection and its children.
    Collection(CollectionKey),
    /// An embedded geometry set.
    GeometrySet(GeometrySet),
}

/// Instances component.
///
/// Instance `i` places `references[handles[i]]` with `transforms[i]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Instances {
    references: Vec<InstanceReference>,
    handles: Vec<u32>,
    transforms: Vec<Mat4>,
    attributes: AttributeStorage,
}

impl Instances {
    /// Create empty instances.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference and return its handle. Equal references share a handle.
    pub fn add_reference(&mut self, reference: InstanceReference) -> u32 {
        if let Some(pos) = self.references.iter().position(|r| *r == reference) {
            return pos as u32;
        }
        self.references.push(reference);
        self.references.len() as u32 - 1
    }

    /// Append an instance of reference `handle`.
    ///
    /// Existing instance attributes grow with default values.
    pub fn add_instance(&mut self, handle: u32, transform: Mat4) -> Result<usize> {
        if handle as usize >= self.references.len() {
            return Err(Error::InvalidHandle {
                handle: handle as usize,
                count: self.references.len(),
            });
        }
        self.handles.push(handle);
        self.transforms.push(transform);
        let count = self.handles.len();
        self.attributes.resize_domain(AttrDomain::Instance, count);
        Ok(count - 1)
    }

    /// Get number of instances.
    #[inline]
    pub fn num_instances(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn references(&self) -> &[InstanceReference] {
        &self.references
    }

    pub fn handles(&self) -> &[u32] {
        &self.handles
    }

    pub fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    /// Resolve the reference of instance `i`.
    pub fn reference_of(&self, i: usize) -> Result<&InstanceReference> {
        let handle = self.handles[i] as usize;
        self.references.get(handle).ok_or(Error::InvalidHandle {
            handle,
            count: self.references.len(),
        })
    }

    /// New instances holding only the instances at `indices`, in that order.
    ///
    /// All references are kept so handles stay valid. Instance attributes
    /// follow their instances.
    pub fn subset(&self, indices: &[usize]) -> Self {
        let mut attributes = AttributeStorage::new();
        for layer in self.attributes.iter() {
            attributes.insert(layer.name.clone(), layer.domain, layer.data.gather(indices));
        }
        Self {
            references: self.references.clone(),
            handles: indices.iter().map(|&i| self.handles[i]).collect(),
            transforms: indices.iter().map(|&i| self.transforms[i]).collect(),
            attributes,
        }
    }

    /// Stored stable ids, if the instances carry an integer id layer.
    pub fn stored_ids(&self) -> Option<&[i32]> {
        self.attributes.typed::<i32>(INSTANCE_ID, AttrDomain::Instance)
    }
}

impl AttributeAccessor for Instances {
    fn attributes(&self) -> &AttributeStorage {
        &self.attributes
    }

    fn attributes_mut(&mut self) -> &mut AttributeStorage {
        &mut self.attributes
    }

    fn domain_size(&self, domain: AttrDomain) -> Option<usize> {
        (domain == AttrDomain::Instance).then_some(self.num_instances())
    }

    fn domain_mapping(&self, _from: AttrDomain, _to: AttrDomain) -> Option<DomainMapping> {
        None
    }
}
