//! Named attribute layers and the accessor contract shared by all geometry kinds.

use std::borrow::Cow;

use super::adapt::DomainMapping;
use super::convert::convert_array;
use super::{AttrDomain, AttrType, AttributeArray, AttributeType};
use crate::util::{Error, Result};

/// One named attribute layer.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeLayer {
    pub name: String,
    pub domain: AttrDomain,
    pub data: AttributeArray,
}

impl AttributeLayer {
    #[inline]
    pub fn data_type(&self) -> AttrType {
        self.data.attr_type()
    }
}

/// Ordered collection of attribute layers with unique names.
///
/// The storage does not know domain sizes; geometry types validate lengths
/// through [`AttributeAccessor::add_attribute`] before inserting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributeStorage {
    layers: Vec<AttributeLayer>,
}

impl AttributeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Iterate layers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &AttributeLayer> {
        self.layers.iter()
    }

    /// Iterate layer names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&AttributeLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut AttributeLayer> {
        self.layers.iter_mut().find(|l| l.name == name)
    }

    /// Insert a layer, replacing any layer with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, domain: AttrDomain, data: AttributeArray) {
        let name = name.into();
        match self.get_mut(&name) {
            Some(layer) => {
                layer.domain = domain;
                layer.data = data;
            }
            None => self.layers.push(AttributeLayer { name, domain, data }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeLayer> {
        let index = self.layers.iter().position(|l| l.name == name)?;
        Some(self.layers.remove(index))
    }

    /// Typed slice of a layer stored exactly on `domain` with element type `T`.
    pub fn typed<T: AttributeType>(&self, name: &str, domain: AttrDomain) -> Option<&[T]> {
        self.get(name)
            .filter(|l| l.domain == domain)
            .and_then(|l| l.data.typed::<T>())
    }

    /// Resize every layer on `domain` to `len`, padding with defaults.
    pub fn resize_domain(&mut self, domain: AttrDomain, len: usize) {
        for layer in self.layers.iter_mut().filter(|l| l.domain == domain) {
            layer.data.resize(len);
        }
    }
}

/// Read/write access to the attributes of one geometry.
///
/// Implementors report the size of every domain they support and how values
/// move between domains. Reads go through [`lookup`](Self::lookup) which
/// performs domain adaptation and type conversion on demand.
pub trait AttributeAccessor {
    fn attributes(&self) -> &AttributeStorage;

    fn attributes_mut(&mut self) -> &mut AttributeStorage;

    /// Number of elements in `domain`, or None if the geometry has no such domain.
    fn domain_size(&self, domain: AttrDomain) -> Option<usize>;

    /// Mapping that moves values from `from` to `to`, or None if unsupported.
    fn domain_mapping(&self, from: AttrDomain, to: AttrDomain) -> Option<DomainMapping>;

    /// Read attribute `name` as `data_type` values on `domain`.
    ///
    /// Returns None when the attribute does not exist or cannot be moved to
    /// `domain`.
    fn lookup(&self, name: &str, domain: AttrDomain, data_type: AttrType) -> Option<AttributeArray> {
        let layer = self.attributes().get(name)?;
        if layer.domain == domain {
            return Some(convert_array(&layer.data, data_type));
        }
        let adapted = self.domain_mapping(layer.domain, domain)?.apply(&layer.data);
        if adapted.attr_type() == data_type {
            Some(adapted)
        } else {
            Some(convert_array(&adapted, data_type))
        }
    }

    /// Like [`lookup`](Self::lookup) but falls back to default values.
    fn lookup_or_default(&self, name: &str, domain: AttrDomain, data_type: AttrType) -> AttributeArray {
        self.lookup(name, domain, data_type).unwrap_or_else(|| {
            AttributeArray::new_default(data_type, self.domain_size(domain).unwrap_or(0))
        })
    }

    /// Typed read that borrows when the layer already matches `domain` and `T`.
    fn lookup_typed<T: AttributeType>(&self, name: &str, domain: AttrDomain) -> Option<Cow<'_, [T]>> {
        if let Some(data) = self.attributes().typed::<T>(name, domain) {
            return Some(Cow::Borrowed(data));
        }
        self.lookup(name, domain, T::TYPE)?.into_typed::<T>().map(Cow::Owned)
    }

    /// Add or replace a layer after checking its length against the domain.
    fn add_attribute(&mut self, name: impl Into<String>, domain: AttrDomain, data: AttributeArray) -> Result<()> {
        let name = name.into();
        let expected = self
            .domain_size(domain)
            .ok_or_else(|| Error::other(format!("Attribute '{name}': unsupported domain {domain}")))?;
        if data.len() != expected {
            return Err(Error::AttributeSize {
                name,
                expected,
                actual: data.len(),
            });
        }
        self.attributes_mut().insert(name, domain, data);
        Ok(())
    }
}

/// Write-only output buffer for one attribute.
///
/// The buffer is allocated at its final size; writers fill it (usually
/// through [`AttributeArray::split_mut`]) and [`finish`](Self::finish) commits
/// it to the destination storage.
#[derive(Debug)]
pub struct AttributeWriter {
    name: String,
    domain: AttrDomain,
    pub data: AttributeArray,
}

impl AttributeWriter {
    pub fn new(name: impl Into<String>, domain: AttrDomain, data_type: AttrType, len: usize) -> Self {
        Self {
            name: name.into(),
            domain,
            data: AttributeArray::new_default(data_type, len),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> AttrDomain {
        self.domain
    }

    /// Commit the written values into `target`.
    pub fn finish<A: AttributeAccessor>(self, target: &mut A) -> Result<()> {
        target.add_attribute(self.name, self.domain, self.data)
    }
}
