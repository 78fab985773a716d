//! Attribute schema of the realized output.
//!
//! For each geometry kind the schema is the union of the attributes found on
//! every reachable source of that kind (plus instance attributes, which land
//! on points). Builtins are pulled out of the generic list and turned into
//! `create_*` flags.
//!
//! Instances kept at their depth limit get a schema of their own, built from
//! the kept components themselves.

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::scan::ReachedInstances;
use super::RealizeOptions;
use crate::attribute::{AttrDomain, AttrType, AttrValue, AttributeAccessor, AttributeStorage};
use crate::geom::{curves, instances::INSTANCE_ID, mesh::MATERIAL_INDEX, point_cloud, CUSTOM_NORMAL};

/// Name of the position builtin, never propagated as a generic attribute.
pub(crate) const POSITION: &str = "position";

const MESH_DOMAINS: [AttrDomain; 4] = [AttrDomain::Point, AttrDomain::Edge, AttrDomain::Face, AttrDomain::Corner];

/// One fallback value per schema entry. `None` means "type default".
pub(crate) type AttributeFallbacks = SmallVec<[Option<AttrValue>; 8]>;

/// Declared domain and type of a schema entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeKind {
    pub domain: AttrDomain,
    pub data_type: AttrType,
}

/// Attribute names with their declared kind, in first-seen order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrderedAttributes {
    map: IndexMap<String, AttributeKind>,
}

impl OrderedAttributes {
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.map.get_index_of(name)
    }

    pub fn kind_of(&self, name: &str) -> Option<AttributeKind> {
        self.map.get(name).copied()
    }

    pub fn get(&self, index: usize) -> Option<(&str, AttributeKind)> {
        self.map.get_index(index).map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, AttributeKind)> {
        self.map.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Add `name`, or widen the existing entry to cover `kind`.
    pub(crate) fn merge(&mut self, name: &str, kind: AttributeKind) {
        match self.map.get_mut(name) {
            Some(existing) => {
                existing.domain = existing.domain.highest_priority(kind.domain);
                existing.data_type = existing.data_type.most_complex(kind.data_type);
            }
            None => {
                self.map.insert(name.to_string(), kind);
            }
        }
    }

    /// Remove a builtin, reporting whether it was present.
    pub(crate) fn take(&mut self, name: &str) -> bool {
        self.take_kind(name).is_some()
    }

    /// Remove a builtin, returning its merged kind.
    pub(crate) fn take_kind(&mut self, name: &str) -> Option<AttributeKind> {
        self.map.shift_remove(name)
    }

    /// Fallback table with every entry set to "type default".
    pub(crate) fn empty_fallbacks(&self) -> AttributeFallbacks {
        SmallVec::from_elem(None, self.len())
    }
}

/// Schema for realized point clouds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointCloudSchema {
    pub attributes: OrderedAttributes,
    pub create_id: bool,
    pub create_radius: bool,
}

/// Schema for realized meshes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshSchema {
    pub attributes: OrderedAttributes,
    pub create_id: bool,
    pub create_material_index: bool,
    /// Domain of the realized custom normals, if any source has them
    pub custom_normal_domain: Option<AttrDomain>,
}

/// Schema for realized curves.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CurvesSchema {
    pub attributes: OrderedAttributes,
    pub create_id: bool,
    pub create_radius: bool,
    pub create_handles: bool,
    pub create_nurbs_weight: bool,
    pub create_resolution: bool,
    pub create_custom_normal: bool,
}

/// Schema for the instances kept in the output.
///
/// Entries all live on the instance domain. Ids are never generic entries.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InstancesSchema {
    pub attributes: OrderedAttributes,
    pub create_id: bool,
}

/// Union of the attributes of `sources` and, if enabled, of `instances`.
///
/// Domains the destination kind does not have (always including the
/// instance domain) are declared on points.
fn gather_attributes<'a>(
    sources: impl Iterator<Item = &'a AttributeStorage>,
    instances: &[ReachedInstances],
    options: &RealizeOptions,
    supported: &[AttrDomain],
) -> OrderedAttributes {
    let declared = |domain: AttrDomain| {
        if supported.contains(&domain) {
            domain
        } else {
            AttrDomain::Point
        }
    };
    let mut attributes = OrderedAttributes::default();
    let filter = &options.attribute_filter;
    for storage in sources {
        for layer in storage.iter() {
            if filter.allow_skip(&layer.name) {
                continue;
            }
            attributes.merge(
                &layer.name,
                AttributeKind {
                    domain: declared(layer.domain),
                    data_type: layer.data_type(),
                },
            );
        }
    }
    if options.realize_instance_attributes {
        for reached in instances {
            for layer in reached.instances.attributes().iter() {
                if filter.allow_skip(&layer.name) {
                    continue;
                }
                if reached.ids_stripped && layer.name == INSTANCE_ID {
                    continue;
                }
                attributes.merge(
                    &layer.name,
                    AttributeKind {
                        domain: declared(layer.domain),
                        data_type: layer.data_type(),
                    },
                );
            }
        }
    }
    attributes
}

pub(crate) fn point_cloud_schema<'a>(
    sources: impl Iterator<Item = &'a AttributeStorage>,
    instances: &[ReachedInstances],
    options: &RealizeOptions,
) -> PointCloudSchema {
    let mut attributes = gather_attributes(sources, instances, options, &[AttrDomain::Point]);
    attributes.take(POSITION);
    let create_id = attributes.take(INSTANCE_ID);
    let create_radius = attributes.take(point_cloud::RADIUS);
    PointCloudSchema {
        attributes,
        create_id,
        create_radius,
    }
}

pub(crate) fn mesh_schema<'a>(
    sources: impl Iterator<Item = &'a AttributeStorage>,
    instances: &[ReachedInstances],
    options: &RealizeOptions,
) -> MeshSchema {
    let mut attributes = gather_attributes(sources, instances, options, &MESH_DOMAINS);
    attributes.take(POSITION);
    let create_id = attributes.take(INSTANCE_ID);
    let create_material_index = attributes.take(MATERIAL_INDEX);
    let custom_normal_domain = attributes.take_kind(CUSTOM_NORMAL).map(|kind| kind.domain);
    MeshSchema {
        attributes,
        create_id,
        create_material_index,
        custom_normal_domain,
    }
}

pub(crate) fn curves_schema<'a>(
    sources: impl Iterator<Item = &'a AttributeStorage>,
    instances: &[ReachedInstances],
    options: &RealizeOptions,
) -> CurvesSchema {
    let mut attributes = gather_attributes(sources, instances, options, &[AttrDomain::Point, AttrDomain::Curve]);
    attributes.take(POSITION);
    let create_id = attributes.take(INSTANCE_ID);
    let create_radius = attributes.take(curves::RADIUS);
    let left = attributes.take(curves::HANDLE_LEFT);
    let right = attributes.take(curves::HANDLE_RIGHT);
    let create_nurbs_weight = attributes.take(curves::NURBS_WEIGHT);
    let create_resolution = attributes.take(curves::RESOLUTION);
    let create_custom_normal = attributes.take(CUSTOM_NORMAL);
    CurvesSchema {
        attributes,
        create_id,
        create_radius,
        create_handles: left || right,
        create_nurbs_weight,
        create_resolution,
        create_custom_normal,
    }
}

/// Schema of the output instances.
///
/// The kept components contribute all their layers. Expanded components
/// contribute theirs as fallbacks when instance attributes are realized.
pub(crate) fn instances_schema(
    kept: &[ReachedInstances],
    expanded: &[ReachedInstances],
    options: &RealizeOptions,
) -> InstancesSchema {
    let mut schema = InstancesSchema::default();
    if kept.is_empty() {
        return schema;
    }
    let filter = &options.attribute_filter;
    let fallbacks = if options.realize_instance_attributes {
        expanded
    } else {
        &[]
    };
    for (reached, is_kept) in kept.iter().map(|r| (r, true)).chain(fallbacks.iter().map(|r| (r, false))) {
        for layer in reached.instances.attributes().iter() {
            if filter.allow_skip(&layer.name) {
                continue;
            }
            if layer.name == INSTANCE_ID {
                schema.create_id |= is_kept && !reached.ids_stripped;
                continue;
            }
            schema.attributes.merge(
                &layer.name,
                AttributeKind {
                    domain: AttrDomain::Instance,
                    data_type: layer.data_type(),
                },
            );
        }
    }
    schema
}
