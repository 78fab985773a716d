//! Instance tree walker.
//!
//! Descends the instance tree depth-first, composing transforms, path ids and
//! attribute fallbacks, and emits one task per concrete geometry occurrence.
//! Destination ranges are handed out here, sequentially, so every task owns a
//! disjoint range and the layout only depends on instancing order.
//!
//! Instances components at their depth limit, and the top-level instances
//! that were not selected, become instances tasks instead.

use std::borrow::Cow;
use std::sync::Arc;

use glam::Mat4;
use tracing::debug;

use super::info::{AllCurvesInfo, AllMeshesInfo, AllPointCloudsInfo};
use super::scan::{Depth, OpenNode, OpenStack};
use super::schema::{AttributeFallbacks, InstancesSchema, OrderedAttributes};
use super::RealizeOptions;
use crate::attribute::{convert_array, AttrDomain, AttributeAccessor, AttributeArray};
use crate::geom::{ComponentKind, EditData, GeometrySet, InstanceReference, Instances};
use crate::scene::{GeometryStore, ObjectKey, VolumeKey};
use crate::util::Result;

/// First destination index of each mesh element kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MeshElementStart {
    pub vertex: usize,
    pub edge: usize,
    pub face: usize,
    pub corner: usize,
}

/// First destination index of each curves element kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct CurvesElementStart {
    pub point: usize,
    pub curve: usize,
}

/// Running destination counters, advanced only by the walker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct GatherOffsets {
    pub point_cloud: usize,
    pub mesh: MeshElementStart,
    pub curves: CurvesElementStart,
}

#[derive(Clone, Debug)]
pub(crate) struct RealizePointCloudTask {
    pub start: usize,
    pub info_index: usize,
    pub transform: Mat4,
    pub fallbacks: AttributeFallbacks,
    pub id: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct RealizeMeshTask {
    pub start: MeshElementStart,
    pub info_index: usize,
    pub transform: Mat4,
    pub fallbacks: AttributeFallbacks,
    pub id: u32,
}

#[derive(Clone, Debug)]
pub(crate) struct RealizeCurvesTask {
    pub start: CurvesElementStart,
    pub info_index: usize,
    pub transform: Mat4,
    pub fallbacks: AttributeFallbacks,
    pub id: u32,
}

/// Instances kept as instances, placed by `transform`.
#[derive(Clone, Debug)]
pub(crate) struct RealizeInstancesTask {
    pub instances: Arc<Instances>,
    pub transform: Mat4,
    pub fallbacks: AttributeFallbacks,
    /// Ignore the component's own "id" layer
    pub ids_stripped: bool,
}

/// Everything the walk produced.
#[derive(Debug, Default)]
pub(crate) struct GatherTasks {
    pub point_clouds: Vec<RealizePointCloudTask>,
    pub meshes: Vec<RealizeMeshTask>,
    pub curves: Vec<RealizeCurvesTask>,
    pub instances: Vec<RealizeInstancesTask>,
    pub first_volume: Option<VolumeKey>,
    pub first_edit_data: Option<Arc<EditData>>,
}

/// Read-only inputs of the walk.
pub(crate) struct GatherInfo<'a> {
    pub store: &'a GeometryStore,
    pub options: &'a RealizeOptions,
    pub point_clouds: &'a AllPointCloudsInfo<'a>,
    pub meshes: &'a AllMeshesInfo<'a>,
    pub curves: &'a AllCurvesInfo<'a>,
    pub instances: &'a InstancesSchema,
}

/// State inherited from the enclosing instances.
#[derive(Clone, Debug)]
struct InstanceContext {
    point_clouds: AttributeFallbacks,
    meshes: AttributeFallbacks,
    curves: AttributeFallbacks,
    instances: AttributeFallbacks,
    id: u32,
    /// Stored instance ids are ignored on this path
    strip_ids: bool,
}

impl InstanceContext {
    fn new(info: &GatherInfo<'_>) -> Self {
        Self {
            point_clouds: info.point_clouds.schema.attributes.empty_fallbacks(),
            meshes: info.meshes.schema.attributes.empty_fallbacks(),
            curves: info.curves.schema.attributes.empty_fallbacks(),
            instances: info.instances.attributes.empty_fallbacks(),
            id: 0,
            strip_ids: info.options.keep_original_ids,
        }
    }
}

/// Mutable state of the walk.
#[derive(Default)]
struct GatherState {
    offsets: GatherOffsets,
    tasks: GatherTasks,
    open: OpenStack,
}

/// Walk `root` and collect tasks for every geometry occurrence.
///
/// `selection` lists the top-level instances to expand, as returned by the
/// depth options. `unselected` holds the other top-level instances; they are
/// merged into the output first, unmoved.
pub(crate) fn gather_realize_tasks(
    info: &GatherInfo<'_>,
    root: &GeometrySet,
    selection: &[(usize, Option<u32>)],
    unselected: Option<Arc<Instances>>,
) -> Result<(GatherTasks, GatherOffsets)> {
    let mut state = GatherState::default();
    if let Some(instances) = unselected {
        state.tasks.instances.push(RealizeInstancesTask {
            instances,
            transform: Mat4::IDENTITY,
            fallbacks: info.instances.attributes.empty_fallbacks(),
            ids_stripped: false,
        });
    }
    let context = InstanceContext::new(info);
    gather_recursive(info, root, &Mat4::IDENTITY, &context, Depth::Root(selection), &mut state)?;
    Ok((state.tasks, state.offsets))
}

fn gather_recursive(
    info: &GatherInfo<'_>,
    geometry: &GeometrySet,
    transform: &Mat4,
    context: &InstanceContext,
    depth: Depth<'_>,
    state: &mut GatherState,
) -> Result<()> {
    for kind in geometry.component_kinds() {
        match kind {
            ComponentKind::Mesh => {
                let Some(index) = geometry.mesh.and_then(|key| info.meshes.order.get_index_of(&key)) else {
                    continue;
                };
                let mesh = info.meshes.realize_info[index].mesh;
                state.tasks.meshes.push(RealizeMeshTask {
                    start: state.offsets.mesh,
                    info_index: index,
                    transform: *transform,
                    fallbacks: context.meshes.clone(),
                    id: context.id,
                });
                state.offsets.mesh.vertex += mesh.num_vertices();
                state.offsets.mesh.edge += mesh.num_edges();
                state.offsets.mesh.face += mesh.num_faces();
                state.offsets.mesh.corner += mesh.num_corners();
            }
            ComponentKind::PointCloud => {
                let Some(index) = geometry
                    .point_cloud
                    .and_then(|key| info.point_clouds.order.get_index_of(&key))
                else {
                    continue;
                };
                let point_cloud = info.point_clouds.realize_info[index].point_cloud;
                state.tasks.point_clouds.push(RealizePointCloudTask {
                    start: state.offsets.point_cloud,
                    info_index: index,
                    transform: *transform,
                    fallbacks: context.point_clouds.clone(),
                    id: context.id,
                });
                state.offsets.point_cloud += point_cloud.num_points();
            }
            ComponentKind::Instances => {
                let Some(instances) = &geometry.instances else {
                    continue;
                };
                if depth.keeps_instances() {
                    if !instances.is_empty() {
                        state.tasks.instances.push(RealizeInstancesTask {
                            instances: Arc::clone(instances),
                            transform: *transform,
                            fallbacks: context.instances.clone(),
                            ids_stripped: context.strip_ids,
                        });
                    }
                } else {
                    gather_instances(info, instances, transform, context, depth, state)?;
                }
            }
            ComponentKind::Volume => {
                if state.tasks.first_volume.is_none() {
                    state.tasks.first_volume = geometry.volume;
                } else {
                    debug!("dropping additional volume component");
                }
            }
            ComponentKind::Curves => {
                let Some(index) = geometry.curves.and_then(|key| info.curves.order.get_index_of(&key)) else {
                    continue;
                };
                let curves = info.curves.realize_info[index].curves;
                state.tasks.curves.push(RealizeCurvesTask {
                    start: state.offsets.curves,
                    info_index: index,
                    transform: *transform,
                    fallbacks: context.curves.clone(),
                    id: context.id,
                });
                state.offsets.curves.point += curves.num_points();
                state.offsets.curves.curve += curves.num_curves();
            }
            ComponentKind::EditData => {
                if state.tasks.first_edit_data.is_none() {
                    state.tasks.first_edit_data = geometry.edit_data.clone();
                } else {
                    debug!("dropping additional edit data component");
                }
            }
        }
    }
    Ok(())
}

/// Instance attribute values that override fallbacks of one schema.
struct FallbackSource<'b> {
    slot: usize,
    values: Cow<'b, AttributeArray>,
}

fn fallback_sources<'b>(
    instances: &'b Instances,
    attributes: &OrderedAttributes,
    options: &RealizeOptions,
) -> Vec<FallbackSource<'b>> {
    if !options.realize_instance_attributes {
        return Vec::new();
    }
    instances
        .attributes()
        .iter()
        .filter(|layer| layer.domain == AttrDomain::Instance)
        .filter_map(|layer| {
            let slot = attributes.index_of(&layer.name)?;
            let (_, kind) = attributes.get(slot)?;
            let values = if layer.data_type() == kind.data_type {
                Cow::Borrowed(&layer.data)
            } else {
                Cow::Owned(convert_array(&layer.data, kind.data_type))
            };
            Some(FallbackSource { slot, values })
        })
        .collect()
}

fn apply_fallbacks(fallbacks: &mut AttributeFallbacks, sources: &[FallbackSource<'_>], index: usize) {
    for source in sources {
        fallbacks[source.slot] = source.values.get(index);
    }
}

fn gather_instances(
    info: &GatherInfo<'_>,
    instances: &Instances,
    base_transform: &Mat4,
    base_context: &InstanceContext,
    depth: Depth<'_>,
    state: &mut GatherState,
) -> Result<()> {
    let store = info.store;
    let point_cloud_sources = fallback_sources(instances, &info.point_clouds.schema.attributes, info.options);
    let mesh_sources = fallback_sources(instances, &info.meshes.schema.attributes, info.options);
    let curves_sources = fallback_sources(instances, &info.curves.schema.attributes, info.options);
    let instances_sources = fallback_sources(instances, &info.instances.attributes, info.options);
    let stored_ids = if base_context.strip_ids {
        None
    } else {
        instances.stored_ids()
    };

    for (i, levels) in depth.expanded(instances) {
        let transform = *base_transform * instances.transforms()[i];
        let local_id = stored_ids.map_or(i as u32, |ids| ids[i] as u32);
        let child = Depth::Remaining(levels);

        let mut context = base_context.clone();
        context.id = lookup3::hash2(base_context.id, local_id);
        apply_fallbacks(&mut context.point_clouds, &point_cloud_sources, i);
        apply_fallbacks(&mut context.meshes, &mesh_sources, i);
        apply_fallbacks(&mut context.curves, &curves_sources, i);
        apply_fallbacks(&mut context.instances, &instances_sources, i);

        match instances.reference_of(i)? {
            InstanceReference::Object(key) => {
                context.strip_ids = false;
                gather_object(info, *key, &transform, &context, child, state)?;
            }
            InstanceReference::Collection(key) => {
                context.strip_ids = false;
                let collection = store.require_collection(*key)?;
                state.open.enter(store, OpenNode::Collection(*key))?;
                let offset_transform = transform * Mat4::from_translation(-collection.instance_offset);
                for (index, object_key) in store.collection_objects_recursive(*key)?.into_iter().enumerate() {
                    let object = store.require_object(object_key)?;
                    let member_transform = offset_transform * object.object_to_world;
                    let mut member_context = context.clone();
                    member_context.id = lookup3::hash2(context.id, index as u32);
                    gather_object(info, object_key, &member_transform, &member_context, child, state)?;
                }
                state.open.leave();
            }
            InstanceReference::GeometrySet(geometry) => {
                gather_recursive(info, geometry, &transform, &context, child, state)?;
            }
            InstanceReference::None => {}
        }
    }
    Ok(())
}

fn gather_object(
    info: &GatherInfo<'_>,
    key: ObjectKey,
    transform: &Mat4,
    context: &InstanceContext,
    depth: Depth<'_>,
    state: &mut GatherState,
) -> Result<()> {
    let object = info.store.require_object(key)?;
    state.open.enter(info.store, OpenNode::Object(key))?;
    gather_recursive(info, &object.geometry, transform, context, depth, state)?;
    state.open.leave();
    Ok(())
}
