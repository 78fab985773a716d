//! Instance realization.
//!
//! Turns a geometry set with (possibly nested) instances into one set with a
//! single mesh, point cloud and curves component holding every instanced
//! element, transformed into place.
//!
//! ## Key Concepts
//!
//! - **Schema**: union of the attributes of every source of one kind, with
//!   domain and type widened on conflict
//! - **Task**: one occurrence of one source geometry, with its destination
//!   window, transform, fallback values and path id
//! - **Path id**: hash of the instance indices (or stored ids) leading to a
//!   task, used to keep realized ids unique across duplicated instances
//! - **Depth**: how many instance levels below a top-level instance are
//!   realized. Instances below that limit stay instances in the output
//!
//! Work happens in three phases. Sources are scanned and prepared once each,
//! tasks are gathered by a sequential walk that hands out destination ranges,
//! and tasks are executed in parallel into disjoint windows.
//!
//! ## Example
//!
//! ```ignore
//! use geo_realize::prelude::*;
//!
//! let result = realize_instances(&mut store, geometry, &RealizeOptions::default())?;
//! let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
//! println!("{} vertices", mesh.num_vertices());
//!
//! // Realize one level and keep deeper instances as instances
//! let depth = VariedDepthOptions::with_depth(count, 1);
//! let result = realize_instances_with_depth(&mut store, geometry, &RealizeOptions::default(), &depth)?;
//! ```

mod attributes;
mod curves;
mod gather;
mod ids;
mod info;
mod instances;
mod mesh;
mod options;
mod point_cloud;
mod scan;
mod schema;

#[cfg(test)]
mod tests;

pub use options::{RealizeOptions, VariedDepthOptions};
pub use schema::{AttributeKind, CurvesSchema, InstancesSchema, MeshSchema, OrderedAttributes, PointCloudSchema};

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::geom::GeometrySet;
use crate::scene::GeometryStore;
use crate::util::{Error, Result};

/// Output of [`realize_instances`].
#[derive(Debug)]
pub struct RealizeResult {
    /// Realized geometry. New components live in the store.
    pub geometry: GeometrySet,
    /// Per-kind failures. A kind listed here is missing from `geometry`.
    pub errors: Vec<Error>,
}

/// Realize all instances of `geometry`.
///
/// Geometry without an instances component is returned unchanged. Otherwise
/// the realized mesh, point cloud and curves are added to `store` and the
/// returned set references them, together with the first volume and edit
/// data found in the tree.
///
/// Fails if an object or collection instances itself.
pub fn realize_instances(
    store: &mut GeometryStore,
    geometry: GeometrySet,
    options: &RealizeOptions,
) -> Result<RealizeResult> {
    let count = geometry.instances.as_ref().map_or(0, |instances| instances.num_instances());
    realize_instances_with_depth(store, geometry, options, &VariedDepthOptions::all(count))
}

/// Realize the selected top-level instances of `geometry`, each down to its
/// own depth.
///
/// Top-level instances that are not selected, or selected with depth 0, are
/// carried over unchanged into the output instances component. Instances
/// nested deeper than a selected instance's depth are kept too, placed by
/// the transform of everything above them.
///
/// Fails with [`Error::InvalidSelection`] if the selection names an instance
/// that does not exist.
#[tracing::instrument(skip_all, fields(keep_original_ids = options.keep_original_ids, selected = depth.selection.len()))]
pub fn realize_instances_with_depth(
    store: &mut GeometryStore,
    geometry: GeometrySet,
    options: &RealizeOptions,
    depth: &VariedDepthOptions,
) -> Result<RealizeResult> {
    let Some(root_instances) = geometry.instances.clone() else {
        return Ok(RealizeResult {
            geometry,
            errors: Vec::new(),
        });
    };
    let selection = depth.resolve(root_instances.num_instances())?;
    if selection.is_empty() && !root_instances.is_empty() {
        debug!("no instance selected");
        return Ok(RealizeResult {
            geometry,
            errors: Vec::new(),
        });
    }
    let unselected = instances::unselected_instances(&root_instances, &selection);

    let mut errors = Vec::new();
    let (point_cloud, mesh, curves, kept, volume, edit_data) = {
        let store: &GeometryStore = store;

        // Phase 1: Find and prepare every reachable source once
        let reachable = scan::scan(store, &geometry, &selection, options)?;
        let point_clouds = info::preprocess_point_clouds(store, &reachable, options)?;
        let meshes = info::preprocess_meshes(store, &reachable, options)?;
        let all_curves = info::preprocess_curves(store, &reachable, options)?;
        let kept_instances: Vec<scan::ReachedInstances> = unselected
            .iter()
            .map(|instances| scan::ReachedInstances {
                instances: Arc::clone(instances),
                ids_stripped: false,
            })
            .chain(reachable.kept_instances.iter().cloned())
            .collect();
        let instances_schema = schema::instances_schema(&kept_instances, &reachable.instances, options);

        // Phase 2: Walk the instance tree (sequential, assigns offsets)
        let gather_info = gather::GatherInfo {
            store,
            options,
            point_clouds: &point_clouds,
            meshes: &meshes,
            curves: &all_curves,
            instances: &instances_schema,
        };
        let (tasks, offsets) = gather::gather_realize_tasks(&gather_info, &geometry, &selection, unselected)?;
        info!(
            point_cloud_tasks = tasks.point_clouds.len(),
            mesh_tasks = tasks.meshes.len(),
            curves_tasks = tasks.curves.len(),
            instances_tasks = tasks.instances.len(),
            "gathered realize tasks"
        );

        // Phase 3: Execute tasks per kind (parallel)
        let ((point_cloud, kept), (mesh, curves)) = rayon::join(
            || {
                rayon::join(
                    || {
                        (!tasks.point_clouds.is_empty()).then(|| {
                            point_cloud::execute_realize_point_cloud_tasks(
                                options,
                                &point_clouds,
                                &tasks.point_clouds,
                                offsets.point_cloud,
                            )
                        })
                    },
                    || {
                        (!tasks.instances.is_empty())
                            .then(|| instances::execute_instances_tasks(&instances_schema, &tasks.instances))
                    },
                )
            },
            || {
                rayon::join(
                    || {
                        (!tasks.meshes.is_empty())
                            .then(|| mesh::execute_realize_mesh_tasks(options, &meshes, &tasks.meshes, offsets.mesh))
                    },
                    || {
                        (!tasks.curves.is_empty()).then(|| {
                            curves::execute_realize_curves_tasks(options, &all_curves, &tasks.curves, offsets.curves)
                        })
                    },
                )
            },
        );
        (
            collect_component(point_cloud, &mut errors)?,
            collect_component(mesh, &mut errors)?,
            collect_component(curves, &mut errors)?,
            collect_component(kept, &mut errors)?,
            tasks.first_volume,
            tasks.first_edit_data,
        )
    };

    let result = GeometrySet {
        mesh: mesh.map(|mesh| store.add_mesh(mesh)),
        point_cloud: point_cloud.map(|point_cloud| store.add_point_cloud(point_cloud)),
        instances: kept.map(Arc::new),
        volume,
        curves: curves.map(|curves| store.add_curves(curves)),
        edit_data,
    };
    Ok(RealizeResult {
        geometry: result,
        errors,
    })
}

/// Keep a realized component, moving a size failure into `errors`.
fn collect_component<T>(result: Option<Result<T>>, errors: &mut Vec<Error>) -> Result<Option<T>> {
    match result {
        None => Ok(None),
        Some(Ok(component)) => Ok(Some(component)),
        Some(Err(err @ Error::TooLarge { .. })) => {
            warn!(error = %err, "realized component dropped");
            errors.push(err);
            Ok(None)
        }
        Some(Err(err)) => Err(err),
    }
}
