//! Mesh task execution.
//!
//! Every task copies one source mesh into its window of the merged mesh and
//! offsets the topology indices by the task's element starts:
//!
//! - edges and corner vertices by the vertex start
//! - corner edges by the edge start
//! - face offsets by the corner start
//!
//! Material indices go through the per-source slot map into the merged
//! material list. Custom normals go through the normal matrix of the task's
//! transform and are renormalized.

use rayon::prelude::*;

use super::attributes::{check_size, copy_generic_attributes, schema_writers, split_writers};
use super::gather::{MeshElementStart, RealizeMeshTask};
use super::ids::create_result_ids;
use super::info::{AllMeshesInfo, MeshRealizeInfo};
use super::RealizeOptions;
use crate::attribute::{AttrDomain, AttributeAccessor, AttributeArray, AttributeSliceMut};
use crate::geom::instances::INSTANCE_ID;
use crate::geom::mesh::MATERIAL_INDEX;
use crate::geom::{Mesh, CUSTOM_NORMAL};
use crate::util::{
    split_counts_mut, split_optional_mut, transform_normals, transform_points, Result, Vec3, PARALLEL_GRAIN,
};

struct MeshTaskOutput<'a> {
    positions: &'a mut [Vec3],
    edges: &'a mut [[u32; 2]],
    face_offsets: &'a mut [u32],
    corner_verts: &'a mut [u32],
    corner_edges: &'a mut [u32],
    material_indices: Option<&'a mut [i32]>,
    ids: Option<&'a mut [i32]>,
    custom_normals: Option<&'a mut [Vec3]>,
    attributes: Vec<AttributeSliceMut<'a>>,
}

/// Merge all mesh tasks into one mesh with `total` elements.
#[tracing::instrument(skip_all, fields(tasks = tasks.len(), vertices = total.vertex, faces = total.face))]
pub(crate) fn execute_realize_mesh_tasks(
    options: &RealizeOptions,
    all: &AllMeshesInfo<'_>,
    tasks: &[RealizeMeshTask],
    total: MeshElementStart,
) -> Result<Mesh> {
    for count in [total.vertex, total.edge, total.face, total.corner] {
        check_size("mesh", count)?;
    }
    let schema = &all.schema;

    let mut positions = vec![Vec3::ZERO; total.vertex];
    let mut edges = vec![[0_u32; 2]; total.edge];
    let mut face_offsets = vec![0_u32; total.face + 1];
    let mut corner_verts = vec![0_u32; total.corner];
    let mut corner_edges = vec![0_u32; total.corner];
    let mut material_indices = schema.create_material_index.then(|| vec![0_i32; total.face]);
    let mut ids = schema.create_id.then(|| vec![0_i32; total.vertex]);
    let domain_total = |domain: AttrDomain| match domain {
        AttrDomain::Edge => total.edge,
        AttrDomain::Face => total.face,
        AttrDomain::Corner => total.corner,
        _ => total.vertex,
    };
    let mut custom_normals = schema
        .custom_normal_domain
        .map(|domain| vec![Vec3::ZERO; domain_total(domain)]);
    let mut writers = schema_writers(&schema.attributes, domain_total);

    let sources: Vec<&Mesh> = tasks
        .iter()
        .map(|task| all.realize_info[task.info_index].mesh)
        .collect();
    let vertices = || sources.iter().map(|m| m.num_vertices());
    let faces = || sources.iter().map(|m| m.num_faces());
    let corners = || sources.iter().map(|m| m.num_corners());

    let topology = split_counts_mut(&mut positions, vertices())
        .into_iter()
        .zip(split_counts_mut(&mut edges, sources.iter().map(|m| m.num_edges())))
        .zip(split_counts_mut(&mut face_offsets[..total.face], faces()))
        .zip(split_counts_mut(&mut corner_verts, corners()))
        .zip(split_counts_mut(&mut corner_edges, corners()));
    let normal_domain = schema.custom_normal_domain.unwrap_or(AttrDomain::Point);
    let extra = split_optional_mut(material_indices.as_deref_mut(), faces())
        .into_iter()
        .zip(split_optional_mut(ids.as_deref_mut(), vertices()))
        .zip(split_optional_mut(
            custom_normals.as_deref_mut(),
            sources.iter().map(|m| m.domain_size(normal_domain).unwrap_or(0)),
        ))
        .zip(split_writers(&mut writers, tasks.len(), |task, domain| {
            sources[task].domain_size(domain).unwrap_or(0)
        }));
    let outputs: Vec<MeshTaskOutput<'_>> = topology
        .zip(extra)
        .map(
            |(
                ((((positions, edges), face_offsets), corner_verts), corner_edges),
                (((material_indices, ids), custom_normals), attributes),
            )| MeshTaskOutput {
                positions,
                edges,
                face_offsets,
                corner_verts,
                corner_edges,
                material_indices,
                ids,
                custom_normals,
                attributes,
            },
        )
        .collect();

    tasks.par_iter().zip(outputs.into_par_iter()).for_each(|(task, output)| {
        realize_mesh(options, &all.realize_info[task.info_index], task, output);
    });
    face_offsets[total.face] = total.corner as u32;

    let mut result = Mesh::new();
    result.positions = positions;
    result.edges = edges;
    result.face_offsets = face_offsets;
    result.corner_verts = corner_verts;
    result.corner_edges = corner_edges;
    result.materials = all.materials.iter().copied().collect();
    result.vertex_group_names = all.vertex_group_names.clone();
    if let Some(first) = sources.first() {
        result.params = first.params.clone();
    }
    for writer in writers {
        writer.finish(&mut result)?;
    }
    if let Some(material_indices) = material_indices {
        result.add_attribute(MATERIAL_INDEX, AttrDomain::Face, AttributeArray::from_vec(material_indices))?;
    }
    if let Some(ids) = ids {
        result.add_attribute(INSTANCE_ID, AttrDomain::Point, AttributeArray::from_vec(ids))?;
    }
    if let Some(normals) = custom_normals {
        result.add_attribute(CUSTOM_NORMAL, normal_domain, AttributeArray::from_vec(normals))?;
    }
    if all.no_loose_edges_hint {
        result.tag_loose_edges_none();
    }
    if all.no_loose_verts_hint {
        result.tag_loose_verts_none();
    }
    Ok(result)
}

fn realize_mesh(options: &RealizeOptions, info: &MeshRealizeInfo<'_>, task: &RealizeMeshTask, mut output: MeshTaskOutput<'_>) {
    let mesh = info.mesh;
    let start = task.start;

    transform_points(&mesh.positions, &task.transform, output.positions);
    offset_indices(&mesh.corner_verts, start.vertex, output.corner_verts);
    offset_indices(&mesh.corner_edges, start.edge, output.corner_edges);
    offset_indices(&mesh.face_offsets[..mesh.num_faces()], start.corner, output.face_offsets);

    let vertex = start.vertex as u32;
    output
        .edges
        .par_iter_mut()
        .with_min_len(PARALLEL_GRAIN)
        .zip(mesh.edges.par_iter())
        .for_each(|(dst, &[a, b])| *dst = [a + vertex, b + vertex]);

    if let Some(dst) = output.material_indices {
        remap_material_indices(info, dst);
    }
    if let Some(dst) = output.ids {
        create_result_ids(options.keep_original_ids, info.stored_vertex_ids.as_deref(), task.id, dst);
    }
    if let (Some(src), Some(dst)) = (info.custom_normals.as_deref(), output.custom_normals) {
        transform_normals(src, &task.transform, dst);
    }
    copy_generic_attributes(&info.attributes, &task.fallbacks, &mut output.attributes);
}

fn offset_indices(src: &[u32], offset: usize, dst: &mut [u32]) {
    let offset = offset as u32;
    dst.par_iter_mut()
        .with_min_len(PARALLEL_GRAIN)
        .zip(src.par_iter())
        .for_each(|(d, &s)| *d = s + offset);
}

/// Map source material indices into the merged slot list.
///
/// Indices outside the source's slots become 0. A source without slots, or
/// without a material index attribute, uses the slot its first entry maps to.
fn remap_material_indices(info: &MeshRealizeInfo<'_>, dst: &mut [i32]) {
    let map = &info.material_index_map;
    let slots = info.mesh.materials.len();
    match &info.material_indices {
        Some(src) if slots > 0 => {
            dst.par_iter_mut()
                .with_min_len(PARALLEL_GRAIN)
                .zip(src.par_iter())
                .for_each(|(d, &s)| {
                    *d = usize::try_from(s).ok().filter(|&i| i < slots).map_or(0, |i| map[i]);
                });
        }
        _ => dst.fill(map.first().copied().unwrap_or(0)),
    }
}
