//! Per-source-geometry data prepared once before tasks are executed.
//!
//! Every unique non-empty source geometry gets one info record holding its
//! attributes already converted to the schema's domain and type, so tasks that
//! instance the same source many times share the conversion work.

use std::borrow::Cow;

use indexmap::IndexSet;
use tracing::debug;

use super::scan::Reachable;
use super::schema::{self, AttributeKind, CurvesSchema, MeshSchema, OrderedAttributes, PointCloudSchema};
use super::RealizeOptions;
use crate::attribute::{AttrDomain, AttrType, AttributeAccessor, AttributeArray};
use crate::geom::{
    curves, instances::INSTANCE_ID, mesh::MATERIAL_INDEX, point_cloud, Curves, Mesh, PointCloud, CUSTOM_NORMAL,
};
use crate::scene::{CurvesKey, GeometryStore, MaterialKey, MeshKey, PointCloudKey};
use crate::util::{Result, Vec3};

/// Read every schema entry the source carries, converted to the declared kind.
fn lookup_schema_attributes<A: AttributeAccessor>(source: &A, schema: &OrderedAttributes) -> Vec<Option<AttributeArray>> {
    schema
        .iter()
        .map(|(name, kind)| {
            if !source.attributes().contains(name) {
                return None;
            }
            let array = source.lookup(name, kind.domain, kind.data_type);
            if array.is_none() {
                debug!(attribute = name, domain = %kind.domain, "attribute not adaptable, using fallback");
            }
            array
        })
        .collect()
}

/// Stored ids moved to the point domain and converted to integers.
fn stored_ids<A: AttributeAccessor>(source: &A) -> Option<Cow<'_, [i32]>> {
    source.lookup_typed::<i32>(INSTANCE_ID, AttrDomain::Point)
}

// ============================================================================
// Point clouds
// ============================================================================

pub(crate) struct PointCloudRealizeInfo<'a> {
    pub point_cloud: &'a PointCloud,
    pub attributes: Vec<Option<AttributeArray>>,
    pub radii: Option<Cow<'a, [f32]>>,
    pub stored_ids: Option<Cow<'a, [i32]>>,
}

pub(crate) struct AllPointCloudsInfo<'a> {
    pub schema: PointCloudSchema,
    /// Non-empty sources; the index of a key is the index of its info record
    pub order: IndexSet<PointCloudKey>,
    pub realize_info: Vec<PointCloudRealizeInfo<'a>>,
}

pub(crate) fn preprocess_point_clouds<'a>(
    store: &'a GeometryStore,
    reachable: &Reachable,
    options: &RealizeOptions,
) -> Result<AllPointCloudsInfo<'a>> {
    let sources = reachable
        .point_clouds
        .iter()
        .map(|&key| -> Result<_> { Ok((key, store.require_point_cloud(key)?)) })
        .collect::<Result<Vec<_>>>()?;
    let schema = schema::point_cloud_schema(
        sources.iter().map(|(_, p)| &p.attributes),
        &reachable.instances,
        options,
    );

    let mut order = IndexSet::new();
    let mut realize_info = Vec::new();
    for (key, source) in sources.into_iter().filter(|(_, p)| !p.is_empty()) {
        order.insert(key);
        realize_info.push(PointCloudRealizeInfo {
            point_cloud: source,
            attributes: lookup_schema_attributes(source, &schema.attributes),
            radii: schema
                .create_radius
                .then(|| source.lookup_typed::<f32>(point_cloud::RADIUS, AttrDomain::Point))
                .flatten(),
            stored_ids: schema.create_id.then(|| stored_ids(source)).flatten(),
        });
    }
    Ok(AllPointCloudsInfo {
        schema,
        order,
        realize_info,
    })
}

// ============================================================================
// Meshes
// ============================================================================

pub(crate) struct MeshRealizeInfo<'a> {
    pub mesh: &'a Mesh,
    pub attributes: Vec<Option<AttributeArray>>,
    /// Source material slot to merged slot
    pub material_index_map: Vec<i32>,
    pub material_indices: Option<Cow<'a, [i32]>>,
    pub stored_vertex_ids: Option<Cow<'a, [i32]>>,
    /// Normals on the schema's custom normal domain, stored or derived
    pub custom_normals: Option<Cow<'a, [Vec3]>>,
}

pub(crate) struct AllMeshesInfo<'a> {
    pub schema: MeshSchema,
    pub order: IndexSet<MeshKey>,
    pub realize_info: Vec<MeshRealizeInfo<'a>>,
    /// Merged material slots of the output
    pub materials: IndexSet<Option<MaterialKey>>,
    /// Vertex group names of the output, in source order
    pub vertex_group_names: Vec<String>,
    pub no_loose_edges_hint: bool,
    pub no_loose_verts_hint: bool,
}

pub(crate) fn preprocess_meshes<'a>(
    store: &'a GeometryStore,
    reachable: &Reachable,
    options: &RealizeOptions,
) -> Result<AllMeshesInfo<'a>> {
    let sources = reachable
        .meshes
        .iter()
        .map(|&key| -> Result<_> { Ok((key, store.require_mesh(key)?)) })
        .collect::<Result<Vec<_>>>()?;
    let mut schema = schema::mesh_schema(
        sources.iter().map(|(_, m)| &m.attributes),
        &reachable.instances,
        options,
    );

    let sources: Vec<_> = sources.into_iter().filter(|(_, m)| m.num_vertices() > 0).collect();

    // Merge material slots in source order.
    let mut materials = IndexSet::new();
    for (_, mesh) in &sources {
        if mesh.materials.is_empty() {
            materials.insert(None);
        } else {
            materials.extend(mesh.materials.iter().copied());
        }
    }
    schema.create_material_index |= materials.len() > 1;

    let mut order = IndexSet::new();
    let mut realize_info = Vec::with_capacity(sources.len());
    for &(key, mesh) in &sources {
        order.insert(key);
        let material_index_map = if mesh.materials.is_empty() {
            vec![slot_index(&materials, None)]
        } else {
            mesh.materials.iter().map(|&m| slot_index(&materials, m)).collect()
        };
        realize_info.push(MeshRealizeInfo {
            mesh,
            attributes: lookup_schema_attributes(mesh, &schema.attributes),
            material_index_map,
            material_indices: schema
                .create_material_index
                .then(|| mesh.lookup_typed::<i32>(MATERIAL_INDEX, AttrDomain::Face))
                .flatten(),
            stored_vertex_ids: schema.create_id.then(|| stored_ids(mesh)).flatten(),
            custom_normals: schema.custom_normal_domain.map(|domain| {
                mesh.lookup_typed::<Vec3>(CUSTOM_NORMAL, domain)
                    .unwrap_or_else(|| Cow::Owned(mesh.normals_on(domain)))
            }),
        });
    }

    // A group survives only if its weights reach the output as point floats.
    let group_kind = AttributeKind {
        domain: AttrDomain::Point,
        data_type: AttrType::Float,
    };
    let mut vertex_group_names: Vec<String> = Vec::new();
    for (_, mesh) in &sources {
        for name in &mesh.vertex_group_names {
            if schema.attributes.kind_of(name) == Some(group_kind) && !vertex_group_names.contains(name) {
                vertex_group_names.push(name.clone());
            }
        }
    }

    let no_loose_edges_hint = sources.iter().all(|(_, m)| m.cached_loose_edges() == Some(0));
    let no_loose_verts_hint = sources.iter().all(|(_, m)| m.cached_loose_verts() == Some(0));

    Ok(AllMeshesInfo {
        schema,
        order,
        realize_info,
        materials,
        vertex_group_names,
        no_loose_edges_hint,
        no_loose_verts_hint,
    })
}

fn slot_index(materials: &IndexSet<Option<MaterialKey>>, material: Option<MaterialKey>) -> i32 {
    materials.get_index_of(&material).map_or(0, |i| i as i32)
}

// ============================================================================
// Curves
// ============================================================================

pub(crate) struct CurvesRealizeInfo<'a> {
    pub curves: &'a Curves,
    pub attributes: Vec<Option<AttributeArray>>,
    pub stored_ids: Option<Cow<'a, [i32]>>,
    pub handle_left: Option<Cow<'a, [Vec3]>>,
    pub handle_right: Option<Cow<'a, [Vec3]>>,
    pub radius: Option<Cow<'a, [f32]>>,
    pub nurbs_weight: Option<Cow<'a, [f32]>>,
    pub resolution: Option<Cow<'a, [i32]>>,
    pub custom_normal: Option<Cow<'a, [Vec3]>>,
}

pub(crate) struct AllCurvesInfo<'a> {
    pub schema: CurvesSchema,
    pub order: IndexSet<CurvesKey>,
    pub realize_info: Vec<CurvesRealizeInfo<'a>>,
}

pub(crate) fn preprocess_curves<'a>(
    store: &'a GeometryStore,
    reachable: &Reachable,
    options: &RealizeOptions,
) -> Result<AllCurvesInfo<'a>> {
    let sources = reachable
        .curves
        .iter()
        .map(|&key| -> Result<_> { Ok((key, store.require_curves(key)?)) })
        .collect::<Result<Vec<_>>>()?;
    let schema = schema::curves_schema(
        sources.iter().map(|(_, c)| &c.attributes),
        &reachable.instances,
        options,
    );

    let mut order = IndexSet::new();
    let mut realize_info = Vec::new();
    for (key, source) in sources.into_iter().filter(|(_, c)| c.num_curves() > 0) {
        order.insert(key);
        let handles = |name| {
            schema
                .create_handles
                .then(|| source.lookup_typed::<Vec3>(name, AttrDomain::Point))
                .flatten()
        };
        realize_info.push(CurvesRealizeInfo {
            curves: source,
            attributes: lookup_schema_attributes(source, &schema.attributes),
            stored_ids: schema.create_id.then(|| stored_ids(source)).flatten(),
            handle_left: handles(curves::HANDLE_LEFT),
            handle_right: handles(curves::HANDLE_RIGHT),
            radius: schema
                .create_radius
                .then(|| source.lookup_typed::<f32>(curves::RADIUS, AttrDomain::Point))
                .flatten(),
            nurbs_weight: schema
                .create_nurbs_weight
                .then(|| source.lookup_typed::<f32>(curves::NURBS_WEIGHT, AttrDomain::Point))
                .flatten(),
            resolution: schema
                .create_resolution
                .then(|| source.lookup_typed::<i32>(curves::RESOLUTION, AttrDomain::Curve))
                .flatten(),
            custom_normal: schema
                .create_custom_normal
                .then(|| source.lookup_typed::<Vec3>(CUSTOM_NORMAL, AttrDomain::Point))
                .flatten(),
        });
    }
    Ok(AllCurvesInfo {
        schema,
        order,
        realize_info,
    })
}
