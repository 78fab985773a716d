//! Walker and executor tests that need access to gathered tasks.

use glam::{Mat4, Vec3};
use proptest::prelude::*;

use super::gather::{gather_realize_tasks, GatherInfo, GatherOffsets, GatherTasks};
use super::info::{preprocess_curves, preprocess_meshes, preprocess_point_clouds};
use super::scan::scan;
use super::*;
use crate::attribute::{AttrDomain, AttributeAccessor, AttributeArray};
use crate::geom::{Curves, InstanceReference, Instances, Mesh, PointCloud};
use crate::scene::{Collection, MeshKey, Object};

fn triangle() -> Mesh {
    Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::Y], &[&[0, 1, 2]]).unwrap()
}

fn instances_of(references: &[(InstanceReference, Mat4)]) -> Instances {
    let mut instances = Instances::new();
    for (reference, transform) in references {
        let handle = instances.add_reference(reference.clone());
        instances.add_instance(handle, *transform).unwrap();
    }
    instances
}

fn gather(store: &GeometryStore, root: &GeometrySet, options: &RealizeOptions) -> Result<(GatherTasks, GatherOffsets)> {
    let count = root.instances.as_ref().map_or(0, |instances| instances.num_instances());
    gather_with_depth(store, root, options, &VariedDepthOptions::all(count))
}

fn gather_with_depth(
    store: &GeometryStore,
    root: &GeometrySet,
    options: &RealizeOptions,
    depth: &VariedDepthOptions,
) -> Result<(GatherTasks, GatherOffsets)> {
    let count = root.instances.as_ref().map_or(0, |instances| instances.num_instances());
    let selection = depth.resolve(count)?;
    let reachable = scan(store, root, &selection, options)?;
    let point_clouds = preprocess_point_clouds(store, &reachable, options)?;
    let meshes = preprocess_meshes(store, &reachable, options)?;
    let curves = preprocess_curves(store, &reachable, options)?;
    let instances = schema::instances_schema(&reachable.kept_instances, &reachable.instances, options);
    let info = GatherInfo {
        store,
        options,
        point_clouds: &point_clouds,
        meshes: &meshes,
        curves: &curves,
        instances: &instances,
    };
    gather_realize_tasks(&info, root, &selection, None)
}

#[test]
fn test_tasks_follow_instance_order() {
    let mut store = GeometryStore::new();
    let mesh = store.add_mesh(triangle());
    let child = GeometrySet::from_mesh(mesh);
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(child.clone()), Mat4::IDENTITY),
        (InstanceReference::None, Mat4::IDENTITY),
        (InstanceReference::GeometrySet(child), Mat4::from_translation(Vec3::Z)),
    ]));

    let (tasks, offsets) = gather(&store, &root, &RealizeOptions::default()).unwrap();
    assert_eq!(tasks.meshes.len(), 2);
    assert_eq!(tasks.meshes[0].start.vertex, 0);
    assert_eq!(tasks.meshes[1].start.vertex, 3);
    assert_eq!(tasks.meshes[1].start.face, 1);
    assert_eq!(offsets.mesh.vertex, 6);
    assert_eq!(offsets.mesh.corner, 6);
    assert_eq!(tasks.meshes[0].id, lookup3::hash2(0, 0));
    assert_eq!(tasks.meshes[1].id, lookup3::hash2(0, 2));
    assert_eq!(tasks.meshes[1].transform, Mat4::from_translation(Vec3::Z));
}

#[test]
fn test_empty_sources_make_no_tasks() {
    let mut store = GeometryStore::new();
    let empty_mesh = store.add_mesh(Mesh::new());
    let empty_cloud = store.add_point_cloud(PointCloud::new());
    let empty_curves = store.add_curves(Curves::new());
    let child = GeometrySet::from_mesh(empty_mesh)
        .with_point_cloud(empty_cloud)
        .with_curves(empty_curves);
    let root = GeometrySet::from_instances(instances_of(&[(InstanceReference::GeometrySet(child), Mat4::IDENTITY)]));

    let (tasks, offsets) = gather(&store, &root, &RealizeOptions::default()).unwrap();
    assert!(tasks.meshes.is_empty());
    assert!(tasks.point_clouds.is_empty());
    assert!(tasks.curves.is_empty());
    assert_eq!(offsets, GatherOffsets::default());
}

#[test]
fn test_stored_instance_ids_feed_path() {
    let mut store = GeometryStore::new();
    let cloud = store.add_point_cloud(PointCloud::from_positions(vec![Vec3::ZERO]));
    let mut instances = instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_point_cloud(cloud)), Mat4::IDENTITY),
        (InstanceReference::GeometrySet(GeometrySet::from_point_cloud(cloud)), Mat4::IDENTITY),
    ]);
    instances
        .add_attribute("id", AttrDomain::Instance, AttributeArray::from_vec(vec![40_i32, 41]))
        .unwrap();
    let root = GeometrySet::from_instances(instances);

    let (tasks, _) = gather(&store, &root, &RealizeOptions::default()).unwrap();
    assert_eq!(tasks.point_clouds[0].id, lookup3::hash2(0, 40));
    assert_eq!(tasks.point_clouds[1].id, lookup3::hash2(0, 41));

    let options = RealizeOptions {
        keep_original_ids: true,
        ..Default::default()
    };
    let (tasks, _) = gather(&store, &root, &options).unwrap();
    assert_eq!(tasks.point_clouds[1].id, lookup3::hash2(0, 1));
}

#[test]
fn test_collection_members_hash_member_index() {
    let mut store = GeometryStore::new();
    let mesh = store.add_mesh(triangle());
    let a = store.add_object(Object::new("a", GeometrySet::from_mesh(mesh)));
    let b = store.add_object(Object::new("b", GeometrySet::from_mesh(mesh)).with_transform(Mat4::from_translation(Vec3::X)));
    let collection = store.add_collection(
        Collection::new("pair")
            .with_objects([a, b])
            .with_offset(Vec3::new(0.0, 2.0, 0.0)),
    );
    let root = GeometrySet::from_instances(instances_of(&[(InstanceReference::Collection(collection), Mat4::IDENTITY)]));

    let (tasks, _) = gather(&store, &root, &RealizeOptions::default()).unwrap();
    let instance_id = lookup3::hash2(0, 0);
    assert_eq!(tasks.meshes[0].id, lookup3::hash2(instance_id, 0));
    assert_eq!(tasks.meshes[1].id, lookup3::hash2(instance_id, 1));
    let expected = Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0)) * Mat4::from_translation(Vec3::X);
    assert!(tasks.meshes[1].transform.abs_diff_eq(expected, 1e-6));
}

#[test]
fn test_first_volume_wins() {
    let mut store = GeometryStore::new();
    let first = store.add_volume(crate::geom::Volume::default());
    let second = store.add_volume(crate::geom::Volume::default());
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::new().with_volume(first)), Mat4::IDENTITY),
        (InstanceReference::GeometrySet(GeometrySet::new().with_volume(second)), Mat4::IDENTITY),
    ]));
    let (tasks, _) = gather(&store, &root, &RealizeOptions::default()).unwrap();
    assert_eq!(tasks.first_volume, Some(first));
}

#[test]
fn test_object_cycle_is_error() {
    let mut store = GeometryStore::new();
    let object = store.add_object(Object::new("loop", GeometrySet::new()));
    let inner = instances_of(&[(InstanceReference::Object(object), Mat4::IDENTITY)]);
    if let Some(o) = store.object_mut(object) {
        o.geometry = GeometrySet::from_instances(inner.clone());
    }
    let root = GeometrySet::from_instances(inner);
    let err = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::CyclicInstancing(ref name) if name.contains("loop")));
}

#[test]
fn test_same_object_twice_is_not_a_cycle() {
    let mut store = GeometryStore::new();
    let mesh = store.add_mesh(triangle());
    let object = store.add_object(Object::new("tri", GeometrySet::from_mesh(mesh)));
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::Object(object), Mat4::IDENTITY),
        (InstanceReference::Object(object), Mat4::from_translation(Vec3::X)),
    ]));
    let (tasks, _) = gather(&store, &root, &RealizeOptions::default()).unwrap();
    assert_eq!(tasks.meshes.len(), 2);
}

#[test]
fn test_nested_fallbacks_inherit() {
    let mut store = GeometryStore::new();
    let cloud = store.add_point_cloud(PointCloud::from_positions(vec![Vec3::ZERO, Vec3::X]));
    let mut inner = instances_of(&[(
        InstanceReference::GeometrySet(GeometrySet::from_point_cloud(cloud)),
        Mat4::IDENTITY,
    )]);
    inner
        .add_attribute("size", AttrDomain::Instance, AttributeArray::from_vec(vec![2.0_f32]))
        .unwrap();
    let mut outer = instances_of(&[(InstanceReference::GeometrySet(GeometrySet::from_instances(inner)), Mat4::IDENTITY)]);
    outer
        .add_attribute("weight", AttrDomain::Instance, AttributeArray::from_vec(vec![3_i32]))
        .unwrap();
    let root = GeometrySet::from_instances(outer);

    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let realized = store.point_cloud(result.geometry.point_cloud.unwrap()).unwrap();
    assert_eq!(realized.attributes.typed::<f32>("size", AttrDomain::Point).unwrap(), &[2.0, 2.0]);
    assert_eq!(realized.attributes.typed::<i32>("weight", AttrDomain::Point).unwrap(), &[3, 3]);
}

#[test]
fn test_fallback_converted_to_schema_type() {
    let mut store = GeometryStore::new();
    let mut mesh = triangle();
    mesh.add_attribute("w", AttrDomain::Point, AttributeArray::from_vec(vec![0.5_f32; 3]))
        .unwrap();
    let mesh_key = store.add_mesh(mesh);
    let plain = store.add_mesh(triangle());
    let mut instances = instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(mesh_key)), Mat4::IDENTITY),
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(plain)), Mat4::IDENTITY),
    ]);
    instances
        .add_attribute("w", AttrDomain::Instance, AttributeArray::from_vec(vec![1_i32, 4]))
        .unwrap();
    let result = realize_instances(&mut store, GeometrySet::from_instances(instances), &RealizeOptions::default()).unwrap();
    let realized = store.mesh(result.geometry.mesh.unwrap()).unwrap();
    let w = realized.attributes.typed::<f32>("w", AttrDomain::Point).unwrap();
    assert_eq!(w, &[0.5, 0.5, 0.5, 4.0, 4.0, 4.0]);
}

#[test]
fn test_point_cloud_builtins() {
    let mut store = GeometryStore::new();
    let mut with_radius = PointCloud::from_positions(vec![Vec3::ZERO]);
    with_radius
        .add_attribute("radius", AttrDomain::Point, AttributeArray::from_vec(vec![0.5_f32]))
        .unwrap();
    let a = store.add_point_cloud(with_radius);
    let b = store.add_point_cloud(PointCloud::from_positions(vec![Vec3::ONE]));
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_point_cloud(a)), Mat4::IDENTITY),
        (InstanceReference::GeometrySet(GeometrySet::from_point_cloud(b)), Mat4::IDENTITY),
    ]));
    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let realized = store.point_cloud(result.geometry.point_cloud.unwrap()).unwrap();
    assert_eq!(realized.radii().unwrap(), &[0.5, crate::geom::point_cloud::DEFAULT_POINT_RADIUS]);
    assert!(!realized.attributes.contains("id"));
}

#[test]
fn test_curves_builtins_and_offsets() {
    let mut store = GeometryStore::new();
    let mut bezier = Curves::from_sizes(vec![Vec3::ZERO, Vec3::X], &[2]).unwrap();
    bezier
        .add_attribute("handle_left", AttrDomain::Point, AttributeArray::from_vec(vec![Vec3::Y; 2]))
        .unwrap();
    bezier
        .add_attribute("resolution", AttrDomain::Curve, AttributeArray::from_vec(vec![4_i32]))
        .unwrap();
    let poly = Curves::from_sizes(vec![Vec3::ZERO, Vec3::Y, Vec3::Z], &[1, 2]).unwrap();
    let a = store.add_curves(bezier);
    let b = store.add_curves(poly);
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_curves(a)), Mat4::from_translation(Vec3::Z)),
        (InstanceReference::GeometrySet(GeometrySet::from_curves(b)), Mat4::IDENTITY),
    ]));
    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let curves = store.curves(result.geometry.curves.unwrap()).unwrap();

    assert_eq!(curves.offsets, [0, 2, 3, 5]);
    let left = curves.attributes.typed::<Vec3>("handle_left", AttrDomain::Point).unwrap();
    assert_eq!(left[0], Vec3::new(0.0, 1.0, 1.0));
    assert_eq!(left[2], Vec3::ZERO);
    let right = curves.attributes.typed::<Vec3>("handle_right", AttrDomain::Point).unwrap();
    assert_eq!(right[0], Vec3::ZERO);
    let resolution = curves.attributes.typed::<i32>("resolution", AttrDomain::Curve).unwrap();
    assert_eq!(resolution, &[4, 12, 12]);
    assert!(!curves.attributes.contains("radius"));
}

#[test]
fn test_loose_hints_require_all_sources() {
    let mut store = GeometryStore::new();
    let mut cached = triangle();
    cached.cache_loose_counts();
    let cached = store.add_mesh(cached);
    let uncached = store.add_mesh(triangle());

    let realize = |store: &mut GeometryStore, keys: &[MeshKey]| {
        let references: Vec<_> = keys
            .iter()
            .map(|&k| (InstanceReference::GeometrySet(GeometrySet::from_mesh(k)), Mat4::IDENTITY))
            .collect();
        let result = realize_instances(store, GeometrySet::from_instances(instances_of(&references)), &RealizeOptions::default())
            .unwrap();
        let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
        (mesh.cached_loose_edges(), mesh.cached_loose_verts())
    };
    assert_eq!(realize(&mut store, &[cached, cached]), (Some(0), Some(0)));
    assert_eq!(realize(&mut store, &[cached, uncached]), (None, None));
}

#[test]
fn test_material_slots_merge() {
    let mut store = GeometryStore::new();
    let red = store.add_material(crate::scene::Material::new("red"));
    let blue = store.add_material(crate::scene::Material::new("blue"));
    let mut a = triangle();
    a.materials = vec![Some(red)];
    let mut b = triangle();
    b.materials = vec![Some(blue), Some(red)];
    b.add_attribute("material_index", AttrDomain::Face, AttributeArray::from_vec(vec![1_i32]))
        .unwrap();
    let a = store.add_mesh(a);
    let b = store.add_mesh(b);
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(a)), Mat4::IDENTITY),
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(b)), Mat4::IDENTITY),
    ]));
    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
    assert_eq!(mesh.materials, vec![Some(red), Some(blue)]);
    let indices = mesh.attributes.typed::<i32>("material_index", AttrDomain::Face).unwrap();
    assert_eq!(indices, &[0, 0]);
}

// ============================================================================
// Normals, vertex groups and stored ids
// ============================================================================

#[test]
fn test_custom_normals_follow_rotation() {
    let mut store = GeometryStore::new();
    let mut with_normal = triangle();
    with_normal
        .add_attribute("custom_normal", AttrDomain::Face, AttributeArray::from_vec(vec![Vec3::X]))
        .unwrap();
    let with_normal = store.add_mesh(with_normal);
    let plain = store.add_mesh(triangle());
    let quarter_turn = Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0)) * Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(with_normal)), quarter_turn),
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(plain)), quarter_turn),
    ]));

    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
    let normals = mesh.attributes.typed::<Vec3>("custom_normal", AttrDomain::Face).unwrap();
    assert_eq!(normals.len(), 2);
    assert!(normals[0].abs_diff_eq(Vec3::Y, 1e-5));
    assert!(normals[1].abs_diff_eq(Vec3::Z, 1e-5));
}

#[test]
fn test_curve_normals_default_up() {
    let mut store = GeometryStore::new();
    let mut with_normal = Curves::from_sizes(vec![Vec3::ZERO, Vec3::X], &[2]).unwrap();
    with_normal
        .add_attribute("custom_normal", AttrDomain::Point, AttributeArray::from_vec(vec![Vec3::X; 2]))
        .unwrap();
    let with_normal = store.add_curves(with_normal);
    let plain = store.add_curves(Curves::from_sizes(vec![Vec3::ZERO, Vec3::X], &[2]).unwrap());
    let quarter_turn = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_curves(with_normal)), quarter_turn),
        (InstanceReference::GeometrySet(GeometrySet::from_curves(plain)), quarter_turn),
    ]));

    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let curves = store.curves(result.geometry.curves.unwrap()).unwrap();
    let normals = curves.attributes.typed::<Vec3>("custom_normal", AttrDomain::Point).unwrap();
    assert!(normals[0].abs_diff_eq(Vec3::Y, 1e-5));
    assert!(normals[1].abs_diff_eq(Vec3::Y, 1e-5));
    assert_eq!(&normals[2..], &[crate::geom::curves::DEFAULT_CURVE_NORMAL; 2]);
}

#[test]
fn test_vertex_group_names_merge() {
    let mut store = GeometryStore::new();
    let mut a = triangle();
    a.add_attribute("grip", AttrDomain::Point, AttributeArray::from_vec(vec![1.0_f32; 3]))
        .unwrap();
    a.vertex_group_names = vec!["grip".into(), "missing".into()];
    let mut b = triangle();
    b.add_attribute("tip", AttrDomain::Point, AttributeArray::from_vec(vec![0.5_f32; 3]))
        .unwrap();
    b.add_attribute("grip", AttrDomain::Point, AttributeArray::from_vec(vec![0.0_f32; 3]))
        .unwrap();
    b.vertex_group_names = vec!["tip".into(), "grip".into()];
    let a = store.add_mesh(a);
    let b = store.add_mesh(b);
    let root = GeometrySet::from_instances(instances_of(&[
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(a)), Mat4::IDENTITY),
        (InstanceReference::GeometrySet(GeometrySet::from_mesh(b)), Mat4::IDENTITY),
    ]));

    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
    assert_eq!(mesh.vertex_group_names, vec!["grip".to_string(), "tip".to_string()]);
    let tip = mesh.attributes.typed::<f32>("tip", AttrDomain::Point).unwrap();
    assert_eq!(tip, &[0.0, 0.0, 0.0, 0.5, 0.5, 0.5]);
}

#[test]
fn test_float_point_ids_hashed_by_value() {
    let mut store = GeometryStore::new();
    let mut cloud = PointCloud::from_positions(vec![Vec3::ZERO, Vec3::X]);
    cloud
        .add_attribute("id", AttrDomain::Point, AttributeArray::from_vec(vec![3.0_f32, 9.0]))
        .unwrap();
    let cloud = store.add_point_cloud(cloud);
    let root = GeometrySet::from_instances(instances_of(&[(
        InstanceReference::GeometrySet(GeometrySet::from_point_cloud(cloud)),
        Mat4::IDENTITY,
    )]));

    let result = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();
    let realized = store.point_cloud(result.geometry.point_cloud.unwrap()).unwrap();
    let path = lookup3::hash2(0, 0);
    let ids = realized.attributes.typed::<i32>("id", AttrDomain::Point).unwrap();
    assert_eq!(ids, &[lookup3::hash2(path, 3) as i32, lookup3::hash2(path, 9) as i32]);
}

#[test]
fn test_instance_ids_inside_objects_survive_keep() {
    let mut store = GeometryStore::new();
    let cloud = store.add_point_cloud(PointCloud::from_positions(vec![Vec3::ZERO]));
    let mut inner = instances_of(&[(
        InstanceReference::GeometrySet(GeometrySet::from_point_cloud(cloud)),
        Mat4::IDENTITY,
    )]);
    inner
        .add_attribute("id", AttrDomain::Instance, AttributeArray::from_vec(vec![7_i32]))
        .unwrap();
    let object = store.add_object(Object::new("scatter", GeometrySet::from_instances(inner.clone())));
    let options = RealizeOptions {
        keep_original_ids: true,
        ..Default::default()
    };

    let through_object =
        GeometrySet::from_instances(instances_of(&[(InstanceReference::Object(object), Mat4::IDENTITY)]));
    let result = realize_instances(&mut store, through_object, &options).unwrap();
    let realized = store.point_cloud(result.geometry.point_cloud.unwrap()).unwrap();
    assert_eq!(realized.attributes.typed::<i32>("id", AttrDomain::Point).unwrap(), &[0]);

    let nested_set = GeometrySet::from_instances(instances_of(&[(
        InstanceReference::GeometrySet(GeometrySet::from_instances(inner)),
        Mat4::IDENTITY,
    )]));
    let result = realize_instances(&mut store, nested_set, &options).unwrap();
    let realized = store.point_cloud(result.geometry.point_cloud.unwrap()).unwrap();
    assert!(!realized.attributes.contains("id"));
}

// ============================================================================
// Selection and depth
// ============================================================================

/// Two top-level copies, at x = 10 and at the origin, of a set holding a
/// triangle and one nested point instance raised by y = 1.
fn two_level_tree(store: &mut GeometryStore) -> (GeometrySet, GeometrySet, GeometrySet) {
    let tri = store.add_mesh(triangle());
    let cloud = store.add_point_cloud(PointCloud::from_positions(vec![Vec3::ZERO]));
    let leaf = GeometrySet::from_point_cloud(cloud);
    let inner = instances_of(&[(InstanceReference::GeometrySet(leaf.clone()), Mat4::from_translation(Vec3::Y))]);
    let child = GeometrySet::from_instances(inner).with_mesh(tri);
    let mut root = instances_of(&[
        (InstanceReference::GeometrySet(child.clone()), Mat4::from_translation(Vec3::X * 10.0)),
        (InstanceReference::GeometrySet(child.clone()), Mat4::IDENTITY),
    ]);
    root.add_attribute("weight", AttrDomain::Instance, AttributeArray::from_vec(vec![1.0_f32, 2.0]))
        .unwrap();
    (GeometrySet::from_instances(root), child, leaf)
}

#[test]
fn test_depth_one_keeps_nested_instances() {
    let mut store = GeometryStore::new();
    let (root, _, leaf) = two_level_tree(&mut store);
    let depth = VariedDepthOptions::with_depth(2, 1);

    let result = realize_instances_with_depth(&mut store, root, &RealizeOptions::default(), &depth).unwrap();
    let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
    assert_eq!(mesh.num_vertices(), 6);
    assert!(result.geometry.point_cloud.is_none());

    let kept = result.geometry.instances.unwrap();
    assert_eq!(kept.references(), &[InstanceReference::GeometrySet(leaf)]);
    assert_eq!(kept.transforms()[0], Mat4::from_translation(Vec3::X * 10.0) * Mat4::from_translation(Vec3::Y));
    assert_eq!(kept.transforms()[1], Mat4::from_translation(Vec3::Y));
    let weight = kept.attributes().typed::<f32>("weight", AttrDomain::Instance).unwrap();
    assert_eq!(weight, &[1.0, 2.0]);
}

#[test]
fn test_depth_two_realizes_everything() {
    let mut store = GeometryStore::new();
    let (root, _, _) = two_level_tree(&mut store);
    let depth = VariedDepthOptions::with_depth(2, 2);

    let result = realize_instances_with_depth(&mut store, root, &RealizeOptions::default(), &depth).unwrap();
    assert!(result.geometry.instances.is_none());
    let cloud = store.point_cloud(result.geometry.point_cloud.unwrap()).unwrap();
    assert_eq!(cloud.positions, vec![Vec3::new(10.0, 1.0, 0.0), Vec3::Y]);
}

#[test]
fn test_unselected_instances_pass_through() {
    let mut store = GeometryStore::new();
    let (root, child, leaf) = two_level_tree(&mut store);
    let partial = VariedDepthOptions {
        selection: vec![1],
        depths: vec![None, Some(1)],
    };

    let result = realize_instances_with_depth(&mut store, root.clone(), &RealizeOptions::default(), &partial).unwrap();
    let mesh = store.mesh(result.geometry.mesh.unwrap()).unwrap();
    assert_eq!(mesh.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    let kept = result.geometry.instances.unwrap();
    assert_eq!(
        kept.references(),
        &[InstanceReference::GeometrySet(child), InstanceReference::GeometrySet(leaf)]
    );
    assert_eq!(kept.handles(), &[0, 1]);
    assert_eq!(kept.transforms()[0], Mat4::from_translation(Vec3::X * 10.0));
    assert_eq!(kept.transforms()[1], Mat4::from_translation(Vec3::Y));
    let weight = kept.attributes().typed::<f32>("weight", AttrDomain::Instance).unwrap();
    assert_eq!(weight, &[1.0, 2.0]);

    let depth_zero = VariedDepthOptions {
        selection: vec![0, 1],
        depths: vec![Some(0), Some(1)],
    };
    let again = realize_instances_with_depth(&mut store, root, &RealizeOptions::default(), &depth_zero).unwrap();
    assert_eq!(again.geometry.instances.as_deref(), Some(&*kept));
}

#[test]
fn test_nothing_selected_returns_input() {
    let mut store = GeometryStore::new();
    let (root, _, _) = two_level_tree(&mut store);
    let result =
        realize_instances_with_depth(&mut store, root.clone(), &RealizeOptions::default(), &VariedDepthOptions::default())
            .unwrap();
    assert_eq!(result.geometry, root);
}

#[test]
fn test_selection_out_of_range() {
    let mut store = GeometryStore::new();
    let (root, _, _) = two_level_tree(&mut store);
    let depth = VariedDepthOptions {
        selection: vec![0, 5],
        depths: Vec::new(),
    };
    let err = realize_instances_with_depth(&mut store, root, &RealizeOptions::default(), &depth).unwrap_err();
    assert!(matches!(err, Error::InvalidSelection { index: 5, count: 2 }));
}

#[test]
fn test_depth_limit_makes_instances_tasks() {
    let mut store = GeometryStore::new();
    let (root, _, _) = two_level_tree(&mut store);
    let (tasks, offsets) =
        gather_with_depth(&store, &root, &RealizeOptions::default(), &VariedDepthOptions::with_depth(2, 1)).unwrap();
    assert_eq!(tasks.instances.len(), 2);
    assert!(tasks.point_clouds.is_empty());
    assert_eq!(offsets.mesh.vertex, 6);
    assert_eq!(tasks.instances[0].transform, Mat4::from_translation(Vec3::X * 10.0));
    assert!(!tasks.instances[0].ids_stripped);
}

// ============================================================================
// Properties over random instance trees
// ============================================================================

/// One top-level instance: which leaf it places, how many copies a nested
/// group holds, and an x offset.
type InstanceSpec = (u8, usize, f32);

fn random_tree(store: &mut GeometryStore, specs: &[InstanceSpec]) -> (GeometrySet, usize) {
    let quad = store.add_mesh(
        Mesh::from_polygons(vec![Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y], &[&[0, 1, 2, 3]]).unwrap(),
    );
    let tri = store.add_mesh(triangle());
    let mut vertices = 0;
    let references: Vec<_> = specs
        .iter()
        .map(|&(leaf, copies, x)| {
            let transform = Mat4::from_translation(Vec3::new(x, 0.0, 0.0));
            let reference = match leaf % 3 {
                0 => {
                    vertices += 4;
                    InstanceReference::GeometrySet(GeometrySet::from_mesh(quad))
                }
                1 => {
                    vertices += 3;
                    InstanceReference::GeometrySet(GeometrySet::from_mesh(tri))
                }
                _ => {
                    vertices += 3 * copies;
                    let nested: Vec<_> = (0..copies)
                        .map(|i| {
                            (
                                InstanceReference::GeometrySet(GeometrySet::from_mesh(tri)),
                                Mat4::from_translation(Vec3::new(0.0, i as f32, 0.0)),
                            )
                        })
                        .collect();
                    InstanceReference::GeometrySet(GeometrySet::from_instances(instances_of(&nested)))
                }
            };
            (reference, transform)
        })
        .collect();
    (GeometrySet::from_instances(instances_of(&references)), vertices)
}

proptest! {
    #[test]
    fn test_tasks_disjoint_and_complete(specs in prop::collection::vec((0u8..3, 0usize..4, -10.0f32..10.0), 1..10)) {
        let mut store = GeometryStore::new();
        let (root, vertices) = random_tree(&mut store, &specs);
        let options = RealizeOptions::default();
        let selection = VariedDepthOptions::all(specs.len()).resolve(specs.len()).unwrap();
        let reachable = scan(&store, &root, &selection, &options).unwrap();
        let point_clouds = preprocess_point_clouds(&store, &reachable, &options).unwrap();
        let meshes = preprocess_meshes(&store, &reachable, &options).unwrap();
        let curves = preprocess_curves(&store, &reachable, &options).unwrap();
        let instances = schema::instances_schema(&reachable.kept_instances, &reachable.instances, &options);
        let info = GatherInfo {
            store: &store,
            options: &options,
            point_clouds: &point_clouds,
            meshes: &meshes,
            curves: &curves,
            instances: &instances,
        };
        let (tasks, offsets) = gather_realize_tasks(&info, &root, &selection, None).unwrap();
        prop_assert!(tasks.instances.is_empty());

        prop_assert_eq!(offsets.mesh.vertex, vertices);
        let mut next = 0;
        for task in &tasks.meshes {
            prop_assert_eq!(task.start.vertex, next);
            next += meshes.realize_info[task.info_index].mesh.num_vertices();
        }
        prop_assert_eq!(next, vertices);
    }

    #[test]
    fn test_realize_deterministic(specs in prop::collection::vec((0u8..3, 0usize..4, -10.0f32..10.0), 1..10)) {
        let mut store = GeometryStore::new();
        let (root, vertices) = random_tree(&mut store, &specs);
        let first = realize_instances(&mut store, root.clone(), &RealizeOptions::default()).unwrap();
        let second = realize_instances(&mut store, root, &RealizeOptions::default()).unwrap();

        match (first.geometry.mesh, second.geometry.mesh) {
            (Some(a), Some(b)) => {
                let a = store.mesh(a).unwrap();
                let b = store.mesh(b).unwrap();
                prop_assert_eq!(a.num_vertices(), vertices);
                prop_assert_eq!(&a.positions, &b.positions);
                prop_assert_eq!(&a.corner_verts, &b.corner_verts);
                prop_assert!(a.validate().is_ok());
            }
            (None, None) => prop_assert_eq!(vertices, 0),
            _ => prop_assert!(false, "realized mesh presence differs between runs"),
        }
    }
}
