//! Shared scene builders for integration tests.

#![allow(dead_code)]

use geo_realize::prelude::*;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install a log subscriber when `RUST_LOG` is set.
pub fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env());
    // Several tests race to install it; the first one wins.
    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub fn triangle() -> Mesh {
    Mesh::from_polygons(
        vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
        &[&[0, 1, 2]],
    )
    .expect("valid triangle")
}

/// Instances placing `reference` once per transform.
pub fn instance_all(reference: InstanceReference, transforms: &[Mat4]) -> Instances {
    let mut instances = Instances::new();
    let handle = instances.add_reference(reference);
    for transform in transforms {
        instances.add_instance(handle, *transform).expect("valid handle");
    }
    instances
}

pub fn realize(store: &mut GeometryStore, geometry: GeometrySet, options: &RealizeOptions) -> RealizeResult {
    init_tracing();
    let result = realize_instances(store, geometry, options).expect("realize");
    assert!(result.errors.is_empty(), "unexpected errors: {:?}", result.errors);
    result
}
