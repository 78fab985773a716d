//! Point cloud task execution.

use rayon::prelude::*;

use super::attributes::{check_size, copy_generic_attributes, schema_writers, split_writers};
use super::gather::RealizePointCloudTask;
use super::ids::create_result_ids;
use super::info::{AllPointCloudsInfo, PointCloudRealizeInfo};
use super::RealizeOptions;
use crate::attribute::{AttrDomain, AttributeAccessor, AttributeArray, AttributeSliceMut};
use crate::geom::instances::INSTANCE_ID;
use crate::geom::point_cloud::{DEFAULT_POINT_RADIUS, RADIUS};
use crate::geom::PointCloud;
use crate::util::{split_counts_mut, split_optional_mut, transform_points, Result, Vec3};

/// Output windows owned by one task.
struct PointCloudTaskOutput<'a> {
    positions: &'a mut [Vec3],
    radii: Option<&'a mut [f32]>,
    ids: Option<&'a mut [i32]>,
    attributes: Vec<AttributeSliceMut<'a>>,
}

/// Merge all point cloud tasks into one point cloud of `total` points.
#[tracing::instrument(skip_all, fields(tasks = tasks.len(), points = total))]
pub(crate) fn execute_realize_point_cloud_tasks(
    options: &RealizeOptions,
    all: &AllPointCloudsInfo<'_>,
    tasks: &[RealizePointCloudTask],
    total: usize,
) -> Result<PointCloud> {
    check_size("point cloud", total)?;
    let schema = &all.schema;

    let mut positions = vec![Vec3::ZERO; total];
    let mut radii = schema.create_radius.then(|| vec![0.0_f32; total]);
    let mut ids = schema.create_id.then(|| vec![0_i32; total]);
    let mut writers = schema_writers(&schema.attributes, |_| total);

    let counts: Vec<usize> = tasks
        .iter()
        .map(|task| all.realize_info[task.info_index].point_cloud.num_points())
        .collect();
    debug_assert!(
        tasks
            .iter()
            .zip(&counts)
            .try_fold(0, |next, (task, &count)| (task.start == next).then_some(next + count))
            == Some(total),
        "point cloud task windows must tile 0..{total} in order"
    );

    let outputs: Vec<PointCloudTaskOutput<'_>> = split_counts_mut(&mut positions, counts.iter().copied())
        .into_iter()
        .zip(split_optional_mut(radii.as_deref_mut(), counts.iter().copied()))
        .zip(split_optional_mut(ids.as_deref_mut(), counts.iter().copied()))
        .zip(split_writers(&mut writers, tasks.len(), |task, _| counts[task]))
        .map(|(((positions, radii), ids), attributes)| PointCloudTaskOutput {
            positions,
            radii,
            ids,
            attributes,
        })
        .collect();

    tasks.par_iter().zip(outputs.into_par_iter()).for_each(|(task, output)| {
        realize_point_cloud(options, &all.realize_info[task.info_index], task, output);
    });

    let mut result = PointCloud::from_positions(positions);
    if let Some(first) = tasks.first() {
        result.materials = all.realize_info[first.info_index].point_cloud.materials.clone();
    }
    for writer in writers {
        writer.finish(&mut result)?;
    }
    if let Some(radii) = radii {
        result.add_attribute(RADIUS, AttrDomain::Point, AttributeArray::from_vec(radii))?;
    }
    if let Some(ids) = ids {
        result.add_attribute(INSTANCE_ID, AttrDomain::Point, AttributeArray::from_vec(ids))?;
    }
    Ok(result)
}

fn realize_point_cloud(
    options: &RealizeOptions,
    info: &PointCloudRealizeInfo<'_>,
    task: &RealizePointCloudTask,
    mut output: PointCloudTaskOutput<'_>,
) {
    transform_points(&info.point_cloud.positions, &task.transform, output.positions);
    if let Some(dst) = output.radii {
        match &info.radii {
            Some(src) => dst.copy_from_slice(src),
            None => dst.fill(DEFAULT_POINT_RADIUS),
        }
    }
    if let Some(dst) = output.ids {
        create_result_ids(options.keep_original_ids, info.stored_ids.as_deref(), task.id, dst);
    }
    copy_generic_attributes(&info.attributes, &task.fallbacks, &mut output.attributes);
}
