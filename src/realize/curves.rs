//! Curves task execution.

use rayon::prelude::*;

use super::attributes::{check_size, copy_generic_attributes, schema_writers, split_writers};
use super::gather::{CurvesElementStart, RealizeCurvesTask};
use super::ids::create_result_ids;
use super::info::{AllCurvesInfo, CurvesRealizeInfo};
use super::RealizeOptions;
use crate::attribute::{AttrDomain, AttributeAccessor, AttributeArray, AttributeSliceMut};
use crate::geom::curves::{
    DEFAULT_CURVE_NORMAL, DEFAULT_CURVE_RADIUS, DEFAULT_NURBS_WEIGHT, DEFAULT_RESOLUTION, HANDLE_LEFT, HANDLE_RIGHT,
    NURBS_WEIGHT, RADIUS, RESOLUTION,
};
use crate::geom::instances::INSTANCE_ID;
use crate::geom::{Curves, CUSTOM_NORMAL};
use crate::util::{
    split_counts_mut, split_optional_mut, transform_normals, transform_points, Mat4, Result, Vec3, PARALLEL_GRAIN,
};

struct CurvesTaskOutput<'a> {
    positions: &'a mut [Vec3],
    offsets: &'a mut [u32],
    ids: Option<&'a mut [i32]>,
    handle_left: Option<&'a mut [Vec3]>,
    handle_right: Option<&'a mut [Vec3]>,
    radius: Option<&'a mut [f32]>,
    nurbs_weight: Option<&'a mut [f32]>,
    resolution: Option<&'a mut [i32]>,
    custom_normal: Option<&'a mut [Vec3]>,
    attributes: Vec<AttributeSliceMut<'a>>,
}

/// Merge all curves tasks into one curves geometry.
#[tracing::instrument(skip_all, fields(tasks = tasks.len(), points = total.point, curves = total.curve))]
pub(crate) fn execute_realize_curves_tasks(
    options: &RealizeOptions,
    all: &AllCurvesInfo<'_>,
    tasks: &[RealizeCurvesTask],
    total: CurvesElementStart,
) -> Result<Curves> {
    check_size("curves", total.point)?;
    check_size("curves", total.curve)?;
    let schema = &all.schema;

    let mut positions = vec![Vec3::ZERO; total.point];
    let mut offsets = vec![0_u32; total.curve + 1];
    let mut ids = schema.create_id.then(|| vec![0_i32; total.point]);
    let mut handle_left = schema.create_handles.then(|| vec![Vec3::ZERO; total.point]);
    let mut handle_right = schema.create_handles.then(|| vec![Vec3::ZERO; total.point]);
    let mut radius = schema.create_radius.then(|| vec![0.0_f32; total.point]);
    let mut nurbs_weight = schema.create_nurbs_weight.then(|| vec![0.0_f32; total.point]);
    let mut resolution = schema.create_resolution.then(|| vec![0_i32; total.curve]);
    let mut custom_normal = schema.create_custom_normal.then(|| vec![Vec3::ZERO; total.point]);
    let mut writers = schema_writers(&schema.attributes, |domain| match domain {
        AttrDomain::Curve => total.curve,
        _ => total.point,
    });

    let sources: Vec<&Curves> = tasks
        .iter()
        .map(|task| all.realize_info[task.info_index].curves)
        .collect();
    let points = || sources.iter().map(|c| c.num_points());

    let outputs: Vec<CurvesTaskOutput<'_>> = split_counts_mut(&mut positions, points())
        .into_iter()
        .zip(split_counts_mut(&mut offsets[..total.curve], sources.iter().map(|c| c.num_curves())))
        .zip(split_optional_mut(ids.as_deref_mut(), points()))
        .zip(split_optional_mut(handle_left.as_deref_mut(), points()))
        .zip(split_optional_mut(handle_right.as_deref_mut(), points()))
        .zip(split_optional_mut(radius.as_deref_mut(), points()))
        .zip(split_optional_mut(nurbs_weight.as_deref_mut(), points()))
        .zip(split_optional_mut(
            resolution.as_deref_mut(),
            sources.iter().map(|c| c.num_curves()),
        ))
        .zip(split_optional_mut(custom_normal.as_deref_mut(), points()))
        .zip(split_writers(&mut writers, tasks.len(), |task, domain| {
            sources[task].domain_size(domain).unwrap_or(0)
        }))
        .map(
            |(
                (
                    (((((((positions, offsets), ids), handle_left), handle_right), radius), nurbs_weight), resolution),
                    custom_normal,
                ),
                attributes,
            )| CurvesTaskOutput {
                positions,
                offsets,
                ids,
                handle_left,
                handle_right,
                radius,
                nurbs_weight,
                resolution,
                custom_normal,
                attributes,
            },
        )
        .collect();

    tasks.par_iter().zip(outputs.into_par_iter()).for_each(|(task, output)| {
        realize_curves(options, &all.realize_info[task.info_index], task, output);
    });
    offsets[total.curve] = total.point as u32;

    let mut result = Curves::new();
    result.positions = positions;
    result.offsets = offsets;
    if let Some(first) = sources.first() {
        result.params = first.params.clone();
    }
    for writer in writers {
        writer.finish(&mut result)?;
    }
    if let Some(ids) = ids {
        result.add_attribute(INSTANCE_ID, AttrDomain::Point, AttributeArray::from_vec(ids))?;
    }
    if let (Some(left), Some(right)) = (handle_left, handle_right) {
        result.add_attribute(HANDLE_LEFT, AttrDomain::Point, AttributeArray::from_vec(left))?;
        result.add_attribute(HANDLE_RIGHT, AttrDomain::Point, AttributeArray::from_vec(right))?;
    }
    if let Some(radius) = radius {
        result.add_attribute(RADIUS, AttrDomain::Point, AttributeArray::from_vec(radius))?;
    }
    if let Some(nurbs_weight) = nurbs_weight {
        result.add_attribute(NURBS_WEIGHT, AttrDomain::Point, AttributeArray::from_vec(nurbs_weight))?;
    }
    if let Some(resolution) = resolution {
        result.add_attribute(RESOLUTION, AttrDomain::Curve, AttributeArray::from_vec(resolution))?;
    }
    if let Some(custom_normal) = custom_normal {
        result.add_attribute(CUSTOM_NORMAL, AttrDomain::Point, AttributeArray::from_vec(custom_normal))?;
    }
    Ok(result)
}

fn realize_curves(
    options: &RealizeOptions,
    info: &CurvesRealizeInfo<'_>,
    task: &RealizeCurvesTask,
    mut output: CurvesTaskOutput<'_>,
) {
    let curves = info.curves;

    transform_points(&curves.positions, &task.transform, output.positions);
    let point = task.start.point as u32;
    output
        .offsets
        .par_iter_mut()
        .with_min_len(PARALLEL_GRAIN)
        .zip(curves.offsets.par_iter())
        .for_each(|(dst, &src)| *dst = src + point);

    transform_handles(info.handle_left.as_deref(), &task.transform, output.handle_left);
    transform_handles(info.handle_right.as_deref(), &task.transform, output.handle_right);
    copy_or_fill(info.radius.as_deref(), DEFAULT_CURVE_RADIUS, output.radius);
    copy_or_fill(info.nurbs_weight.as_deref(), DEFAULT_NURBS_WEIGHT, output.nurbs_weight);
    copy_or_fill(info.resolution.as_deref(), DEFAULT_RESOLUTION, output.resolution);
    match (info.custom_normal.as_deref(), output.custom_normal) {
        (Some(src), Some(dst)) => transform_normals(src, &task.transform, dst),
        (None, Some(dst)) => dst.fill(DEFAULT_CURVE_NORMAL),
        (_, None) => {}
    }

    if let Some(dst) = output.ids {
        create_result_ids(options.keep_original_ids, info.stored_ids.as_deref(), task.id, dst);
    }
    copy_generic_attributes(&info.attributes, &task.fallbacks, &mut output.attributes);
}

fn transform_handles(src: Option<&[Vec3]>, transform: &Mat4, dst: Option<&mut [Vec3]>) {
    match (src, dst) {
        (Some(src), Some(dst)) => transform_points(src, transform, dst),
        (None, Some(dst)) => dst.fill(Vec3::ZERO),
        (_, None) => {}
    }
}

fn copy_or_fill<T: Copy>(src: Option<&[T]>, default: T, dst: Option<&mut [T]>) {
    match (src, dst) {
        (Some(src), Some(dst)) => dst.copy_from_slice(src),
        (None, Some(dst)) => dst.fill(default),
        (_, None) => {}
    }
}
