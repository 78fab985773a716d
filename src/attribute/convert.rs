//! Implicit conversions between attribute types.
//!
//! Every built-in type converts into every other one:
//!
//! | from \ to      | rule                                               |
//! |----------------|----------------------------------------------------|
//! | vector → float | component average                                  |
//! | color → float  | luminance (Rec. 709 weights)                       |
//! | float → int    | truncation toward zero, saturating                 |
//! | any → bool     | `> 0` for scalars, non-zero for vectors            |
//! | scalar → color | gray with alpha 1                                  |

use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use super::array::{dispatch_array, dispatch_type};
use super::{AttrType, AttrValue, AttributeArray, AttributeType};
use crate::util::PARALLEL_GRAIN;

const LUMINANCE: Vec3 = Vec3::new(0.2126, 0.7152, 0.0722);

/// Convert a single value to `to`.
pub fn convert_value(value: AttrValue, to: AttrType) -> AttrValue {
    if value.attr_type() == to {
        return value;
    }
    match to {
        AttrType::Bool => AttrValue::Bool(as_bool(value)),
        AttrType::Int8 => AttrValue::Int8(as_int(value).clamp(i8::MIN as i32, i8::MAX as i32) as i8),
        AttrType::Int => AttrValue::Int(as_int(value)),
        AttrType::Float => AttrValue::Float(as_float(value)),
        AttrType::Float2 => AttrValue::Float2(as_float2(value)),
        AttrType::Float3 => AttrValue::Float3(as_float3(value)),
        AttrType::Color => AttrValue::Color(as_color(value)),
    }
}

/// Convert a whole array to `to`. Arrays already of that type are cloned.
pub fn convert_array(src: &AttributeArray, to: AttrType) -> AttributeArray {
    if src.attr_type() == to {
        return src.clone();
    }
    dispatch_type!(to, D => {
        let values: Vec<D> = dispatch_array!(src, data => convert_typed::<_, D>(data));
        AttributeArray::from_vec(values)
    })
}

fn convert_typed<S: AttributeType, D: AttributeType>(src: &[S]) -> Vec<D> {
    src.par_iter()
        .with_min_len(PARALLEL_GRAIN)
        .map(|v| D::from_value(convert_value(v.into_value(), D::TYPE)).unwrap_or_default())
        .collect()
}

fn as_float(value: AttrValue) -> f32 {
    match value {
        AttrValue::Bool(b) => b as i32 as f32,
        AttrValue::Int8(i) => i as f32,
        AttrValue::Int(i) => i as f32,
        AttrValue::Float(f) => f,
        AttrValue::Float2(v) => (v.x + v.y) / 2.0,
        AttrValue::Float3(v) => (v.x + v.y + v.z) / 3.0,
        AttrValue::Color(c) => c.truncate().dot(LUMINANCE),
    }
}

fn as_int(value: AttrValue) -> i32 {
    match value {
        AttrValue::Bool(b) => b as i32,
        AttrValue::Int8(i) => i as i32,
        AttrValue::Int(i) => i,
        // `as` truncates toward zero and saturates on overflow.
        other => as_float(other) as i32,
    }
}

fn as_bool(value: AttrValue) -> bool {
    match value {
        AttrValue::Bool(b) => b,
        AttrValue::Int8(i) => i > 0,
        AttrValue::Int(i) => i > 0,
        AttrValue::Float(f) => f > 0.0,
        AttrValue::Float2(v) => v != Vec2::ZERO,
        AttrValue::Float3(v) => v != Vec3::ZERO,
        AttrValue::Color(c) => as_float(AttrValue::Color(c)) > 0.0,
    }
}

fn as_float2(value: AttrValue) -> Vec2 {
    match value {
        AttrValue::Float2(v) => v,
        AttrValue::Float3(v) => v.truncate(),
        AttrValue::Color(c) => Vec2::new(c.x, c.y),
        scalar => Vec2::splat(as_float(scalar)),
    }
}

fn as_float3(value: AttrValue) -> Vec3 {
    match value {
        AttrValue::Float2(v) => v.extend(0.0),
        AttrValue::Float3(v) => v,
        AttrValue::Color(c) => c.truncate(),
        scalar => Vec3::splat(as_float(scalar)),
    }
}

fn as_color(value: AttrValue) -> Vec4 {
    match value {
        AttrValue::Float2(v) => Vec4::new(v.x, v.y, 0.0, 1.0),
        AttrValue::Float3(v) => v.extend(1.0),
        AttrValue::Color(c) => c,
        scalar => Vec3::splat(as_float(scalar)).extend(1.0),
    }
}
