//! Dynamically typed attribute buffers.

use glam::{Vec2, Vec3, Vec4};
use rayon::prelude::*;

use super::{AttrType, AttrValue, AttributeType, Bool};
use crate::util::{split_counts_mut, PARALLEL_GRAIN};

/// Match on an [`AttributeArray`] and bind its typed `Vec` to `$data`.
///
/// The body is instantiated once per element type, so it can call generic
/// functions bounded by [`AttributeType`].
macro_rules! dispatch_array {
    ($array:expr, $data:ident => $body:expr) => {
        match $array {
            $crate::attribute::AttributeArray::Bool($data) => $body,
            $crate::attribute::AttributeArray::Int8($data) => $body,
            $crate::attribute::AttributeArray::Int($data) => $body,
            $crate::attribute::AttributeArray::Float($data) => $body,
            $crate::attribute::AttributeArray::Float2($data) => $body,
            $crate::attribute::AttributeArray::Float3($data) => $body,
            $crate::attribute::AttributeArray::Color($data) => $body,
        }
    };
}

/// Run `$body` with `$T` bound to the Rust type of an [`AttrType`].
macro_rules! dispatch_type {
    ($ty:expr, $T:ident => $body:expr) => {
        match $ty {
            $crate::attribute::AttrType::Bool => {
                type $T = $crate::attribute::Bool;
                $body
            }
            $crate::attribute::AttrType::Int8 => {
                type $T = i8;
                $body
            }
            $crate::attribute::AttrType::Int => {
                type $T = i32;
                $body
            }
            $crate::attribute::AttrType::Float => {
                type $T = f32;
                $body
            }
            $crate::attribute::AttrType::Float2 => {
                type $T = glam::Vec2;
                $body
            }
            $crate::attribute::AttrType::Float3 => {
                type $T = glam::Vec3;
                $body
            }
            $crate::attribute::AttrType::Color => {
                type $T = glam::Vec4;
                $body
            }
        }
    };
}

pub(crate) use dispatch_array;
pub(crate) use dispatch_type;

/// Owned attribute values of one type.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeArray {
    Bool(Vec<Bool>),
    Int8(Vec<i8>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Float2(Vec<Vec2>),
    Float3(Vec<Vec3>),
    Color(Vec<Vec4>),
}

impl AttributeArray {
    /// Array of `len` default values.
    pub fn new_default(ty: AttrType, len: usize) -> Self {
        dispatch_type!(ty, T => T::into_array(vec![T::default(); len]))
    }

    /// Array of `len` copies of `value`.
    pub fn filled(value: AttrValue, len: usize) -> Self {
        dispatch_type!(value.attr_type(), T => {
            let v = T::from_value(value).unwrap_or_default();
            T::into_array(vec![v; len])
        })
    }

    /// Wrap a typed buffer.
    #[inline]
    pub fn from_vec<T: AttributeType>(values: Vec<T>) -> Self {
        T::into_array(values)
    }

    /// Element type.
    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Bool(_) => AttrType::Bool,
            Self::Int8(_) => AttrType::Int8,
            Self::Int(_) => AttrType::Int,
            Self::Float(_) => AttrType::Float,
            Self::Float2(_) => AttrType::Float2,
            Self::Float3(_) => AttrType::Float3,
            Self::Color(_) => AttrType::Color,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        dispatch_array!(self, data => data.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value at `index`, or None if out of bounds.
    pub fn get(&self, index: usize) -> Option<AttrValue> {
        dispatch_array!(self, data => data.get(index).map(|v| v.into_value()))
    }

    /// Borrow as a typed slice if the element type is `T`.
    #[inline]
    pub fn typed<T: AttributeType>(&self) -> Option<&[T]> {
        T::slice(self)
    }

    /// Mutably borrow as a typed slice if the element type is `T`.
    #[inline]
    pub fn typed_mut<T: AttributeType>(&mut self) -> Option<&mut [T]> {
        T::slice_mut(self)
    }

    /// Take the typed buffer if the element type is `T`.
    #[inline]
    pub fn into_typed<T: AttributeType>(self) -> Option<Vec<T>> {
        T::into_vec(self)
    }

    /// Raw bytes of the buffer.
    pub fn as_bytes(&self) -> &[u8] {
        dispatch_array!(self, data => bytemuck::cast_slice(data.as_slice()))
    }

    /// New array holding the values at `indices`, in that order.
    pub fn gather(&self, indices: &[usize]) -> Self {
        dispatch_array!(self, data => AttributeArray::from_vec(indices.iter().map(|&i| data[i]).collect::<Vec<_>>()))
    }

    /// Grow or shrink to `len`, filling new elements with the default value.
    pub fn resize(&mut self, len: usize) {
        dispatch_array!(self, data => data.resize(len, Default::default()))
    }

    /// Split into consecutive mutable parts of the given sizes.
    ///
    /// The sizes must not add up to more than the array length.
    pub fn split_mut(&mut self, counts: impl IntoIterator<Item = usize>) -> Vec<AttributeSliceMut<'_>> {
        match self {
            Self::Bool(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Bool).collect(),
            Self::Int8(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Int8).collect(),
            Self::Int(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Int).collect(),
            Self::Float(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Float).collect(),
            Self::Float2(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Float2).collect(),
            Self::Float3(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Float3).collect(),
            Self::Color(d) => split_counts_mut(d, counts).into_iter().map(AttributeSliceMut::Color).collect(),
        }
    }
}

/// Mutable window into an [`AttributeArray`], owned by one realize task.
#[derive(Debug)]
pub enum AttributeSliceMut<'a> {
    Bool(&'a mut [Bool]),
    Int8(&'a mut [i8]),
    Int(&'a mut [i32]),
    Float(&'a mut [f32]),
    Float2(&'a mut [Vec2]),
    Float3(&'a mut [Vec3]),
    Color(&'a mut [Vec4]),
}

impl AttributeSliceMut<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Bool(d) => d.len(),
            Self::Int8(d) => d.len(),
            Self::Int(d) => d.len(),
            Self::Float(d) => d.len(),
            Self::Float2(d) => d.len(),
            Self::Float3(d) => d.len(),
            Self::Color(d) => d.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attr_type(&self) -> AttrType {
        match self {
            Self::Bool(_) => AttrType::Bool,
            Self::Int8(_) => AttrType::Int8,
            Self::Int(_) => AttrType::Int,
            Self::Float(_) => AttrType::Float,
            Self::Float2(_) => AttrType::Float2,
            Self::Float3(_) => AttrType::Float3,
            Self::Color(_) => AttrType::Color,
        }
    }

    /// Copy all values of `src` into this slice.
    ///
    /// Returns false and leaves the slice untouched if `src` has a different
    /// type or length.
    pub fn copy_from(&mut self, src: &AttributeArray) -> bool {
        match (self, src) {
            (Self::Bool(d), AttributeArray::Bool(s)) => copy_typed(s, d),
            (Self::Int8(d), AttributeArray::Int8(s)) => copy_typed(s, d),
            (Self::Int(d), AttributeArray::Int(s)) => copy_typed(s, d),
            (Self::Float(d), AttributeArray::Float(s)) => copy_typed(s, d),
            (Self::Float2(d), AttributeArray::Float2(s)) => copy_typed(s, d),
            (Self::Float3(d), AttributeArray::Float3(s)) => copy_typed(s, d),
            (Self::Color(d), AttributeArray::Color(s)) => copy_typed(s, d),
            _ => false,
        }
    }

    /// Fill the slice with `value`, converted to the slice type.
    pub fn fill(&mut self, value: AttrValue) {
        let value = value.convert(self.attr_type());
        match self {
            Self::Bool(d) => fill_typed(d, value),
            Self::Int8(d) => fill_typed(d, value),
            Self::Int(d) => fill_typed(d, value),
            Self::Float(d) => fill_typed(d, value),
            Self::Float2(d) => fill_typed(d, value),
            Self::Float3(d) => fill_typed(d, value),
            Self::Color(d) => fill_typed(d, value),
        }
    }

    /// Fill the slice with the default value of its type.
    pub fn fill_default(&mut self) {
        self.fill(self.attr_type().default_value());
    }
}

fn copy_typed<T: AttributeType>(src: &[T], dst: &mut [T]) -> bool {
    if src.len() != dst.len() {
        return false;
    }
    dst.par_chunks_mut(PARALLEL_GRAIN)
        .zip(src.par_chunks(PARALLEL_GRAIN))
        .for_each(|(d, s)| d.copy_from_slice(s));
    true
}

fn fill_typed<T: AttributeType>(dst: &mut [T], value: AttrValue) {
    let v = T::from_value(value).unwrap_or_default();
    dst.par_chunks_mut(PARALLEL_GRAIN).for_each(|chunk| chunk.fill(v));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_default() {
        let a = AttributeArray::new_default(AttrType::Float3, 3);
        assert_eq!(a.len(), 3);
        assert_eq!(a.get(2), Some(AttrValue::Float3(Vec3::ZERO)));
        assert_eq!(a.get(3), None);
    }

    #[test]
    fn test_filled_and_typed() {
        let a = AttributeArray::filled(AttrValue::Int(7), 4);
        assert_eq!(a.typed::<i32>(), Some(&[7, 7, 7, 7][..]));
        assert!(a.typed::<f32>().is_none());
        assert_eq!(a.as_bytes().len(), 16);
    }

    #[test]
    fn test_resize() {
        let mut a = AttributeArray::from_vec(vec![1.0_f32, 2.0]);
        a.resize(4);
        assert_eq!(a.typed::<f32>(), Some(&[1.0, 2.0, 0.0, 0.0][..]));
    }

    #[test]
    fn test_split_copy_fill() {
        let mut dst = AttributeArray::new_default(AttrType::Int, 5);
        let src = AttributeArray::from_vec(vec![1, 2]);
        {
            let mut parts = dst.split_mut([2, 3]);
            assert_eq!(parts.len(), 2);
            assert!(parts[0].copy_from(&src));
            parts[1].fill(AttrValue::Float(9.7));
        }
        assert_eq!(dst.typed::<i32>(), Some(&[1, 2, 9, 9, 9][..]));
    }

    #[test]
    fn test_copy_rejects_mismatch() {
        let mut dst = AttributeArray::new_default(AttrType::Int, 2);
        let wrong_type = AttributeArray::from_vec(vec![1.0_f32, 2.0]);
        let wrong_len = AttributeArray::from_vec(vec![1]);
        let mut parts = dst.split_mut([2]);
        assert!(!parts[0].copy_from(&wrong_type));
        assert!(!parts[0].copy_from(&wrong_len));
    }

    #[test]
    fn test_gather() {
        let a = AttributeArray::from_vec(vec![10_i32, 20, 30]);
        assert_eq!(a.gather(&[2, 0, 2]).typed::<i32>(), Some(&[30, 10, 30][..]));
        assert!(a.gather(&[]).is_empty());
    }
}
