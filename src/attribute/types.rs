//! Attribute domains, data types and single values.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div};

use super::AttributeArray;

/// Element granularity an attribute is stored on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrDomain {
    /// Mesh vertices, point cloud points, curve control points
    Point,
    /// Mesh edges
    Edge,
    /// Mesh faces (polygons)
    Face,
    /// Mesh face corners (loops)
    Corner,
    /// Whole curves
    Curve,
    /// Instances of an instances component
    Instance,
}

impl AttrDomain {
    /// Priority used when the same attribute is found on different domains.
    /// The domain with the higher priority wins.
    #[inline]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Instance => 0,
            Self::Curve => 1,
            Self::Face => 2,
            Self::Edge => 3,
            Self::Point => 4,
            Self::Corner => 5,
        }
    }

    /// The higher-priority domain of the two.
    #[inline]
    pub fn highest_priority(self, other: Self) -> Self {
        if other.priority() > self.priority() {
            other
        } else {
            self
        }
    }

    /// Returns the name of this domain.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Edge => "edge",
            Self::Face => "face",
            Self::Corner => "corner",
            Self::Curve => "curve",
            Self::Instance => "instance",
        }
    }
}

impl fmt::Display for AttrDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Scalar type of an attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrType {
    Bool,
    Int8,
    Int,
    Float,
    Float2,
    Float3,
    /// Linear RGBA color
    Color,
}

impl AttrType {
    /// All attribute types, ordered by complexity.
    pub const ALL: [AttrType; 7] = [
        Self::Bool,
        Self::Int8,
        Self::Int,
        Self::Float,
        Self::Float2,
        Self::Float3,
        Self::Color,
    ];

    /// Rank used to pick the type that can represent both of two types.
    #[inline]
    pub const fn complexity(self) -> u8 {
        match self {
            Self::Bool => 0,
            Self::Int8 => 1,
            Self::Int => 2,
            Self::Float => 3,
            Self::Float2 => 4,
            Self::Float3 => 5,
            Self::Color => 6,
        }
    }

    /// The more complex type of the two.
    #[inline]
    pub fn most_complex(self, other: Self) -> Self {
        if other.complexity() > self.complexity() {
            other
        } else {
            self
        }
    }

    /// Registered default value of this type.
    pub fn default_value(self) -> AttrValue {
        match self {
            Self::Bool => AttrValue::Bool(false),
            Self::Int8 => AttrValue::Int8(0),
            Self::Int => AttrValue::Int(0),
            Self::Float => AttrValue::Float(0.0),
            Self::Float2 => AttrValue::Float2(Vec2::ZERO),
            Self::Float3 => AttrValue::Float3(Vec3::ZERO),
            Self::Color => AttrValue::Color(Vec4::ZERO),
        }
    }

    /// Returns the name of this type.
    #[inline]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int8 => "int8",
            Self::Int => "int",
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Color => "color",
        }
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Boolean with guaranteed 1-byte storage, so boolean layers can be viewed as bytes.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct Bool(u8);

impl Bool {
    pub const TRUE: Self = Self(1);
    pub const FALSE: Self = Self(0);

    #[inline]
    pub const fn new(v: bool) -> Self {
        Self(v as u8)
    }

    #[inline]
    pub const fn get(self) -> bool {
        self.0 != 0
    }
}

impl From<bool> for Bool {
    #[inline]
    fn from(v: bool) -> Self {
        Self::new(v)
    }
}

impl From<Bool> for bool {
    #[inline]
    fn from(v: Bool) -> Self {
        v.get()
    }
}

impl fmt::Debug for Bool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// One attribute value of any type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int8(i8),
    Int(i32),
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Color(Vec4),
}

impl AttrValue {
    /// Type of this value.
    pub const fn attr_type(&self) -> AttrType {
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

    /// Convert to another type with the implicit conversion rules.
    #[inline]
    pub fn convert(self, to: AttrType) -> AttrValue {
        super::convert::convert_value(self, to)
    }
}

/// Rust types that can be stored in an attribute layer.
///
/// Every implementor maps 1:1 to an [`AttrType`], which lets generic code be
/// instantiated once per concrete type after a single dispatch on the runtime
/// type.
pub trait AttributeType: Pod + Default + PartialEq + Send + Sync + fmt::Debug + 'static {
    /// Runtime type tag.
    const TYPE: AttrType;

    /// Wrap into a dynamically typed value.
    fn into_value(self) -> AttrValue;

    /// Unwrap a value of exactly this type.
    fn from_value(value: AttrValue) -> Option<Self>;

    /// Wrap a typed buffer into an array.
    fn into_array(values: Vec<Self>) -> AttributeArray;

    /// Borrow the typed buffer of an array of this type.
    fn slice(array: &AttributeArray) -> Option<&[Self]>;

    /// Mutably borrow the typed buffer of an array of this type.
    fn slice_mut(array: &mut AttributeArray) -> Option<&mut [Self]>;

    /// Take the typed buffer out of an array of this type.
    fn into_vec(array: AttributeArray) -> Option<Vec<Self>>;

    /// Combine several values into one, used when moving values between domains.
    fn mix(values: impl Iterator<Item = Self>) -> Self;
}

macro_rules! impl_attribute_type {
    ($ty:ty, $variant:ident, |$v:ident| $into:expr, |$w:ident| $from:expr, $mix:path) => {
        impl AttributeType for $ty {
            const TYPE: AttrType = AttrType::$variant;

            #[inline]
            fn into_value(self) -> AttrValue {
                let $v = self;
                AttrValue::$variant($into)
            }

            #[inline]
            fn from_value(value: AttrValue) -> Option<Self> {
                match value {
                    AttrValue::$variant($w) => Some($from),
                    _ => None,
                }
            }

            #[inline]
            fn into_array(values: Vec<Self>) -> AttributeArray {
                AttributeArray::$variant(values)
            }

            #[inline]
            fn slice(array: &AttributeArray) -> Option<&[Self]> {
                match array {
                    AttributeArray::$variant(data) => Some(data),
                    _ => None,
                }
            }

            #[inline]
            fn slice_mut(array: &mut AttributeArray) -> Option<&mut [Self]> {
                match array {
                    AttributeArray::$variant(data) => Some(data),
                    _ => None,
                }
            }

            #[inline]
            fn into_vec(array: AttributeArray) -> Option<Vec<Self>> {
                match array {
                    AttributeArray::$variant(data) => Some(data),
                    _ => None,
                }
            }

            #[inline]
            fn mix(values: impl Iterator<Item = Self>) -> Self {
                $mix(values)
            }
        }
    };
}

fn mix_any(mut values: impl Iterator<Item = Bool>) -> Bool {
    Bool::new(values.any(Bool::get))
}

fn mix_rounded<T>(values: impl Iterator<Item = T>) -> T
where
    T: Copy + Default + Into<i64> + TryFrom<i64>,
{
    let mut count = 0_i64;
    let mut sum = 0_i64;
    for v in values {
        sum += v.into();
        count += 1;
    }
    if count == 0 {
        return T::default();
    }
    let mean = (sum as f64 / count as f64).round() as i64;
    T::try_from(mean).unwrap_or_default()
}

fn mix_mean<T>(values: impl Iterator<Item = T>) -> T
where
    T: Copy + Default + Add<Output = T> + Div<f32, Output = T>,
{
    let mut count = 0_u32;
    let mut sum = T::default();
    for v in values {
        sum = sum + v;
        count += 1;
    }
    if count == 0 {
        T::default()
    } else {
        sum / count as f32
    }
}

impl_attribute_type!(Bool, Bool, |v| v.get(), |w| Bool::new(w), mix_any);
impl_attribute_type!(i8, Int8, |v| v, |w| w, mix_rounded);
impl_attribute_type!(i32, Int, |v| v, |w| w, mix_rounded);
impl_attribute_type!(f32, Float, |v| v, |w| w, mix_mean);
impl_attribute_type!(Vec2, Float2, |v| v, |w| w, mix_mean);
impl_attribute_type!(Vec3, Float3, |v| v, |w| w, mix_mean);
impl_attribute_type!(Vec4, Color, |v| v, |w| w, mix_mean);
