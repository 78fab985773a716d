//! Generic attribute system.
//!
//! Attributes are named, typed value arrays attached to one domain of a
//! geometry (points, edges, faces, corners, curves or instances).
//!
//! - [`AttrDomain`], [`AttrType`], [`AttrValue`] - domain and type tags
//! - [`AttributeArray`] - owned typed buffer, [`AttributeSliceMut`] a writable window into one
//! - [`AttributeStorage`] - the layers of one geometry
//! - [`AttributeAccessor`] - per-geometry reads with domain adaptation and type conversion
//! - [`AttributeFilter`] - name filter for propagation

pub(crate) mod array;
mod adapt;
mod convert;
mod filter;
mod storage;
mod types;

pub use adapt::DomainMapping;
pub use array::{AttributeArray, AttributeSliceMut};
pub use convert::{convert_array, convert_value};
pub use filter::AttributeFilter;
pub use storage::{AttributeAccessor, AttributeLayer, AttributeStorage, AttributeWriter};
pub use types::{AttrDomain, AttrType, AttrValue, AttributeType, Bool};
