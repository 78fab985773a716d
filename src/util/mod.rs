//! Utility types and functions.
//!
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam and point transform helpers
//! - Slice partitioning for per-task output windows

mod error;
mod math;
mod slices;

pub use error::*;
pub use math::*;
pub use slices::*;
