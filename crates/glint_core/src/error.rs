//! Validation errors for primitive sets.

use thiserror::Error;

/// Inconsistencies between the flat arrays of a primitive set.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("{name} has {len} elements, expected a multiple of {stride}")]
    BadStride {
        name: &'static str,
        len: usize,
        stride: usize,
    },

    #[error("{name} has {len} elements, expected {expected}")]
    SizeMismatch {
        name: &'static str,
        len: usize,
        expected: usize,
    },

    #[error("face {face} references vertex {index}, but only {vertex_count} vertices exist")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },
}

pub type GeometryResult<T> = Result<T, GeometryError>;

/// Checks that an optional per-element array is either absent (empty) or
/// sized exactly `count * stride`.
pub(crate) fn check_optional(
    name: &'static str,
    data_len: usize,
    count: usize,
    stride: usize,
) -> GeometryResult<()> {
    if data_len != 0 && data_len != count * stride {
        return Err(GeometryError::SizeMismatch {
            name,
            len: data_len,
            expected: count * stride,
        });
    }
    Ok(())
}

/// Checks that a flat array is a whole number of `stride`-sized elements.
pub(crate) fn check_stride(name: &'static str, len: usize, stride: usize) -> GeometryResult<()> {
    if len % stride != 0 {
        return Err(GeometryError::BadStride { name, len, stride });
    }
    Ok(())
}
