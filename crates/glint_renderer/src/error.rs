//! Error types for BVH construction and rendering.

use glint_core::GeometryError;
use thiserror::Error;

/// Errors that can occur while building a BVH.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("cannot build a BVH over zero primitives")]
    EmptyScene,
}

/// Errors reported by a render session.
///
/// None of these are fatal; the session stays usable and the caller may
/// retry once the cause is fixed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("invalid render configuration: {0}")]
    Configuration(String),

    #[error("scene has no primitives")]
    EmptyScene,

    #[error("acceleration structure has not been built")]
    NotBuilt,

    #[error("render pass was cancelled")]
    Cancelled,

    #[error("invalid geometry: {0}")]
    Geometry(#[from] GeometryError),
}

impl From<BuildError> for RenderError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::EmptyScene => RenderError::EmptyScene,
        }
    }
}

pub type RenderResult<T> = Result<T, RenderError>;
