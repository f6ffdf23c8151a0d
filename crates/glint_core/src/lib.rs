//! Glint Core - scene data and render buffers for the Glint ray caster.
//!
//! This crate provides the in-memory data handed to the renderer and read
//! back from it:
//!
//! - **Primitive sets**: `Spheres` (point clouds) and `TriangleMesh`
//! - **Shading inputs**: `Material`, `Texture`
//! - **Configuration**: `RenderConfig`, loadable from JSON
//! - **Output**: `RenderLayers`, the per-pixel image layers
//!
//! File formats (LAS, OBJ, image files) are deliberately not handled here;
//! loaders produce these types and the renderer consumes them.
//!
//! # Example
//!
//! ```ignore
//! use glint_core::{PointCloud, RenderConfig, RenderLayers};
//!
//! let config = RenderConfig::load("render.json")?;
//! let spheres = PointCloud::new(positions, colors).into_spheres(config.max_points);
//! let mut layers = RenderLayers::new(config.width, config.height);
//! ```

pub mod config;
pub mod error;
pub mod layers;
pub mod material;
pub mod mesh;
pub mod points;
pub mod texture;

// Re-export commonly used types
pub use config::{ConfigError, ConfigResult, RenderConfig};
pub use error::{GeometryError, GeometryResult};
pub use layers::{LayerRow, PixelSample, RenderLayers};
pub use material::Material;
pub use mesh::TriangleMesh;
pub use points::{PointCloud, Spheres};
pub use texture::Texture;
