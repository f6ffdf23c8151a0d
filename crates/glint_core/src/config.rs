//! Render configuration loaded from JSON.
//!
//! Every field is optional in the file; missing fields take the defaults
//! below.
//!
//! ```json
//! {
//!     "width": 512,
//!     "height": 512,
//!     "eye": [0, 0, 5],
//!     "up": [0, 1, 0],
//!     "look_at": [0, 0, 0],
//!     "fov": 45,
//!     "scene_scale": 1.0,
//!     "max_points": 100000,
//!     "passes": 16
//! }
//! ```

use std::path::Path;

use glint_math::Vec3;
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Image and camera parameters for a render session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Camera position
    pub eye: [f32; 3],

    /// Camera up vector
    pub up: [f32; 3],

    /// Point the camera looks at
    pub look_at: [f32; 3],

    /// Vertical field of view in degrees
    pub fov: f32,

    /// Current pass index; 0 resets accumulation
    pub pass: u32,

    /// Uniform scale applied to loaded meshes
    pub scene_scale: f32,

    /// Cap on the number of points kept from a point cloud
    pub max_points: Option<usize>,

    /// Number of progressive passes to accumulate
    pub passes: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            eye: [0.0, 0.0, 5.0],
            up: [0.0, 1.0, 0.0],
            look_at: [0.0, 0.0, 0.0],
            fov: 45.0,
            pass: 0,
            scene_scale: 1.0,
            max_points: None,
            passes: 16,
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from a JSON string and validate it.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        log::info!("Loading config: {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Reject configurations that cannot produce an image.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(ConfigError::Invalid(format!(
                "fov must be in (0, 180) degrees, got {}",
                self.fov
            )));
        }
        if self.up_vec().length_squared() == 0.0 {
            return Err(ConfigError::Invalid("up vector is zero".to_string()));
        }
        if self.eye_vec() == self.look_at_vec() {
            return Err(ConfigError::Invalid(
                "eye and look_at are the same point".to_string(),
            ));
        }
        if !(self.scene_scale.is_finite() && self.scene_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "scene_scale must be positive, got {}",
                self.scene_scale
            )));
        }
        Ok(())
    }

    pub fn eye_vec(&self) -> Vec3 {
        Vec3::from_array(self.eye)
    }

    pub fn up_vec(&self) -> Vec3 {
        Vec3::from_array(self.up)
    }

    pub fn look_at_vec(&self) -> Vec3 {
        Vec3::from_array(self.look_at)
    }

    /// Number of pixels in the image.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Copy of this config with the pass index set.
    pub fn with_pass(&self, pass: u32) -> Self {
        Self {
            pass,
            ..self.clone()
        }
    }
}
