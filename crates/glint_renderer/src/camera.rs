//! Pinhole camera frame for ray generation.

use glint_core::RenderConfig;
use glint_math::{Quat, Ray, Vec3};

/// Source of primary rays for pixel coordinates.
///
/// `(du, dv)` is the sub-pixel jitter in [0, 1).
pub trait RayGenerator: Sync {
    fn generate_ray(&self, x: u32, y: u32, du: f32, dv: f32) -> Ray;
}

/// Image-plane basis for a pinhole camera.
///
/// Pixel row 0 is the bottom of the image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrame {
    /// Ray origin (the rotated eye)
    pub origin: Vec3,

    /// Top-left corner of the image plane
    pub corner: Vec3,

    /// One pixel to the right
    pub u_axis: Vec3,

    /// One pixel down
    pub v_axis: Vec3,

    pub width: u32,
    pub height: u32,
}

impl CameraFrame {
    /// Build the frame for a look-at camera.
    ///
    /// `rotation` orbits the eye around `look_at` (and turns `up` with it),
    /// keeping the distance to the target.
    pub fn new(
        eye: Vec3,
        look_at: Vec3,
        up: Vec3,
        fov_degrees: f32,
        width: u32,
        height: u32,
        rotation: Quat,
    ) -> Self {
        let eye = look_at + rotation * (eye - look_at);
        let up = rotation * up;

        let focal_length = 0.5 * height as f32 / (0.5 * fov_degrees.to_radians()).tan();
        let forward = (look_at - eye).normalize_or_zero();

        // Fall back to an arbitrary side vector when up is parallel to forward.
        let mut u_axis = forward.cross(up).normalize_or_zero();
        if u_axis == Vec3::ZERO {
            u_axis = forward.any_orthonormal_vector();
        }
        let v_axis = forward.cross(u_axis).normalize_or_zero();

        let corner = eye + focal_length * forward
            - 0.5 * (width as f32 * u_axis + height as f32 * v_axis);

        Self {
            origin: eye,
            corner,
            u_axis,
            v_axis,
            width,
            height,
        }
    }

    /// Build the frame from a render configuration.
    pub fn from_config(config: &RenderConfig, rotation: Quat) -> Self {
        Self::new(
            config.eye_vec(),
            config.look_at_vec(),
            config.up_vec(),
            config.fov,
            config.width,
            config.height,
            rotation,
        )
    }
}

impl RayGenerator for CameraFrame {
    #[inline]
    fn generate_ray(&self, x: u32, y: u32, du: f32, dv: f32) -> Ray {
        let px = x as f32 + du;
        let py = (self.height as f32 - y as f32 - 1.0) + dv;
        let direction = (self.corner + px * self.u_axis + py * self.v_axis - self.origin).normalize();
        Ray::new_simple(self.origin, direction)
    }
}
