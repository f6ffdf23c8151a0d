// Re-export glam for convenience
pub use glam::*;

// Glint math types
mod aabb;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use interval::Interval;
pub use ray::{Ray, RAY_FAR};

/// Returns component `axis` (0=X, 1=Y, 2=Z) of a vector.
#[inline]
pub fn axis_component(v: Vec3, axis: usize) -> f32 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}
