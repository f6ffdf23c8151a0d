use crate::{Interval, Vec3};

/// Far clip distance used for camera rays.
pub const RAY_FAR: f32 = 1.0e30;

/// A ray with the parametric range `[t_min, t_max)` in which hits count.
///
/// The camera emits unit-length directions, but intersectors do not rely on
/// that.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub t_min: f32,
    pub t_max: f32,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3, t_min: f32, t_max: f32) -> Self {
        Self {
            origin,
            direction,
            t_min,
            t_max,
        }
    }

    /// Ray over `[0, RAY_FAR)`.
    #[inline]
    pub fn new_simple(origin: Vec3, direction: Vec3) -> Self {
        Self::new(origin, direction, 0.0, RAY_FAR)
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    #[inline]
    pub fn interval(&self) -> Interval {
        Interval::new(self.t_min, self.t_max)
    }

    /// `origin + t * direction`
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
