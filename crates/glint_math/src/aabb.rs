use crate::{axis_component, Interval, Vec3};

/// Axis-aligned box stored as one [`Interval`] per axis.
///
/// Boxes with zero extent on an axis (the bounds of an axis-aligned triangle)
/// are valid, and a ray grazing such a box counts as entering it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub x: Interval,
    pub y: Interval,
    pub z: Interval,
}

impl Aabb {
    /// Box with nothing in it; folding points into it yields their bounds.
    pub const EMPTY: Aabb = Aabb {
        x: Interval::EMPTY,
        y: Interval::EMPTY,
        z: Interval::EMPTY,
    };

    /// Box spanned by two opposite corners given in any order.
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        let (lo, hi) = (a.min(b), a.max(b));
        Self {
            x: Interval::new(lo.x, hi.x),
            y: Interval::new(lo.y, hi.y),
            z: Interval::new(lo.z, hi.z),
        }
    }

    pub fn surrounding(a: &Aabb, b: &Aabb) -> Self {
        Self {
            x: Interval::surrounding(&a.x, &b.x),
            y: Interval::surrounding(&a.y, &b.y),
            z: Interval::surrounding(&a.z, &b.z),
        }
    }

    pub fn include_point(&self, p: Vec3) -> Self {
        Self {
            x: self.x.include(p.x),
            y: self.y.include(p.y),
            z: self.z.include(p.z),
        }
    }

    pub fn min(&self) -> Vec3 {
        Vec3::new(self.x.min, self.y.min, self.z.min)
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.x.max, self.y.max, self.z.max)
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty() || self.y.is_empty() || self.z.is_empty()
    }

    /// Span along `axis` (0=X, 1=Y, anything else Z).
    pub fn axis_interval(&self, axis: usize) -> Interval {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Slab test. Returns the distance at which a ray enters the box, clamped
    /// to `ray_t.min`, or `None` if the box is missed inside `ray_t`.
    ///
    /// `inv_dir` is the reciprocal of the ray direction, computed once per ray
    /// by the caller.
    #[inline]
    pub fn entry_distance(&self, origin: Vec3, inv_dir: Vec3, mut ray_t: Interval) -> Option<f32> {
        for axis in 0..3 {
            let slab = self.axis_interval(axis);
            let o = axis_component(origin, axis);
            let inv = axis_component(inv_dir, axis);
            let (near, far) = {
                let t0 = (slab.min - o) * inv;
                let t1 = (slab.max - o) * inv;
                if inv < 0.0 {
                    (t1, t0)
                } else {
                    (t0, t1)
                }
            };
            // f32::max/min drop a NaN operand (0 * inf on a slab plane).
            ray_t.min = near.max(ray_t.min);
            ray_t.max = far.min(ray_t.max);
            if ray_t.is_empty() {
                return None;
            }
        }
        Some(ray_t.min)
    }

    /// Surface area for the SAH cost. Zero for an empty box.
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.max() - self.min();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Axis of greatest extent; ties resolve toward Z.
    pub fn longest_axis(&self) -> usize {
        let d = self.max() - self.min();
        if d.x > d.y && d.x > d.z {
            0
        } else if d.y > d.z {
            1
        } else {
            2
        }
    }

    pub fn centroid(&self) -> Vec3 {
        (self.min() + self.max()) * 0.5
    }
}
