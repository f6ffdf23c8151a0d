//! Geometry adapters and split predicates used by the BVH builder.
//!
//! The builder only sees primitives through these two traits, so one BVH
//! implementation serves every primitive kind.

use glint_core::{Spheres, TriangleMesh};
use glint_math::{axis_component, Aabb, Vec3};

/// Per-primitive bounds queries for BVH construction.
pub trait PrimitiveGeometry: Sync {
    fn primitive_count(&self) -> usize;

    /// Bounding box of primitive `i`.
    fn bounding_box(&self, i: usize) -> Aabb;

    /// Bounding box of primitive `i` plus the representative point used to
    /// partition it.
    fn bounding_box_and_centroid(&self, i: usize) -> (Aabb, Vec3);
}

/// Answers "is primitive `i` below `position` on `axis`?" for a split
/// configured with [`SplitPredicate::set`].
///
/// The answer depends only on the configured axis/position and the queried
/// primitive, never on earlier queries.
pub trait SplitPredicate {
    fn set(&mut self, axis: usize, position: f32);

    fn is_below(&self, i: usize) -> bool;
}

/// Spheres viewed as BVH primitives.
#[derive(Clone, Copy, Debug)]
pub struct SphereGeometry<'a> {
    spheres: &'a Spheres,
}

impl<'a> SphereGeometry<'a> {
    pub fn new(spheres: &'a Spheres) -> Self {
        Self { spheres }
    }
}

impl PrimitiveGeometry for SphereGeometry<'_> {
    fn primitive_count(&self) -> usize {
        self.spheres.len()
    }

    fn bounding_box(&self, i: usize) -> Aabb {
        let center = self.spheres.center(i);
        let r = Vec3::splat(self.spheres.radius(i));
        Aabb::from_points(center - r, center + r)
    }

    fn bounding_box_and_centroid(&self, i: usize) -> (Aabb, Vec3) {
        (self.bounding_box(i), self.spheres.center(i))
    }
}

/// Triangles of a mesh viewed as BVH primitives.
#[derive(Clone, Copy, Debug)]
pub struct TriangleGeometry<'a> {
    mesh: &'a TriangleMesh,
}

impl<'a> TriangleGeometry<'a> {
    pub fn new(mesh: &'a TriangleMesh) -> Self {
        Self { mesh }
    }
}

impl PrimitiveGeometry for TriangleGeometry<'_> {
    fn primitive_count(&self) -> usize {
        self.mesh.face_count()
    }

    fn bounding_box(&self, i: usize) -> Aabb {
        let [v0, v1, v2] = self.mesh.triangle(i);
        Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2))
    }

    fn bounding_box_and_centroid(&self, i: usize) -> (Aabb, Vec3) {
        let [v0, v1, v2] = self.mesh.triangle(i);
        (
            Aabb::from_points(v0.min(v1).min(v2), v0.max(v1).max(v2)),
            (v0 + v1 + v2) / 3.0,
        )
    }
}

/// Splits spheres by center.
#[derive(Clone, Debug)]
pub struct SphereSplitPredicate<'a> {
    spheres: &'a Spheres,
    axis: usize,
    position: f32,
}

impl<'a> SphereSplitPredicate<'a> {
    pub fn new(spheres: &'a Spheres) -> Self {
        Self {
            spheres,
            axis: 0,
            position: 0.0,
        }
    }
}

impl SplitPredicate for SphereSplitPredicate<'_> {
    fn set(&mut self, axis: usize, position: f32) {
        self.axis = axis;
        self.position = position;
    }

    #[inline]
    fn is_below(&self, i: usize) -> bool {
        axis_component(self.spheres.center(i), self.axis) < self.position
    }
}

/// Splits triangles by the mean of their vertices.
#[derive(Clone, Debug)]
pub struct TriangleSplitPredicate<'a> {
    mesh: &'a TriangleMesh,
    axis: usize,
    position: f32,
}

impl<'a> TriangleSplitPredicate<'a> {
    pub fn new(mesh: &'a TriangleMesh) -> Self {
        Self {
            mesh,
            axis: 0,
            position: 0.0,
        }
    }
}

impl SplitPredicate for TriangleSplitPredicate<'_> {
    fn set(&mut self, axis: usize, position: f32) {
        self.axis = axis;
        self.position = position;
    }

    #[inline]
    fn is_below(&self, i: usize) -> bool {
        let [v0, v1, v2] = self.mesh.triangle(i);
        // Compare the vertex sum against 3x the position to skip the divide.
        axis_component(v0 + v1 + v2, self.axis) < 3.0 * self.position
    }
}
