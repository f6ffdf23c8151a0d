//! Leaf-level ray/primitive tests driven by BVH traversal.
//!
//! An intersector tracks the nearest hit for one ray at a time. Traversal
//! calls [`Intersector::prepare_traversal`] once, then `intersect`/`update`
//! for every candidate primitive, then [`Intersector::post_traversal`].

use std::f32::consts::PI;
use std::ops::Range;

use glint_core::{Spheres, TriangleMesh};
use glint_math::{Ray, Vec3, RAY_FAR};

/// Determinants smaller than this are treated as parallel or degenerate.
const TRIANGLE_EPSILON: f32 = 1e-8;

/// Per-ray filtering options.
#[derive(Clone, Debug, PartialEq)]
pub struct TraceOptions {
    /// Only primitives with an id in this range are eligible
    pub prim_ids_range: Range<u32>,

    /// Reject triangles seen from behind (clockwise from the ray)
    pub cull_back_face: bool,
}

impl Default for TraceOptions {
    fn default() -> Self {
        Self {
            prim_ids_range: 0..u32::MAX,
            cull_back_face: false,
        }
    }
}

/// Nearest-hit result of a traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intersection {
    /// Distance along the ray
    pub t: f32,

    /// Index of the primitive hit
    pub prim_id: u32,

    /// Spherical (spheres) or barycentric (triangles) coordinates
    pub u: f32,
    pub v: f32,
}

impl Default for Intersection {
    fn default() -> Self {
        Self {
            t: RAY_FAR,
            prim_id: u32::MAX,
            u: 0.0,
            v: 0.0,
        }
    }
}

/// Geometric tests for one primitive kind.
pub trait Intersector {
    /// Cache the ray and options. Called once per ray before any test.
    fn prepare_traversal(&mut self, ray: &Ray, options: &TraceOptions);

    /// Test primitive `prim` against the cached ray.
    ///
    /// Returns true only for a hit strictly closer than `t_max`, which is
    /// then tightened to the hit distance.
    fn intersect(&mut self, prim: u32, t_max: &mut f32) -> bool;

    /// Record `prim` at distance `t` as the nearest hit so far.
    fn update(&mut self, t: f32, prim: u32);

    /// Fill `isect` from the nearest hit. Leaves it untouched on a miss.
    fn post_traversal(&self, ray: &Ray, hit: bool, isect: &mut Intersection);
}

/// Ray/sphere intersection.
#[derive(Debug)]
pub struct SphereIntersector<'a> {
    spheres: &'a Spheres,
    origin: Vec3,
    direction: Vec3,
    t_min: f32,
    prim_ids_range: Range<u32>,
    hit_t: f32,
    hit_prim: u32,
}

impl<'a> SphereIntersector<'a> {
    pub fn new(spheres: &'a Spheres) -> Self {
        Self {
            spheres,
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            t_min: 0.0,
            prim_ids_range: 0..u32::MAX,
            hit_t: RAY_FAR,
            hit_prim: u32::MAX,
        }
    }

    /// Map a unit normal to (azimuth, polar) coordinates in [0, 1].
    pub fn sphere_uv(n: Vec3) -> (f32, f32) {
        let u = (n.x.atan2(n.z) + PI) / (2.0 * PI);
        let v = n.y.clamp(-1.0, 1.0).acos() / PI;
        (u, v)
    }
}

impl Intersector for SphereIntersector<'_> {
    fn prepare_traversal(&mut self, ray: &Ray, options: &TraceOptions) {
        self.origin = ray.origin();
        self.direction = ray.direction();
        self.t_min = ray.t_min;
        self.prim_ids_range = options.prim_ids_range.clone();
        self.hit_t = ray.t_max;
        self.hit_prim = u32::MAX;
    }

    fn intersect(&mut self, prim: u32, t_max: &mut f32) -> bool {
        if !self.prim_ids_range.contains(&prim) {
            return false;
        }
        let i = prim as usize;
        let radius = self.spheres.radius(i);
        let oc = self.spheres.center(i) - self.origin;
        let a = self.direction.length_squared();
        let h = self.direction.dot(oc);
        let c = oc.length_squared() - radius * radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 || a == 0.0 {
            return false;
        }

        // Stable form: avoid subtracting nearly equal values.
        let sqrtd = discriminant.sqrt();
        let q = if h >= 0.0 { h + sqrtd } else { h - sqrtd };
        let (mut t0, mut t1) = if q == 0.0 { (0.0, 0.0) } else { (q / a, c / q) };
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }

        let t = if t0 >= self.t_min {
            t0
        } else if t1 >= self.t_min {
            t1
        } else {
            return false;
        };

        if t < *t_max {
            *t_max = t;
            true
        } else {
            false
        }
    }

    fn update(&mut self, t: f32, prim: u32) {
        self.hit_t = t;
        self.hit_prim = prim;
    }

    fn post_traversal(&self, ray: &Ray, hit: bool, isect: &mut Intersection) {
        if !hit {
            return;
        }
        let center = self.spheres.center(self.hit_prim as usize);
        let n = (ray.at(self.hit_t) - center).normalize_or_zero();
        let (u, v) = Self::sphere_uv(n);
        *isect = Intersection {
            t: self.hit_t,
            prim_id: self.hit_prim,
            u,
            v,
        };
    }
}

/// Ray/triangle intersection (Möller-Trumbore).
#[derive(Debug)]
pub struct TriangleIntersector<'a> {
    mesh: &'a TriangleMesh,
    origin: Vec3,
    direction: Vec3,
    t_min: f32,
    prim_ids_range: Range<u32>,
    cull_back_face: bool,
    // Barycentrics of the last successful test, committed by `update`.
    pending_uv: (f32, f32),
    hit_t: f32,
    hit_prim: u32,
    hit_uv: (f32, f32),
}

impl<'a> TriangleIntersector<'a> {
    pub fn new(mesh: &'a TriangleMesh) -> Self {
        Self {
            mesh,
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
            t_min: 0.0,
            prim_ids_range: 0..u32::MAX,
            cull_back_face: false,
            pending_uv: (0.0, 0.0),
            hit_t: RAY_FAR,
            hit_prim: u32::MAX,
            hit_uv: (0.0, 0.0),
        }
    }
}

impl Intersector for TriangleIntersector<'_> {
    fn prepare_traversal(&mut self, ray: &Ray, options: &TraceOptions) {
        self.origin = ray.origin();
        self.direction = ray.direction();
        self.t_min = ray.t_min;
        self.prim_ids_range = options.prim_ids_range.clone();
        self.cull_back_face = options.cull_back_face;
        self.hit_t = ray.t_max;
        self.hit_prim = u32::MAX;
        self.hit_uv = (0.0, 0.0);
    }

    fn intersect(&mut self, prim: u32, t_max: &mut f32) -> bool {
        if !self.prim_ids_range.contains(&prim) {
            return false;
        }
        let [v0, v1, v2] = self.mesh.triangle(prim as usize);
        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        let h = self.direction.cross(edge2);
        let det = edge1.dot(h);

        // Parallel ray or degenerate triangle
        if det.abs() < TRIANGLE_EPSILON {
            return false;
        }
        // Positive determinant means the ray sees the counter-clockwise side.
        if self.cull_back_face && det < TRIANGLE_EPSILON {
            return false;
        }

        let f = 1.0 / det;
        let s = self.origin - v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * self.direction.dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if t < self.t_min || t >= *t_max {
            return false;
        }

        *t_max = t;
        self.pending_uv = (u, v);
        true
    }

    fn update(&mut self, t: f32, prim: u32) {
        self.hit_t = t;
        self.hit_prim = prim;
        self.hit_uv = self.pending_uv;
    }

    fn post_traversal(&self, _ray: &Ray, hit: bool, isect: &mut Intersection) {
        if !hit {
            return;
        }
        *isect = Intersection {
            t: self.hit_t,
            prim_id: self.hit_prim,
            u: self.hit_uv.0,
            v: self.hit_uv.1,
        };
    }
}
