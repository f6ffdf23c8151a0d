//! Glint Renderer - BVH ray casting with progressive multithreaded passes.
//!
//! A [`Renderer`] session owns a scene (spheres or a triangle mesh) and its
//! BVH. Each call to [`Renderer::render`] traces one jittered sample per
//! pixel on scoped worker threads and accumulates it into caller-owned
//! [`glint_core::RenderLayers`].
//!
//! ```ignore
//! let mut renderer = Renderer::new();
//! renderer.load_spheres(spheres)?;
//! renderer.build_bvh()?;
//!
//! let cancel = AtomicBool::new(false);
//! for pass in 0..config.passes {
//!     renderer.render(&mut layers, Quat::IDENTITY, &config.with_pass(pass), &cancel)?;
//! }
//! ```

mod bvh;
mod camera;
mod error;
mod geometry;
mod intersector;
mod renderer;
mod rng;
mod shading;

pub use bvh::{Bvh, BvhBuildOptions, BvhStatistics};
pub use camera::{CameraFrame, RayGenerator};
pub use error::{BuildError, RenderError, RenderResult};
pub use geometry::{
    PrimitiveGeometry, SphereGeometry, SphereSplitPredicate, SplitPredicate, TriangleGeometry,
    TriangleSplitPredicate,
};
pub use intersector::{Intersection, Intersector, SphereIntersector, TraceOptions, TriangleIntersector};
pub use renderer::{
    PassStats, PrimitiveSet, RenderOptions, Renderer, RendererState, DEFAULT_CANCEL_POLL_INTERVAL,
};
pub use rng::{Pcg32, StreamSeeding};
pub use shading::{shade_sphere, shade_triangle};

/// Re-export math types from glint_math
pub use glint_math::{Quat, Ray, Vec3};
