//! Render session: owns the scene and its BVH and renders progressive
//! passes into caller-owned layers on scoped worker threads.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use glint_core::{LayerRow, Material, PixelSample, RenderConfig, RenderLayers, Spheres, Texture, TriangleMesh};
use glint_math::{Quat, Ray};

use crate::bvh::{Bvh, BvhBuildOptions, BvhStatistics};
use crate::camera::{CameraFrame, RayGenerator};
use crate::error::{RenderError, RenderResult};
use crate::geometry::{SphereGeometry, SphereSplitPredicate, TriangleGeometry, TriangleSplitPredicate};
use crate::intersector::{Intersection, Intersector, SphereIntersector, TraceOptions, TriangleIntersector};
use crate::rng::StreamSeeding;
use crate::shading::{shade_sphere, shade_triangle};

/// Default interval between cancellation checks.
pub const DEFAULT_CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(300);

/// The primitives of a loaded scene.
#[derive(Clone, Debug)]
pub enum PrimitiveSet {
    Spheres(Spheres),
    Mesh {
        mesh: TriangleMesh,
        materials: Vec<Material>,
        textures: Vec<Texture>,
    },
}

impl PrimitiveSet {
    pub fn primitive_count(&self) -> usize {
        match self {
            PrimitiveSet::Spheres(spheres) => spheres.len(),
            PrimitiveSet::Mesh { mesh, .. } => mesh.face_count(),
        }
    }
}

/// Lifecycle of a render session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState {
    /// No scene loaded
    Idle,
    /// Scene loaded, BVH not built
    BuildPending,
    /// Ready to render
    Built,
    /// A pass is in progress
    Rendering,
    /// The last pass was cancelled; the BVH is still usable
    Cancelled,
}

/// Tuning for render passes.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Worker count; `None` uses the available parallelism
    pub threads: Option<usize>,

    /// How often each worker checks the cancel flag
    pub cancel_poll_interval: Duration,

    /// How workers seed their jitter streams
    pub seeding: StreamSeeding,

    /// Per-ray filtering
    pub trace: TraceOptions,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            threads: None,
            cancel_poll_interval: DEFAULT_CANCEL_POLL_INTERVAL,
            seeding: StreamSeeding::default(),
            trace: TraceOptions::default(),
        }
    }
}

impl RenderOptions {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn with_cancel_poll_interval(mut self, interval: Duration) -> Self {
        self.cancel_poll_interval = interval;
        self
    }

    pub fn with_seeding(mut self, seeding: StreamSeeding) -> Self {
        self.seeding = seeding;
        self
    }

    pub fn with_trace(mut self, trace: TraceOptions) -> Self {
        self.trace = trace;
        self
    }

    /// Resolved worker count (at least one).
    pub fn thread_count(&self) -> usize {
        self.threads
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }
}

/// Summary of a completed pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassStats {
    pub pass: u32,
    pub threads: usize,
    pub rows_rendered: usize,
    pub hits: usize,
    pub elapsed: Duration,
}

/// An explicitly owned render session.
///
/// Each session holds its own scene and BVH, so independent sessions can
/// coexist in one process.
#[derive(Debug)]
pub struct Renderer {
    scene: Option<PrimitiveSet>,
    bvh: Bvh,
    state: RendererState,
    options: RenderOptions,
    build_options: BvhBuildOptions,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            scene: None,
            bvh: Bvh::default(),
            state: RendererState::Idle,
            options,
            build_options: BvhBuildOptions::default(),
        }
    }

    pub fn with_build_options(mut self, build_options: BvhBuildOptions) -> Self {
        self.build_options = build_options;
        self
    }

    pub fn state(&self) -> RendererState {
        self.state
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RenderOptions) {
        self.options = options;
    }

    pub fn scene(&self) -> Option<&PrimitiveSet> {
        self.scene.as_ref()
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    /// Replace the scene with a set of spheres.
    pub fn load_spheres(&mut self, spheres: Spheres) -> RenderResult<()> {
        spheres.validate()?;
        log::info!("Loaded {} spheres", spheres.len());
        self.replace_scene(PrimitiveSet::Spheres(spheres));
        Ok(())
    }

    /// Replace the scene with a triangle mesh and its materials.
    pub fn load_mesh(
        &mut self,
        mesh: TriangleMesh,
        materials: Vec<Material>,
        textures: Vec<Texture>,
    ) -> RenderResult<()> {
        mesh.validate()?;
        for (i, texture) in textures.iter().enumerate() {
            if !texture.is_valid() {
                log::warn!(
                    "Texture {} ({}x{}, {} components) has a short pixel buffer; it will read as black",
                    i,
                    texture.width,
                    texture.height,
                    texture.components
                );
            }
        }
        log::info!(
            "Loaded mesh: {} faces, {} vertices, {} materials, {} textures",
            mesh.face_count(),
            mesh.vertex_count(),
            materials.len(),
            textures.len()
        );
        self.replace_scene(PrimitiveSet::Mesh {
            mesh,
            materials,
            textures,
        });
        Ok(())
    }

    fn replace_scene(&mut self, scene: PrimitiveSet) {
        self.scene = Some(scene);
        self.bvh = Bvh::default();
        self.state = RendererState::BuildPending;
    }

    /// Build the BVH over the loaded scene.
    pub fn build_bvh(&mut self) -> RenderResult<BvhStatistics> {
        let Some(scene) = &self.scene else {
            return Err(RenderError::EmptyScene);
        };

        let start = Instant::now();
        let result = match scene {
            PrimitiveSet::Spheres(spheres) => Bvh::build(
                spheres.len(),
                &SphereGeometry::new(spheres),
                &mut SphereSplitPredicate::new(spheres),
                &self.build_options,
            ),
            PrimitiveSet::Mesh { mesh, .. } => Bvh::build(
                mesh.face_count(),
                &TriangleGeometry::new(mesh),
                &mut TriangleSplitPredicate::new(mesh),
                &self.build_options,
            ),
        };

        match result {
            Ok(bvh) => {
                let stats = bvh.statistics();
                log::info!("BVH build time: {:.2?}", start.elapsed());
                log::info!(
                    "BVH statistics: {} leaf nodes, {} branch nodes, max depth {}",
                    stats.leaf_nodes,
                    stats.branch_nodes,
                    stats.max_depth
                );
                self.bvh = bvh;
                self.state = RendererState::Built;
                Ok(stats)
            }
            Err(err) => {
                log::warn!("BVH build failed: {}", err);
                self.bvh = Bvh::default();
                self.state = RendererState::BuildPending;
                Err(err.into())
            }
        }
    }

    /// Render one pass with a pinhole camera built from `config`.
    ///
    /// `config.pass == 0` restarts accumulation. On `Err(Cancelled)` the
    /// layers may be partially updated; every other error leaves them
    /// untouched.
    pub fn render(
        &mut self,
        layers: &mut RenderLayers,
        rotation: Quat,
        config: &RenderConfig,
        cancel: &AtomicBool,
    ) -> RenderResult<PassStats> {
        let camera = CameraFrame::from_config(config, rotation);
        self.render_with(layers, &camera, config, cancel)
    }

    /// Render one pass with a custom ray generator.
    pub fn render_with(
        &mut self,
        layers: &mut RenderLayers,
        camera: &dyn RayGenerator,
        config: &RenderConfig,
        cancel: &AtomicBool,
    ) -> RenderResult<PassStats> {
        check_config(layers, config)?;
        if !self.bvh.is_valid() {
            return Err(RenderError::NotBuilt);
        }
        let Some(scene) = &self.scene else {
            return Err(RenderError::NotBuilt);
        };

        self.state = RendererState::Rendering;
        let pass = Pass {
            bvh: &self.bvh,
            camera,
            options: &self.options,
            pass: config.pass,
            width: config.width,
            cancel,
        };

        let (stats, cancelled) = match scene {
            PrimitiveSet::Spheres(spheres) => pass.run(
                layers,
                || SphereIntersector::new(spheres),
                |ray, isect| shade_sphere(spheres, ray, isect),
            ),
            PrimitiveSet::Mesh {
                mesh,
                materials,
                textures,
            } => pass.run(
                layers,
                || TriangleIntersector::new(mesh),
                |ray, isect| shade_triangle(mesh, materials, textures, ray, isect),
            ),
        };

        if cancelled {
            log::warn!(
                "Pass {} cancelled after {} of {} rows",
                stats.pass,
                stats.rows_rendered,
                config.height
            );
            self.state = RendererState::Cancelled;
            return Err(RenderError::Cancelled);
        }

        log::debug!(
            "Pass {} finished in {:.2?} on {} threads ({} hits)",
            stats.pass,
            stats.elapsed,
            stats.threads,
            stats.hits
        );
        self.state = RendererState::Built;
        Ok(stats)
    }
}

fn check_config(layers: &RenderLayers, config: &RenderConfig) -> RenderResult<()> {
    config
        .validate()
        .map_err(|err| RenderError::Configuration(err.to_string()))?;
    if !layers.matches(config.width, config.height) {
        return Err(RenderError::Configuration(format!(
            "layers are {}x{} but the config asks for {}x{}",
            layers.width, layers.height, config.width, config.height
        )));
    }
    Ok(())
}

/// Shared, read-only state of one pass.
struct Pass<'a> {
    bvh: &'a Bvh,
    camera: &'a dyn RayGenerator,
    options: &'a RenderOptions,
    pass: u32,
    width: u32,
    cancel: &'a AtomicBool,
}

impl Pass<'_> {
    /// Render every row on scoped worker threads.
    ///
    /// Returns the pass statistics and whether cancellation was seen.
    fn run<I, M, S>(&self, layers: &mut RenderLayers, make_intersector: M, shade: S) -> (PassStats, bool)
    where
        I: Intersector,
        M: Fn() -> I + Sync,
        S: Fn(&Ray, &Intersection) -> PixelSample + Sync,
    {
        let start = Instant::now();
        let threads = self.options.thread_count();
        let rows: Vec<Mutex<LayerRow<'_>>> = layers.rows_mut().into_iter().map(Mutex::new).collect();

        let next_row = AtomicUsize::new(0);
        let rows_rendered = AtomicUsize::new(0);
        let hits = AtomicUsize::new(0);
        let observed = AtomicBool::new(false);

        thread::scope(|s| {
            for worker in 0..threads {
                let rows = &rows;
                let next_row = &next_row;
                let rows_rendered = &rows_rendered;
                let hits = &hits;
                let observed = &observed;
                let make_intersector = &make_intersector;
                let shade = &shade;

                s.spawn(move || {
                    let mut intersector = make_intersector();
                    let mut rng = self.options.seeding.worker_stream(self.pass, worker);
                    let mut last_check = start;
                    let mut worker_hits = 0;

                    loop {
                        if last_check.elapsed() >= self.options.cancel_poll_interval {
                            last_check = Instant::now();
                            if self.cancel.load(Ordering::Relaxed) {
                                observed.store(true, Ordering::Relaxed);
                                break;
                            }
                        }

                        let y = next_row.fetch_add(1, Ordering::Relaxed);
                        let Some(row) = rows.get(y) else {
                            break;
                        };
                        if let Some(row_rng) = self.options.seeding.row_stream(self.pass, y as u32) {
                            rng = row_rng;
                        }

                        let mut row = row.lock().unwrap_or_else(PoisonError::into_inner);
                        for x in 0..self.width {
                            let du = rng.next_f32();
                            let dv = rng.next_f32();
                            let ray = self.camera.generate_ray(x, y as u32, du, dv);

                            let mut isect = Intersection::default();
                            if self.bvh.traverse(&ray, &mut intersector, &self.options.trace, &mut isect) {
                                row.write_hit(x as usize, &shade(&ray, &isect), self.pass);
                                worker_hits += 1;
                            } else {
                                row.write_miss(x as usize, self.pass);
                            }
                        }
                        rows_rendered.fetch_add(1, Ordering::Relaxed);
                    }
                    hits.fetch_add(worker_hits, Ordering::Relaxed);
                });
            }
        });

        let cancelled = observed.load(Ordering::Relaxed) || self.cancel.load(Ordering::Relaxed);
        let stats = PassStats {
            pass: self.pass,
            threads,
            rows_rendered: rows_rendered.load(Ordering::Relaxed),
            hits: hits.load(Ordering::Relaxed),
            elapsed: start.elapsed(),
        };
        (stats, cancelled)
    }
}
