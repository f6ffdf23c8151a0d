//! End-to-end tests for render sessions.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use glint_core::{Material, RenderConfig, RenderLayers, Spheres, Texture, TriangleMesh};
use glint_renderer::{
    Bvh, BvhBuildOptions, CameraFrame, Intersection, Intersector, Quat, Ray, RayGenerator, RenderError,
    RenderOptions, Renderer, RendererState, SphereGeometry, SphereIntersector, SphereSplitPredicate,
    StreamSeeding, TraceOptions, TriangleGeometry, TriangleIntersector, TriangleSplitPredicate, Vec3,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config(width: u32, height: u32, pass: u32) -> RenderConfig {
    RenderConfig {
        width,
        height,
        pass,
        ..Default::default()
    }
}

fn random_spheres(rng: &mut StdRng, n: usize, colored: bool) -> Spheres {
    let centers = (0..3 * n).map(|_| rng.gen_range(-2.0..2.0)).collect();
    let radii = (0..n).map(|_| rng.gen_range(0.02..0.2)).collect();
    let spheres = Spheres::new(centers, radii);
    if colored {
        spheres.with_colors((0..3 * n).map(|_| rng.gen_range(0.0..1.0)).collect())
    } else {
        spheres
    }
}

fn built_renderer(spheres: Spheres, options: RenderOptions) -> Renderer {
    let mut renderer = Renderer::with_options(options);
    renderer.load_spheres(spheres).unwrap();
    renderer.build_bvh().unwrap();
    renderer
}

fn assert_layers_eq(a: &RenderLayers, b: &RenderLayers) {
    assert_eq!(a.rgba, b.rgba);
    assert_eq!(a.position, b.position);
    assert_eq!(a.normal, b.normal);
    assert_eq!(a.depth, b.depth);
    assert_eq!(a.texcoord, b.texcoord);
    assert_eq!(a.varycoord, b.varycoord);
    assert_eq!(a.vertex_color, b.vertex_color);
    assert_eq!(a.material_id, b.material_id);
    assert_eq!(a.sample_counts, b.sample_counts);
}

/// Fires the same ray for every pixel, ignoring jitter.
struct FixedRay(Ray);

impl RayGenerator for FixedRay {
    fn generate_ray(&self, _x: u32, _y: u32, _du: f32, _dv: f32) -> Ray {
        self.0
    }
}

#[test]
fn miss_zeroes_every_layer_on_first_pass() {
    init_logging();
    // A single sphere far behind the camera.
    let mut renderer = built_renderer(
        Spheres::new(vec![0.0, 0.0, 50.0], vec![1.0]),
        RenderOptions::default().with_threads(2),
    );

    let mut layers = RenderLayers::new(16, 16);
    layers.rgba.fill(7.0);
    layers.depth.fill(3.0);
    layers.material_id.fill(5);

    let cancel = AtomicBool::new(false);
    let stats = renderer
        .render(&mut layers, Quat::IDENTITY, &config(16, 16, 0), &cancel)
        .unwrap();

    assert_eq!(stats.hits, 0);
    for layer in [
        &layers.rgba,
        &layers.position,
        &layers.normal,
        &layers.depth,
        &layers.texcoord,
        &layers.varycoord,
        &layers.vertex_color,
    ] {
        assert!(layer.iter().all(|&v| v == 0.0));
    }
    assert!(layers.material_id.iter().all(|&m| m == -1));
    assert!(layers.sample_counts.iter().all(|&c| c == 1));
}

#[test]
fn output_is_independent_of_worker_count() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(7);
    let spheres = random_spheres(&mut rng, 500, false);
    let cancel = AtomicBool::new(false);

    let render = |threads: usize| {
        let mut renderer = built_renderer(spheres.clone(), RenderOptions::default().with_threads(threads));
        let mut layers = RenderLayers::new(48, 32);
        for pass in 0..2 {
            renderer
                .render(&mut layers, Quat::IDENTITY, &config(48, 32, pass), &cancel)
                .unwrap();
        }
        layers
    };

    let single = render(1);
    let multi = render(4);
    assert!(single.material_id.len() == 48 * 32);
    assert!(single.depth.iter().any(|&d| d > 0.0));
    assert_layers_eq(&single, &multi);
}

#[test]
fn per_worker_seeding_is_reproducible() {
    let mut rng = StdRng::seed_from_u64(11);
    let spheres = random_spheres(&mut rng, 200, true);
    let cancel = AtomicBool::new(false);
    let options = RenderOptions::default()
        .with_threads(1)
        .with_seeding(StreamSeeding::PerWorker);

    let render = || {
        let mut renderer = built_renderer(spheres.clone(), options.clone());
        let mut layers = RenderLayers::new(24, 24);
        renderer
            .render(&mut layers, Quat::IDENTITY, &config(24, 24, 3), &cancel)
            .unwrap();
        layers
    };

    assert_layers_eq(&render(), &render());
}

#[test]
fn sphere_hit_distance_and_normal() {
    let spheres = Spheres::new(vec![0.0, 0.0, 0.0], vec![1.0]);
    let ray = Ray::new_simple(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

    // Directly through the BVH.
    let geom = SphereGeometry::new(&spheres);
    let mut pred = SphereSplitPredicate::new(&spheres);
    let bvh = Bvh::build(1, &geom, &mut pred, &BvhBuildOptions::default()).unwrap();
    let mut isector = SphereIntersector::new(&spheres);
    let mut isect = Intersection::default();
    assert!(bvh.traverse(&ray, &mut isector, &TraceOptions::default(), &mut isect));
    assert!((isect.t - 4.0).abs() < 1e-5);
    let normal = (ray.at(isect.t) - Vec3::ZERO).normalize();
    assert!((normal - Vec3::Z).length() < 1e-5);

    // And through a full render pass.
    let mut renderer = built_renderer(spheres, RenderOptions::default());
    let mut layers = RenderLayers::new(2, 2);
    let cancel = AtomicBool::new(false);
    renderer
        .render_with(&mut layers, &FixedRay(ray), &config(2, 2, 0), &cancel)
        .unwrap();

    for px in layers.depth.chunks_exact(4) {
        assert!((px[0] - 4.0).abs() < 1e-5);
        assert_eq!(px[3], 1.0);
    }
    for px in layers.normal.chunks_exact(4) {
        // (0, 0, 1) remapped to [0, 1]
        assert!((px[0] - 0.5).abs() < 1e-5);
        assert!((px[1] - 0.5).abs() < 1e-5);
        assert!((px[2] - 1.0).abs() < 1e-5);
    }
}

#[test]
fn triangle_hit_barycentrics() {
    let mesh = TriangleMesh::new(
        vec![-1.0, -1.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0, 0.0],
        vec![0, 1, 2],
    );
    let centroid = Vec3::new(0.0, -1.0 / 3.0, 0.0);
    let ray = Ray::new_simple(centroid + 5.0 * Vec3::Z, Vec3::NEG_Z);

    let mut renderer = Renderer::new();
    renderer.load_mesh(mesh, Vec::new(), Vec::new()).unwrap();
    renderer.build_bvh().unwrap();

    let mut layers = RenderLayers::new(1, 1);
    let cancel = AtomicBool::new(false);
    renderer
        .render_with(&mut layers, &FixedRay(ray), &config(1, 1, 0), &cancel)
        .unwrap();

    let (u, v) = (layers.varycoord[0], layers.varycoord[1]);
    assert!(u >= 0.0 && v >= 0.0);
    assert!(u + v <= 1.0);
    assert!((u - 1.0 / 3.0).abs() < 1e-5);
    assert!((v - 1.0 / 3.0).abs() < 1e-5);
    assert!((layers.depth[0] - 5.0).abs() < 1e-5);
}

#[test]
fn progressive_passes_accumulate_color() {
    init_logging();
    // A large flat-colored sphere fills the whole view.
    let spheres = Spheres::new(vec![0.0, 0.0, -60.0], vec![50.0]).with_colors(vec![0.2, 0.4, 0.6]);
    let mut renderer = built_renderer(spheres, RenderOptions::default().with_threads(3));
    let cancel = AtomicBool::new(false);

    let mut layers = RenderLayers::new(20, 10);
    renderer
        .render(&mut layers, Quat::IDENTITY, &config(20, 10, 0), &cancel)
        .unwrap();
    let single = layers.rgba.clone();

    renderer
        .render(&mut layers, Quat::IDENTITY, &config(20, 10, 1), &cancel)
        .unwrap();

    assert!(layers.sample_counts.iter().all(|&c| c == 2));
    for (twice, once) in layers.rgba.iter().zip(&single) {
        assert!((twice - 2.0 * once).abs() < 1e-6);
    }
    assert!((layers.resolved_color(5, 5).x - 0.2).abs() < 1e-6);

    // Pass 0 starts over.
    renderer
        .render(&mut layers, Quat::IDENTITY, &config(20, 10, 0), &cancel)
        .unwrap();
    assert!(layers.sample_counts.iter().all(|&c| c == 1));
    assert_eq!(layers.rgba, single);
}

#[test]
fn preset_cancel_fails_the_pass() {
    init_logging();
    let mut rng = StdRng::seed_from_u64(3);
    let spheres = random_spheres(&mut rng, 2000, false);
    let cancel = AtomicBool::new(true);

    // Immediate polling: no row is ever claimed.
    let mut renderer = built_renderer(
        spheres.clone(),
        RenderOptions::default()
            .with_threads(4)
            .with_cancel_poll_interval(Duration::ZERO),
    );
    let mut layers = RenderLayers::new(64, 64);
    let result = renderer.render(&mut layers, Quat::IDENTITY, &config(64, 64, 0), &cancel);
    assert_eq!(result, Err(RenderError::Cancelled));
    assert_eq!(renderer.state(), RendererState::Cancelled);
    assert!(layers.sample_counts.iter().all(|&c| c == 0));

    // Default polling still reports the cancellation once workers join.
    let mut renderer = built_renderer(spheres, RenderOptions::default().with_threads(4));
    let result = renderer.render(&mut layers, Quat::IDENTITY, &config(64, 64, 0), &cancel);
    assert_eq!(result, Err(RenderError::Cancelled));

    // Clearing the flag makes the session usable again.
    cancel.store(false, Ordering::Relaxed);
    assert!(renderer
        .render(&mut layers, Quat::IDENTITY, &config(64, 64, 0), &cancel)
        .is_ok());
    assert_eq!(renderer.state(), RendererState::Built);
}

/// Pinhole camera that raises the cancel flag after a fixed number of rays.
struct CancelAfter<'a> {
    camera: CameraFrame,
    cancel: &'a AtomicBool,
    limit: usize,
    rays: AtomicUsize,
}

impl RayGenerator for CancelAfter<'_> {
    fn generate_ray(&self, x: u32, y: u32, du: f32, dv: f32) -> Ray {
        if self.rays.fetch_add(1, Ordering::Relaxed) + 1 == self.limit {
            self.cancel.store(true, Ordering::Relaxed);
        }
        self.camera.generate_ray(x, y, du, dv)
    }
}

fn cancel_mid_pass(threads: usize) -> (Result<(), RenderError>, Vec<usize>) {
    let (width, height) = (64u32, 64u32);
    let mut rng = StdRng::seed_from_u64(11);
    let mut renderer = built_renderer(
        random_spheres(&mut rng, 500, true),
        RenderOptions::default()
            .with_threads(threads)
            .with_cancel_poll_interval(Duration::ZERO),
    );

    let config = config(width, height, 0);
    let cancel = AtomicBool::new(false);
    let camera = CancelAfter {
        camera: CameraFrame::from_config(&config, Quat::IDENTITY),
        cancel: &cancel,
        limit: 4 * width as usize,
        rays: AtomicUsize::new(0),
    };

    let mut layers = RenderLayers::new(width, height);
    let result = renderer
        .render_with(&mut layers, &camera, &config, &cancel)
        .map(|_| ());
    if result.is_err() {
        assert_eq!(renderer.state(), RendererState::Cancelled);
    }

    // Samples written per row.
    let per_row = layers
        .sample_counts
        .chunks_exact(width as usize)
        .map(|row| row.iter().filter(|&&c| c > 0).count())
        .collect();
    (result, per_row)
}

#[test]
fn cancel_during_pass_keeps_whole_rows() {
    init_logging();
    let width = 64;

    let (result, per_row) = cancel_mid_pass(1);
    assert_eq!(result, Err(RenderError::Cancelled));
    // The single worker finishes the row it raised the flag in, then stops.
    assert_eq!(per_row.iter().filter(|&&n| n == width).count(), 4);
    assert!(per_row[4..].iter().all(|&n| n == 0));

    let threads = 4;
    let (result, per_row) = cancel_mid_pass(threads);
    assert_eq!(result, Err(RenderError::Cancelled));
    assert!(per_row.iter().all(|&n| n == 0 || n == width));
    let touched = per_row.iter().filter(|&&n| n == width).count();
    // Rows finished before the flag, plus at most one in flight per worker.
    assert!(touched >= 4 && touched <= 4 + threads, "{touched} rows touched");
}

#[test]
fn empty_scene_fails_without_touching_layers() {
    let mut renderer = Renderer::new();
    renderer.load_spheres(Spheres::default()).unwrap();
    assert_eq!(renderer.build_bvh(), Err(RenderError::EmptyScene));
    assert!(!renderer.bvh().is_valid());

    let mut layers = RenderLayers::new(8, 8);
    layers.rgba.fill(0.25);
    let cancel = AtomicBool::new(false);
    let result = renderer.render(&mut layers, Quat::IDENTITY, &config(8, 8, 0), &cancel);

    assert_eq!(result, Err(RenderError::NotBuilt));
    assert!(layers.rgba.iter().all(|&v| v == 0.25));
    assert!(layers.sample_counts.iter().all(|&c| c == 0));
}

#[test]
fn bvh_matches_brute_force_spheres() {
    let mut rng = StdRng::seed_from_u64(42);
    let spheres = random_spheres(&mut rng, 300, false);
    let geom = SphereGeometry::new(&spheres);
    let mut pred = SphereSplitPredicate::new(&spheres);
    let bvh = Bvh::build(spheres.len(), &geom, &mut pred, &BvhBuildOptions::default()).unwrap();

    let mut isector = SphereIntersector::new(&spheres);
    for _ in 0..500 {
        let ray = random_ray(&mut rng);
        let mut fast = Intersection::default();
        let hit = bvh.traverse(&ray, &mut isector, &TraceOptions::default(), &mut fast);
        let slow = brute_force(&mut isector, spheres.len(), &ray);

        assert_eq!(hit, slow.is_some());
        if let Some(slow) = slow {
            assert!((fast.t - slow.t).abs() < 1e-5);
        }
    }
}

#[test]
fn bvh_matches_brute_force_triangles() {
    let mut rng = StdRng::seed_from_u64(9);
    let n = 400;
    let mut vertices = Vec::with_capacity(9 * n);
    for _ in 0..n {
        let base = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
        for _ in 0..3 {
            let p = base + Vec3::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3));
            vertices.extend_from_slice(&p.to_array());
        }
    }
    let mesh = TriangleMesh::new(vertices, (0..3 * n as u32).collect());
    let geom = TriangleGeometry::new(&mesh);
    let mut pred = TriangleSplitPredicate::new(&mesh);
    let bvh = Bvh::build(mesh.face_count(), &geom, &mut pred, &BvhBuildOptions::default()).unwrap();

    let mut isector = TriangleIntersector::new(&mesh);
    for _ in 0..500 {
        let ray = random_ray(&mut rng);
        let mut fast = Intersection::default();
        let hit = bvh.traverse(&ray, &mut isector, &TraceOptions::default(), &mut fast);
        let slow = brute_force(&mut isector, mesh.face_count(), &ray);

        assert_eq!(hit, slow.is_some());
        if let Some(slow) = slow {
            assert!((fast.t - slow.t).abs() < 1e-5);
        }
    }
}

#[test]
fn mesh_materials_reach_the_layers() {
    // Two triangles side by side, each with its own material.
    let mesh = TriangleMesh::new(
        vec![
            -2.0, -1.0, 0.0, 0.0, -1.0, 0.0, -1.0, 1.0, 0.0, //
            0.0, -1.0, 0.0, 2.0, -1.0, 0.0, 1.0, 1.0, 0.0,
        ],
        vec![0, 1, 2, 3, 4, 5],
    )
    .with_uvs(vec![0.5; 12])
    .with_material_ids(vec![0, 1]);
    let materials = vec![Material::new(Vec3::X), Material::default().with_diffuse_texture(0)];
    let textures = vec![Texture::solid_color([0, 0, 255])];

    let mut renderer = Renderer::new();
    renderer.load_mesh(mesh, materials, textures).unwrap();
    renderer.build_bvh().unwrap();

    let cancel = AtomicBool::new(false);
    let mut layers = RenderLayers::new(1, 1);
    let left = Ray::new_simple(Vec3::new(-1.0, -0.5, 5.0), Vec3::NEG_Z);
    renderer
        .render_with(&mut layers, &FixedRay(left), &config(1, 1, 0), &cancel)
        .unwrap();
    assert_eq!(layers.material_id[0], 0);
    assert!((layers.rgba[0] - 1.0).abs() < 1e-5);
    assert_eq!(&layers.texcoord[..], &[0.5, 0.5]);

    let right = Ray::new_simple(Vec3::new(1.0, -0.5, 5.0), Vec3::NEG_Z);
    renderer
        .render_with(&mut layers, &FixedRay(right), &config(1, 1, 0), &cancel)
        .unwrap();
    assert_eq!(layers.material_id[0], 1);
    assert!((layers.rgba[2] - 1.0).abs() < 1e-5);
}

#[test]
fn primitive_range_limits_hits() {
    let spheres = Spheres::new(vec![0.0, 0.0, 0.0, 0.0, 0.0, -3.0], vec![1.0, 1.0]);
    let options = RenderOptions::default().with_trace(TraceOptions {
        prim_ids_range: 1..2,
        ..Default::default()
    });
    let mut renderer = built_renderer(spheres, options);

    let mut layers = RenderLayers::new(1, 1);
    let cancel = AtomicBool::new(false);
    let ray = Ray::new_simple(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
    renderer
        .render_with(&mut layers, &FixedRay(ray), &config(1, 1, 0), &cancel)
        .unwrap();
    // The nearer sphere 0 is excluded, so the hit lands on sphere 1.
    assert!((layers.depth[0] - 7.0).abs() < 1e-5);
}

fn random_ray(rng: &mut StdRng) -> Ray {
    let origin = Vec3::new(rng.gen_range(-4.0..4.0), rng.gen_range(-4.0..4.0), 6.0);
    let target = Vec3::new(rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0), rng.gen_range(-2.0..2.0));
    Ray::new_simple(origin, (target - origin).normalize())
}

fn brute_force<I: Intersector>(isector: &mut I, count: usize, ray: &Ray) -> Option<Intersection> {
    isector.prepare_traversal(ray, &TraceOptions::default());
    let mut t_max = ray.t_max;
    let mut hit = false;
    for prim in 0..count as u32 {
        if isector.intersect(prim, &mut t_max) {
            isector.update(t_max, prim);
            hit = true;
        }
    }
    let mut isect = Intersection::default();
    isector.post_traversal(ray, hit, &mut isect);
    hit.then_some(isect)
}
