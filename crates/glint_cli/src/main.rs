//! Headless driver: renders a procedural scene for a number of progressive
//! passes and writes the color and normal layers as PNG files.
//!
//! Usage: `glint [CONFIG] [OUTPUT] [--mesh]`

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glint_core::{Material, PointCloud, RenderConfig, RenderLayers, Texture, TriangleMesh};
use glint_math::{Quat, Vec3};
use glint_renderer::Renderer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Points in the procedural cloud before `max_points` is applied.
const CLOUD_POINTS: usize = 200_000;

/// Render a procedural scene progressively and write its layers as PNG files.
#[derive(Debug, Parser)]
#[command(name = "glint", version, about)]
struct Args {
    /// JSON render configuration; defaults apply when omitted.
    config: Option<PathBuf>,

    /// Color output path. The normal layer is written next to it as `<stem>_normal.png`.
    #[arg(default_value = "glint.png")]
    output: PathBuf,

    /// Render a textured checker mesh instead of the point cloud.
    #[arg(long)]
    mesh: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => RenderConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RenderConfig::default(),
    };

    log::info!("Starting Glint: {}x{}, {} passes", config.width, config.height, config.passes);

    let mut renderer = Renderer::new();
    if args.mesh {
        let (mesh, materials, textures) = checker_scene();
        renderer.load_mesh(mesh.scaled(config.scene_scale), materials, textures)?;
    } else {
        let spheres = spiral_cloud(CLOUD_POINTS).into_spheres(config.max_points);
        renderer.load_spheres(spheres)?;
    }
    renderer.build_bvh()?;

    let mut layers = RenderLayers::new(config.width, config.height);
    let cancel = AtomicBool::new(false);
    let start = Instant::now();
    for pass in 0..config.passes.max(1) {
        renderer.render(&mut layers, Quat::IDENTITY, &config.with_pass(pass), &cancel)?;
    }
    log::info!("Rendered {} passes in {:.2?}", config.passes.max(1), start.elapsed());

    save_png(&args.output, &layers.to_rgba8(), &config)?;
    let normal_path = sibling_path(&args.output, "normal");
    save_png(&normal_path, &normal_rgba8(&layers), &config)?;

    Ok(())
}

/// A colored spiral galaxy of points around the origin.
fn spiral_cloud(count: usize) -> PointCloud {
    let mut rng = StdRng::seed_from_u64(0x9e3779b9);
    let mut positions = Vec::with_capacity(3 * count);
    let mut colors = Vec::with_capacity(3 * count);

    for _ in 0..count {
        let arm = rng.gen_range(0..3) as f32;
        let r: f32 = rng.gen_range(0.05f32..1.0).sqrt() * 10.0;
        let angle = r * 0.6 + arm * std::f32::consts::TAU / 3.0 + rng.gen_range(-0.25..0.25);
        let height = rng.gen_range(-0.4..0.4) * (1.0 - r / 10.0);

        positions.extend_from_slice(&[r * angle.cos(), height, r * angle.sin()]);

        let t = r / 10.0;
        let color = Vec3::new(1.0, 0.85, 0.6).lerp(Vec3::new(0.3, 0.5, 1.0), t);
        colors.extend_from_slice(&color.to_array());
    }

    PointCloud::new(positions, colors)
}

/// A tilted grid of quads alternating between a flat and a textured material.
fn checker_scene() -> (TriangleMesh, Vec<Material>, Vec<Texture>) {
    const N: u32 = 8;
    let mut vertices = Vec::new();
    let mut faces = Vec::new();
    let mut uvs = Vec::new();
    let mut material_ids = Vec::new();

    for j in 0..N {
        for i in 0..N {
            let x = i as f32 / N as f32 * 4.0 - 2.0;
            let z = j as f32 / N as f32 * 4.0 - 2.0;
            let s = 4.0 / N as f32;
            let base = vertices.len() as u32 / 3;
            for (dx, dz) in [(0.0, 0.0), (s, 0.0), (0.0, s), (s, s)] {
                vertices.extend_from_slice(&[x + dx, -1.0, z + dz]);
            }
            faces.extend_from_slice(&[base, base + 2, base + 1, base + 1, base + 2, base + 3]);
            uvs.extend_from_slice(&[0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
            let id = (i + j) % 2;
            material_ids.extend_from_slice(&[id, id]);
        }
    }

    let mesh = TriangleMesh::new(vertices, faces)
        .with_uvs(uvs)
        .with_material_ids(material_ids);
    let materials = vec![
        Material::new(Vec3::new(0.8, 0.3, 0.2)),
        Material::default().with_diffuse_texture(0),
    ];
    let gradient = (0..16u32)
        .flat_map(|y| (0..16u32).flat_map(move |x| [(x * 16) as u8, (y * 16) as u8, 200]))
        .collect();
    let textures = vec![Texture::new(16, 16, 3, gradient)];

    (mesh, materials, textures)
}

/// The normal layer as 8-bit RGBA, top row first.
fn normal_rgba8(layers: &RenderLayers) -> Vec<u8> {
    let row_len = layers.width as usize * 4;
    layers
        .normal
        .chunks_exact(row_len)
        .rev()
        .flatten()
        .map(|&v| (255.0 * v.clamp(0.0, 1.0)) as u8)
        .collect()
}

/// `out.png` -> `out_<suffix>.png`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("glint");
    path.with_file_name(format!("{stem}_{suffix}.png"))
}

fn save_png(path: &Path, rgba: &[u8], config: &RenderConfig) -> Result<()> {
    image::save_buffer(path, rgba, config.width, config.height, image::ColorType::Rgba8)
        .with_context(|| format!("failed to write {}", path.display()))?;
    log::info!("Saved {}", path.display());
    Ok(())
}
