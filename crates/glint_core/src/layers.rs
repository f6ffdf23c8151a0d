//! Per-pixel output buffers (AOV layers) and progressive accumulation.
//!
//! All layers are row-major with row 0 at the bottom of the image. The color
//! layer accumulates across passes; the others hold the most recent sample.

use glint_math::{Vec2, Vec3, Vec4};

/// Channels per pixel of the four-wide float layers.
const RGBA: usize = 4;
/// Channels per pixel of the texcoord layer.
const UV: usize = 2;

/// Everything a single camera ray writes for a hit.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PixelSample {
    pub color: Vec3,
    pub position: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    pub texcoord: Vec2,
    pub varycoord: Vec2,
    pub vertex_color: Vec3,
    /// Material index, -1 when the primitive has none
    pub material_id: i32,
}

/// Caller-owned output buffers for a render session.
#[derive(Clone, Debug)]
pub struct RenderLayers {
    pub width: u32,
    pub height: u32,

    /// Accumulated color, RGBA per pixel
    pub rgba: Vec<f32>,

    /// Hit position, (x, y, z, 1)
    pub position: Vec<f32>,

    /// Shading normal remapped to [0, 1], (n * 0.5 + 0.5, 1)
    pub normal: Vec<f32>,

    /// Hit distance replicated to RGB, (t, t, t, 1)
    pub depth: Vec<f32>,

    /// Surface texture coordinates, (u, v)
    pub texcoord: Vec<f32>,

    /// Barycentric (triangles) or spherical (spheres) coordinates, (u, v, 0, 1)
    pub varycoord: Vec<f32>,

    /// Interpolated vertex color, (r, g, b, 1)
    pub vertex_color: Vec<f32>,

    /// Material index per pixel, -1 for none or miss
    pub material_id: Vec<i32>,

    /// Number of passes accumulated into `rgba`
    pub sample_counts: Vec<u32>,
}

impl RenderLayers {
    /// Allocate zeroed layers for a `width` x `height` image.
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            width,
            height,
            rgba: vec![0.0; n * RGBA],
            position: vec![0.0; n * RGBA],
            normal: vec![0.0; n * RGBA],
            depth: vec![0.0; n * RGBA],
            texcoord: vec![0.0; n * UV],
            varycoord: vec![0.0; n * RGBA],
            vertex_color: vec![0.0; n * RGBA],
            material_id: vec![-1; n],
            sample_counts: vec![0; n],
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// True if every layer is sized for a `width` x `height` image.
    pub fn matches(&self, width: u32, height: u32) -> bool {
        let n = width as usize * height as usize;
        self.width == width
            && self.height == height
            && self.rgba.len() == n * RGBA
            && self.position.len() == n * RGBA
            && self.normal.len() == n * RGBA
            && self.depth.len() == n * RGBA
            && self.texcoord.len() == n * UV
            && self.varycoord.len() == n * RGBA
            && self.vertex_color.len() == n * RGBA
            && self.material_id.len() == n
            && self.sample_counts.len() == n
    }

    /// Reset every layer to its freshly allocated state.
    pub fn clear(&mut self) {
        for layer in [
            &mut self.rgba,
            &mut self.position,
            &mut self.normal,
            &mut self.depth,
            &mut self.texcoord,
            &mut self.varycoord,
            &mut self.vertex_color,
        ] {
            layer.fill(0.0);
        }
        self.material_id.fill(-1);
        self.sample_counts.fill(0);
    }

    /// Split the layers into independently writable rows, bottom row first.
    pub fn rows_mut(&mut self) -> Vec<LayerRow<'_>> {
        let w = self.width as usize;
        if w == 0 || self.height == 0 {
            return Vec::new();
        }

        self.rgba
            .chunks_mut(w * RGBA)
            .zip(self.position.chunks_mut(w * RGBA))
            .zip(self.normal.chunks_mut(w * RGBA))
            .zip(self.depth.chunks_mut(w * RGBA))
            .zip(self.texcoord.chunks_mut(w * UV))
            .zip(self.varycoord.chunks_mut(w * RGBA))
            .zip(self.vertex_color.chunks_mut(w * RGBA))
            .zip(self.material_id.chunks_mut(w))
            .zip(self.sample_counts.chunks_mut(w))
            .enumerate()
            .map(
                |(
                    y,
                    (
                        (
                            ((((((rgba, position), normal), depth), texcoord), varycoord), vertex_color),
                            material_id,
                        ),
                        sample_counts,
                    ),
                )| LayerRow {
                    y: y as u32,
                    rgba,
                    position,
                    normal,
                    depth,
                    texcoord,
                    varycoord,
                    vertex_color,
                    material_id,
                    sample_counts,
                },
            )
            .collect()
    }

    /// Accumulated color divided by the sample count.
    pub fn resolved_color(&self, x: u32, y: u32) -> Vec4 {
        let i = (y * self.width + x) as usize;
        let sum = Vec4::from_slice(&self.rgba[RGBA * i..RGBA * i + RGBA]);
        sum / self.sample_counts[i].max(1) as f32
    }

    /// Gamma-corrected 8-bit RGBA with the top row first, ready for an
    /// image encoder.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixel_count() * 4);
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let c = self.resolved_color(x, y);
                out.extend_from_slice(&[
                    to_byte(linear_to_gamma(c.x)),
                    to_byte(linear_to_gamma(c.y)),
                    to_byte(linear_to_gamma(c.z)),
                    to_byte(c.w),
                ]);
            }
        }
        out
    }
}

#[inline]
fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

#[inline]
fn to_byte(value: f32) -> u8 {
    (255.0 * value.clamp(0.0, 1.0)) as u8
}

/// One image row of every layer, borrowed mutably.
#[derive(Debug)]
pub struct LayerRow<'a> {
    /// Row index, 0 = bottom
    pub y: u32,
    pub rgba: &'a mut [f32],
    pub position: &'a mut [f32],
    pub normal: &'a mut [f32],
    pub depth: &'a mut [f32],
    pub texcoord: &'a mut [f32],
    pub varycoord: &'a mut [f32],
    pub vertex_color: &'a mut [f32],
    pub material_id: &'a mut [i32],
    pub sample_counts: &'a mut [u32],
}

impl LayerRow<'_> {
    pub fn width(&self) -> usize {
        self.material_id.len()
    }

    /// Store a hit. Pass 0 overwrites the color, later passes add to it.
    pub fn write_hit(&mut self, x: usize, sample: &PixelSample, pass: u32) {
        let color = sample.color.extend(1.0);
        let rgba = Vec4::from_slice(&self.rgba[RGBA * x..RGBA * x + RGBA]);
        let rgba = if pass == 0 { color } else { rgba + color };
        put4(self.rgba, x, rgba);

        put4(self.position, x, sample.position.extend(1.0));
        put4(self.normal, x, (sample.normal * 0.5 + 0.5).extend(1.0));
        put4(self.depth, x, Vec3::splat(sample.depth).extend(1.0));
        self.texcoord[UV * x..UV * x + UV].copy_from_slice(&sample.texcoord.to_array());
        put4(self.varycoord, x, Vec4::new(sample.varycoord.x, sample.varycoord.y, 0.0, 1.0));
        put4(self.vertex_color, x, sample.vertex_color.extend(1.0));
        self.material_id[x] = sample.material_id;
        self.bump_count(x, pass);
    }

    /// Store a miss. The accumulated color is only cleared on pass 0.
    pub fn write_miss(&mut self, x: usize, pass: u32) {
        if pass == 0 {
            put4(self.rgba, x, Vec4::ZERO);
        }
        put4(self.position, x, Vec4::ZERO);
        put4(self.normal, x, Vec4::ZERO);
        put4(self.depth, x, Vec4::ZERO);
        self.texcoord[UV * x..UV * x + UV].fill(0.0);
        put4(self.varycoord, x, Vec4::ZERO);
        put4(self.vertex_color, x, Vec4::ZERO);
        self.material_id[x] = -1;
        self.bump_count(x, pass);
    }

    #[inline]
    fn bump_count(&mut self, x: usize, pass: u32) {
        self.sample_counts[x] = if pass == 0 {
            1
        } else {
            self.sample_counts[x] + 1
        };
    }
}

#[inline]
fn put4(layer: &mut [f32], x: usize, value: Vec4) {
    layer[RGBA * x..RGBA * x + RGBA].copy_from_slice(&value.to_array());
}
