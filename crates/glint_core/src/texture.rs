//! Decoded 8-bit textures.
//!
//! Decoding image files is left to the caller; the renderer only needs the
//! raw pixel buffer.

use glint_math::Vec3;

/// An 8-bit texture with 1 to 4 channels per pixel.
#[derive(Clone, Debug)]
pub struct Texture {
    /// Texture width in pixels
    pub width: u32,

    /// Texture height in pixels
    pub height: u32,

    /// Channels per pixel
    pub components: u32,

    /// Pixel data, row-major, top row first
    pub pixels: Vec<u8>,
}

impl Texture {
    /// Create a new texture from pixel data.
    pub fn new(width: u32, height: u32, components: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            components,
            pixels,
        }
    }

    /// Create a solid color texture (1x1, RGB).
    pub fn solid_color(color: [u8; 3]) -> Self {
        Self::new(1, 1, 3, color.to_vec())
    }

    /// True if the buffer holds at least `width * height * components` bytes.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && (1..=4).contains(&self.components)
            && self
                .required_bytes()
                .is_some_and(|bytes| self.pixels.len() >= bytes)
    }

    /// `None` if the texel count does not fit in memory.
    fn required_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.components as usize)
    }

    /// Fetch the texel at UV coordinates (nearest, no filtering).
    ///
    /// `v = 1` is the top row. Coordinates outside [0, 1] clamp to the edge.
    /// Single- and two-channel textures replicate their first channel.
    pub fn fetch(&self, u: f32, v: f32) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ZERO;
        }

        let tx = ((u * self.width as f32) as i64).clamp(0, self.width as i64 - 1) as usize;
        let ty = (((1.0 - v) * self.height as f32) as i64).clamp(0, self.height as i64 - 1) as usize;
        let offset = (ty * self.width as usize + tx) * self.components as usize;

        let channel = |c: usize| self.pixels[offset + c] as f32 / 255.0;
        if self.components >= 3 {
            Vec3::new(channel(0), channel(1), channel(2))
        } else {
            Vec3::splat(channel(0))
        }
    }

    /// Get total size in bytes.
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }
}
