//! Surface materials referenced by per-face material ids.

use glint_math::Vec3;

/// A simple diffuse/specular material.
///
/// Texture references index into the texture list handed to the renderer
/// alongside the materials. Only the diffuse terms are shaded; the specular
/// terms are carried through from the scene for callers that read them.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Diffuse/albedo color (RGB, 0-1)
    pub diffuse: Vec3,

    /// Specular color (RGB, 0-1). Not used by the shader.
    pub specular: Vec3,

    /// Index of the diffuse texture
    pub diffuse_texture: Option<usize>,

    /// Index of the specular texture. Not used by the shader.
    pub specular_texture: Option<usize>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            diffuse: Vec3::splat(0.5), // Grey default
            specular: Vec3::splat(0.5),
            diffuse_texture: None,
            specular_texture: None,
        }
    }
}

impl Material {
    /// Create a material with the given diffuse color.
    pub fn new(diffuse: Vec3) -> Self {
        Self {
            diffuse,
            ..Default::default()
        }
    }

    /// Set the diffuse texture index.
    pub fn with_diffuse_texture(mut self, texture: usize) -> Self {
        self.diffuse_texture = Some(texture);
        self
    }
}
