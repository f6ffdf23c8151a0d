//! Turn a traversal hit into the values written to every output layer.

use glint_core::mesh::lerp3;
use glint_core::{Material, PixelSample, Spheres, Texture, TriangleMesh};
use glint_math::{Ray, Vec2, Vec3};

use crate::intersector::Intersection;

/// Albedo used when a primitive has neither a material nor a color.
const DEFAULT_ALBEDO: f32 = 0.5;

/// Shade a sphere hit.
///
/// Per-sphere colors are written flat; otherwise a grey `|N·D|` term is used.
pub fn shade_sphere(spheres: &Spheres, ray: &Ray, isect: &Intersection) -> PixelSample {
    let i = isect.prim_id as usize;
    let position = ray.at(isect.t);
    let normal = (position - spheres.center(i)).normalize_or_zero();
    let uv = Vec2::new(isect.u, isect.v);

    let (color, vertex_color) = match spheres.color(i) {
        Some(c) => (c, c),
        None => (
            Vec3::splat(DEFAULT_ALBEDO * normal.dot(ray.direction).abs()),
            Vec3::ZERO,
        ),
    };

    PixelSample {
        color,
        position,
        normal,
        depth: isect.t,
        texcoord: uv,
        varycoord: uv,
        vertex_color,
        material_id: -1,
    }
}

/// Shade a triangle hit.
///
/// Faces with a valid material use its diffuse texture or color; faces
/// without one fall back to vertex colors, then to grey.
pub fn shade_triangle(
    mesh: &TriangleMesh,
    materials: &[Material],
    textures: &[Texture],
    ray: &Ray,
    isect: &Intersection,
) -> PixelSample {
    let face = isect.prim_id as usize;
    let (u, v) = (isect.u, isect.v);
    let position = ray.at(isect.t);

    let normal = match mesh.facevarying_normal(face) {
        Some([n0, n1, n2]) => lerp3(n0, n1, n2, u, v).normalize_or_zero(),
        None => mesh.face_normal(face),
    };

    let texcoord = match mesh.facevarying_uv(face) {
        Some([t0, t1, t2]) => (1.0 - u - v) * t0 + u * t1 + v * t2,
        None => Vec2::ZERO,
    };

    let vertex_color = mesh
        .vertex_color(face)
        .map(|[c0, c1, c2]| lerp3(c0, c1, c2, u, v));

    let shade = normal.dot(ray.direction).abs();
    let material = mesh
        .material_id(face)
        .and_then(|id| materials.get(id as usize).map(|m| (id, m)));

    let (color, material_id) = match (material, vertex_color) {
        (Some((id, material)), _) => {
            let albedo = material
                .diffuse_texture
                .and_then(|t| textures.get(t))
                .map_or(material.diffuse, |tex| tex.fetch(texcoord.x, texcoord.y));
            (albedo * shade, id as i32)
        }
        (None, Some(vcol)) => (vcol, -1),
        (None, None) => (Vec3::splat(DEFAULT_ALBEDO * shade), -1),
    };

    PixelSample {
        color,
        position,
        normal,
        depth: isect.t,
        texcoord,
        varycoord: Vec2::new(u, v),
        vertex_color: vertex_color.unwrap_or(Vec3::ZERO),
        material_id,
    }
}
