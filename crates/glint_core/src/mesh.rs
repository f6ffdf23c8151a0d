//! Triangle mesh geometry.
//!
//! Attributes follow the layout produced by OBJ-style loaders: positions and
//! colors are shared per vertex, while normals and UVs are stored per face
//! vertex ("facevarying") so hard edges and UV seams survive.

use glint_math::{Aabb, Vec2, Vec3};

use crate::error::{check_optional, check_stride, GeometryError, GeometryResult};

/// A triangle mesh stored as flat arrays.
///
/// Every optional array is either empty (not provided) or sized exactly for
/// the element count it is indexed by.
#[derive(Clone, Debug, Default)]
pub struct TriangleMesh {
    /// Vertex positions, [xyz] per vertex
    pub vertices: Vec<f32>,

    /// Triangle indices (every 3 indices form a triangle)
    pub faces: Vec<u32>,

    /// Shading normals, [xyz] * 3 per face
    pub facevarying_normals: Vec<f32>,

    /// Texture coordinates, [uv] * 3 per face
    pub facevarying_uvs: Vec<f32>,

    /// Vertex colors, [rgb] per vertex
    pub vertex_colors: Vec<f32>,

    /// Material index per face
    pub material_ids: Vec<u32>,
}

impl TriangleMesh {
    /// Create a mesh from positions and indices only.
    pub fn new(vertices: Vec<f32>, faces: Vec<u32>) -> Self {
        Self {
            vertices,
            faces,
            ..Default::default()
        }
    }

    pub fn with_normals(mut self, facevarying_normals: Vec<f32>) -> Self {
        self.facevarying_normals = facevarying_normals;
        self
    }

    pub fn with_uvs(mut self, facevarying_uvs: Vec<f32>) -> Self {
        self.facevarying_uvs = facevarying_uvs;
        self
    }

    pub fn with_vertex_colors(mut self, vertex_colors: Vec<f32>) -> Self {
        self.vertex_colors = vertex_colors;
        self
    }

    pub fn with_material_ids(mut self, material_ids: Vec<u32>) -> Self {
        self.material_ids = material_ids;
        self
    }

    /// Uniformly scale all positions (the loader's scene scale).
    pub fn scaled(mut self, scale: f32) -> Self {
        for v in &mut self.vertices {
            *v *= scale;
        }
        self
    }

    /// Get the number of triangles in the mesh.
    pub fn face_count(&self) -> usize {
        self.faces.len() / 3
    }

    /// Get the number of vertices in the mesh.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 3
    }

    #[inline]
    pub fn vertex(&self, index: u32) -> Vec3 {
        let i = index as usize;
        Vec3::from_slice(&self.vertices[3 * i..3 * i + 3])
    }

    /// Vertex indices of a face.
    #[inline]
    pub fn face_indices(&self, face: usize) -> [u32; 3] {
        [
            self.faces[3 * face],
            self.faces[3 * face + 1],
            self.faces[3 * face + 2],
        ]
    }

    /// The three corner positions of a face.
    #[inline]
    pub fn triangle(&self, face: usize) -> [Vec3; 3] {
        let [i0, i1, i2] = self.face_indices(face);
        [self.vertex(i0), self.vertex(i1), self.vertex(i2)]
    }

    /// Geometric normal of a face (counter-clockwise winding), unit length.
    pub fn face_normal(&self, face: usize) -> Vec3 {
        let [v0, v1, v2] = self.triangle(face);
        (v1 - v0).cross(v2 - v0).normalize_or_zero()
    }

    pub fn has_normals(&self) -> bool {
        !self.facevarying_normals.is_empty()
    }

    pub fn has_uvs(&self) -> bool {
        !self.facevarying_uvs.is_empty()
    }

    pub fn has_vertex_colors(&self) -> bool {
        !self.vertex_colors.is_empty()
    }

    /// Stored normals of the three face vertices.
    pub fn facevarying_normal(&self, face: usize) -> Option<[Vec3; 3]> {
        if !self.has_normals() {
            return None;
        }
        let n = &self.facevarying_normals[9 * face..9 * face + 9];
        Some([
            Vec3::from_slice(&n[0..3]),
            Vec3::from_slice(&n[3..6]),
            Vec3::from_slice(&n[6..9]),
        ])
    }

    /// Stored UVs of the three face vertices.
    pub fn facevarying_uv(&self, face: usize) -> Option<[Vec2; 3]> {
        if !self.has_uvs() {
            return None;
        }
        let uv = &self.facevarying_uvs[6 * face..6 * face + 6];
        Some([
            Vec2::new(uv[0], uv[1]),
            Vec2::new(uv[2], uv[3]),
            Vec2::new(uv[4], uv[5]),
        ])
    }

    /// Colors of the three face vertices.
    pub fn vertex_color(&self, face: usize) -> Option<[Vec3; 3]> {
        if !self.has_vertex_colors() {
            return None;
        }
        let color = |index: u32| {
            let i = index as usize;
            Vec3::from_slice(&self.vertex_colors[3 * i..3 * i + 3])
        };
        let [i0, i1, i2] = self.face_indices(face);
        Some([color(i0), color(i1), color(i2)])
    }

    /// Material index of a face, if material ids were provided.
    pub fn material_id(&self, face: usize) -> Option<u32> {
        self.material_ids.get(face).copied()
    }

    /// Axis-aligned bounding box of all vertices.
    pub fn bounds(&self) -> Aabb {
        self.vertices
            .chunks_exact(3)
            .fold(Aabb::EMPTY, |acc, p| acc.include_point(Vec3::from_slice(p)))
    }

    /// Check array sizes and face indices.
    pub fn validate(&self) -> GeometryResult<()> {
        check_stride("vertices", self.vertices.len(), 3)?;
        check_stride("faces", self.faces.len(), 3)?;

        let faces = self.face_count();
        let vertices = self.vertex_count();
        check_optional("facevarying_normals", self.facevarying_normals.len(), faces, 9)?;
        check_optional("facevarying_uvs", self.facevarying_uvs.len(), faces, 6)?;
        check_optional("vertex_colors", self.vertex_colors.len(), vertices, 3)?;
        check_optional("material_ids", self.material_ids.len(), faces, 1)?;

        if let Some((i, &index)) = self
            .faces
            .iter()
            .enumerate()
            .find(|&(_, &index)| index as usize >= vertices)
        {
            return Err(GeometryError::IndexOutOfRange {
                face: i / 3,
                index,
                vertex_count: vertices,
            });
        }
        Ok(())
    }
}

/// Interpolate three per-vertex values with barycentric weights
/// `(1 - u - v, u, v)`.
#[inline]
pub fn lerp3(v0: Vec3, v1: Vec3, v2: Vec3, u: f32, v: f32) -> Vec3 {
    (1.0 - u - v) * v0 + u * v1 + v * v2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                0.0, 0.0, 0.0, // v0
                1.0, 0.0, 0.0, // v1
                0.0, 1.0, 0.0, // v2
                1.0, 1.0, 0.0, // v3
            ],
            vec![0, 1, 2, 1, 3, 2],
        )
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = quad();

        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.face_count(), 2);
        assert!(!mesh.has_normals());
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_triangle_extraction() {
        let mesh = quad();
        let [a, b, c] = mesh.triangle(1);
        assert_eq!(a, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(b, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(c, Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_face_normal_ccw() {
        // 0,1,2 counter-clockwise viewed from +Z
        let mesh = quad();
        assert!((mesh.face_normal(0) - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_bounds_computation() {
        let mesh = TriangleMesh::new(
            vec![-1.0, -2.0, -3.0, 4.0, 5.0, 6.0, 0.0, 0.0, 0.0],
            vec![0, 1, 2],
        );
        let bounds = mesh.bounds();

        assert_eq!(bounds.min(), Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(bounds.max(), Vec3::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn test_scaled() {
        let mesh = quad().scaled(2.0);
        assert_eq!(mesh.vertex(3), Vec3::new(2.0, 2.0, 0.0));
    }

    #[test]
    fn test_optional_attributes() {
        let mesh = quad()
            .with_normals(vec![0.0, 0.0, 1.0].repeat(6))
            .with_uvs(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0].repeat(2))
            .with_vertex_colors(vec![1.0, 0.0, 0.0].repeat(4))
            .with_material_ids(vec![0, 1]);

        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.facevarying_normal(1), Some([Vec3::Z; 3]));
        assert_eq!(mesh.facevarying_uv(0).map(|uv| uv[1]), Some(Vec2::new(1.0, 0.0)));
        assert_eq!(mesh.vertex_color(0), Some([Vec3::X; 3]));
        assert_eq!(mesh.material_id(1), Some(1));
    }

    #[test]
    fn test_validate_errors() {
        let mesh = quad().with_material_ids(vec![0]);
        assert!(matches!(
            mesh.validate(),
            Err(GeometryError::SizeMismatch { name: "material_ids", .. })
        ));

        let mesh = TriangleMesh::new(vec![0.0; 9], vec![0, 1, 7]);
        assert_eq!(
            mesh.validate(),
            Err(GeometryError::IndexOutOfRange {
                face: 0,
                index: 7,
                vertex_count: 3
            })
        );
    }

    #[test]
    fn test_lerp3() {
        let p = lerp3(Vec3::ZERO, Vec3::X, Vec3::Y, 0.25, 0.5);
        assert_eq!(p, Vec3::new(0.25, 0.5, 0.0));
    }
}
