//! Point clouds rendered as spheres.

use glint_math::{Aabb, Vec3};

use crate::error::{check_optional, check_stride, GeometryError, GeometryResult};

/// A set of spheres stored as flat parallel arrays.
///
/// Sphere `i` has center `centers[3i..3i+3]`, radius `radii[i]` and, when
/// `colors` is non-empty, color `colors[3i..3i+3]`.
#[derive(Clone, Debug, Default)]
pub struct Spheres {
    /// Sphere centers, [xyz] per sphere
    pub centers: Vec<f32>,

    /// Sphere radii, one per sphere
    pub radii: Vec<f32>,

    /// Optional per-sphere colors, [rgb] per sphere (empty = not provided)
    pub colors: Vec<f32>,
}

impl Spheres {
    /// Create spheres without colors.
    pub fn new(centers: Vec<f32>, radii: Vec<f32>) -> Self {
        Self {
            centers,
            radii,
            colors: Vec::new(),
        }
    }

    /// Attach per-sphere colors.
    pub fn with_colors(mut self, colors: Vec<f32>) -> Self {
        self.colors = colors;
        self
    }

    /// Number of spheres.
    pub fn len(&self) -> usize {
        self.radii.len()
    }

    pub fn is_empty(&self) -> bool {
        self.radii.is_empty()
    }

    #[inline]
    pub fn center(&self, i: usize) -> Vec3 {
        Vec3::from_slice(&self.centers[3 * i..3 * i + 3])
    }

    #[inline]
    pub fn radius(&self, i: usize) -> f32 {
        self.radii[i]
    }

    pub fn has_colors(&self) -> bool {
        !self.colors.is_empty()
    }

    /// Color of sphere `i`, if colors were provided.
    #[inline]
    pub fn color(&self, i: usize) -> Option<Vec3> {
        if self.has_colors() {
            Some(Vec3::from_slice(&self.colors[3 * i..3 * i + 3]))
        } else {
            None
        }
    }

    /// Check that all arrays agree on the sphere count.
    pub fn validate(&self) -> GeometryResult<()> {
        check_stride("centers", self.centers.len(), 3)?;
        if self.centers.len() / 3 != self.radii.len() {
            return Err(GeometryError::SizeMismatch {
                name: "radii",
                len: self.radii.len(),
                expected: self.centers.len() / 3,
            });
        }
        check_optional("colors", self.colors.len(), self.len(), 3)
    }
}

/// Raw points as produced by a point-cloud loader, before normalization.
#[derive(Clone, Debug, Default)]
pub struct PointCloud {
    /// Point positions, [xyz] per point
    pub positions: Vec<f32>,

    /// Optional colors in [0, 1], [rgb] per point (empty = not provided)
    pub colors: Vec<f32>,
}

impl PointCloud {
    pub fn new(positions: Vec<f32>, colors: Vec<f32>) -> Self {
        Self { positions, colors }
    }

    pub fn len(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.positions.len() < 3
    }

    /// Bounding box of all points.
    pub fn bounds(&self) -> Aabb {
        self.positions
            .chunks_exact(3)
            .fold(Aabb::EMPTY, |acc, p| acc.include_point(Vec3::from_slice(p)))
    }

    /// Convert to spheres fitted into a unit cube around the origin.
    ///
    /// Points are recentred on the bounding-box center and scaled by
    /// `1 / largest_extent`. Every sphere gets the same radius, half a source
    /// unit after scaling (`0.5 / largest_extent`). At most `max_points`
    /// points are kept.
    pub fn into_spheres(self, max_points: Option<usize>) -> Spheres {
        let count = max_points.map_or(self.len(), |max| max.min(self.len()));
        let mut positions = self.positions;
        positions.truncate(count * 3);
        let mut colors = self.colors;
        if colors.len() >= count * 3 {
            colors.truncate(count * 3);
        } else if !colors.is_empty() {
            log::warn!(
                "Point cloud has {} color values for {} points, dropping colors",
                colors.len(),
                count
            );
            colors.clear();
        }

        let bounds = positions
            .chunks_exact(3)
            .fold(Aabb::EMPTY, |acc, p| acc.include_point(Vec3::from_slice(p)));
        let (center, inv_size) = if bounds.is_empty() {
            (Vec3::ZERO, 1.0)
        } else {
            let largest = (bounds.max() - bounds.min()).max_element();
            let inv = if largest > 0.0 { 1.0 / largest } else { 1.0 };
            (bounds.centroid(), inv)
        };
        log::debug!(
            "Normalizing {} points: bmin = {:?}, bmax = {:?}, invsize = {}",
            count,
            bounds.min(),
            bounds.max(),
            inv_size
        );

        for p in positions.chunks_exact_mut(3) {
            let n = (Vec3::from_slice(p) - center) * inv_size;
            p.copy_from_slice(&n.to_array());
        }

        Spheres {
            centers: positions,
            radii: vec![0.5 * inv_size; count],
            colors,
        }
    }
}
