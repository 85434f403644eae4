use crate::Vec3;

/// Identity of one triangle in a multi-mesh scene.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId {
    /// Index of the mesh in the scene
    pub mesh: usize,
    /// Index of the triangle within that mesh
    pub triangle: u32,
}

impl SurfaceId {
    pub fn new(mesh: usize, triangle: u32) -> Self {
        Self { mesh, triangle }
    }
}

/// A ray in 3D space.
///
/// Rays spawned from a surface carry the [`SurfaceId`] of the triangle they
/// left, so intersection code can skip that exact triangle instead of
/// reporting a spurious hit at distance ~0.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
    pub exclude: Option<SurfaceId>,
}

impl Ray {
    /// Create a new ray.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction,
            exclude: None,
        }
    }

    /// Create a ray leaving the surface `from`.
    pub fn from_surface(origin: Vec3, direction: Vec3, from: SurfaceId) -> Self {
        Self {
            origin,
            direction,
            exclude: Some(from),
        }
    }

    /// True if hits against `surface` must be ignored.
    #[inline]
    pub fn excludes(&self, surface: SurfaceId) -> bool {
        self.exclude == Some(surface)
    }

    /// Get the point along the ray at parameter t.
    ///
    /// Returns: origin + t * direction
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}
