//! Camera for primary ray generation.

use qpath_math::{normalize_or, Ray, Vec3};

/// Maps normalized image coordinates to primary rays.
pub trait Camera: Send + Sync {
    /// Ray through image position `(x, y)` in `[0, 1)^2`, with `(0, 0)` at
    /// the top-left corner.
    fn primary_ray(&self, x: f32, y: f32) -> Ray;
}

/// Pinhole camera.
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    // Camera positioning
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,

    /// Vertical field of view in degrees
    vfov: f32,
    /// Width over height
    aspect_ratio: f32,

    // Cached computed values (set by initialize())
    upper_left: Vec3,
    horizontal: Vec3,
    vertical: Vec3,
}

impl PinholeCamera {
    /// Create a new camera with default settings, looking down -Z.
    pub fn new() -> Self {
        let mut camera = Self {
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            aspect_ratio: 1.0,
            upper_left: Vec3::ZERO,
            horizontal: Vec3::ZERO,
            vertical: Vec3::ZERO,
        };
        camera.initialize();
        camera
    }

    /// Set camera position.
    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    /// Set the vertical field of view in degrees.
    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }

    /// Set the aspect ratio from an image resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.aspect_ratio = width.max(1) as f32 / height.max(1) as f32;
        self
    }

    pub fn look_from(&self) -> Vec3 {
        self.look_from
    }

    /// Recompute the image plane (must be called after the `with_*` setters).
    pub fn initialize(&mut self) {
        let h = (self.vfov.to_radians() / 2.0).tan();
        let viewport_height = 2.0 * h;
        let viewport_width = viewport_height * self.aspect_ratio;

        // Camera basis; degenerate inputs fall back to the default orientation
        let w = normalize_or(self.look_from - self.look_at, Vec3::Z);
        let u = self
            .vup
            .cross(w)
            .try_normalize()
            .unwrap_or_else(|| w.any_orthonormal_vector());
        let v = w.cross(u);

        self.horizontal = viewport_width * u;
        self.vertical = -viewport_height * v;
        self.upper_left = self.look_from - w - self.horizontal / 2.0 - self.vertical / 2.0;
    }
}

impl Default for PinholeCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl Camera for PinholeCamera {
    fn primary_ray(&self, x: f32, y: f32) -> Ray {
        let target = self.upper_left + x * self.horizontal + y * self.vertical;
        Ray::new(self.look_from, normalize_or(target - self.look_from, Vec3::NEG_Z))
    }
}
