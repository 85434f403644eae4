// Re-export glam for convenience
pub use glam::*;

// qpath math types
mod aabb;
mod frame;
mod interval;
mod ray;

pub use aabb::Aabb;
pub use frame::Frame;
pub use interval::Interval;
pub use ray::{Ray, SurfaceId};

/// Normalize `v`, or return `fallback` when `v` has no usable length.
#[inline]
pub fn normalize_or(v: Vec3, fallback: Vec3) -> Vec3 {
    v.try_normalize().unwrap_or(fallback)
}
