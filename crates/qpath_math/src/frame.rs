use crate::{normalize_or, Vec3};

/// Orthonormal tangent frame with `z` along a surface normal.
///
/// Hemisphere samplers produce directions with `z` as the "up" axis; the
/// frame carries them to world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    pub x: Vec3,
    pub y: Vec3,
    pub z: Vec3,
}

impl Frame {
    /// Build a frame around `normal`, using `edge` (any vector lying roughly
    /// in the surface plane, e.g. a triangle edge) to fix the tangent.
    ///
    /// Falls back to an arbitrary tangent when `edge` is parallel to the
    /// normal or degenerate.
    pub fn from_normal_and_edge(normal: Vec3, edge: Vec3) -> Self {
        let z = normalize_or(normal, Vec3::Z);
        let in_plane = edge - z * edge.dot(z);
        let x = in_plane
            .try_normalize()
            .unwrap_or_else(|| z.any_orthonormal_vector());
        let y = z.cross(x);
        Self { x, y, z }
    }

    /// Local (tangent space) direction to world space.
    #[inline]
    pub fn to_world(&self, v: Vec3) -> Vec3 {
        self.x * v.x + self.y * v.y + self.z * v.z
    }

    /// World direction to local (tangent space).
    #[inline]
    pub fn to_local(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_orthonormal(f: &Frame) {
        assert!((f.x.length() - 1.0).abs() < 1e-5);
        assert!((f.y.length() - 1.0).abs() < 1e-5);
        assert!((f.z.length() - 1.0).abs() < 1e-5);
        assert!(f.x.dot(f.y).abs() < 1e-5);
        assert!(f.x.dot(f.z).abs() < 1e-5);
        assert!(f.y.dot(f.z).abs() < 1e-5);
    }

    #[test]
    fn test_frame_maps_up_to_normal() {
        let n = Vec3::new(1.0, 2.0, -0.5).normalize();
        let frame = Frame::from_normal_and_edge(n, Vec3::new(0.3, 0.1, 0.9));
        assert_orthonormal(&frame);
        assert!((frame.to_world(Vec3::Z) - n).length() < 1e-5);
    }

    #[test]
    fn test_frame_roundtrip() {
        let frame = Frame::from_normal_and_edge(Vec3::Y, Vec3::X);
        let v = Vec3::new(0.2, -0.4, 0.7);
        let back = frame.to_local(frame.to_world(v));
        assert!((back - v).length() < 1e-5);
    }

    #[test]
    fn test_frame_degenerate_edge() {
        // Edge parallel to the normal
        let frame = Frame::from_normal_and_edge(Vec3::Z, Vec3::new(0.0, 0.0, 3.0));
        assert_orthonormal(&frame);

        // Zero normal falls back to +Z
        let frame = Frame::from_normal_and_edge(Vec3::ZERO, Vec3::X);
        assert_orthonormal(&frame);
        assert_eq!(frame.z, Vec3::Z);
    }
}
