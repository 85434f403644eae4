//! Ray-triangle intersection.
//!
//! Uses the Möller-Trumbore algorithm.

use qpath_math::{Ray, Vec3};

/// Determinants below this magnitude are treated as parallel/degenerate.
pub const DETERMINANT_EPSILON: f32 = 1e-5;

/// Raw result of a ray-triangle test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    /// Distance along the ray
    pub t: f32,
    /// Barycentric weights of the three corners (sum to 1)
    pub barycentric: Vec3,
}

/// Möller-Trumbore ray-triangle intersection.
///
/// Returns `None` for near-parallel rays and for hits behind the origin.
/// Self-intersection exclusion is the caller's job, since a bare triangle
/// has no identity.
pub fn intersect_triangle(ray: &Ray, [v0, v1, v2]: [Vec3; 3]) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let h = ray.direction.cross(edge2);
    let det = edge1.dot(h);

    if det.abs() < DETERMINANT_EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let s = ray.origin - v0;
    let b1 = inv_det * s.dot(h);
    if !(0.0..=1.0).contains(&b1) {
        return None;
    }

    let q = s.cross(edge1);
    let b2 = inv_det * ray.direction.dot(q);
    if b2 < 0.0 || b1 + b2 > 1.0 {
        return None;
    }

    let t = inv_det * edge2.dot(q);
    if t < 0.0 {
        return None;
    }

    Some(TriangleHit {
        t,
        barycentric: Vec3::new(1.0 - b1 - b2, b1, b2),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRI: [Vec3; 3] = [
        Vec3::new(-1.0, -1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
        Vec3::new(0.0, 1.0, -1.0),
    ];

    #[test]
    fn test_triangle_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let hit = intersect_triangle(&ray, TRI).unwrap();

        assert!((hit.t - 1.0).abs() < 1e-5);
        let b = hit.barycentric;
        assert!((b.x + b.y + b.z - 1.0).abs() < 1e-5);
        // Barycentrics reproduce the hit point
        let p = TRI[0] * b.x + TRI[1] * b.y + TRI[2] * b.z;
        assert!((p - ray.at(hit.t)).length() < 1e-5);
    }

    #[test]
    fn test_triangle_miss() {
        // Pointing away
        let away = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 1.0));
        assert!(intersect_triangle(&away, TRI).is_none());

        // Outside the edges
        let beside = Ray::new(Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(intersect_triangle(&beside, TRI).is_none());
    }

    #[test]
    fn test_triangle_parallel_is_no_hit() {
        let grazing = Ray::new(Vec3::new(0.0, 0.0, -1.0), Vec3::X);
        assert!(intersect_triangle(&grazing, TRI).is_none());

        let degenerate = [Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)];
        let ray = Ray::new(Vec3::new(0.5, 1.0, 0.0), Vec3::NEG_Y);
        assert!(intersect_triangle(&ray, degenerate).is_none());
    }

    #[test]
    fn test_triangle_back_face_hits() {
        // Winding does not matter for the test itself
        let ray = Ray::new(Vec3::new(0.0, 0.0, -2.0), Vec3::Z);
        let hit = intersect_triangle(&ray, TRI).unwrap();
        assert!((hit.t - 1.0).abs() < 1e-5);
    }
}
