use crate::{Interval, Ray, Vec3};

/// Direction components smaller than this are treated as parallel to a slab.
const PARALLEL_EPSILON: f32 = 1e-8;

/// Axis-Aligned Bounding Box for spatial acceleration structures (BVH).
///
/// The box is an accumulator: it starts [`Aabb::EMPTY`] (inverted bounds) and
/// grows through [`Aabb::update`] so that it always encloses every point it
/// has been given.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Aabb {
    /// Create an AABB from two corner points (in any order).
    pub fn from_points(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Smallest box enclosing all `points`; [`Aabb::EMPTY`] for no points.
    pub fn enclosing<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut aabb = Self::EMPTY;
        for p in points {
            aabb.update(p);
        }
        aabb
    }

    /// Grow the box so it contains `p`.
    #[inline]
    pub fn update(&mut self, p: Vec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Grow the box so it contains `other`.
    #[inline]
    pub fn update_aabb(&mut self, other: &Aabb) {
        if other.is_empty() {
            return;
        }
        self.update(other.min);
        self.update(other.max);
    }

    /// True until the first point has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// True if `p` lies inside or on the box.
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// True if `other` lies entirely inside this box.
    pub fn encloses(&self, other: &Aabb) -> bool {
        other.is_empty() || (self.contains(other.min) && self.contains(other.max))
    }

    /// Size of the box along each axis.
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Returns the index (0=X, 1=Y, 2=Z) of the axis with the longest extent.
    ///
    /// Ties resolve towards the lower axis index.
    pub fn longest_axis(&self) -> usize {
        let e = self.extent().abs();
        let axis = if e.x >= e.y { 0 } else { 1 };
        if e[axis] >= e.z {
            axis
        } else {
            2
        }
    }

    /// Returns the center point of the bounding box.
    pub fn centroid(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Copy of the box where every axis thinner than `delta` is widened to
    /// `delta`, centered on the original slab.
    pub fn padded(&self, delta: f32) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = *self;
        for axis in 0..3 {
            let size = self.max[axis] - self.min[axis];
            if size < delta {
                let pad = (delta - size) * 0.5;
                out.min[axis] -= pad;
                out.max[axis] += pad;
            }
        }
        out
    }

    /// Slab test: returns the parametric `[entry, exit]` interval where the
    /// ray is inside the box, or `None` when it misses or when the box lies
    /// entirely outside `ray_t`.
    ///
    /// Direction components close to zero are handled explicitly instead of
    /// relying on IEEE infinities: the ray is then parallel to that slab and
    /// only hits if its origin lies within it.
    pub fn hit(&self, ray: &Ray, ray_t: Interval) -> Option<Interval> {
        let mut entry = f32::NEG_INFINITY;
        let mut exit = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];

            if dir.abs() < PARALLEL_EPSILON {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (self.min[axis] - origin) * inv;
            let mut t1 = (self.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            entry = entry.max(t0);
            exit = exit.min(t1);
            if entry > exit {
                return None;
            }
        }

        // Entirely behind or beyond the caller's range
        let span = Interval::new(entry, exit);
        if span.intersect(&ray_t).is_empty() {
            return None;
        }

        Some(span)
    }

    pub const EMPTY: Aabb = Aabb {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube() -> Aabb {
        Aabb::from_points(Vec3::ZERO, Vec3::ONE)
    }

    #[test]
    fn test_aabb_update_encloses_points() {
        let points = [
            Vec3::new(1.0, -2.0, 3.0),
            Vec3::new(-4.0, 5.0, 0.5),
            Vec3::new(0.0, 0.0, -7.0),
        ];
        let mut aabb = Aabb::EMPTY;
        assert!(aabb.is_empty());

        for p in points {
            aabb.update(p);
        }
        assert!(!aabb.is_empty());
        for p in points {
            assert!(aabb.contains(p));
        }
        assert_eq!(aabb.min, Vec3::new(-4.0, -2.0, -7.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 5.0, 3.0));
    }

    #[test]
    fn test_aabb_update_aabb() {
        let box1 = Aabb::from_points(Vec3::ZERO, Vec3::new(5.0, 5.0, 5.0));
        let box2 = Aabb::from_points(Vec3::new(3.0, 3.0, 3.0), Vec3::new(10.0, 10.0, 10.0));
        let mut surrounding = box1;
        surrounding.update_aabb(&box2);

        assert_eq!(surrounding.min, Vec3::ZERO);
        assert_eq!(surrounding.max, Vec3::splat(10.0));
        assert!(surrounding.encloses(&box1));
        assert!(surrounding.encloses(&box2));
    }

    #[test]
    fn test_aabb_update_with_empty_is_noop() {
        let mut aabb = unit_cube();
        aabb.update_aabb(&Aabb::EMPTY);
        assert_eq!(aabb, unit_cube());
    }

    #[test]
    fn test_aabb_longest_axis() {
        let aabb_x = Aabb::from_points(Vec3::ZERO, Vec3::new(10.0, 1.0, 1.0));
        assert_eq!(aabb_x.longest_axis(), 0);

        let aabb_y = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 10.0, 1.0));
        assert_eq!(aabb_y.longest_axis(), 1);

        let aabb_z = Aabb::from_points(Vec3::ZERO, Vec3::new(1.0, 1.0, 10.0));
        assert_eq!(aabb_z.longest_axis(), 2);
    }

    #[test]
    fn test_aabb_padded() {
        let flat = Aabb::from_points(Vec3::new(0.0, 0.0, 2.0), Vec3::new(1.0, 1.0, 2.0));
        let padded = flat.padded(0.01);
        assert!((padded.min.z - 1.995).abs() < 1e-6);
        assert!((padded.max.z - 2.005).abs() < 1e-6);
        assert_eq!(padded.min.x, 0.0);
        assert!(padded.encloses(&flat));
    }

    #[test]
    fn test_aabb_hit_interval() {
        let ray = Ray::new(Vec3::new(-1.0, 0.25, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = unit_cube().hit(&ray, Interval::FORWARD).expect("ray crosses the cube");
        assert!((hit.min - 1.0).abs() < 1e-6);
        assert!((hit.max - 2.0).abs() < 1e-6);

        // Diagonal through opposite corners
        let ray = Ray::new(Vec3::splat(-1.0), Vec3::ONE.normalize());
        let hit = unit_cube().hit(&ray, Interval::FORWARD).expect("diagonal hit");
        let sqrt3 = 3.0f32.sqrt();
        assert!((hit.min - sqrt3).abs() < 1e-5);
        assert!((hit.max - 2.0 * sqrt3).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_miss() {
        // Passes beside the cube
        let ray = Ray::new(Vec3::new(-1.0, 2.0, 0.5), Vec3::new(1.0, 0.1, 0.0));
        assert!(unit_cube().hit(&ray, Interval::FORWARD).is_none());

        // Points away from the cube
        let ray = Ray::new(Vec3::new(-1.0, 0.5, 0.5), Vec3::new(-1.0, 0.0, 0.0));
        assert!(unit_cube().hit(&ray, Interval::FORWARD).is_none());

        // Box beyond the allowed range
        let ray = Ray::new(Vec3::new(-5.0, 0.5, 0.5), Vec3::X);
        assert!(unit_cube().hit(&ray, Interval::new(0.0, 2.0)).is_none());
    }

    #[test]
    fn test_aabb_hit_zero_direction_components() {
        // Origin inside the y and z slabs, direction has zero y and z
        let ray = Ray::new(Vec3::new(-2.0, 0.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        let hit = unit_cube().hit(&ray, Interval::FORWARD).expect("axis aligned hit");
        assert!(hit.min.is_finite() && hit.max.is_finite());
        assert!((hit.min - 2.0).abs() < 1e-6);
        assert!((hit.max - 3.0).abs() < 1e-6);

        // Same direction, origin outside the y slab
        let ray = Ray::new(Vec3::new(-2.0, 1.5, 0.5), Vec3::new(1.0, 0.0, 0.0));
        assert!(unit_cube().hit(&ray, Interval::FORWARD).is_none());

        // Negative zero and a flat box
        let flat = Aabb::from_points(Vec3::new(0.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        let ray = Ray::new(Vec3::new(0.5, 0.0, -1.0), Vec3::new(-0.0, 0.0, 1.0));
        assert!(flat.hit(&ray, Interval::FORWARD).is_some());
    }

    #[test]
    fn test_aabb_hit_from_inside() {
        let ray = Ray::new(Vec3::splat(0.5), Vec3::new(0.0, 1.0, 0.0));
        let hit = unit_cube().hit(&ray, Interval::FORWARD).expect("origin inside");
        assert!(hit.min < 0.0);
        assert!((hit.max - 0.5).abs() < 1e-6);
    }
}
