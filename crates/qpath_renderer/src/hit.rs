//! Hit records and the scene tracer.

use qpath_core::{Material, Scene};
use qpath_math::{Interval, Ray, SurfaceId, Vec3};

use crate::bvh::{Bvh, NodeId};
use crate::triangle::{intersect_triangle, TriangleHit};

/// Record of a ray-triangle intersection.
#[derive(Debug, Clone)]
pub struct HitRecord<'a> {
    /// Mesh and triangle that were struck
    pub surface: SurfaceId,
    /// Barycentric weights of the triangle's corners
    pub barycentric: Vec3,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Point of intersection
    pub point: Vec3,
    /// Interpolated shading normal, on the side the ray came from
    pub normal: Vec3,
    /// Geometric normal, on the side the ray came from
    pub face_normal: Vec3,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
    /// BVH leaf that produced the hit, if it came from a traversal
    pub leaf: Option<NodeId>,
    /// Material at the intersection point
    pub material: &'a Material,
}

impl<'a> HitRecord<'a> {
    /// Set the normals based on ray direction and the outward face normal.
    ///
    /// Both normals are stored pointing against the ray direction.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_face: Vec3, outward_shading: Vec3) {
        self.front_face = ray.direction.dot(outward_face) < 0.0;

        if self.front_face {
            self.face_normal = outward_face;
            self.normal = outward_shading;
        } else {
            self.face_normal = -outward_face;
            self.normal = -outward_shading;
        }
    }
}

/// Closest-hit and occlusion queries against a scene.
///
/// An empty scene has no BVH; every query against it misses.
#[derive(Debug)]
pub struct Tracer<'s> {
    scene: &'s Scene,
    bvh: Option<Bvh>,
}

impl<'s> Tracer<'s> {
    /// Build the BVH for `scene`.
    pub fn new(scene: &'s Scene, leaf_size: usize) -> Self {
        let bvh = match Bvh::build(scene.meshes(), leaf_size) {
            Ok(bvh) => Some(bvh),
            Err(err) => {
                log::warn!("{err}; every ray will miss");
                None
            }
        };
        Self { scene, bvh }
    }

    pub fn scene(&self) -> &'s Scene {
        self.scene
    }

    pub fn bvh(&self) -> Option<&Bvh> {
        self.bvh.as_ref()
    }

    /// Nearest hit, testing only triangles in leaves the ray crosses.
    pub fn closest_hit(&self, ray: &Ray) -> Option<HitRecord<'s>> {
        let bvh = self.bvh.as_ref()?;
        let mut closest: Option<(SurfaceId, TriangleHit, NodeId)> = None;

        for leaf in bvh.intersect_leaves(ray, Interval::FORWARD) {
            let Some(buckets) = bvh.leaf_triangles(leaf) else {
                continue;
            };
            for (&mesh, tris) in buckets {
                for &triangle in tris {
                    let surface = SurfaceId::new(mesh, triangle);
                    if let Some(hit) = self.test(ray, surface) {
                        if closest.map_or(true, |(_, best, _)| hit.t < best.t) {
                            closest = Some((surface, hit, leaf));
                        }
                    }
                }
            }
        }

        closest.map(|(surface, hit, leaf)| self.record(ray, surface, hit, Some(leaf)))
    }

    /// Nearest hit by testing every triangle in the scene.
    pub fn closest_hit_brute_force(&self, ray: &Ray) -> Option<HitRecord<'s>> {
        let mut closest: Option<(SurfaceId, TriangleHit)> = None;

        for (mesh, m) in self.scene.meshes().iter().enumerate() {
            for triangle in 0..m.triangle_count() as u32 {
                let surface = SurfaceId::new(mesh, triangle);
                if let Some(hit) = self.test(ray, surface) {
                    if closest.map_or(true, |(_, best)| hit.t < best.t) {
                        closest = Some((surface, hit));
                    }
                }
            }
        }

        closest.map(|(surface, hit)| self.record(ray, surface, hit, None))
    }

    /// True if anything lies on the ray strictly between its origin and
    /// `max_dist`.
    pub fn occluded(&self, ray: &Ray, max_dist: f32) -> bool {
        let Some(bvh) = self.bvh.as_ref() else {
            return false;
        };

        let range = Interval::new(0.0, max_dist);
        bvh.intersect_leaves(ray, range).into_iter().any(|leaf| {
            bvh.leaf_triangles(leaf).is_some_and(|buckets| {
                buckets.iter().any(|(&mesh, tris)| {
                    tris.iter().any(|&triangle| {
                        self.test(ray, SurfaceId::new(mesh, triangle))
                            .is_some_and(|hit| range.surrounds(hit.t))
                    })
                })
            })
        })
    }

    #[inline]
    fn test(&self, ray: &Ray, surface: SurfaceId) -> Option<TriangleHit> {
        if ray.excludes(surface) {
            return None;
        }
        intersect_triangle(ray, self.scene.mesh(surface.mesh).triangle_vertices(surface.triangle))
    }

    fn record(&self, ray: &Ray, surface: SurfaceId, hit: TriangleHit, leaf: Option<NodeId>) -> HitRecord<'s> {
        let mesh = self.scene.mesh(surface.mesh);
        let mut rec = HitRecord {
            surface,
            barycentric: hit.barycentric,
            t: hit.t,
            point: ray.at(hit.t),
            normal: Vec3::ZERO,
            face_normal: Vec3::ZERO,
            front_face: false,
            leaf,
            material: self.scene.mesh_material(surface.mesh),
        };
        rec.set_face_normal(
            ray,
            mesh.face_normals()[surface.triangle as usize],
            mesh.interpolated_normal(surface.triangle, hit.barycentric),
        );
        rec
    }
}
