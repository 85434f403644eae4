//! qpath renderer - CPU path tracing with learned directional sampling.
//!
//! A Monte Carlo renderer over triangle meshes. Bounce directions come from
//! uniform or cosine-weighted hemisphere sampling, or from per-BVH-leaf
//! radiance grids that are refined while the image renders.
//!
//! # Example
//!
//! ```
//! use qpath_core::{Light, Material, Mesh, Scene};
//! use qpath_math::Vec3;
//! use qpath_renderer::{ImageBuffer, PinholeCamera, RenderConfig, RenderMode, Renderer};
//!
//! let floor = Mesh::new(
//!     vec![Vec3::new(-5.0, 0.0, 5.0), Vec3::new(5.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -5.0)],
//!     vec![[0, 1, 2]],
//! )
//! .unwrap();
//! let mut scene = Scene::new();
//! scene.add_mesh_with_material(floor, Material::lambertian("floor", Vec3::splat(0.8), 1.0));
//! scene.add_light(Light::point(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 10.0));
//!
//! let camera = PinholeCamera::new().with_position(Vec3::new(0.0, 1.0, 3.0), Vec3::ZERO, Vec3::Y);
//! let mut camera = camera.with_resolution(8, 8);
//! camera.initialize();
//!
//! let config = RenderConfig::default().with_mode(RenderMode::PathTraced).with_quality(4, 2);
//! let mut renderer = Renderer::new(&scene, config).unwrap();
//! let mut image = ImageBuffer::filled(8, 8, Vec3::splat(0.1));
//! renderer.render(&camera, &mut image).unwrap();
//! ```

mod brdf;
mod bucket;
mod bvh;
mod camera;
mod hit;
mod qtable;
mod renderer;
mod sampler;
mod triangle;

pub use brdf::Brdf;
pub use bucket::{generate_buckets, render_bucket, Bucket, BucketResult, DEFAULT_BUCKET_SIZE};
pub use bvh::{Bvh, BvhError, BvhNode, NodeId, NodeKind, Split, TriangleBuckets};
pub use camera::{Camera, PinholeCamera};
pub use hit::{HitRecord, Tracer};
pub use qtable::{scalar, HemisphereGrid, QTable, MIN_VALUE};
pub use renderer::{
    color_to_rgb, linear_to_gamma, GridConfig, ImageBuffer, RenderConfig, RenderError, RenderMode, Renderer,
};
pub use sampler::{CosineHemisphere, HemisphereSample, HemisphereSampler, SamplerKind, UniformHemisphere};
pub use triangle::{intersect_triangle, TriangleHit, DETERMINANT_EPSILON};

/// Re-export the math types the public API is written in
pub use qpath_math::{Aabb, Frame, Interval, Ray, SurfaceId, Vec3};
