//! qpath core - scene data for the qpath renderer.
//!
//! This crate provides:
//!
//! - **Geometry**: `Mesh` with per-face and per-vertex normals
//! - **Surfaces**: `Material` parameters and procedural `ScalarField`s
//! - **Lighting**: point and area `Light`s
//! - **Scene**: the read-only container handed to the renderer
//!
//! # Example
//!
//! ```
//! use qpath_core::{Light, Material, Mesh, Scene};
//! use qpath_math::Vec3;
//!
//! let floor = Mesh::new(
//!     vec![Vec3::ZERO, Vec3::X, Vec3::new(0.0, 0.0, -1.0)],
//!     vec![[0, 1, 2]],
//! )?;
//!
//! let mut scene = Scene::new();
//! scene.add_mesh_with_material(floor, Material::new("floor", Vec3::splat(0.8)));
//! scene.add_light(Light::point(Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 10.0));
//! assert_eq!(scene.triangle_count(), 1);
//! # Ok::<(), qpath_core::MeshError>(())
//! ```

pub mod light;
pub mod material;
pub mod mesh;
pub mod noise;
pub mod scene;

// Re-export commonly used types
pub use light::Light;
pub use material::{Color, Material, MaterialId, NoiseLayer, NoiseTarget};
pub use mesh::{Mesh, MeshError};
pub use noise::{ScalarField, Worley};
pub use scene::{Scene, SceneError};
