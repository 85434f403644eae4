//! Scene container: meshes, their materials, and light sources.

use thiserror::Error;

use crate::light::Light;
use crate::material::{Material, MaterialId};
use crate::mesh::Mesh;

/// Errors raised while assembling a scene.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    #[error("mesh references material {0:?}, but the scene has {1} materials")]
    UnknownMaterial(MaterialId, usize),
}

/// Everything the renderer reads during a frame.
///
/// Meshes are addressed by their insertion index; that index is the `mesh`
/// half of a [`SurfaceId`](qpath_math::SurfaceId).
#[derive(Clone, Debug, Default)]
pub struct Scene {
    meshes: Vec<Mesh>,
    materials: Vec<Material>,
    lights: Vec<Light>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material and return its id.
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Add a mesh whose material has already been registered.
    pub fn add_mesh(&mut self, mesh: Mesh) -> Result<usize, SceneError> {
        let id = mesh.material();
        if id.0 >= self.materials.len() {
            return Err(SceneError::UnknownMaterial(id, self.materials.len()));
        }
        self.meshes.push(mesh);
        Ok(self.meshes.len() - 1)
    }

    /// Register `material` and add `mesh` using it.
    pub fn add_mesh_with_material(&mut self, mesh: Mesh, material: Material) -> usize {
        let id = self.add_material(material);
        self.meshes.push(mesh.with_material(id));
        self.meshes.len() - 1
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.meshes
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    pub fn mesh(&self, index: usize) -> &Mesh {
        &self.meshes[index]
    }

    /// Material of mesh `index`.
    pub fn mesh_material(&self, index: usize) -> &Material {
        &self.materials[self.meshes[index].material().0]
    }

    /// Total number of triangles over all meshes.
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(Mesh::triangle_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Color;
    use qpath_math::Vec3;

    fn triangle() -> Mesh {
        Mesh::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![[0, 1, 2]]).unwrap()
    }

    #[test]
    fn test_scene_assembly() {
        let _ = env_logger::builder().is_test(true).try_init();

        let mut scene = Scene::new();
        assert!(scene.is_empty());

        let red = scene.add_material(Material::new("red", Color::new(1.0, 0.0, 0.0)));
        let first = scene.add_mesh(triangle().with_material(red)).unwrap();
        let second = scene.add_mesh_with_material(triangle(), Material::new("blue", Color::Z));
        scene.add_light(Light::point(Vec3::Y, Color::ONE, 1.0));

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(scene.triangle_count(), 2);
        assert_eq!(scene.mesh_material(0).name, "red");
        assert_eq!(scene.mesh_material(1).name, "blue");
        assert_eq!(scene.lights().len(), 1);
    }

    #[test]
    fn test_unknown_material() {
        let mut scene = Scene::new();
        let err = scene.add_mesh(triangle().with_material(MaterialId(3))).unwrap_err();
        assert_eq!(err, SceneError::UnknownMaterial(MaterialId(3), 0));
        assert!(scene.is_empty());
    }
}
