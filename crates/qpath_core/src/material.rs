//! Surface material parameters.
//!
//! This is the renderer-agnostic description of a surface. The reflectance
//! model that consumes it lives in `qpath_renderer::brdf`.

use std::sync::Arc;

use qpath_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::noise::ScalarField;

/// Color type alias (RGB values typically 0-1)
pub type Color = Vec3;

/// Index of a material in a [`Scene`](crate::Scene)'s material table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Which material parameter a noise layer perturbs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoiseTarget {
    Roughness,
    Albedo,
}

/// A procedural scalar field modulating one material parameter.
#[derive(Clone, Debug)]
pub struct NoiseLayer {
    pub field: Arc<dyn ScalarField>,
    pub target: NoiseTarget,
    /// Blend weight of the field's value, 0 = no effect
    pub strength: f32,
}

/// A microfacet material (Lambertian diffuse + GGX specular + emission).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Material name, for logs
    pub name: String,

    /// Base color (RGB, 0-1)
    pub albedo: Color,

    /// Diffuse coefficient
    pub kd: f32,

    /// GGX roughness α (0 = mirror-like, 1 = rough)
    pub roughness: f32,

    /// Blends the Fresnel base reflectance from 0.04 towards `albedo`
    pub metallic: f32,

    /// Weight of the specular lobe (0 turns the material purely Lambertian)
    pub specular: f32,

    /// Emitted radiance as a multiple of `albedo`
    pub emission: f32,

    #[serde(skip)]
    pub noise: Option<NoiseLayer>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            albedo: Color::new(0.8, 0.8, 0.8),
            kd: 1.0,
            roughness: 0.4,
            metallic: 0.0,
            specular: 1.0,
            emission: 0.0,
            noise: None,
        }
    }
}

impl Material {
    /// Create a new material with just a name and base color.
    pub fn new(name: impl Into<String>, albedo: Color) -> Self {
        Self {
            name: name.into(),
            albedo,
            ..Default::default()
        }
    }

    /// A purely diffuse material.
    pub fn lambertian(name: impl Into<String>, albedo: Color, kd: f32) -> Self {
        Self {
            kd,
            specular: 0.0,
            ..Self::new(name, albedo)
        }
    }

    /// A light-emitting material.
    pub fn emitter(name: impl Into<String>, color: Color, emission: f32) -> Self {
        Self {
            emission,
            ..Self::new(name, color)
        }
    }

    pub fn with_kd(mut self, kd: f32) -> Self {
        self.kd = kd;
        self
    }

    pub fn with_roughness(mut self, roughness: f32) -> Self {
        self.roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_metallic(mut self, metallic: f32) -> Self {
        self.metallic = metallic.clamp(0.0, 1.0);
        self
    }

    pub fn with_specular(mut self, specular: f32) -> Self {
        self.specular = specular.max(0.0);
        self
    }

    pub fn with_emission(mut self, emission: f32) -> Self {
        self.emission = emission.max(0.0);
        self
    }

    pub fn with_noise(mut self, field: Arc<dyn ScalarField>, target: NoiseTarget, strength: f32) -> Self {
        self.noise = Some(NoiseLayer {
            field,
            target,
            strength,
        });
        self
    }

    /// Base color at `point`, after any albedo noise.
    pub fn albedo_at(&self, point: Vec3) -> Color {
        match &self.noise {
            Some(layer) if layer.target == NoiseTarget::Albedo => {
                let n = layer.field.evaluate(point);
                (self.albedo * (1.0 - layer.strength + layer.strength * n)).clamp(Vec3::ZERO, Vec3::ONE)
            }
            _ => self.albedo,
        }
    }

    /// Roughness at `point`, after any roughness noise.
    pub fn roughness_at(&self, point: Vec3) -> f32 {
        match &self.noise {
            Some(layer) if layer.target == NoiseTarget::Roughness => {
                let n = layer.field.evaluate(point);
                (self.roughness + layer.strength * n).clamp(0.0, 1.0)
            }
            _ => self.roughness,
        }
    }

    /// Radiance emitted by the surface.
    pub fn emitted(&self) -> Color {
        self.albedo * self.emission
    }

    /// Check if this material emits at least `cutoff`.
    pub fn is_emissive(&self, cutoff: f32) -> bool {
        self.emission > 0.0 && self.emission >= cutoff
    }
}
