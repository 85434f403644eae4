//! Cook-Torrance reflectance: GGX specular lobe over a Lambertian base.

use std::f32::consts::PI;

use qpath_core::{Color, Material};
use qpath_math::Vec3;

/// Cosines below this give no specular response.
const MIN_COSINE: f32 = 1e-4;

/// Lower bound on α so the GGX distribution stays finite.
const MIN_ALPHA: f32 = 1e-3;

/// Base reflectance of dielectrics.
const DIELECTRIC_F0: f32 = 0.04;

/// Material parameters resolved at one shading point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Brdf {
    pub albedo: Color,
    pub kd: f32,
    pub alpha: f32,
    pub metallic: f32,
    pub specular: f32,
}

impl Brdf {
    /// Resolve `material` at `point`, applying any noise layer.
    pub fn at(material: &Material, point: Vec3) -> Self {
        Self {
            albedo: material.albedo_at(point),
            kd: material.kd,
            alpha: material.roughness_at(point),
            metallic: material.metallic,
            specular: material.specular,
        }
    }

    /// Diffuse-only response: `albedo * kd * max(n.wi, 0)`.
    pub fn diffuse_response(&self, n: Vec3, wi: Vec3) -> Color {
        self.albedo * self.kd * n.dot(wi).max(0.0)
    }

    /// Full reflectance times the incident cosine, `f(wi, wo) * max(n.wi, 0)`.
    ///
    /// `wi` points towards the light, `wo` towards the viewer; both unit.
    pub fn evaluate(&self, n: Vec3, wi: Vec3, wo: Vec3) -> Color {
        let n_dot_wi = n.dot(wi);
        if n_dot_wi <= 0.0 {
            return Color::ZERO;
        }
        let diffuse = self.albedo * self.kd / PI;
        (diffuse + self.specular_term(n, wi, wo) * self.specular) * n_dot_wi
    }

    /// GGX specular term `D * F * G / (4 (n.wi)(n.wo))`.
    pub fn specular_term(&self, n: Vec3, wi: Vec3, wo: Vec3) -> Color {
        let n_dot_wi = n.dot(wi);
        let n_dot_wo = n.dot(wo);
        if n_dot_wi < MIN_COSINE || n_dot_wo < MIN_COSINE {
            return Color::ZERO;
        }
        let Some(h) = (wi + wo).try_normalize() else {
            return Color::ZERO;
        };

        let alpha = self.alpha.max(MIN_ALPHA);
        let d = ggx_d(n.dot(h).max(0.0), alpha);
        let f = schlick_fresnel3(self.fresnel_0(), h.dot(wo).max(0.0));
        let g = schlick_g1(n_dot_wi, alpha) * schlick_g1(n_dot_wo, alpha);

        f * (d * g / (4.0 * n_dot_wi * n_dot_wo))
    }

    /// Fresnel at normal incidence, blended from dielectric to `albedo`.
    fn fresnel_0(&self) -> Color {
        lerp3(Color::splat(DIELECTRIC_F0), self.albedo, self.metallic)
    }
}

#[inline]
fn lerp3(a: Color, b: Color, t: f32) -> Color {
    a + t * (b - a)
}

/// Schlick weight for Fresnel.
#[inline]
fn schlick_weight(cos_theta: f32) -> f32 {
    let x = (1.0 - cos_theta).clamp(0.0, 1.0);
    let x2 = x * x;
    x2 * x2 * x
}

/// Schlick Fresnel approximation.
#[inline]
fn schlick_fresnel3(f0: Color, cos_theta: f32) -> Color {
    f0 + (Color::ONE - f0) * schlick_weight(cos_theta)
}

/// GGX/Trowbridge-Reitz distribution.
#[inline]
fn ggx_d(n_dot_h: f32, alpha: f32) -> f32 {
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * denom * denom)
}

/// Schlick-GGX masking for one direction, `k = α sqrt(2/π)`.
#[inline]
fn schlick_g1(n_dot_x: f32, alpha: f32) -> f32 {
    let k = alpha * (2.0 / PI).sqrt();
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}
