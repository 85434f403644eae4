//! Hemisphere direction samplers.
//!
//! Every sampler works in a local tangent frame with `z` along the surface
//! normal; callers rotate the result to world space with a
//! [`Frame`](qpath_math::Frame).

use std::f32::consts::{FRAC_1_PI, PI};

use qpath_math::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A sampled bounce direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereSample {
    /// Unit direction in the local frame (`z >= 0`)
    pub direction: Vec3,
    /// Density over solid angle
    pub pdf: f32,
    /// Grid cell the direction was drawn from (learned sampler only)
    pub cell: Option<usize>,
}

/// Draws directions over the upper hemisphere.
pub trait HemisphereSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HemisphereSample;
}

/// Which strategy draws indirect bounce directions.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplerKind {
    /// pdf = 1/2π
    Uniform,
    /// pdf = cosθ/π
    #[default]
    CosineWeighted,
    /// Per-leaf grid learned from the radiance that paths bring back
    Learned,
}

/// Uniform over solid angle.
#[derive(Debug, Copy, Clone, Default)]
pub struct UniformHemisphere;

impl HemisphereSampler for UniformHemisphere {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HemisphereSample {
        let z: f32 = rng.gen();
        let phi = 2.0 * PI * rng.gen::<f32>();
        let r = (1.0 - z * z).max(0.0).sqrt();

        HemisphereSample {
            direction: Vec3::new(r * phi.cos(), r * phi.sin(), z),
            pdf: 0.5 * FRAC_1_PI,
            cell: None,
        }
    }
}

/// Cosine-weighted: a uniform disk sample projected up onto the hemisphere.
#[derive(Debug, Copy, Clone, Default)]
pub struct CosineHemisphere;

impl HemisphereSampler for CosineHemisphere {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HemisphereSample {
        let u1: f32 = rng.gen();
        let theta = 2.0 * PI * rng.gen::<f32>();
        let r = u1.sqrt();
        let z = (1.0 - u1).max(0.0).sqrt();

        HemisphereSample {
            direction: Vec3::new(r * theta.cos(), r * theta.sin(), z),
            pdf: z * FRAC_1_PI,
            cell: None,
        }
    }
}
