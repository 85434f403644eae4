//! Light sources used for direct (next-event) lighting.

use qpath_math::{normalize_or, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::material::Color;

/// A light source. Point lights always sample the same position; area
/// lights jitter it within a square footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Light {
    Point {
        position: Vec3,
        color: Color,
        intensity: f32,
    },
    Area {
        position: Vec3,
        color: Color,
        intensity: f32,
        /// In-plane axes of the square, unit length
        right: Vec3,
        up: Vec3,
        /// Side length of the square
        size: f32,
    },
}

impl Light {
    pub fn point(position: Vec3, color: Color, intensity: f32) -> Self {
        Light::Point {
            position,
            color,
            intensity,
        }
    }

    /// Square light centered on `position`, facing along `direction`.
    pub fn area(position: Vec3, color: Color, intensity: f32, direction: Vec3, size: f32) -> Self {
        let n = -normalize_or(direction, Vec3::NEG_Y);
        let right = Vec3::Y
            .cross(n)
            .try_normalize()
            .unwrap_or_else(|| n.any_orthonormal_vector());
        let up = n.cross(right);
        Light::Area {
            position,
            color,
            intensity,
            right,
            up,
            size,
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Light::Point { color, .. } | Light::Area { color, .. } => *color,
        }
    }

    pub fn intensity(&self) -> f32 {
        match self {
            Light::Point { intensity, .. } | Light::Area { intensity, .. } => *intensity,
        }
    }

    /// Nominal (center) position.
    pub fn position(&self) -> Vec3 {
        match self {
            Light::Point { position, .. } | Light::Area { position, .. } => *position,
        }
    }

    /// Position to aim a shadow ray at.
    pub fn sample_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        match self {
            Light::Point { position, .. } => *position,
            Light::Area {
                position,
                right,
                up,
                size,
                ..
            } => {
                let su = rng.gen::<f32>() - 0.5;
                let sv = rng.gen::<f32>() - 0.5;
                *position + (*right * su + *up * sv) * *size
            }
        }
    }
}
