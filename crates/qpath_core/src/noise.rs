//! Procedural scalar fields used to perturb material parameters.

use std::fmt::Debug;

use qpath_math::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A scalar function of position.
pub trait ScalarField: Send + Sync + Debug {
    fn evaluate(&self, point: Vec3) -> f32;
}

/// Cellular (Worley) noise: distance to the nearest of a fixed set of
/// feature points, evaluated on the fractional part of the input so the
/// pattern tiles with period 1.
#[derive(Clone, Debug)]
pub struct Worley {
    feature_points: Vec<Vec3>,
}

impl Worley {
    /// Scatter `count` feature points in `[-1, 1]^3` from `seed`.
    pub fn new(count: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let feature_points = (0..count)
            .map(|_| {
                Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
            })
            .collect();
        Self { feature_points }
    }

    pub fn feature_points(&self) -> &[Vec3] {
        &self.feature_points
    }
}

impl ScalarField for Worley {
    fn evaluate(&self, point: Vec3) -> f32 {
        // Truncation towards zero, not floor: negative coordinates mirror
        let local = point - point.trunc();
        self.feature_points
            .iter()
            .map(|f| f.distance(local))
            .reduce(f32::min)
            .map_or(0.0, |d| d * 0.5)
    }
}
