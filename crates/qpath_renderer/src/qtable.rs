//! Learned directional sampling.
//!
//! Every BVH leaf owns a [`HemisphereGrid`] of radiance estimates, one per
//! equal-solid-angle cell. Bounces leaving a leaf draw cells in proportion
//! to those estimates, and the radiance the bounce brings back is blended
//! into the drawn cell.
//!
//! Grids are created on first use. Each one sits behind its own lock, which
//! is held for a single draw, read, or update and never across recursion.

use std::f32::consts::PI;
use std::sync::OnceLock;

use parking_lot::Mutex;
use qpath_core::Color;
use qpath_math::Vec3;
use rand::Rng;

use crate::brdf::Brdf;
use crate::bvh::NodeId;
use crate::sampler::{HemisphereSample, HemisphereSampler, UniformHemisphere};

/// Initial estimate of every cell.
const INITIAL_VALUE: f32 = 1.0;

/// Estimates never drop below this, so every direction stays reachable.
pub const MIN_VALUE: f32 = 1e-4;

/// `res_x * res_y` grid over the hemisphere.
///
/// Cell `i` covers row `i / res_x` (a band of `cosθ`, row 0 at the
/// horizon) and column `i % res_x` (a wedge of azimuth). Bands are uniform
/// in `cosθ`, so every cell spans the same solid angle `2π / len`.
#[derive(Debug, Clone, PartialEq)]
pub struct HemisphereGrid {
    res_x: usize,
    res_y: usize,
    values: Vec<f32>,
}

impl HemisphereGrid {
    /// Grid with every cell at the initial estimate. Resolutions are
    /// clamped to at least 1.
    pub fn new(res_x: usize, res_y: usize) -> Self {
        let res_x = res_x.max(1);
        let res_y = res_y.max(1);
        Self {
            res_x,
            res_y,
            values: vec![INITIAL_VALUE; res_x * res_y],
        }
    }

    pub fn res_x(&self) -> usize {
        self.res_x
    }

    pub fn res_y(&self) -> usize {
        self.res_y
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn value(&self, cell: usize) -> f32 {
        self.values[cell]
    }

    fn total(&self) -> f32 {
        self.values.iter().sum()
    }

    /// Probability of drawing `cell`.
    pub fn mass(&self, cell: usize) -> f32 {
        self.values[cell] / self.total()
    }

    /// Largest cell mass: `1 / len` for a uniform grid, 1 when all mass
    /// sits in one cell.
    pub fn concentration(&self) -> f32 {
        let max = self.values.iter().copied().fold(0.0, f32::max);
        max / self.total()
    }

    /// Direction through `cell`, offset inside it by `jitter` in `[0, 1)^2`.
    /// `(0.5, 0.5)` gives the cell center.
    pub fn cell_direction(&self, cell: usize, jitter: (f32, f32)) -> Vec3 {
        let row = cell / self.res_x;
        let col = cell % self.res_x;

        let z = ((row as f32 + jitter.1) / self.res_y as f32).clamp(0.0, 1.0);
        let phi = 2.0 * PI * (col as f32 + jitter.0) / self.res_x as f32;
        let r = (1.0 - z * z).max(0.0).sqrt();
        Vec3::new(r * phi.cos(), r * phi.sin(), z)
    }

    /// Cell containing a local upper-hemisphere direction.
    pub fn cell_of(&self, direction: Vec3) -> usize {
        let row = ((direction.z.clamp(0.0, 1.0) * self.res_y as f32) as usize).min(self.res_y - 1);
        let phi = direction.y.atan2(direction.x).rem_euclid(2.0 * PI);
        let col = ((phi / (2.0 * PI) * self.res_x as f32) as usize).min(self.res_x - 1);
        row * self.res_x + col
    }

    /// Blend `target` into `cell`: `(1 - rate) * q + rate * target`.
    pub fn update(&mut self, cell: usize, target: f32, rate: f32) {
        let q = &mut self.values[cell];
        let blended = (1.0 - rate) * *q + rate * target;
        *q = if blended.is_finite() {
            blended.max(MIN_VALUE)
        } else {
            *q
        };
    }

    /// Reflected radiance towards `wo` (local frame) predicted by the grid:
    /// the mean over cells of `f(wi, wo) cosθ_i Q_i`, as a scalar.
    pub fn reflected(&self, brdf: &Brdf, wo: Vec3) -> f32 {
        let sum: Color = self
            .values
            .iter()
            .enumerate()
            .map(|(cell, &q)| brdf.evaluate(Vec3::Z, self.cell_direction(cell, (0.5, 0.5)), wo) * q)
            .sum();
        scalar(sum) / self.len() as f32
    }
}

impl HemisphereSampler for HemisphereGrid {
    /// Invert the cumulative distribution of cell values, then jitter
    /// inside the chosen cell.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> HemisphereSample {
        let total = self.total();
        let u = rng.gen::<f32>() * total;

        let mut cumulative = 0.0;
        let mut cell = self.len() - 1;
        for (i, &v) in self.values.iter().enumerate() {
            cumulative += v;
            if cumulative > u {
                cell = i;
                break;
            }
        }

        let mass = self.values[cell] / total;
        let direction = self.cell_direction(cell, (rng.gen(), rng.gen()));
        HemisphereSample {
            direction,
            pdf: self.len() as f32 * mass / (2.0 * PI),
            cell: Some(cell),
        }
    }
}

/// Scalar radiance used by the learned estimates: the channel mean.
#[inline]
pub fn scalar(c: Color) -> f32 {
    (c.x + c.y + c.z) / 3.0
}

/// One lazily created [`HemisphereGrid`] per BVH node.
#[derive(Debug)]
pub struct QTable {
    res_x: usize,
    res_y: usize,
    grids: Vec<OnceLock<Mutex<HemisphereGrid>>>,
}

impl QTable {
    /// Table with a slot for each of `node_count` nodes.
    pub fn new(node_count: usize, res_x: usize, res_y: usize) -> Self {
        Self {
            res_x,
            res_y,
            grids: (0..node_count).map(|_| OnceLock::new()).collect(),
        }
    }

    fn grid(&self, leaf: NodeId) -> Option<&Mutex<HemisphereGrid>> {
        self.grids
            .get(leaf.index())
            .map(|slot| slot.get_or_init(|| Mutex::new(HemisphereGrid::new(self.res_x, self.res_y))))
    }

    /// Draw a direction from `leaf`'s grid.
    ///
    /// Unknown leaves fall back to uniform sampling without a cell.
    pub fn sample<R: Rng + ?Sized>(&self, leaf: NodeId, rng: &mut R) -> HemisphereSample {
        match self.grid(leaf) {
            Some(grid) => grid.lock().sample(rng),
            None => UniformHemisphere.sample(rng),
        }
    }

    /// Blend `target` into `cell` of `leaf`'s grid.
    pub fn update(&self, leaf: NodeId, cell: usize, target: f32, rate: f32) {
        if let Some(grid) = self.grid(leaf) {
            let mut grid = grid.lock();
            if cell < grid.len() {
                grid.update(cell, target, rate);
            }
        }
    }

    /// Reflected radiance estimate of `leaf` towards local `wo`.
    pub fn reflected(&self, leaf: NodeId, brdf: &Brdf, wo: Vec3) -> f32 {
        self.grid(leaf).map_or(0.0, |grid| grid.lock().reflected(brdf, wo))
    }

    /// Copy of `leaf`'s grid, if it has been used.
    pub fn snapshot(&self, leaf: NodeId) -> Option<HemisphereGrid> {
        self.grids
            .get(leaf.index())
            .and_then(OnceLock::get)
            .map(|grid| grid.lock().clone())
    }

    /// Number of grids created so far.
    pub fn initialized(&self) -> usize {
        self.grids.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// Used grids with their leaf ids.
    pub fn grids(&self) -> impl Iterator<Item = (NodeId, HemisphereGrid)> + '_ {
        self.grids.iter().enumerate().filter_map(|(i, slot)| {
            slot.get().map(|grid| (NodeId(i as u32), grid.lock().clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qpath_core::Material;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_grid_starts_uniform() {
        let grid = HemisphereGrid::new(8, 4);
        assert_eq!(grid.len(), 32);
        assert!((grid.concentration() - 1.0 / 32.0).abs() < 1e-6);
        assert!(grid.values().iter().all(|&v| v == INITIAL_VALUE));
    }

    #[test]
    fn test_cell_directions_stay_in_their_cell() {
        let grid = HemisphereGrid::new(6, 5);
        let mut rng = StdRng::seed_from_u64(42);
        for cell in 0..grid.len() {
            let center = grid.cell_direction(cell, (0.5, 0.5));
            assert_eq!(grid.cell_of(center), cell);
            assert!((center.length() - 1.0).abs() < 1e-5);

            let jittered = grid.cell_direction(cell, (rng.gen_range(0.01..0.99), rng.gen_range(0.01..0.99)));
            assert_eq!(grid.cell_of(jittered), cell);
        }
    }

    #[test]
    fn test_learned_is_unbiased() {
        let mut grid = HemisphereGrid::new(8, 4);
        // Skew the distribution heavily
        for cell in 0..grid.len() {
            grid.update(cell, (cell % 5) as f32 * 3.0 + 0.1, 1.0);
        }

        let mut rng = StdRng::seed_from_u64(42);
        let l0 = 0.7f32;
        let draws = 1_000_000;
        let mut sum = 0.0f64;
        for _ in 0..draws {
            let s = grid.sample(&mut rng);
            let cell = s.cell.unwrap();
            assert!((s.pdf - grid.len() as f32 * grid.mass(cell) / (2.0 * PI)).abs() < 1e-4);
            sum += (l0 / s.pdf) as f64;
        }
        let mean = sum / draws as f64;
        let expected = (l0 * 2.0 * PI) as f64;
        assert!((mean - expected).abs() < 0.02 * expected, "{mean} vs {expected}");
    }

    #[test]
    fn test_sampling_follows_values() {
        let mut grid = HemisphereGrid::new(4, 2);
        grid.update(5, 21.0, 1.0);
        // Cell 5 now holds 21 of 28 units of mass
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let hits = (0..n).filter(|_| grid.sample(&mut rng).cell == Some(5)).count();
        let frac = hits as f32 / n as f32;
        assert!((frac - 0.75).abs() < 0.02, "{frac}");
    }

    #[test]
    fn test_update_is_floored() {
        let mut grid = HemisphereGrid::new(2, 2);
        grid.update(0, -10.0, 1.0);
        assert_eq!(grid.value(0), MIN_VALUE);
        grid.update(1, f32::NAN, 0.5);
        assert_eq!(grid.value(1), INITIAL_VALUE);
        grid.update(2, 3.0, 0.5);
        assert!((grid.value(2) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_concentration_does_not_regress() {
        // One direction keeps returning more radiance than the rest
        let mut grid = HemisphereGrid::new(8, 4);
        let mut rng = StdRng::seed_from_u64(42);
        let bright = 13;
        let mut previous = grid.concentration();

        for _ in 0..2000 {
            let s = grid.sample(&mut rng);
            let cell = s.cell.unwrap();
            let target = if cell == bright { 4.0 } else { 0.2 };
            grid.update(cell, target, 0.1);

            if cell == bright {
                let now = grid.concentration();
                assert!(now >= previous - 1e-6, "{now} < {previous}");
                previous = now;
            }
        }
        assert!(grid.concentration() > 0.2);
        assert_eq!(
            grid.values()
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i),
            Some(bright)
        );
    }

    #[test]
    fn test_reflected_uniform_grid_lambertian() {
        let grid = HemisphereGrid::new(16, 16);
        let brdf = Brdf::at(&Material::lambertian("white", Color::ONE, 1.0), Vec3::ZERO);
        // Mean over equal-solid-angle cells of cosθ/π with Q = 1 is 1/(2π)
        let r = grid.reflected(&brdf, Vec3::Z);
        assert!((r - 0.5 / PI).abs() < 1e-3, "{r}");
    }

    #[test]
    fn test_qtable_lazy_and_shared() {
        let table = QTable::new(4, 4, 2);
        assert_eq!(table.initialized(), 0);
        assert!(table.snapshot(NodeId(1)).is_none());

        let mut rng = StdRng::seed_from_u64(1);
        let s = table.sample(NodeId(1), &mut rng);
        assert!(s.cell.is_some());
        assert_eq!(table.initialized(), 1);

        table.update(NodeId(1), 3, 9.0, 1.0);
        let grid = table.snapshot(NodeId(1)).unwrap();
        assert_eq!(grid.value(3), 9.0);

        // Out-of-range ids are ignored
        table.update(NodeId(99), 0, 1.0, 1.0);
        let fallback = table.sample(NodeId(99), &mut rng);
        assert!(fallback.cell.is_none());
        assert_eq!(table.grids().count(), 1);
    }

    #[test]
    fn test_qtable_concurrent_updates() {
        use rayon::prelude::*;

        let table = QTable::new(1, 4, 4);
        (0..10_000).into_par_iter().for_each(|i| {
            table.update(NodeId(0), i % 16, 2.0, 0.05);
        });
        let grid = table.snapshot(NodeId(0)).unwrap();
        assert!(grid.values().iter().all(|&v| v > 1.0 && v < 2.0 + 1e-4));
    }
}
