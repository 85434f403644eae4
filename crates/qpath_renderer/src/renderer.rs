//! Monte Carlo integrator.
//!
//! Three modes:
//! - direct lighting through the pixel center
//! - anti-aliased direct lighting over an `R x R` sub-pixel grid
//! - path tracing with stratified jittered primary rays and recursive
//!   bounces drawn from the configured sampler
//!
//! Rays that miss return the value already in the framebuffer at that
//! pixel, so callers set the background by filling the image first.
//!
//! Paths stop after `max_depth` bounces; the light they would have carried
//! further is lost, which biases finite-depth renders slightly dark.

use std::time::Instant;

use qpath_core::{Color, Scene};
use qpath_math::{Frame, Ray, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::brdf::Brdf;
use crate::bucket::{generate_buckets, render_bucket, BucketResult, DEFAULT_BUCKET_SIZE};
use crate::camera::Camera;
use crate::hit::{HitRecord, Tracer};
use crate::qtable::{scalar, QTable};
use crate::sampler::{CosineHemisphere, HemisphereSample, HemisphereSampler, SamplerKind, UniformHemisphere};

/// Errors raised by the renderer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("leaf size must be at least 1")]
    LeafSize,
    #[error("grid resolution must be at least 1x1, got {res_x}x{res_y}")]
    GridResolution { res_x: usize, res_y: usize },
    #[error("learning rate must lie in [0, 1], got {0}")]
    LearningRate(f32),
    #[error("cannot render into an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}

/// Which estimator fills the pixels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// One ray through the pixel center, direct lighting only
    #[default]
    Direct,
    /// `antialiasing x antialiasing` sub-pixel rays, direct lighting only
    AntiAliased,
    /// Recursive path tracing
    PathTraced,
}

/// Learned sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Azimuthal cells
    pub res_x: usize,
    /// Polar cells
    pub res_y: usize,
    /// Weight of a new radiance sample in a cell update
    pub learning_rate: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            res_x: 16,
            res_y: 8,
            learning_rate: 0.1,
        }
    }
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub mode: RenderMode,
    /// Test light visibility with shadow rays
    pub shadows: bool,
    /// Sub-pixel grid size `R` for anti-aliased direct lighting
    pub antialiasing: u32,
    /// BVH nodes with more triangles than this are split
    pub leaf_size: usize,
    /// Maximum number of bounces per path
    pub max_depth: u32,
    /// Primary samples per pixel when path tracing (rounded down to a square)
    pub samples_per_pixel: u32,
    /// Light comes only from emissive surfaces; the light list is ignored
    pub pure_emission: bool,
    /// Surfaces emitting at least this much end a path
    pub emission_cutoff: f32,
    /// Bounce direction strategy
    pub sampler: SamplerKind,
    pub grid: GridConfig,
    /// Seed of the per-pixel random streams
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::Direct,
            shadows: true,
            antialiasing: 2,
            leaf_size: 4,
            max_depth: 4,
            samples_per_pixel: 16,
            pure_emission: false,
            emission_cutoff: 1.0,
            sampler: SamplerKind::CosineWeighted,
            grid: GridConfig::default(),
            seed: 42,
        }
    }
}

impl RenderConfig {
    pub fn with_mode(mut self, mode: RenderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_sampler(mut self, sampler: SamplerKind) -> Self {
        self.sampler = sampler;
        self
    }

    /// Set quality settings.
    pub fn with_quality(mut self, samples_per_pixel: u32, max_depth: u32) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self.max_depth = max_depth;
        self
    }

    pub fn with_shadows(mut self, shadows: bool) -> Self {
        self.shadows = shadows;
        self
    }

    pub fn with_pure_emission(mut self, pure_emission: bool) -> Self {
        self.pure_emission = pure_emission;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.leaf_size == 0 {
            return Err(RenderError::LeafSize);
        }
        if self.grid.res_x == 0 || self.grid.res_y == 0 {
            return Err(RenderError::GridResolution {
                res_x: self.grid.res_x,
                res_y: self.grid.res_y,
            });
        }
        if !(0.0..=1.0).contains(&self.grid.learning_rate) {
            return Err(RenderError::LearningRate(self.grid.learning_rate));
        }
        Ok(())
    }

    /// Side of the stratified primary-sample grid.
    fn strata(&self) -> u32 {
        ((self.samples_per_pixel as f64).sqrt() as u32).max(1)
    }
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self::filled(width, height, Color::ZERO)
    }

    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        Self {
            width,
            height,
            pixels: vec![color; width as usize * height as usize],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    /// Blend rows from `top` (row 0) to `bottom` (last row).
    pub fn fill_vertical_gradient(&mut self, top: Color, bottom: Color) {
        let span = self.height.saturating_sub(1).max(1) as f32;
        for y in 0..self.height {
            let color = top.lerp(bottom, y as f32 / span);
            for x in 0..self.width {
                self.set(x, y, color);
            }
        }
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            let [r, g, b] = color_to_rgb(*color);
            bytes.extend_from_slice(&[r, g, b, 255]);
        }
        bytes
    }

    /// Gamma-corrected 8-bit image, for callers that persist renders.
    pub fn to_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| image::Rgb(color_to_rgb(self.get(x, y))))
    }
}

/// Apply gamma correction (gamma = 2.0).
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    if linear > 0.0 {
        linear.sqrt()
    } else {
        0.0
    }
}

/// Convert a color to 8-bit RGB.
pub fn color_to_rgb(color: Color) -> [u8; 3] {
    let to_byte = |c: f32| (255.0 * linear_to_gamma(c).clamp(0.0, 1.0)) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z)]
}

/// Radiance carried back along a path segment, plus the scalar target it
/// implies for the learned estimate of the direction that produced it.
#[derive(Debug, Clone, Copy)]
struct Traced {
    radiance: Color,
    q_target: f32,
}

/// Renders a scene into an [`ImageBuffer`].
///
/// The BVH is built once in [`Renderer::new`]. The learned sampler's table
/// outlives individual passes, so repeated [`Renderer::render`] calls keep
/// refining it.
pub struct Renderer<'s> {
    tracer: Tracer<'s>,
    config: RenderConfig,
    qtable: Option<QTable>,
    pass: u64,
}

impl<'s> Renderer<'s> {
    pub fn new(scene: &'s Scene, config: RenderConfig) -> Result<Self, RenderError> {
        config.validate()?;

        let tracer = Tracer::new(scene, config.leaf_size);
        let qtable = tracer
            .bvh()
            .map(|bvh| QTable::new(bvh.node_count(), config.grid.res_x, config.grid.res_y));

        if scene.lights().is_empty() && !config.pure_emission {
            log::warn!("Scene has no lights; direct lighting will be black");
        }

        Ok(Self {
            tracer,
            config,
            qtable,
            pass: 0,
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn tracer(&self) -> &Tracer<'s> {
        &self.tracer
    }

    /// Learned sampler state; `None` for an empty scene.
    pub fn qtable(&self) -> Option<&QTable> {
        self.qtable.as_ref()
    }

    /// Number of completed passes.
    pub fn passes(&self) -> u64 {
        self.pass
    }

    /// Render one pass over `image`, in parallel buckets.
    ///
    /// The image's current contents act as the background.
    pub fn render(&mut self, camera: &dyn Camera, image: &mut ImageBuffer) -> Result<(), RenderError> {
        if image.width == 0 || image.height == 0 {
            return Err(RenderError::EmptyImage {
                width: image.width,
                height: image.height,
            });
        }

        let start = Instant::now();
        let pass = self.pass;
        let buckets = generate_buckets(image.width, image.height, DEFAULT_BUCKET_SIZE);

        let results: Vec<BucketResult> = {
            let this = &*self;
            let target = &*image;
            buckets
                .par_iter()
                .map(|bucket| render_bucket(bucket, |x, y| this.render_pixel(camera, target, pass, x, y)))
                .collect()
        };

        for result in &results {
            for (x, y, color) in result.iter() {
                image.set(x, y, color);
            }
        }

        self.pass += 1;
        log::info!(
            "Pass {} ({:?}, {}x{}, {} buckets) rendered in {:.2?}",
            pass,
            self.config.mode,
            image.width,
            image.height,
            results.len(),
            start.elapsed()
        );
        if let Some(table) = &self.qtable {
            if self.config.mode == RenderMode::PathTraced && self.config.sampler == SamplerKind::Learned {
                log::debug!("{} leaf grids in use", table.initialized());
            }
        }

        Ok(())
    }

    /// Final color of pixel `(x, y)`.
    fn render_pixel(&self, camera: &dyn Camera, image: &ImageBuffer, pass: u64, x: u32, y: u32) -> Color {
        let background = image.get(x, y);
        let mut rng = pixel_rng(self.config.seed, pass, image.index(x, y) as u64);
        let (w, h) = (image.width as f32, image.height as f32);

        match self.config.mode {
            RenderMode::Direct => {
                let ray = camera.primary_ray((x as f32 + 0.5) / w, (y as f32 + 0.5) / h);
                self.shade_direct(&ray, background, &mut rng)
            }
            RenderMode::AntiAliased => {
                let r = self.config.antialiasing.max(1);
                let rf = r as f32;
                let mut sum = Color::ZERO;
                for kj in 0..r {
                    for ki in 0..r {
                        let px = (x as f32 * rf + ki as f32 + 0.5) / (w * rf);
                        let py = (y as f32 * rf + kj as f32 + 0.5) / (h * rf);
                        sum += self.shade_direct(&camera.primary_ray(px, py), background, &mut rng);
                    }
                }
                sum / (r * r) as f32
            }
            RenderMode::PathTraced => {
                let r = self.config.strata();
                let rf = r as f32;
                let mut sum = Color::ZERO;
                for kj in 0..r {
                    for ki in 0..r {
                        let px = (x as f32 * rf + ki as f32 + rng.gen::<f32>()) / (w * rf);
                        let py = (y as f32 * rf + kj as f32 + rng.gen::<f32>()) / (h * rf);
                        let traced = self.trace(&camera.primary_ray(px, py), 0, background, &mut rng);
                        sum += traced.radiance.clamp(Color::ZERO, Color::ONE);
                    }
                }
                sum / (r * r) as f32
            }
        }
    }

    /// Direct lighting (or emission, in pure mode) at the first hit.
    fn shade_direct(&self, ray: &Ray, background: Color, rng: &mut StdRng) -> Color {
        match self.tracer.closest_hit(ray) {
            Some(hit) => {
                let wo = -ray.direction.normalize_or_zero();
                self.local_lighting(&hit, wo, rng)
            }
            None => background,
        }
    }

    fn local_lighting(&self, hit: &HitRecord<'_>, wo: Vec3, rng: &mut StdRng) -> Color {
        if self.config.pure_emission {
            hit.material.emitted()
        } else {
            self.direct_lighting(hit, wo, rng)
        }
    }

    /// Sum over lights of `f(l, wo) cos / d^2`, skipping occluded ones.
    pub fn direct_lighting(&self, hit: &HitRecord<'_>, wo: Vec3, rng: &mut StdRng) -> Color {
        let brdf = Brdf::at(hit.material, hit.point);
        let mut total = Color::ZERO;

        for light in self.tracer.scene().lights() {
            let to_light = light.sample_position(rng) - hit.point;
            let dist2 = to_light.length_squared();
            if dist2 <= 0.0 {
                continue;
            }
            let dist = dist2.sqrt();
            let l = to_light / dist;

            if self.config.shadows {
                let shadow = Ray::from_surface(hit.point, l, hit.surface);
                if self.tracer.occluded(&shadow, dist) {
                    continue;
                }
            }

            total += brdf.evaluate(hit.normal, l, wo) * light.color() * light.intensity() / dist2;
        }

        total
    }

    /// Radiance along `ray`, bouncing while `depth < max_depth`.
    fn trace(&self, ray: &Ray, depth: u32, background: Color, rng: &mut StdRng) -> Traced {
        let Some(hit) = self.tracer.closest_hit(ray) else {
            return Traced {
                radiance: background,
                q_target: scalar(background),
            };
        };

        let wo = -ray.direction.normalize_or_zero();
        let direct = self.local_lighting(&hit, wo, rng);

        if hit.material.is_emissive(self.config.emission_cutoff) {
            // A light reached by the path
            let radiance = if self.config.pure_emission {
                direct
            } else {
                direct + hit.material.emitted()
            };
            return Traced {
                radiance,
                q_target: scalar(radiance),
            };
        }

        let learning = self.config.sampler == SamplerKind::Learned;
        let brdf = Brdf::at(hit.material, hit.point);
        let [v0, v1, _] = self.tracer.scene().mesh(hit.surface.mesh).triangle_vertices(hit.surface.triangle);
        let frame = Frame::from_normal_and_edge(hit.normal, v1 - v0);

        let mut radiance = direct;
        if depth < self.config.max_depth {
            let sample = self.sample_direction(&hit, rng);
            if sample.pdf > 0.0 {
                let wi = frame.to_world(sample.direction);
                let bounce = Ray::from_surface(hit.point, wi, hit.surface);
                let incoming = self.trace(&bounce, depth + 1, background, rng);

                radiance += brdf.evaluate(hit.normal, wi, wo) * incoming.radiance / sample.pdf;

                if let (true, Some(table), Some(leaf), Some(cell)) = (learning, &self.qtable, hit.leaf, sample.cell) {
                    table.update(leaf, cell, incoming.q_target, self.config.grid.learning_rate);
                }
            }
        }

        // Read after this hit's own update has landed
        let q_target = match (learning, &self.qtable, hit.leaf) {
            (true, Some(table), Some(leaf)) => scalar(direct) + table.reflected(leaf, &brdf, frame.to_local(wo)),
            _ => 0.0,
        };

        Traced { radiance, q_target }
    }

    fn sample_direction(&self, hit: &HitRecord<'_>, rng: &mut StdRng) -> HemisphereSample {
        match self.config.sampler {
            SamplerKind::Uniform => UniformHemisphere.sample(rng),
            SamplerKind::CosineWeighted => CosineHemisphere.sample(rng),
            SamplerKind::Learned => match (&self.qtable, hit.leaf) {
                (Some(table), Some(leaf)) => table.sample(leaf, rng),
                _ => UniformHemisphere.sample(rng),
            },
        }
    }
}

/// Independent, reproducible stream for one pixel of one pass.
fn pixel_rng(seed: u64, pass: u64, pixel: u64) -> StdRng {
    let mixed = seed
        ^ pass.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ pixel.wrapping_add(1).wrapping_mul(0xD1B5_4A32_D192_ED03);
    StdRng::seed_from_u64(mixed)
}
