//! Local hypersphere sampling around region representatives.
//!
//! Candidates are drawn by picking a direction uniformly on the unit
//! hypersphere (normalized standard-normal draws) and scaling it by a factor
//! drawn uniformly from `[0, radius]`. The scale is not volume-corrected, so
//! the density is biased toward larger jumps.
//!
//! ## Seeding
//!
//! [`PassSeeder`] owns the master RNG of a run. At the start of every loop
//! pass it draws a fresh seed and hands out a new [`StdRng`] for that pass's
//! sampling only. Two runs with the same master seed draw identical candidate
//! streams regardless of any randomness inside the oracle.

use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::types::ParameterVector;

/// Draws local candidate points around a center
#[derive(Debug, Clone, Copy)]
pub struct HypersphereSampler {
    radius: f64,
    count: usize,
}

impl HypersphereSampler {
    /// Create a sampler producing `count` points within `radius`.
    pub fn new(radius: f64, count: usize) -> Self {
        Self { radius, count }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Draw `count` points around `center`, one per row.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, center: &ParameterVector) -> Array2<f64> {
        let dims = center.len();
        let mut points = Array2::zeros((self.count, dims));
        if dims == 0 {
            return points;
        }
        for mut row in points.rows_mut() {
            let direction = unit_direction(rng, dims);
            let scale = rng.gen_range(0.0..=self.radius);
            row.assign(&(direction * scale + center));
        }
        points
    }
}

/// Uniform direction on the unit hypersphere in `dims` dimensions.
///
/// Zero-norm draws are redrawn.
fn unit_direction<R: Rng + ?Sized>(rng: &mut R, dims: usize) -> Array1<f64> {
    loop {
        let draw = Array1::from_iter((0..dims).map(|_| rng.sample::<f64, _>(StandardNormal)));
        let norm = draw.dot(&draw).sqrt();
        if norm > 0.0 && norm.is_finite() {
            return draw / norm;
        }
    }
}

/// Source of per-pass sampling streams
pub struct PassSeeder {
    master: StdRng,
}

impl PassSeeder {
    /// Seed from the operating system.
    pub fn from_entropy() -> Self {
        Self {
            master: StdRng::from_entropy(),
        }
    }

    /// Create a seeder with a specific master seed (reproducible runs).
    pub fn with_seed(seed: u64) -> Self {
        Self {
            master: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw a fresh seed and return it with the stream for the next pass.
    pub fn next_pass(&mut self) -> (u64, StdRng) {
        let seed = self.master.next_u64();
        (seed, StdRng::seed_from_u64(seed))
    }
}

impl std::fmt::Debug for PassSeeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassSeeder").finish_non_exhaustive()
    }
}
