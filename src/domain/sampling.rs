//! Random number plumbing for the stochastic engines.
//!
//! Engines never construct their own generator; callers pass `&mut R` so
//! tests can fix the stream with a seed.

use crate::domain::error::QuantError;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// `StdRng` from a fixed seed, or from OS entropy when `None`.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Normal distribution; a zero standard deviation is allowed and yields `mean`.
pub fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>, QuantError> {
    if !mean.is_finite() || !(std_dev.is_finite() && std_dev >= 0.0) {
        return Err(QuantError::domain(format!(
            "invalid normal distribution (mean {mean}, std {std_dev})"
        )));
    }
    Normal::new(mean, std_dev).map_err(|e| {
        QuantError::domain(format!(
            "invalid normal distribution (mean {mean}, std {std_dev}): {e}"
        ))
    })
}

pub fn normal_draws<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    std_dev: f64,
    count: usize,
) -> Result<Vec<f64>, QuantError> {
    let dist = normal(mean, std_dev)?;
    let mut draws = Vec::with_capacity(count);
    for _ in 0..count {
        draws.push(dist.sample(rng));
    }
    Ok(draws)
}
