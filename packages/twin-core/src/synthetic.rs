//! Seeded synthetic data with both potential outcomes known.
//!
//! Two mechanisms: the three-class latent model (covariates are the one-hot
//! class) and a threshold mechanism over continuous covariates with an
//! analytic PNS of 0.25.

use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TwinError};
use crate::types::{Dataset, Sample, EPSILON};

/// Number of latent classes (and one-hot covariate columns)
pub const LATENT_CLASSES: usize = 3;

// ==================== Latent-class generator ====================

/// Distribution of the latent class U.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LatentDistribution {
    /// Normal draw binned at 1 and 2: `< 1` → 0, `[1, 2)` → 1, `>= 2` → 2
    Normal { mu: f64, sigma: f64 },
    /// Integer drawn uniformly from `low..high`
    Uniform { low: u8, high: u8 },
}

impl Default for LatentDistribution {
    fn default() -> Self {
        LatentDistribution::Normal {
            mu: 1.0,
            sigma: 2.0 / 3.0,
        }
    }
}

impl LatentDistribution {
    pub fn uniform() -> Self {
        LatentDistribution::Uniform { low: 0, high: 3 }
    }

    fn validate(&self) -> Result<()> {
        match *self {
            LatentDistribution::Normal { mu, sigma } => {
                if !mu.is_finite() || !(sigma.is_finite() && sigma > 0.0) {
                    return Err(TwinError::InvalidConfig(format!(
                        "normal latent needs finite mu and positive sigma, got ({mu}, {sigma})"
                    )));
                }
            }
            LatentDistribution::Uniform { low, high } => {
                if low >= high || usize::from(high) > LATENT_CLASSES {
                    return Err(TwinError::InvalidConfig(format!(
                        "uniform latent range {low}..{high} must be non-empty within 0..{LATENT_CLASSES}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn sample(&self, rng: &mut ChaCha8Rng) -> u8 {
        match *self {
            LatentDistribution::Normal { mu, sigma } => {
                let value = mu + sigma * sample_normal(rng);
                if value < 1.0 {
                    0
                } else if value < 2.0 {
                    1
                } else {
                    2
                }
            }
            LatentDistribution::Uniform { low, high } => rng.gen_range(low..high),
        }
    }
}

/// Latent-class generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatentClassConfig {
    pub n_samples: usize,
    /// P(T = 1)
    pub treatment_probability: f64,
    pub latent: LatentDistribution,
    pub seed: u64,
}

impl Default for LatentClassConfig {
    fn default() -> Self {
        Self {
            n_samples: 100_000,
            treatment_probability: 0.5,
            latent: LatentDistribution::default(),
            seed: 42,
        }
    }
}

/// Latent-class mechanism:
///
/// - U = 0: the outcome follows the treatment, Y(t) = t
/// - U = 1: never, Y(t) = 0
/// - U = 2: always, Y(t) = 1
///
/// Covariates are the one-hot encoding of U.
pub fn latent_class(config: &LatentClassConfig) -> Result<Dataset> {
    if config.n_samples == 0 {
        return Err(TwinError::InvalidConfig(
            "n_samples must be positive".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&config.treatment_probability) {
        return Err(TwinError::InvalidConfig(format!(
            "treatment probability must lie in [0, 1], got {}",
            config.treatment_probability
        )));
    }
    config.latent.validate()?;

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let samples = (0..config.n_samples)
        .map(|_| {
            let treatment = u8::from(rng.gen_bool(config.treatment_probability));
            let class = config.latent.sample(&mut rng);
            let (y0, y1) = match class {
                0 => (0, 1),
                1 => (0, 0),
                _ => (1, 1),
            };
            let mut covariates = vec![0.0; LATENT_CLASSES];
            covariates[usize::from(class)] = 1.0;
            Sample::with_potential_outcomes(covariates, treatment, y0, y1)
        })
        .collect();

    let dataset = Dataset::new(samples)?;
    debug!(
        n = dataset.len(),
        treated = dataset.treated_count(),
        seed = config.seed,
        "latent-class dataset generated"
    );
    Ok(dataset)
}

// ==================== Threshold mechanism ====================

/// Threshold-mechanism generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub n_samples: usize,
    /// Exact number of treated units
    pub n_treated: usize,
    /// Covariate dimension, at least 2
    pub feature_dim: usize,
    pub seed: u64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            n_samples: 1_000,
            n_treated: 500,
            feature_dim: 2,
            seed: 42,
        }
    }
}

/// Analytic PNS of the threshold mechanism: P(x1 > 0, x2 <= 0)
pub const THRESHOLD_PNS: f64 = 0.25;

/// Threshold mechanism: x ~ U[-1, 1]^d, `Y(t) = (t = 1 and x1 > 0) or x2 > 0`.
///
/// Treatment is assigned to exactly `n_treated` units in shuffled order, so
/// assignment is independent of the covariates.
pub fn threshold(config: &ThresholdConfig) -> Result<Dataset> {
    if config.feature_dim < 2 {
        return Err(TwinError::InvalidConfig(format!(
            "threshold mechanism needs at least 2 covariates, got {}",
            config.feature_dim
        )));
    }
    if config.n_samples == 0 || config.n_treated > config.n_samples {
        return Err(TwinError::InvalidConfig(format!(
            "cannot treat {} of {} samples",
            config.n_treated, config.n_samples
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut assignment: Vec<u8> = (0..config.n_samples)
        .map(|i| u8::from(i < config.n_treated))
        .collect();
    assignment.shuffle(&mut rng);

    let samples = assignment
        .into_iter()
        .map(|treatment| {
            let covariates: Vec<f64> = (0..config.feature_dim)
                .map(|_| rng.gen_range(-1.0..1.0))
                .collect();
            let responds = covariates[0] > 0.0;
            let baseline = covariates[1] > 0.0;
            let y0 = u8::from(baseline);
            let y1 = u8::from(responds || baseline);
            Sample::with_potential_outcomes(covariates, treatment, y0, y1)
        })
        .collect();

    let dataset = Dataset::new(samples)?;
    debug!(
        n = dataset.len(),
        treated = dataset.treated_count(),
        seed = config.seed,
        "threshold dataset generated"
    );
    Ok(dataset)
}

/// Box-Muller transform for standard normal sampling
fn sample_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(EPSILON);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
