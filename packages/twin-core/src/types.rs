use serde::{Deserialize, Serialize};

use crate::error::{Result, Subpopulation, TwinError};
use crate::sanitize::{clamp_probability, has_invalid_values};

// ==================== Constants ====================

/// Numerical stability: minimum positive number
pub const EPSILON: f64 = 1e-10;
/// Smallest ridge penalty accepted by the Cholesky solver
pub const MIN_LAMBDA: f64 = 1e-8;
/// Propensity clipping bounds used by the X-learner combination weight
pub const PROPENSITY_MIN: f64 = 0.05;
pub const PROPENSITY_MAX: f64 = 0.95;

// ==================== Data Structures ====================

/// One observational unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Covariate vector
    pub covariates: Vec<f64>,
    /// Treatment indicator (0 = control, 1 = treated)
    pub treatment: u8,
    /// Factual outcome (0 or 1)
    pub outcome: u8,
    /// Outcome under control, synthetic data only
    pub outcome_control: Option<u8>,
    /// Outcome under treatment, synthetic data only
    pub outcome_treated: Option<u8>,
}

impl Sample {
    /// Sample with only the factual outcome observed.
    pub fn factual(covariates: Vec<f64>, treatment: u8, outcome: u8) -> Self {
        Self {
            covariates,
            treatment,
            outcome,
            outcome_control: None,
            outcome_treated: None,
        }
    }

    /// Sample with both potential outcomes known; the factual outcome is the
    /// one matching the realized treatment.
    pub fn with_potential_outcomes(
        covariates: Vec<f64>,
        treatment: u8,
        outcome_control: u8,
        outcome_treated: u8,
    ) -> Self {
        let outcome = if treatment == 1 {
            outcome_treated
        } else {
            outcome_control
        };
        Self {
            covariates,
            treatment,
            outcome,
            outcome_control: Some(outcome_control),
            outcome_treated: Some(outcome_treated),
        }
    }

    pub fn is_treated(&self) -> bool {
        self.treatment == 1
    }

    /// (Y(0), Y(1)) when both counterfactual labels are present.
    pub fn potential_outcomes(&self) -> Option<(u8, u8)> {
        match (self.outcome_control, self.outcome_treated) {
            (Some(y0), Some(y1)) => Some((y0, y1)),
            _ => None,
        }
    }

    /// Label of the arm the unit did not receive.
    pub fn counterfactual_outcome(&self) -> Option<u8> {
        if self.is_treated() {
            self.outcome_control
        } else {
            self.outcome_treated
        }
    }

    fn validate(&self, index: usize, feature_dim: usize) -> Result<()> {
        if self.covariates.len() != feature_dim {
            return Err(TwinError::InvalidDataset(format!(
                "sample {index} has {} covariates, expected {feature_dim}",
                self.covariates.len()
            )));
        }
        if has_invalid_values(&self.covariates) {
            return Err(TwinError::InvalidDataset(format!(
                "sample {index} has a non-finite covariate"
            )));
        }
        let binary = |v: u8| v <= 1;
        if !binary(self.treatment) || !binary(self.outcome) {
            return Err(TwinError::InvalidDataset(format!(
                "sample {index}: treatment and outcome must be 0 or 1"
            )));
        }
        for label in [self.outcome_control, self.outcome_treated].into_iter().flatten() {
            if !binary(label) {
                return Err(TwinError::InvalidDataset(format!(
                    "sample {index}: counterfactual outcomes must be 0 or 1"
                )));
            }
        }

        // consistency: the label of the realized arm is the factual outcome
        let realized = if self.is_treated() {
            self.outcome_treated
        } else {
            self.outcome_control
        };
        if let Some(label) = realized {
            if label != self.outcome {
                return Err(TwinError::InvalidDataset(format!(
                    "sample {index}: outcome under the realized treatment ({label}) \
                     differs from the factual outcome ({})",
                    self.outcome
                )));
            }
        }
        Ok(())
    }
}

/// Ordered, validated collection of samples sharing one covariate schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    samples: Vec<Sample>,
    feature_dim: usize,
}

impl Dataset {
    /// Validates non-emptiness, constant dimensionality, binary labels and
    /// counterfactual consistency. Arm sizes are checked by the strategies.
    pub fn new(samples: Vec<Sample>) -> Result<Self> {
        let first = samples
            .first()
            .ok_or_else(|| TwinError::InvalidDataset("dataset is empty".to_string()))?;
        let feature_dim = first.covariates.len();
        for (index, sample) in samples.iter().enumerate() {
            sample.validate(index, feature_dim)?;
        }
        Ok(Self {
            samples,
            feature_dim,
        })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false for a constructed dataset.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Covariate rows, in sample order.
    pub fn covariates(&self) -> Vec<Vec<f64>> {
        self.samples.iter().map(|s| s.covariates.clone()).collect()
    }

    /// Samples in the given arm (0 = control, 1 = treated).
    pub fn arm(&self, treatment: u8) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter().filter(move |s| s.treatment == treatment)
    }

    pub fn treated_count(&self) -> usize {
        self.arm(1).count()
    }

    pub fn control_count(&self) -> usize {
        self.arm(0).count()
    }

    /// Meta-learners need at least one unit in each arm.
    pub fn require_both_arms(&self) -> Result<()> {
        if self.treated_count() == 0 {
            return Err(TwinError::InsufficientData {
                subpopulation: Subpopulation::Treated,
            });
        }
        if self.control_count() == 0 {
            return Err(TwinError::InsufficientData {
                subpopulation: Subpopulation::Control,
            });
        }
        Ok(())
    }

    /// True iff every sample carries both counterfactual outcomes.
    pub fn has_counterfactuals(&self) -> bool {
        self.samples.iter().all(|s| s.potential_outcomes().is_some())
    }

    /// New dataset made of the samples at `indices` (repeats allowed).
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        let samples = indices
            .iter()
            .map(|&i| {
                self.samples.get(i).cloned().ok_or_else(|| {
                    TwinError::InvalidDataset(format!(
                        "index {i} out of bounds for {} samples",
                        self.samples.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(samples)
    }

    /// Ordered train/test split: the first `fraction` of the samples train.
    pub fn split(&self, fraction: f64) -> Result<(Self, Self)> {
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(TwinError::InvalidConfig(format!(
                "split fraction must lie in (0, 1), got {fraction}"
            )));
        }
        let cut = (fraction * self.samples.len() as f64) as usize;
        if cut == 0 || cut == self.samples.len() {
            return Err(TwinError::InvalidDataset(format!(
                "split {fraction} of {} samples leaves an empty part",
                self.samples.len()
            )));
        }
        let (train, test) = self.samples.split_at(cut);
        Ok((
            Self {
                samples: train.to_vec(),
                feature_dim: self.feature_dim,
            },
            Self {
                samples: test.to_vec(),
                feature_dim: self.feature_dim,
            },
        ))
    }
}

/// Estimated P(Y=1 | do(T=0)) and P(Y=1 | do(T=1)) for one row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PotentialOutcome {
    pub control: f64,
    pub treated: f64,
}

impl PotentialOutcome {
    /// Clamps both probabilities into [0, 1].
    pub fn new(control: f64, treated: f64) -> Self {
        Self {
            control: clamp_probability(control),
            treated: clamp_probability(treated),
        }
    }

    /// Probability for the given arm.
    pub fn arm(&self, treatment: u8) -> f64 {
        if treatment == 1 {
            self.treated
        } else {
            self.control
        }
    }
}
