//! Twin-model strategies.
//!
//! Every strategy implements [`TwinModel`]: fit on a [`Dataset`], then predict
//! the pair (P(Y=1 | do(T=0)), P(Y=1 | do(T=1))) for arbitrary covariate rows.
//!
//! - [`BaselineTwinModel`] - direct supervision on both counterfactual columns
//! - [`SLearner`] - one model, treatment as an input feature
//! - [`TLearner`] - one model per treatment arm
//! - [`XLearner`] - T-learner plus imputed-effect regressors, blended per row

mod baseline;
mod s_learner;
mod t_learner;
mod x_learner;

pub use baseline::BaselineTwinModel;
pub use s_learner::SLearner;
pub use t_learner::TLearner;
pub use x_learner::XLearner;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TwinError};
use crate::learner::{ClassifierKind, RegressorKind};
use crate::sanitize::{check_schema, sanitize_rows};
use crate::types::{Dataset, PotentialOutcome};

/// Capability set shared by every estimation strategy.
///
/// `fit` replaces the fitted state only on success; a failed fit leaves the
/// previous state in place.
pub trait TwinModel: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_fitted(&self) -> bool;

    fn fit(&mut self, dataset: &Dataset) -> Result<()>;

    /// One estimate per input row. Only covariates are consulted.
    fn predict_potential_outcomes(&self, covariates: &[Vec<f64>]) -> Result<Vec<PotentialOutcome>>;
}

// ==================== Configuration ====================

/// How the X-learner blends its two effect estimates:
/// tau(x) = g(x) * tau_control(x) + (1 - g(x)) * tau_treated(x).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CombinationWeight {
    /// g(x) is the clipped propensity estimate P(T=1 | x)
    #[default]
    Propensity,
    /// g(x) is this constant in [0, 1]
    Fixed(f64),
}

impl CombinationWeight {
    pub fn validate(&self) -> Result<()> {
        match *self {
            CombinationWeight::Fixed(w) if !(0.0..=1.0).contains(&w) => Err(
                TwinError::InvalidConfig(format!("combination weight must lie in [0, 1], got {w}")),
            ),
            _ => Ok(()),
        }
    }
}

impl FromStr for CombinationWeight {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("propensity") {
            return Ok(CombinationWeight::Propensity);
        }
        let weight = s
            .parse::<f64>()
            .map(CombinationWeight::Fixed)
            .map_err(|_| {
                TwinError::InvalidConfig(format!(
                    "combination weight must be 'propensity' or a number, got '{s}'"
                ))
            })?;
        weight.validate()?;
        Ok(weight)
    }
}

impl fmt::Display for CombinationWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombinationWeight::Propensity => f.write_str("propensity"),
            CombinationWeight::Fixed(w) => write!(f, "{w}"),
        }
    }
}

/// Arm whose stage-1 outcome model anchors the X-learner's reported pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Control,
    Treated,
}

impl FromStr for Anchor {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "control" => Ok(Anchor::Control),
            "treated" => Ok(Anchor::Treated),
            other => Err(TwinError::InvalidConfig(format!(
                "anchor must be 'control' or 'treated', got '{other}'"
            ))),
        }
    }
}

/// Construction-time options. Meta-learners ignore what they do not use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StrategyConfig {
    /// Trains outcome sub-models (and the X-learner propensity model)
    pub base_classifier: ClassifierKind,
    /// Trains X-learner effect sub-models
    pub base_regressor: RegressorKind,
    pub combination_weight: CombinationWeight,
    pub anchor: Anchor,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        self.base_classifier.validate()?;
        self.base_regressor.validate()?;
        self.combination_weight.validate()
    }
}

// ==================== Strategy selection ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Baseline,
    SLearner,
    TLearner,
    XLearner,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Baseline,
        Strategy::SLearner,
        Strategy::TLearner,
        Strategy::XLearner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Baseline => "baseline",
            Strategy::SLearner => "s_learner",
            Strategy::TLearner => "t_learner",
            Strategy::XLearner => "x_learner",
        }
    }

    /// Only the baseline needs counterfactual labels to fit.
    pub fn requires_counterfactuals(&self) -> bool {
        matches!(self, Strategy::Baseline)
    }

    /// Fresh, unfitted instance.
    pub fn build(&self, config: &StrategyConfig) -> Box<dyn TwinModel> {
        match self {
            Strategy::Baseline => Box::new(BaselineTwinModel::new(config.base_classifier.clone())),
            Strategy::SLearner => Box::new(SLearner::new(config.base_classifier.clone())),
            Strategy::TLearner => Box::new(TLearner::new(config.base_classifier.clone())),
            Strategy::XLearner => Box::new(XLearner::new(config.clone())),
        }
    }
}

impl FromStr for Strategy {
    type Err = TwinError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "baseline" | "direct" => Ok(Strategy::Baseline),
            "s" | "s_learner" => Ok(Strategy::SLearner),
            "t" | "t_learner" => Ok(Strategy::TLearner),
            "x" | "x_learner" => Ok(Strategy::XLearner),
            other => Err(TwinError::InvalidConfig(format!("unknown strategy '{other}'"))),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Shared helpers ====================

/// Schema check plus sanitization for prediction input.
fn prediction_rows(feature_dim: usize, covariates: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    check_schema(covariates, feature_dim)?;
    Ok(sanitize_rows(covariates))
}

/// Covariates and factual outcomes of one treatment arm.
fn arm_training_set(dataset: &Dataset, treatment: u8) -> (Vec<Vec<f64>>, Vec<f64>) {
    dataset
        .arm(treatment)
        .map(|s| (s.covariates.clone(), f64::from(s.outcome)))
        .unzip()
}
