//! Twin-model estimation of the probabilities of causation.
//!
//! A [`TwinModel`] strategy is fitted on a [`Dataset`] of (covariates,
//! treatment, outcome) records and predicts both potential outcomes per row;
//! the [`CausalProbabilityCalculator`] aggregates those into PN, PS and PNS.
//!
//! ```no_run
//! use twin_core::{synthetic, CausalProbabilityCalculator, Strategy, StrategyConfig};
//!
//! # fn main() -> twin_core::Result<()> {
//! let dataset = synthetic::threshold(&synthetic::ThresholdConfig::default())?;
//! let mut model = Strategy::XLearner.build(&StrategyConfig::default());
//! model.fit(&dataset)?;
//! let estimates = model.predict_potential_outcomes(&dataset.covariates())?;
//! let probabilities = CausalProbabilityCalculator::default().compute(&dataset, &estimates)?;
//! println!("PNS = {:.3}", probabilities.pns);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]

pub mod causal;
pub mod error;
pub mod evaluation;
pub mod learner;
pub mod matrix;
pub mod sanitize;
pub mod strategy;
pub mod synthetic;
pub mod types;

pub use causal::{
    BootstrapInterval, BootstrapSummary, CausalProbabilities, CausalProbabilityCalculator,
    CausalQuantity, Scoring, Support,
};
pub use error::{Result, Subpopulation, TwinError};
pub use evaluation::{evaluate, evaluate_with, EvaluationReport};
pub use learner::{ClassifierKind, KnnConfig, LogisticConfig, RegressorKind, RidgeConfig};
pub use strategy::{
    Anchor, BaselineTwinModel, CombinationWeight, SLearner, Strategy, StrategyConfig, TLearner,
    TwinModel, XLearner,
};
pub use types::*;
