use tracing::debug;

use super::{
    arm_training_set, prediction_rows, Anchor, CombinationWeight, StrategyConfig, TwinModel,
};
use crate::error::{Result, TwinError};
use crate::learner::FittedLearner;
use crate::types::{Dataset, PotentialOutcome, PROPENSITY_MAX, PROPENSITY_MIN};

/// Cross learner.
///
/// 1. Outcome models mu_0 / mu_1 per arm (as the T-learner).
/// 2. Imputed effects: treated `Y - mu_0(x)`, control `mu_1(x) - Y`.
/// 3. Effect regressors tau_1 (treated) and tau_0 (control) on those targets.
/// 4. `tau(x) = g(x) * tau_0(x) + (1 - g(x)) * tau_1(x)`, where g is the
///    clipped propensity or a fixed weight.
///
/// The reported pair keeps the anchor arm's outcome model and shifts the other
/// arm by `tau(x)`.
pub struct XLearner {
    config: StrategyConfig,
    state: Option<XLearnerState>,
}

/// Everything prediction needs, built once per successful fit.
struct XLearnerState {
    feature_dim: usize,
    outcome_control: FittedLearner,
    outcome_treated: FittedLearner,
    effect_control: FittedLearner,
    effect_treated: FittedLearner,
    /// Present only for propensity weighting
    propensity: Option<FittedLearner>,
}

impl XLearner {
    pub fn new(config: StrategyConfig) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn combination_weight(&self) -> CombinationWeight {
        self.config.combination_weight
    }
}

impl XLearnerState {
    /// g(x) in the blend above.
    fn weight(&self, row: &[f64], policy: CombinationWeight) -> f64 {
        match (policy, &self.propensity) {
            (CombinationWeight::Fixed(w), _) => w,
            (CombinationWeight::Propensity, Some(model)) => {
                model.predict(row).clamp(PROPENSITY_MIN, PROPENSITY_MAX)
            }
            (CombinationWeight::Propensity, None) => 0.5,
        }
    }

    fn effect(&self, row: &[f64], policy: CombinationWeight) -> f64 {
        let g = self.weight(row, policy);
        g * self.effect_control.predict(row) + (1.0 - g) * self.effect_treated.predict(row)
    }
}

impl TwinModel for XLearner {
    fn name(&self) -> &'static str {
        "x_learner"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        self.config.validate()?;
        dataset.require_both_arms()?;
        let classifier = &self.config.base_classifier;
        let regressor = &self.config.base_regressor;

        // stage 1: per-arm outcome models
        let (rows_control, labels_control) = arm_training_set(dataset, 0);
        let (rows_treated, labels_treated) = arm_training_set(dataset, 1);
        let outcome_control = classifier.fit(&rows_control, &labels_control)?;
        let outcome_treated = classifier.fit(&rows_treated, &labels_treated)?;

        // stage 2: imputed individual effects
        let imputed_treated: Vec<f64> = rows_treated
            .iter()
            .zip(&labels_treated)
            .map(|(row, &y)| y - outcome_control.predict(row))
            .collect();
        let imputed_control: Vec<f64> = rows_control
            .iter()
            .zip(&labels_control)
            .map(|(row, &y)| outcome_treated.predict(row) - y)
            .collect();

        // stage 3: effect regressors
        let effect_treated = regressor.fit(&rows_treated, &imputed_treated)?;
        let effect_control = regressor.fit(&rows_control, &imputed_control)?;

        let propensity = match self.config.combination_weight {
            CombinationWeight::Propensity => {
                let rows = dataset.covariates();
                let assignments: Vec<f64> = dataset
                    .samples()
                    .iter()
                    .map(|s| f64::from(s.treatment))
                    .collect();
                Some(classifier.fit(&rows, &assignments)?)
            }
            CombinationWeight::Fixed(_) => None,
        };

        debug!(
            control = rows_control.len(),
            treated = rows_treated.len(),
            classifier = classifier.name(),
            regressor = regressor.name(),
            combination = %self.config.combination_weight,
            "x-learner fitted"
        );

        self.state = Some(XLearnerState {
            feature_dim: dataset.feature_dim(),
            outcome_control,
            outcome_treated,
            effect_control,
            effect_treated,
            propensity,
        });
        Ok(())
    }

    fn predict_potential_outcomes(&self, covariates: &[Vec<f64>]) -> Result<Vec<PotentialOutcome>> {
        let state = self.state.as_ref().ok_or(TwinError::NotFitted {
            strategy: self.name(),
        })?;
        let rows = prediction_rows(state.feature_dim, covariates)?;
        let policy = self.config.combination_weight;

        Ok(rows
            .iter()
            .map(|row| {
                let tau = state.effect(row, policy);
                match self.config.anchor {
                    Anchor::Control => {
                        let p0 = state.outcome_control.predict(row);
                        PotentialOutcome::new(p0, p0 + tau)
                    }
                    Anchor::Treated => {
                        let p1 = state.outcome_treated.predict(row);
                        PotentialOutcome::new(p1 - tau, p1)
                    }
                }
            })
            .collect())
    }
}
