use tracing::debug;

use super::{arm_training_set, prediction_rows, TwinModel};
use crate::error::{Result, TwinError};
use crate::learner::{ClassifierKind, FittedLearner};
use crate::types::{Dataset, PotentialOutcome};

/// Two-model learner: one outcome classifier per treatment arm.
/// Predictions for rows unlike either arm are plain extrapolation.
pub struct TLearner {
    classifier: ClassifierKind,
    state: Option<TLearnerState>,
}

struct TLearnerState {
    feature_dim: usize,
    control: FittedLearner,
    treated: FittedLearner,
}

impl TLearner {
    pub fn new(classifier: ClassifierKind) -> Self {
        Self {
            classifier,
            state: None,
        }
    }
}

impl TwinModel for TLearner {
    fn name(&self) -> &'static str {
        "t_learner"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        dataset.require_both_arms()?;

        let (rows_control, labels_control) = arm_training_set(dataset, 0);
        let (rows_treated, labels_treated) = arm_training_set(dataset, 1);
        let control = self.classifier.fit(&rows_control, &labels_control)?;
        let treated = self.classifier.fit(&rows_treated, &labels_treated)?;
        debug!(
            control = rows_control.len(),
            treated = rows_treated.len(),
            classifier = self.classifier.name(),
            "t-learner fitted"
        );

        self.state = Some(TLearnerState {
            feature_dim: dataset.feature_dim(),
            control,
            treated,
        });
        Ok(())
    }

    fn predict_potential_outcomes(&self, covariates: &[Vec<f64>]) -> Result<Vec<PotentialOutcome>> {
        let state = self.state.as_ref().ok_or(TwinError::NotFitted {
            strategy: self.name(),
        })?;
        let rows = prediction_rows(state.feature_dim, covariates)?;

        Ok(rows
            .iter()
            .map(|row| PotentialOutcome::new(state.control.predict(row), state.treated.predict(row)))
            .collect())
    }
}
