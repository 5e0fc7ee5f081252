use tracing::debug;

use super::{prediction_rows, TwinModel};
use crate::error::{Result, TwinError};
use crate::learner::{ClassifierKind, FittedLearner};
use crate::types::{Dataset, PotentialOutcome};

/// Single-model learner: the treatment indicator is appended to the
/// covariates and forced to 0 / 1 at prediction time.
///
/// A base learner that puts little weight on the treatment column can
/// regularize the effect away; that is a property of the strategy.
pub struct SLearner {
    classifier: ClassifierKind,
    state: Option<SLearnerState>,
}

struct SLearnerState {
    feature_dim: usize,
    model: FittedLearner,
}

impl SLearner {
    pub fn new(classifier: ClassifierKind) -> Self {
        Self {
            classifier,
            state: None,
        }
    }
}

fn with_treatment(covariates: &[f64], treatment: u8) -> Vec<f64> {
    let mut row = Vec::with_capacity(covariates.len() + 1);
    row.extend_from_slice(covariates);
    row.push(f64::from(treatment));
    row
}

impl TwinModel for SLearner {
    fn name(&self) -> &'static str {
        "s_learner"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        dataset.require_both_arms()?;

        let (rows, labels): (Vec<Vec<f64>>, Vec<f64>) = dataset
            .samples()
            .iter()
            .map(|s| (with_treatment(&s.covariates, s.treatment), f64::from(s.outcome)))
            .unzip();
        let model = self.classifier.fit(&rows, &labels)?;
        debug!(
            samples = rows.len(),
            classifier = self.classifier.name(),
            "s-learner fitted"
        );

        self.state = Some(SLearnerState {
            feature_dim: dataset.feature_dim(),
            model,
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
            .map(|row| {
                PotentialOutcome::new(
                    state.model.predict(&with_treatment(row, 0)),
                    state.model.predict(&with_treatment(row, 1)),
                )
            })
            .collect())
    }
}
