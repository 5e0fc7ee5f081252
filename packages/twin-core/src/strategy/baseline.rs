use tracing::debug;

use super::{prediction_rows, TwinModel};
use crate::error::{Result, TwinError};
use crate::learner::{ClassifierKind, FittedLearner};
use crate::types::{Dataset, PotentialOutcome};

/// Direct twin model: one classifier per potential outcome, both trained on
/// the whole population from the counterfactual labels. Synthetic data only;
/// serves as the upper-bound reference for the meta-learners.
pub struct BaselineTwinModel {
    classifier: ClassifierKind,
    state: Option<BaselineState>,
}

struct BaselineState {
    feature_dim: usize,
    control: FittedLearner,
    treated: FittedLearner,
}

impl BaselineTwinModel {
    pub fn new(classifier: ClassifierKind) -> Self {
        Self {
            classifier,
            state: None,
        }
    }
}

impl TwinModel for BaselineTwinModel {
    fn name(&self) -> &'static str {
        "baseline"
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        if !dataset.has_counterfactuals() {
            return Err(TwinError::MissingCounterfactualLabels);
        }
        dataset.require_both_arms()?;

        let rows = dataset.covariates();
        let (labels_control, labels_treated): (Vec<f64>, Vec<f64>) = dataset
            .samples()
            .iter()
            .filter_map(|s| s.potential_outcomes())
            .map(|(y0, y1)| (f64::from(y0), f64::from(y1)))
            .unzip();

        let control = self.classifier.fit(&rows, &labels_control)?;
        let treated = self.classifier.fit(&rows, &labels_treated)?;
        debug!(
            samples = rows.len(),
            classifier = self.classifier.name(),
            "baseline twin model fitted"
        );

        self.state = Some(BaselineState {
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

        let control = state.control.predict_rows(&rows);
        let treated = state.treated.predict_rows(&rows);
        Ok(control
            .into_iter()
            .zip(treated)
            .map(|(p0, p1)| PotentialOutcome::new(p0, p1))
            .collect())
    }
}
