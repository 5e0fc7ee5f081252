//! Base learners backing every strategy sub-model.
//!
//! Classifiers map covariates to P(label = 1); regressors map covariates to a
//! real-valued target (the X-learner's imputed effects). The family is chosen
//! by configuration, so strategies stay agnostic of the concrete model.

mod knn;
mod logistic;
mod ridge;

pub use knn::{KnnConfig, KnnModel};
pub use logistic::{LogisticConfig, LogisticModel};
pub use ridge::{RidgeConfig, RidgeModel};

use serde::{Deserialize, Serialize};

use crate::error::{Result, Subpopulation, TwinError};
use crate::sanitize::sanitize_rows;

/// Which model family trains outcome (and propensity) sub-models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierKind {
    Logistic(LogisticConfig),
    Knn(KnnConfig),
}

impl Default for ClassifierKind {
    fn default() -> Self {
        ClassifierKind::Logistic(LogisticConfig::default())
    }
}

/// Which model family trains the X-learner's effect sub-models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RegressorKind {
    Ridge(RidgeConfig),
    Knn(KnnConfig),
}

impl Default for RegressorKind {
    fn default() -> Self {
        RegressorKind::Ridge(RidgeConfig::default())
    }
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::Logistic(_) => "logistic",
            ClassifierKind::Knn(_) => "knn",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ClassifierKind::Logistic(config) => config.validate(),
            ClassifierKind::Knn(config) => config.validate(),
        }
    }

    /// Fit on binary labels (0.0 / 1.0).
    pub fn fit(&self, rows: &[Vec<f64>], labels: &[f64]) -> Result<FittedLearner> {
        self.validate()?;
        let rows = prepare(rows, labels)?;
        let fitted = match self {
            ClassifierKind::Logistic(config) => {
                FittedLearner::Logistic(LogisticModel::fit(config, &rows, labels))
            }
            ClassifierKind::Knn(config) => FittedLearner::Knn(KnnModel::fit(config, rows, labels)),
        };
        Ok(fitted)
    }
}

impl RegressorKind {
    pub fn name(&self) -> &'static str {
        match self {
            RegressorKind::Ridge(_) => "ridge",
            RegressorKind::Knn(_) => "knn",
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            RegressorKind::Ridge(config) => config.validate(),
            RegressorKind::Knn(config) => config.validate(),
        }
    }

    pub fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<FittedLearner> {
        self.validate()?;
        let rows = prepare(rows, targets)?;
        let fitted = match self {
            RegressorKind::Ridge(config) => {
                FittedLearner::Ridge(RidgeModel::fit(config, &rows, targets))
            }
            RegressorKind::Knn(config) => FittedLearner::Knn(KnnModel::fit(config, rows, targets)),
        };
        Ok(fitted)
    }
}

/// Trained sub-model. Immutable once built.
#[derive(Debug, Clone)]
pub enum FittedLearner {
    Logistic(LogisticModel),
    Ridge(RidgeModel),
    Knn(KnnModel),
}

impl FittedLearner {
    /// Prediction for one already-sanitized row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        match self {
            FittedLearner::Logistic(model) => model.predict_proba(row),
            FittedLearner::Ridge(model) => model.predict(row),
            FittedLearner::Knn(model) => model.predict(row),
        }
    }

    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict(row)).collect()
    }
}

/// Shared pre-flight checks; returns sanitized rows.
fn prepare(rows: &[Vec<f64>], targets: &[f64]) -> Result<Vec<Vec<f64>>> {
    if rows.is_empty() {
        return Err(TwinError::InsufficientData {
            subpopulation: Subpopulation::Training,
        });
    }
    if rows.len() != targets.len() {
        return Err(TwinError::InvalidDataset(format!(
            "{} rows but {} targets",
            rows.len(),
            targets.len()
        )));
    }
    Ok(sanitize_rows(rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_training_set() {
        let err = ClassifierKind::default().fit(&[], &[]).unwrap_err();
        assert_eq!(
            err,
            TwinError::InsufficientData {
                subpopulation: Subpopulation::Training
            }
        );
    }

    #[test]
    fn test_length_mismatch() {
        let rows = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            RegressorKind::default().fit(&rows, &[1.0]),
            Err(TwinError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_invalid_k_rejected() {
        let kind = ClassifierKind::Knn(KnnConfig { k: Some(0) });
        assert!(matches!(kind.validate(), Err(TwinError::InvalidConfig(_))));
    }

    #[test]
    fn test_serde_tagging() {
        let kind: ClassifierKind =
            serde_json::from_str(r#"{"kind":"knn","k":5}"#).unwrap();
        assert_eq!(kind, ClassifierKind::Knn(KnnConfig { k: Some(5) }));
        assert_eq!(kind.name(), "knn");
        assert_eq!(RegressorKind::default().name(), "ridge");
    }
}
