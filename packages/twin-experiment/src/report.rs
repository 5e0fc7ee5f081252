use serde::Serialize;

use twin_core::{BootstrapSummary, Dataset, EvaluationReport, Scoring, StrategyConfig};

use crate::config::{DatasetKind, ExperimentConfig};

/// Generated data and how it was split.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub kind: DatasetKind,
    pub n_samples: usize,
    pub feature_dim: usize,
    pub treated: usize,
    pub control: usize,
    pub has_counterfactuals: bool,
    pub split: f64,
    pub train_size: usize,
    pub test_size: usize,
    pub seed: u64,
}

impl DatasetSummary {
    pub fn new(config: &ExperimentConfig, full: &Dataset, train: &Dataset, test: &Dataset) -> Self {
        Self {
            kind: config.dataset.kind(),
            n_samples: full.len(),
            feature_dim: full.feature_dim(),
            treated: full.treated_count(),
            control: full.control_count(),
            has_counterfactuals: full.has_counterfactuals(),
            split: config.split,
            train_size: train.len(),
            test_size: test.len(),
            seed: config.seed,
        }
    }
}

/// Evaluation of one strategy plus optional bootstrap intervals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyReport {
    #[serde(flatten)]
    pub evaluation: EvaluationReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapSummary>,
}

/// One JSON document per run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentReport {
    pub dataset: DatasetSummary,
    pub learners: StrategyConfig,
    pub scoring: Scoring,
    pub strategies: Vec<StrategyReport>,
    /// Strategies not run, with the reason
    pub skipped: Vec<SkippedStrategy>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedStrategy {
    pub strategy: &'static str,
    pub reason: String,
}

impl ExperimentReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
