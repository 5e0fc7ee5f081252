use clap::{Parser, ValueEnum};
use serde::Serialize;

use twin_core::learner::{ClassifierKind, KnnConfig, RegressorKind};
use twin_core::synthetic::{LatentClassConfig, LatentDistribution, ThresholdConfig};
use twin_core::{Anchor, CombinationWeight, Scoring, Strategy, StrategyConfig};

const DEFAULT_LATENT_SAMPLES: usize = 100_000;
const DEFAULT_THRESHOLD_SAMPLES: usize = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// Three latent classes, one-hot covariates
    Latent,
    /// Y(t) = (t and x1 > 0) or x2 > 0 over uniform covariates
    Threshold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UDistribution {
    Normal,
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyChoice {
    Baseline,
    S,
    T,
    X,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassifierChoice {
    Logistic,
    Knn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RegressorChoice {
    Ridge,
    Knn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScoringChoice {
    /// Soft averages of the predicted probabilities
    Probability,
    /// Probabilities thresholded at --threshold first
    Binary,
}

/// Command-line arguments, each with an environment fallback.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "twin-experiment",
    version,
    about = "Fit twin-model strategies on synthetic data and report PN / PS / PNS",
    long_about = None
)]
pub struct Args {
    /// Synthetic data-generating process
    #[arg(long, env = "TWIN_DATASET", value_enum, default_value_t = DatasetKind::Threshold)]
    pub dataset: DatasetKind,

    /// Number of samples (100000 for latent, 1000 for threshold)
    #[arg(long, env = "TWIN_N_SAMPLES")]
    pub n_samples: Option<usize>,

    /// Treatment probability (latent dataset)
    #[arg(long, env = "TWIN_P", default_value_t = 0.5)]
    pub p: f64,

    /// Latent class distribution (latent dataset)
    #[arg(long, env = "TWIN_U_DISTRIBUTION", value_enum, default_value_t = UDistribution::Normal)]
    pub u_distribution: UDistribution,

    /// Treated units (threshold dataset); half the samples when omitted
    #[arg(long, env = "TWIN_N_TREATED")]
    pub n_treated: Option<usize>,

    /// Covariate dimension (threshold dataset)
    #[arg(long, env = "TWIN_FEATURE_DIM", default_value_t = 2)]
    pub feature_dim: usize,

    /// Training fraction of the ordered split
    #[arg(long, env = "TWIN_SPLIT", default_value_t = 0.8)]
    pub split: f64,

    #[arg(long, env = "TWIN_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Decision threshold for accuracy and binary scoring
    #[arg(long, env = "TWIN_THRESHOLD", default_value_t = 0.5)]
    pub threshold: f64,

    #[arg(long, env = "TWIN_STRATEGY", value_enum, default_value_t = StrategyChoice::All)]
    pub strategy: StrategyChoice,

    #[arg(long, env = "TWIN_CLASSIFIER", value_enum, default_value_t = ClassifierChoice::Logistic)]
    pub classifier: ClassifierChoice,

    /// Effect regressor (X-learner)
    #[arg(long, env = "TWIN_REGRESSOR", value_enum, default_value_t = RegressorChoice::Ridge)]
    pub regressor: RegressorChoice,

    /// Neighbour count for knn learners
    #[arg(long, env = "TWIN_K")]
    pub k: Option<usize>,

    /// X-learner blend: `propensity` or a fixed weight in [0, 1]
    #[arg(long, env = "TWIN_COMBINATION", default_value = "propensity")]
    pub combination: CombinationWeight,

    /// X-learner anchor arm
    #[arg(long, env = "TWIN_ANCHOR", default_value = "control")]
    pub anchor: Anchor,

    #[arg(long, env = "TWIN_SCORING", value_enum, default_value_t = ScoringChoice::Probability)]
    pub scoring: ScoringChoice,

    /// Bootstrap resamples for intervals on the test split (0 = off)
    #[arg(long, env = "TWIN_BOOTSTRAP", default_value_t = 0)]
    pub bootstrap: usize,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

/// Which generator to run, with its resolved parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetConfig {
    Latent(LatentClassConfig),
    Threshold(ThresholdConfig),
}

impl DatasetConfig {
    pub fn kind(&self) -> DatasetKind {
        match self {
            DatasetConfig::Latent(_) => DatasetKind::Latent,
            DatasetConfig::Threshold(_) => DatasetKind::Threshold,
        }
    }
}

/// Fully resolved experiment settings.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub dataset: DatasetConfig,
    pub split: f64,
    pub threshold: f64,
    pub strategies: Vec<Strategy>,
    pub strategy_config: StrategyConfig,
    pub scoring: Scoring,
    pub bootstrap: usize,
    pub seed: u64,
}

impl Args {
    pub fn into_config(self) -> ExperimentConfig {
        let seed = self.seed;
        let dataset = match self.dataset {
            DatasetKind::Latent => DatasetConfig::Latent(LatentClassConfig {
                n_samples: self.n_samples.unwrap_or(DEFAULT_LATENT_SAMPLES),
                treatment_probability: self.p,
                latent: match self.u_distribution {
                    UDistribution::Normal => LatentDistribution::default(),
                    UDistribution::Uniform => LatentDistribution::uniform(),
                },
                seed,
            }),
            DatasetKind::Threshold => {
                let n_samples = self.n_samples.unwrap_or(DEFAULT_THRESHOLD_SAMPLES);
                DatasetConfig::Threshold(ThresholdConfig {
                    n_samples,
                    n_treated: self.n_treated.unwrap_or(n_samples / 2),
                    feature_dim: self.feature_dim,
                    seed,
                })
            }
        };

        let knn = KnnConfig {
            k: self.k.or(KnnConfig::default().k),
        };
        let base_classifier = match self.classifier {
            ClassifierChoice::Logistic => ClassifierKind::default(),
            ClassifierChoice::Knn => ClassifierKind::Knn(knn.clone()),
        };
        let base_regressor = match self.regressor {
            RegressorChoice::Ridge => RegressorKind::default(),
            RegressorChoice::Knn => RegressorKind::Knn(knn),
        };

        let strategies = match self.strategy {
            StrategyChoice::Baseline => vec![Strategy::Baseline],
            StrategyChoice::S => vec![Strategy::SLearner],
            StrategyChoice::T => vec![Strategy::TLearner],
            StrategyChoice::X => vec![Strategy::XLearner],
            StrategyChoice::All => Strategy::ALL.to_vec(),
        };

        let scoring = match self.scoring {
            ScoringChoice::Probability => Scoring::Probability,
            ScoringChoice::Binary => Scoring::Binary {
                threshold: self.threshold,
            },
        };

        ExperimentConfig {
            dataset,
            split: self.split,
            threshold: self.threshold,
            strategies,
            strategy_config: StrategyConfig {
                base_classifier,
                base_regressor,
                combination_weight: self.combination,
                anchor: self.anchor,
            },
            scoring,
            bootstrap: self.bootstrap,
            seed,
        }
    }
}
