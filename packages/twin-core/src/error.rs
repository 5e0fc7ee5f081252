//! Error types shared by every estimation strategy.

use thiserror::Error;

/// Treatment arm (or conditioning set) that turned out to be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subpopulation {
    Treated,
    Control,
    Training,
    /// Subpopulation requested from the causal-probability calculator
    Requested,
}

impl std::fmt::Display for Subpopulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Subpopulation::Treated => "treated arm",
            Subpopulation::Control => "control arm",
            Subpopulation::Training => "training set",
            Subpopulation::Requested => "requested subpopulation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TwinError {
    /// Prediction requested before a successful `fit`.
    #[error("{strategy} has not been fitted")]
    NotFitted { strategy: &'static str },

    #[error("insufficient data: {subpopulation} is empty")]
    InsufficientData { subpopulation: Subpopulation },

    /// Direct supervision needs both counterfactual columns on every sample.
    #[error("dataset lacks counterfactual outcome labels")]
    MissingCounterfactualLabels,

    #[error("schema mismatch: expected {expected} columns, got {got}")]
    SchemaMismatch { expected: usize, got: usize },

    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, TwinError>;
