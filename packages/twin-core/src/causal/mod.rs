use std::fmt;

use serde::{Deserialize, Serialize};

pub mod calculator;

pub use calculator::CausalProbabilityCalculator;

/// PN or PS: a probability, or explicitly undefined when the conditioning
/// set is empty. Never encoded as 0 or NaN.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum CausalQuantity {
    Defined(f64),
    Undefined,
}

impl CausalQuantity {
    pub fn value(&self) -> Option<f64> {
        match *self {
            CausalQuantity::Defined(v) => Some(v),
            CausalQuantity::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, CausalQuantity::Defined(_))
    }
}

impl fmt::Display for CausalQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CausalQuantity::Defined(v) => write!(f, "{v:.4}"),
            CausalQuantity::Undefined => f.write_str("undefined"),
        }
    }
}

/// Units behind each estimate
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Support {
    /// Treated units with outcome 1 (PN conditioning set)
    pub necessity: usize,
    /// Control units with outcome 0 (PS conditioning set)
    pub sufficiency: usize,
    /// Units in the evaluated population (PNS)
    pub population: usize,
}

/// Probabilities of causation for one population
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CausalProbabilities {
    /// Probability of necessity
    pub pn: CausalQuantity,
    /// Probability of sufficiency
    pub ps: CausalQuantity,
    /// Probability of necessity and sufficiency
    pub pns: f64,
    pub support: Support,
}

/// How per-unit potential outcomes enter the averages
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Scoring {
    /// Probabilities as-is; the PNS term is p1 * (1 - p0)
    #[default]
    Probability,
    /// Each probability thresholded to 0/1 first (p >= threshold -> 1)
    Binary { threshold: f64 },
}

/// Percentile bootstrap interval for one quantity
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapInterval {
    /// 2.5th percentile
    pub lower: f64,
    /// 97.5th percentile
    pub upper: f64,
    /// Standard deviation of the resampled estimates
    pub standard_error: f64,
    /// Resamples in which the quantity was defined
    pub resamples: usize,
}

/// Bootstrap summary; `None` when a quantity was never defined
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub resamples: usize,
    pub pn: Option<BootstrapInterval>,
    pub ps: Option<BootstrapInterval>,
    pub pns: Option<BootstrapInterval>,
}
