use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TwinError};
use crate::matrix::{add_bias, dot_product};
use crate::types::EPSILON;

const DEFAULT_LEARNING_RATE: f64 = 0.5;
const DEFAULT_REGULARIZATION: f64 = 0.01;
const DEFAULT_MAX_ITERATIONS: u32 = 2000;
const DEFAULT_CONVERGENCE_THRESHOLD: f64 = 1e-7;

/// Logistic regression settings; `None` falls back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Gradient descent step size
    pub learning_rate: Option<f64>,
    /// L2 penalty (intercept is not penalized)
    pub regularization: Option<f64>,
    pub max_iterations: Option<u32>,
    /// Stop once the mean loss changes by less than this
    pub convergence_threshold: Option<f64>,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            learning_rate: Some(DEFAULT_LEARNING_RATE),
            regularization: Some(DEFAULT_REGULARIZATION),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            convergence_threshold: Some(DEFAULT_CONVERGENCE_THRESHOLD),
        }
    }
}

impl LogisticConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let learning_rate = self.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE);
        let regularization = self.regularization.unwrap_or(DEFAULT_REGULARIZATION);
        if !(learning_rate > 0.0 && learning_rate.is_finite()) {
            return Err(TwinError::InvalidConfig(format!(
                "logistic learning_rate must be positive, got {learning_rate}"
            )));
        }
        if !(regularization >= 0.0 && regularization.is_finite()) {
            return Err(TwinError::InvalidConfig(format!(
                "logistic regularization must be non-negative, got {regularization}"
            )));
        }
        Ok(())
    }
}

/// Fitted logistic regression; the intercept is the last weight.
///
/// Weights act on standardized covariates: each column is centred and scaled
/// by the mean and standard deviation seen at fit time.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    weights: Vec<f64>,
    means: Vec<f64>,
    scales: Vec<f64>,
    iterations: u32,
}

impl LogisticModel {
    /// Full-batch gradient descent with L2 regularization.
    pub(crate) fn fit(config: &LogisticConfig, rows: &[Vec<f64>], labels: &[f64]) -> Self {
        let learning_rate = config.learning_rate.unwrap_or(DEFAULT_LEARNING_RATE);
        let regularization = config.regularization.unwrap_or(DEFAULT_REGULARIZATION);
        let max_iterations = config.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let convergence_threshold = config
            .convergence_threshold
            .unwrap_or(DEFAULT_CONVERGENCE_THRESHOLD);

        let n = rows.len() as f64;
        let d = rows.first().map_or(0, Vec::len) + 1;
        let (means, scales) = column_moments(rows);
        let design: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| add_bias(&standardize(row, &means, &scales)))
            .collect();
        let mut weights = vec![0.0; d];
        let mut prev_loss = f64::INFINITY;
        let mut iterations = 0;

        for _ in 0..max_iterations {
            iterations += 1;
            let mut gradients = vec![0.0; d];
            let mut loss = 0.0;

            for (x, &y) in design.iter().zip(labels) {
                let pred = sigmoid(dot_product(x, &weights));
                // cross-entropy
                loss += -y * (pred + EPSILON).ln() - (1.0 - y) * (1.0 - pred + EPSILON).ln();

                let error = pred - y;
                for (g, &xj) in gradients.iter_mut().zip(x) {
                    *g += error * xj;
                }
            }

            let mut loss = loss / n;
            for (g, &w) in gradients.iter_mut().zip(&weights).take(d - 1) {
                loss += (regularization / 2.0) * w * w;
                *g = *g / n + regularization * w;
            }
            gradients[d - 1] /= n;

            for (w, g) in weights.iter_mut().zip(&gradients) {
                *w -= learning_rate * g;
            }

            if (prev_loss - loss).abs() < convergence_threshold {
                break;
            }
            prev_loss = loss;
        }

        debug!(iterations, loss = prev_loss, "logistic regression fitted");
        Self {
            weights,
            means,
            scales,
            iterations,
        }
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let x = standardize(row, &self.means, &self.scales);
        sigmoid(dot_product(&add_bias(&x), &self.weights))
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}

/// Per-column mean and standard deviation; constant columns get scale 1.
fn column_moments(rows: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>) {
    let d = rows.first().map_or(0, Vec::len);
    let n = rows.len().max(1) as f64;
    let mut means = vec![0.0; d];
    for row in rows {
        for (m, &v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut scales = vec![0.0; d];
    for row in rows {
        for ((s, &m), &v) in scales.iter_mut().zip(&means).zip(row) {
            *s += (v - m) * (v - m) / n;
        }
    }
    for s in scales.iter_mut() {
        *s = if *s > EPSILON { s.sqrt() } else { 1.0 };
    }
    (means, scales)
}

fn standardize(row: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means.iter().zip(scales))
        .map(|(&v, (&m, &s))| (v - m) / s)
        .collect()
}

/// Sigmoid with saturation outside ±20
fn sigmoid(x: f64) -> f64 {
    if x > 20.0 {
        1.0 - EPSILON
    } else if x < -20.0 {
        EPSILON
    } else {
        1.0 / (1.0 + (-x).exp())
    }
}
