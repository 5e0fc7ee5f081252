use serde::{Deserialize, Serialize};

use crate::error::{Result, TwinError};
use crate::matrix::{
    add_bias, cholesky_decompose, dot_product, rank1_update_matrix, solve_cholesky, vec_add_scaled,
};

const DEFAULT_REGULARIZATION: f64 = 0.01;

/// Ridge regression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RidgeConfig {
    /// L2 penalty, scaled by the sample count; the intercept is not penalized
    pub regularization: Option<f64>,
}

impl Default for RidgeConfig {
    fn default() -> Self {
        Self {
            regularization: Some(DEFAULT_REGULARIZATION),
        }
    }
}

impl RidgeConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        let regularization = self.regularization.unwrap_or(DEFAULT_REGULARIZATION);
        if !(regularization >= 0.0 && regularization.is_finite()) {
            return Err(TwinError::InvalidConfig(format!(
                "ridge regularization must be non-negative, got {regularization}"
            )));
        }
        Ok(())
    }
}

/// Fitted ridge regression; the intercept is the last weight.
#[derive(Debug, Clone)]
pub struct RidgeModel {
    weights: Vec<f64>,
}

impl RidgeModel {
    /// Solves (X^T X + lambda * n * I) w = X^T y by Cholesky decomposition.
    pub(crate) fn fit(config: &RidgeConfig, rows: &[Vec<f64>], targets: &[f64]) -> Self {
        let regularization = config.regularization.unwrap_or(DEFAULT_REGULARIZATION);
        let n = rows.len();
        let d = rows.first().map_or(0, Vec::len) + 1;

        let mut xtx = vec![0.0; d * d];
        let mut xty = vec![0.0; d];
        for (row, &y) in rows.iter().zip(targets) {
            let x = add_bias(row);
            rank1_update_matrix(&mut xtx, &x, d, 1.0);
            vec_add_scaled(&mut xty, &x, y);
        }

        // intercept stays unpenalized
        for i in 0..(d - 1) {
            xtx[i * d + i] += regularization * n as f64;
        }

        let l = cholesky_decompose(&xtx, d, regularization);
        Self {
            weights: solve_cholesky(&l, &xty, d),
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        dot_product(&add_bias(row), &self.weights)
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_linear_relation() {
        // y = 2x - 1
        let rows: Vec<Vec<f64>> = (0..50).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<f64> = rows.iter().map(|r| 2.0 * r[0] - 1.0).collect();
        let config = RidgeConfig {
            regularization: Some(0.0),
        };

        let model = RidgeModel::fit(&config, &rows, &targets);
        assert!((model.weights()[0] - 2.0).abs() < 1e-6);
        assert!((model.weights()[1] + 1.0).abs() < 1e-6);
        assert!((model.predict(&[1.0]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_regularization_shrinks_slope() {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64 / 10.0]).collect();
        let targets: Vec<f64> = rows.iter().map(|r| 3.0 * r[0]).collect();

        let loose = RidgeModel::fit(
            &RidgeConfig {
                regularization: Some(0.0),
            },
            &rows,
            &targets,
        );
        let tight = RidgeModel::fit(
            &RidgeConfig {
                regularization: Some(10.0),
            },
            &rows,
            &targets,
        );
        assert!(tight.weights()[0].abs() < loose.weights()[0].abs());
    }

    #[test]
    fn test_constant_target_is_intercept() {
        let rows = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.5, 0.5]];
        let model = RidgeModel::fit(&RidgeConfig::default(), &rows, &[0.4, 0.4, 0.4]);
        assert!((model.predict(&[0.3, 0.9]) - 0.4).abs() < 1e-3);
    }

    #[test]
    fn test_negative_regularization_rejected() {
        let config = RidgeConfig {
            regularization: Some(-1.0),
        };
        assert!(config.validate().is_err());
    }
}
