//! Dense row-major linear algebra for the ridge and logistic learners.

use crate::types::{EPSILON, MIN_LAMBDA};

/// `numerator / pivot`, or 0 when the pivot is numerically zero.
fn divide_by_pivot(numerator: f64, pivot: f64) -> f64 {
    if pivot.abs() > EPSILON {
        numerator / pivot
    } else {
        0.0
    }
}

/// Cholesky factor L of a symmetric positive-definite `d x d` matrix, A = L L^T.
///
/// A non-positive pivot (rank-deficient design) is replaced by `sqrt(lambda)`,
/// so the result is always usable by [`solve_cholesky`].
pub fn cholesky_decompose(a: &[f64], d: usize, lambda: f64) -> Vec<f64> {
    let fallback_pivot = lambda.max(MIN_LAMBDA).sqrt();
    let mut l = vec![0.0; d * d];

    for i in 0..d {
        for j in 0..=i {
            let partial: f64 = (0..j).map(|k| l[i * d + k] * l[j * d + k]).sum();
            let residual = a[i * d + j] - partial;
            l[i * d + j] = if i == j {
                if residual > 0.0 {
                    residual.sqrt()
                } else {
                    fallback_pivot
                }
            } else {
                divide_by_pivot(residual, l[j * d + j])
            };
        }
    }
    l
}

/// Solve A x = b from the Cholesky factor of A: L y = b, then L^T x = y.
pub fn solve_cholesky(l: &[f64], b: &[f64], d: usize) -> Vec<f64> {
    let mut y = vec![0.0; d];
    for i in 0..d {
        let partial: f64 = (0..i).map(|j| l[i * d + j] * y[j]).sum();
        y[i] = divide_by_pivot(b[i] - partial, l[i * d + i]);
    }

    let mut x = vec![0.0; d];
    for i in (0..d).rev() {
        // L^T[i][j] = L[j][i]
        let partial: f64 = ((i + 1)..d).map(|j| l[j * d + i] * x[j]).sum();
        x[i] = divide_by_pivot(y[i] - partial, l[i * d + i]);
    }
    x
}

pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// A += w * x x^T
pub fn rank1_update_matrix(a: &mut [f64], x: &[f64], d: usize, w: f64) {
    for (i, row) in a.chunks_exact_mut(d).enumerate().take(d) {
        let scale = w * x[i];
        for (aij, xj) in row.iter_mut().zip(x) {
            *aij += scale * xj;
        }
    }
}

/// a += scale * b
pub fn vec_add_scaled(a: &mut [f64], b: &[f64], scale: f64) {
    for (ai, bi) in a.iter_mut().zip(b) {
        *ai += scale * bi;
    }
}

/// Covariates with the intercept column appended.
pub fn add_bias(features: &[f64]) -> Vec<f64> {
    let mut result = Vec::with_capacity(features.len() + 1);
    result.extend_from_slice(features);
    result.push(1.0);
    result
}

pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}
