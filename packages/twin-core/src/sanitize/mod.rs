use crate::error::{Result, TwinError};

/// Whether the slice contains NaN or infinite values
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|x| !x.is_finite())
}

/// Non-finite entries become 0; finite values pass through at any magnitude.
pub fn sanitize_feature_vector(x: &mut [f64]) {
    for val in x.iter_mut().filter(|v| !v.is_finite()) {
        *val = 0.0;
    }
}

/// Sanitized copy of a covariate matrix.
pub fn sanitize_rows(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            sanitize_feature_vector(&mut row);
            row
        })
        .collect()
}

/// Every row must have exactly `expected` columns.
pub fn check_schema(rows: &[Vec<f64>], expected: usize) -> Result<()> {
    match rows.iter().find(|row| row.len() != expected) {
        Some(row) => Err(TwinError::SchemaMismatch {
            expected,
            got: row.len(),
        }),
        None => Ok(()),
    }
}

/// Clamp a learner output into [0, 1]; NaN maps to 0.5.
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.5
    } else {
        p.clamp(0.0, 1.0)
    }
}
