use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TwinError};
use crate::matrix::squared_distance;

const DEFAULT_K: usize = 15;

/// k-nearest-neighbours settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnnConfig {
    /// Neighbour count; capped at the training-set size
    pub k: Option<usize>,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self { k: Some(DEFAULT_K) }
    }
}

impl KnnConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.k == Some(0) {
            return Err(TwinError::InvalidConfig("knn k must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Memorized training set. As a classifier the mean of 0/1 labels is the
/// vote fraction; as a regressor it is the neighbourhood average.
#[derive(Debug, Clone)]
pub struct KnnModel {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    k: usize,
}

impl KnnModel {
    pub(crate) fn fit(config: &KnnConfig, rows: Vec<Vec<f64>>, targets: &[f64]) -> Self {
        let k = config.k.unwrap_or(DEFAULT_K).min(rows.len()).max(1);
        Self {
            rows,
            targets: targets.to_vec(),
            k,
        }
    }

    /// Mean target of the k closest rows; distance ties go to the earlier row.
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut distances: Vec<(f64, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, r)| (squared_distance(r, row), i))
            .collect();

        let by_distance = |a: &(f64, usize), b: &(f64, usize)| -> Ordering {
            a.0.total_cmp(&b.0).then(a.1.cmp(&b.1))
        };
        if self.k < distances.len() {
            distances.select_nth_unstable_by(self.k - 1, by_distance);
        }

        let sum: f64 = distances[..self.k]
            .iter()
            .map(|&(_, i)| self.targets[i])
            .sum();
        sum / self.k as f64
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line() -> (Vec<Vec<f64>>, Vec<f64>) {
        let rows: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let targets = (0..10).map(|i| if i < 5 { 0.0 } else { 1.0 }).collect();
        (rows, targets)
    }

    #[test]
    fn test_single_neighbour() {
        let (rows, targets) = line();
        let model = KnnModel::fit(&KnnConfig { k: Some(1) }, rows, &targets);
        assert_eq!(model.predict(&[1.2]), 0.0);
        assert_eq!(model.predict(&[8.7]), 1.0);
    }

    #[test]
    fn test_vote_fraction() {
        let (rows, targets) = line();
        let model = KnnModel::fit(&KnnConfig { k: Some(4) }, rows, &targets);
        // neighbours of 4.5: 4, 5, 3, 6 -> two of four positive
        assert!((model.predict(&[4.5]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_k_capped_at_training_size() {
        let (rows, targets) = line();
        let model = KnnModel::fit(&KnnConfig { k: Some(100) }, rows, &targets);
        assert_eq!(model.k(), 10);
        assert!((model.predict(&[0.0]) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tie_breaking_is_deterministic() {
        let rows = vec![vec![-1.0], vec![1.0]];
        let model = KnnModel::fit(&KnnConfig { k: Some(1) }, rows, &[0.0, 1.0]);
        assert_eq!(model.predict(&[0.0]), 0.0);
        assert_eq!(model.predict(&[0.0]), model.predict(&[0.0]));
    }
}
