//! Fit on a training split, score on a held-out split.

use serde::Serialize;
use tracing::{debug, info};

use crate::causal::{CausalProbabilities, CausalProbabilityCalculator};
use crate::error::{Result, TwinError};
use crate::strategy::TwinModel;
use crate::types::{Dataset, PotentialOutcome};

/// Held-out evaluation of one strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub strategy: &'static str,
    /// Thresholded prediction for the realized arm vs the factual outcome
    pub factual_accuracy: f64,
    /// Thresholded prediction for the other arm vs its counterfactual label;
    /// absent when the test split carries no counterfactual labels
    pub counterfactual_accuracy: Option<f64>,
    /// Causal probabilities from the model's estimates on the test split
    pub estimated: CausalProbabilities,
    /// Causal probabilities from the test split's own labels
    pub ground_truth: Option<CausalProbabilities>,
    pub threshold: f64,
    pub train_size: usize,
    pub test_size: usize,
}

/// Train `model` on `train` and evaluate it on `test`.
///
/// `threshold` turns probabilities into hard labels for the accuracy figures;
/// the causal probabilities use the calculator's default soft scoring.
pub fn evaluate(
    model: &mut dyn TwinModel,
    train: &Dataset,
    test: &Dataset,
    threshold: f64,
) -> Result<EvaluationReport> {
    evaluate_with(model, train, test, threshold, &CausalProbabilityCalculator::default())
}

/// [`evaluate`] with an explicit calculator (scoring mode).
pub fn evaluate_with(
    model: &mut dyn TwinModel,
    train: &Dataset,
    test: &Dataset,
    threshold: f64,
    calculator: &CausalProbabilityCalculator,
) -> Result<EvaluationReport> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(TwinError::InvalidConfig(format!(
            "decision threshold must lie in [0, 1], got {threshold}"
        )));
    }

    model.fit(train)?;
    let estimates = model.predict_potential_outcomes(&test.covariates())?;
    debug!(strategy = model.name(), rows = estimates.len(), "test split predicted");

    let factual_accuracy = factual_accuracy(test, &estimates, threshold);
    let counterfactual_accuracy = counterfactual_accuracy(test, &estimates, threshold);
    let estimated = calculator.compute(test, &estimates)?;
    let ground_truth = if test.has_counterfactuals() {
        Some(CausalProbabilityCalculator::ground_truth(test)?)
    } else {
        None
    };

    info!(
        strategy = model.name(),
        factual_accuracy,
        counterfactual_accuracy = ?counterfactual_accuracy,
        pns = estimated.pns,
        "evaluation finished"
    );

    Ok(EvaluationReport {
        strategy: model.name(),
        factual_accuracy,
        counterfactual_accuracy,
        estimated,
        ground_truth,
        threshold,
        train_size: train.len(),
        test_size: test.len(),
    })
}

fn hard_label(p: f64, threshold: f64) -> u8 {
    u8::from(p >= threshold)
}

/// Share of units whose realized-arm prediction matches the factual outcome.
pub fn factual_accuracy(dataset: &Dataset, estimates: &[PotentialOutcome], threshold: f64) -> f64 {
    let hits = dataset
        .samples()
        .iter()
        .zip(estimates)
        .filter(|(s, e)| hard_label(e.arm(s.treatment), threshold) == s.outcome)
        .count();
    hits as f64 / dataset.len() as f64
}

/// Share of units whose other-arm prediction matches the counterfactual
/// label, over the units that carry one. `None` when no unit does.
pub fn counterfactual_accuracy(
    dataset: &Dataset,
    estimates: &[PotentialOutcome],
    threshold: f64,
) -> Option<f64> {
    let (hits, labelled) = dataset
        .samples()
        .iter()
        .zip(estimates)
        .filter_map(|(s, e)| {
            s.counterfactual_outcome()
                .map(|label| hard_label(e.arm(1 - s.treatment), threshold) == label)
        })
        .fold((0usize, 0usize), |(hits, n), hit| (hits + usize::from(hit), n + 1));
    (labelled > 0).then(|| hits as f64 / labelled as f64)
}
