use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::*;
use crate::error::{Result, Subpopulation, TwinError};
use crate::types::{Dataset, PotentialOutcome, Sample};

const LOWER_QUANTILE: f64 = 0.025;
const UPPER_QUANTILE: f64 = 0.975;

/// Probabilities of causation from per-unit potential-outcome estimates.
///
/// - PN: over treated units with outcome 1, the mean of P(Y0 = 0)
/// - PS: over control units with outcome 0, the mean of P(Y1 = 1)
/// - PNS: over all units, the mean of P(Y1 = 1, Y0 = 0)
///
/// An empty conditioning set makes PN or PS `Undefined`, not an error.
#[derive(Clone, Debug, Default)]
pub struct CausalProbabilityCalculator {
    scoring: Scoring,
}

/// Running sums and conditioning-set sizes for the three quantities.
#[derive(Clone, Copy, Debug, Default)]
struct Tally {
    pn_sum: f64,
    pn_count: usize,
    ps_sum: f64,
    ps_count: usize,
    pns_sum: f64,
    count: usize,
}

impl Tally {
    /// Adds one unit: factual treatment and outcome, scored (p0, p1).
    fn add(&mut self, treatment: u8, outcome: u8, p0: f64, p1: f64) {
        if treatment == 1 && outcome == 1 {
            self.pn_sum += 1.0 - p0;
            self.pn_count += 1;
        }
        if treatment == 0 && outcome == 0 {
            self.ps_sum += p1;
            self.ps_count += 1;
        }
        self.pns_sum += p1 * (1.0 - p0);
        self.count += 1;
    }

    fn pn(&self) -> CausalQuantity {
        ratio(self.pn_sum, self.pn_count)
    }

    fn ps(&self) -> CausalQuantity {
        ratio(self.ps_sum, self.ps_count)
    }

    fn pns(&self) -> Option<f64> {
        ratio(self.pns_sum, self.count).value()
    }

    fn support(&self) -> Support {
        Support {
            necessity: self.pn_count,
            sufficiency: self.ps_count,
            population: self.count,
        }
    }
}

fn ratio(sum: f64, count: usize) -> CausalQuantity {
    if count == 0 {
        CausalQuantity::Undefined
    } else {
        CausalQuantity::Defined((sum / count as f64).clamp(0.0, 1.0))
    }
}

impl CausalProbabilityCalculator {
    pub fn new(scoring: Scoring) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// PN / PS / PNS over the whole dataset.
    pub fn compute(
        &self,
        dataset: &Dataset,
        estimates: &[PotentialOutcome],
    ) -> Result<CausalProbabilities> {
        self.compute_where(dataset, estimates, |_| true)
    }

    /// PN / PS / PNS over the units matching `predicate`.
    pub fn compute_where<F>(
        &self,
        dataset: &Dataset,
        estimates: &[PotentialOutcome],
        predicate: F,
    ) -> Result<CausalProbabilities>
    where
        F: Fn(&Sample) -> bool,
    {
        self.validate()?;
        check_alignment(dataset, estimates)?;

        let mut tally = Tally::default();
        for (sample, estimate) in dataset.samples().iter().zip(estimates) {
            if predicate(sample) {
                let (p0, p1) = self.score(estimate);
                tally.add(sample.treatment, sample.outcome, p0, p1);
            }
        }

        let probabilities = finish(&tally)?;
        if !probabilities.pn.is_defined() {
            warn!("no treated units with outcome 1: PN undefined");
        }
        if !probabilities.ps.is_defined() {
            warn!("no control units with outcome 0: PS undefined");
        }
        Ok(probabilities)
    }

    /// The same quantities from the dataset's own counterfactual labels.
    pub fn ground_truth(dataset: &Dataset) -> Result<CausalProbabilities> {
        if !dataset.has_counterfactuals() {
            return Err(TwinError::MissingCounterfactualLabels);
        }

        let mut tally = Tally::default();
        for sample in dataset.samples() {
            if let Some((y0, y1)) = sample.potential_outcomes() {
                tally.add(sample.treatment, sample.outcome, f64::from(y0), f64::from(y1));
            }
        }
        finish(&tally)
    }

    /// Percentile bootstrap intervals, resampled in parallel.
    ///
    /// Resample `b` is seeded with `seed + b`, so results do not depend on thread scheduling.
    pub fn bootstrap(
        &self,
        dataset: &Dataset,
        estimates: &[PotentialOutcome],
        resamples: usize,
        seed: u64,
    ) -> Result<BootstrapSummary> {
        self.validate()?;
        check_alignment(dataset, estimates)?;
        if resamples == 0 {
            return Err(TwinError::InvalidConfig(
                "bootstrap needs at least one resample".to_string(),
            ));
        }

        let n = dataset.len();
        let tallies = (0..resamples)
            .into_par_iter()
            .map(|b| -> Result<Tally> {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(b as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let resample = dataset.subset(&indices)?;
                Ok(self.tally(&resample, indices.iter().map(|&i| &estimates[i])))
            })
            .collect::<Result<Vec<Tally>>>()?;

        let pn: Vec<f64> = tallies.iter().filter_map(|t| t.pn().value()).collect();
        let ps: Vec<f64> = tallies.iter().filter_map(|t| t.ps().value()).collect();
        let pns: Vec<f64> = tallies.iter().filter_map(Tally::pns).collect();
        debug!(
            resamples,
            pn_defined = pn.len(),
            ps_defined = ps.len(),
            "bootstrap finished"
        );

        Ok(BootstrapSummary {
            resamples,
            pn: interval(pn),
            ps: interval(ps),
            pns: interval(pns),
        })
    }

    fn tally<'a, I>(&self, dataset: &Dataset, estimates: I) -> Tally
    where
        I: IntoIterator<Item = &'a PotentialOutcome>,
    {
        let mut tally = Tally::default();
        for (sample, estimate) in dataset.samples().iter().zip(estimates) {
            let (p0, p1) = self.score(estimate);
            tally.add(sample.treatment, sample.outcome, p0, p1);
        }
        tally
    }

    fn validate(&self) -> Result<()> {
        match self.scoring {
            Scoring::Binary { threshold } if !(0.0..=1.0).contains(&threshold) => {
                Err(TwinError::InvalidConfig(format!(
                    "binary scoring threshold must lie in [0, 1], got {threshold}"
                )))
            }
            _ => Ok(()),
        }
    }

    /// (p0, p1) under the configured scoring mode.
    fn score(&self, estimate: &PotentialOutcome) -> (f64, f64) {
        match self.scoring {
            Scoring::Probability => (estimate.control, estimate.treated),
            Scoring::Binary { threshold } => {
                let hard = |p: f64| if p >= threshold { 1.0 } else { 0.0 };
                (hard(estimate.control), hard(estimate.treated))
            }
        }
    }
}

fn check_alignment(dataset: &Dataset, estimates: &[PotentialOutcome]) -> Result<()> {
    if estimates.len() != dataset.len() {
        return Err(TwinError::SchemaMismatch {
            expected: dataset.len(),
            got: estimates.len(),
        });
    }
    Ok(())
}

fn finish(tally: &Tally) -> Result<CausalProbabilities> {
    let pns = tally.pns().ok_or(TwinError::InsufficientData {
        subpopulation: Subpopulation::Requested,
    })?;
    Ok(CausalProbabilities {
        pn: tally.pn(),
        ps: tally.ps(),
        pns,
        support: tally.support(),
    })
}

/// 2.5 / 97.5 percentiles and standard error.
fn interval(mut values: Vec<f64>) -> Option<BootstrapInterval> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));

    let m = values.len();
    let at = |q: f64| values[((q * (m - 1) as f64).round() as usize).min(m - 1)];
    let mean = values.iter().sum::<f64>() / m as f64;
    // sample variance (n - 1)
    let variance = if m < 2 {
        0.0
    } else {
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (m - 1) as f64
    };

    Some(BootstrapInterval {
        lower: at(LOWER_QUANTILE),
        upper: at(UPPER_QUANTILE),
        standard_error: variance.sqrt(),
        resamples: m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(t: u8, y0: u8, y1: u8) -> Sample {
        Sample::with_potential_outcomes(vec![0.0], t, y0, y1)
    }

    fn dataset(samples: Vec<Sample>) -> Dataset {
        Dataset::new(samples).unwrap()
    }

    fn truth_as_estimates(dataset: &Dataset) -> Vec<PotentialOutcome> {
        dataset
            .samples()
            .iter()
            .filter_map(|s| s.potential_outcomes())
            .map(|(y0, y1)| PotentialOutcome::new(f64::from(y0), f64::from(y1)))
            .collect()
    }

    #[test]
    fn test_hand_computed_values() {
        // treated & Y=1: two units, one with Y0 = 0 -> PN = 0.5
        // control & Y=0: two units, one with Y1 = 1 -> PS = 0.5
        // PNS: units with (Y0, Y1) = (0, 1) -> 2 of 5
        let data = dataset(vec![
            unit(1, 0, 1),
            unit(1, 1, 1),
            unit(0, 0, 1),
            unit(0, 0, 0),
            unit(1, 0, 0),
        ]);
        let estimates = truth_as_estimates(&data);

        let result = CausalProbabilityCalculator::default()
            .compute(&data, &estimates)
            .unwrap();
        assert_eq!(result.pn, CausalQuantity::Defined(0.5));
        assert_eq!(result.ps, CausalQuantity::Defined(0.5));
        assert!((result.pns - 0.4).abs() < 1e-12);
        assert_eq!(
            result.support,
            Support {
                necessity: 2,
                sufficiency: 2,
                population: 5
            }
        );

        assert_eq!(CausalProbabilityCalculator::ground_truth(&data).unwrap(), result);
    }

    #[test]
    fn test_pn_undefined_without_treated_outcomes() {
        let data = dataset(vec![unit(1, 0, 0), unit(0, 0, 1), unit(0, 1, 1)]);
        let estimates = truth_as_estimates(&data);

        let result = CausalProbabilityCalculator::default()
            .compute(&data, &estimates)
            .unwrap();
        assert_eq!(result.pn, CausalQuantity::Undefined);
        assert_eq!(result.ps, CausalQuantity::Defined(1.0));
        assert_eq!(result.support.necessity, 0);
    }

    #[test]
    fn test_ps_undefined_without_untreated_failures() {
        let data = dataset(vec![unit(1, 0, 1), unit(0, 1, 1)]);
        let estimates = truth_as_estimates(&data);

        let result = CausalProbabilityCalculator::default()
            .compute(&data, &estimates)
            .unwrap();
        assert_eq!(result.ps, CausalQuantity::Undefined);
        assert!(result.pn.is_defined());
    }

    #[test]
    fn test_probability_scoring_uses_soft_terms() {
        let data = dataset(vec![Sample::factual(vec![0.0], 1, 1)]);
        let estimates = vec![PotentialOutcome::new(0.4, 0.8)];

        let result = CausalProbabilityCalculator::default()
            .compute(&data, &estimates)
            .unwrap();
        assert!((result.pn.value().unwrap() - 0.6).abs() < 1e-12);
        assert!((result.pns - 0.8 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_binary_scoring_thresholds() {
        let data = dataset(vec![Sample::factual(vec![0.0], 1, 1)]);
        let estimates = vec![PotentialOutcome::new(0.4, 0.8)];

        let calculator = CausalProbabilityCalculator::new(Scoring::Binary { threshold: 0.5 });
        let result = calculator.compute(&data, &estimates).unwrap();
        assert_eq!(result.pn, CausalQuantity::Defined(1.0));
        assert_eq!(result.pns, 1.0);
    }

    #[test]
    fn test_invalid_threshold() {
        let data = dataset(vec![Sample::factual(vec![0.0], 1, 1)]);
        let calculator = CausalProbabilityCalculator::new(Scoring::Binary { threshold: 1.5 });
        assert!(matches!(
            calculator.compute(&data, &[PotentialOutcome::new(0.0, 1.0)]),
            Err(TwinError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_misaligned_estimates() {
        let data = dataset(vec![unit(1, 0, 1), unit(0, 0, 1)]);
        let err = CausalProbabilityCalculator::default()
            .compute(&data, &[PotentialOutcome::new(0.0, 1.0)])
            .unwrap_err();
        assert_eq!(
            err,
            TwinError::SchemaMismatch {
                expected: 2,
                got: 1
            }
        );
    }

    #[test]
    fn test_compute_where_restricts_population() {
        let data = dataset(vec![
            Sample::with_potential_outcomes(vec![-1.0], 1, 0, 1),
            Sample::with_potential_outcomes(vec![1.0], 1, 1, 1),
        ]);
        let estimates = truth_as_estimates(&data);
        let calculator = CausalProbabilityCalculator::default();

        let left = calculator
            .compute_where(&data, &estimates, |s| s.covariates[0] < 0.0)
            .unwrap();
        assert_eq!(left.pn, CausalQuantity::Defined(1.0));
        assert_eq!(left.support.population, 1);

        let empty = calculator.compute_where(&data, &estimates, |_| false);
        assert_eq!(
            empty,
            Err(TwinError::InsufficientData {
                subpopulation: Subpopulation::Requested
            })
        );
    }

    #[test]
    fn test_ground_truth_requires_labels() {
        let data = dataset(vec![Sample::factual(vec![0.0], 1, 1)]);
        assert_eq!(
            CausalProbabilityCalculator::ground_truth(&data),
            Err(TwinError::MissingCounterfactualLabels)
        );
    }

    #[test]
    fn test_bootstrap_interval_brackets_estimate() {
        let samples: Vec<Sample> = (0..200)
            .map(|i| unit((i % 2) as u8, (i % 3 == 0) as u8, (i % 5 != 0) as u8))
            .collect();
        let data = dataset(samples);
        let estimates = truth_as_estimates(&data);
        let calculator = CausalProbabilityCalculator::default();

        let point = calculator.compute(&data, &estimates).unwrap();
        let summary = calculator.bootstrap(&data, &estimates, 200, 42).unwrap();
        let pns = summary.pns.unwrap();
        assert!(pns.lower <= point.pns && point.pns <= pns.upper);
        assert!(pns.standard_error > 0.0);
        assert_eq!(pns.resamples, 200);

        // same seed, same answer regardless of thread scheduling
        let again = calculator.bootstrap(&data, &estimates, 200, 42).unwrap();
        assert_eq!(summary, again);
    }

    #[test]
    fn test_bootstrap_skips_undefined_resamples() {
        let data = dataset(vec![unit(1, 0, 0), unit(0, 0, 1)]);
        let estimates = truth_as_estimates(&data);
        let summary = CausalProbabilityCalculator::default()
            .bootstrap(&data, &estimates, 50, 1)
            .unwrap();
        assert!(summary.pn.is_none());
        assert!(summary.ps.is_some());
        assert!(CausalProbabilityCalculator::default()
            .bootstrap(&data, &estimates, 0, 1)
            .is_err());
    }

    #[test]
    fn test_interval_single_value() {
        let iv = interval(vec![0.3]).unwrap();
        assert_eq!(iv.lower, 0.3);
        assert_eq!(iv.upper, 0.3);
        assert_eq!(iv.standard_error, 0.0);
    }
}
