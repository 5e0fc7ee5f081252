//! End-to-end behaviour of the strategies and the calculator on synthetic data.

use twin_core::evaluation::evaluate;
use twin_core::synthetic::{
    latent_class, threshold, LatentClassConfig, ThresholdConfig, THRESHOLD_PNS,
};
use twin_core::{
    CausalProbabilityCalculator, CausalQuantity, ClassifierKind, Dataset, KnnConfig, Sample,
    Strategy, StrategyConfig, Subpopulation, TwinError,
};

// ============================================================================
// Helpers
// ============================================================================

fn knn_config() -> StrategyConfig {
    StrategyConfig {
        base_classifier: ClassifierKind::Knn(KnnConfig::default()),
        ..StrategyConfig::default()
    }
}

fn threshold_dataset(n_samples: usize, seed: u64) -> Dataset {
    threshold(&ThresholdConfig {
        n_samples,
        n_treated: n_samples / 2,
        feature_dim: 2,
        seed,
    })
    .unwrap()
}

fn assert_unit_interval(value: f64, what: &str) {
    assert!((0.0..=1.0).contains(&value), "{what} = {value} outside [0, 1]");
}

// ============================================================================
// Error contract
// ============================================================================

#[test]
fn predict_before_fit_is_not_fitted() {
    let rows = vec![vec![0.1, 0.2]];
    for strategy in Strategy::ALL {
        let model = strategy.build(&StrategyConfig::default());
        let err = model.predict_potential_outcomes(&rows).unwrap_err();
        assert_eq!(
            err,
            TwinError::NotFitted {
                strategy: strategy.as_str()
            }
        );
    }
}

#[test]
fn baseline_requires_counterfactual_labels() {
    let samples = vec![
        Sample::factual(vec![0.0], 0, 0),
        Sample::factual(vec![1.0], 1, 1),
    ];
    let dataset = Dataset::new(samples).unwrap();
    let mut model = Strategy::Baseline.build(&StrategyConfig::default());

    assert_eq!(
        model.fit(&dataset),
        Err(TwinError::MissingCounterfactualLabels)
    );
    assert!(!model.is_fitted());
}

#[test]
fn meta_learners_reject_single_arm_data() {
    let treated_only = Dataset::new(vec![
        Sample::with_potential_outcomes(vec![0.0], 1, 0, 1),
        Sample::with_potential_outcomes(vec![1.0], 1, 1, 1),
    ])
    .unwrap();

    for strategy in [Strategy::TLearner, Strategy::XLearner, Strategy::SLearner] {
        let mut model = strategy.build(&StrategyConfig::default());
        assert_eq!(
            model.fit(&treated_only),
            Err(TwinError::InsufficientData {
                subpopulation: Subpopulation::Control
            }),
            "{strategy}"
        );
    }
}

#[test]
fn failed_fit_keeps_previous_state() {
    let good = threshold_dataset(200, 1);
    let bad = Dataset::new(vec![Sample::with_potential_outcomes(vec![0.0, 0.0], 0, 0, 0)]).unwrap();

    let mut model = Strategy::TLearner.build(&knn_config());
    model.fit(&good).unwrap();
    let before = model.predict_potential_outcomes(&good.covariates()).unwrap();

    assert!(model.fit(&bad).is_err());
    assert!(model.is_fitted());
    let after = model.predict_potential_outcomes(&good.covariates()).unwrap();
    assert_eq!(before, after);
}

#[test]
fn prediction_schema_mismatch() {
    let dataset = threshold_dataset(200, 3);
    for strategy in Strategy::ALL {
        let mut model = strategy.build(&StrategyConfig::default());
        model.fit(&dataset).unwrap();
        let err = model
            .predict_potential_outcomes(&[vec![0.1, 0.2, 0.3]])
            .unwrap_err();
        assert_eq!(
            err,
            TwinError::SchemaMismatch {
                expected: 2,
                got: 3
            }
        );
    }
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn prediction_is_deterministic() {
    let dataset = threshold_dataset(300, 9);
    let rows = dataset.covariates();
    for strategy in Strategy::ALL {
        let mut model = strategy.build(&StrategyConfig::default());
        model.fit(&dataset).unwrap();
        let first = model.predict_potential_outcomes(&rows).unwrap();
        let second = model.predict_potential_outcomes(&rows).unwrap();
        assert_eq!(first, second, "{strategy}");

        let mut refit = strategy.build(&StrategyConfig::default());
        refit.fit(&dataset).unwrap();
        assert_eq!(first, refit.predict_potential_outcomes(&rows).unwrap());
    }
}

// ============================================================================
// Accuracy against known counterfactuals
// ============================================================================

#[test]
fn baseline_agrees_with_held_out_counterfactuals() {
    let (train, test) = threshold_dataset(2_000, 42).split(0.8).unwrap();
    let mut model = Strategy::Baseline.build(&knn_config());

    let report = evaluate(model.as_mut(), &train, &test, 0.5).unwrap();
    let agreement = report.counterfactual_accuracy.unwrap();
    assert!(agreement >= 0.9, "counterfactual agreement {agreement}");
    assert!(report.factual_accuracy >= 0.9);
}

#[test]
fn baseline_recovers_latent_class_mechanism() {
    let dataset = latent_class(&LatentClassConfig {
        n_samples: 5_000,
        ..LatentClassConfig::default()
    })
    .unwrap();
    let (train, test) = dataset.split(0.8).unwrap();
    let mut model = Strategy::Baseline.build(&StrategyConfig::default());

    let report = evaluate(model.as_mut(), &train, &test, 0.5).unwrap();
    assert!(report.counterfactual_accuracy.unwrap() >= 0.9);
}

#[test]
fn large_covariates_keep_their_ordering() {
    // x spans (0, 200); the treated outcome switches on at x = 100
    let samples: Vec<Sample> = (0..200)
        .map(|i| {
            let x = i as f64 + 0.5;
            Sample::with_potential_outcomes(vec![x], (i % 2) as u8, 0, u8::from(x > 100.0))
        })
        .collect();
    let dataset = Dataset::new(samples).unwrap();
    let config = StrategyConfig {
        base_classifier: ClassifierKind::Knn(KnnConfig { k: Some(1) }),
        ..StrategyConfig::default()
    };
    let mut model = Strategy::Baseline.build(&config);

    let report = evaluate(model.as_mut(), &dataset, &dataset, 0.5).unwrap();
    assert_eq!(report.counterfactual_accuracy, Some(1.0));

    let estimates = model
        .predict_potential_outcomes(&[vec![60.2], vec![150.2]])
        .unwrap();
    assert_eq!(estimates[0].treated, 0.0);
    assert_eq!(estimates[1].treated, 1.0);
}

#[test]
fn logistic_baseline_handles_shifted_covariates() {
    // x in (35, 45); Y(1) = 1 above 40, Y(0) = 1 below 38
    let n = 400;
    let samples: Vec<Sample> = (0..n)
        .map(|i| {
            let x = 35.0 + 10.0 * (i as f64 + 0.5) / n as f64;
            let y0 = u8::from(x < 38.0);
            let y1 = u8::from(x > 40.0);
            Sample::with_potential_outcomes(vec![x], (i % 2) as u8, y0, y1)
        })
        .collect();
    let dataset = Dataset::new(samples).unwrap();
    let mut model = Strategy::Baseline.build(&StrategyConfig::default());

    let report = evaluate(model.as_mut(), &dataset, &dataset, 0.5).unwrap();
    let agreement = report.counterfactual_accuracy.unwrap();
    assert!(agreement >= 0.95, "counterfactual agreement {agreement}");
    assert!(report.factual_accuracy >= 0.95);
}

// ============================================================================
// End to end
// ============================================================================

#[test]
fn end_to_end_threshold_mechanism() {
    let dataset = threshold_dataset(1_000, 42);
    assert_eq!(dataset.treated_count(), 500);
    assert_eq!(dataset.control_count(), 500);

    let calculator = CausalProbabilityCalculator::default();
    let rows = dataset.covariates();

    for strategy in Strategy::ALL {
        let mut model = strategy.build(&StrategyConfig::default());
        model.fit(&dataset).unwrap();
        let estimates = model.predict_potential_outcomes(&rows).unwrap();
        assert_eq!(estimates.len(), dataset.len());

        let result = calculator.compute(&dataset, &estimates).unwrap();
        assert_unit_interval(result.pns, "PNS");
        for quantity in [result.pn, result.ps] {
            assert_unit_interval(quantity.value().unwrap(), "PN/PS");
        }
    }

    let mut baseline = Strategy::Baseline.build(&knn_config());
    baseline.fit(&dataset).unwrap();
    let estimates = baseline.predict_potential_outcomes(&rows).unwrap();
    let pns = calculator.compute(&dataset, &estimates).unwrap().pns;
    assert!(
        (pns - THRESHOLD_PNS).abs() <= 0.05,
        "baseline PNS {pns} vs analytic {THRESHOLD_PNS}"
    );
}

#[test]
fn pn_undefined_without_treated_successes() {
    // every treated unit sits where Y(1) = 0
    let mut samples = Vec::new();
    for i in 0..20 {
        let x = -0.05 * (i as f64 + 1.0);
        samples.push(Sample::with_potential_outcomes(vec![x, x], 1, 0, 0));
    }
    for i in 0..20 {
        let x = 0.05 * (i as f64 + 1.0);
        samples.push(Sample::with_potential_outcomes(vec![x, -x], 0, 0, 1));
    }
    let dataset = Dataset::new(samples).unwrap();

    let mut model = Strategy::TLearner.build(&knn_config());
    model.fit(&dataset).unwrap();
    let estimates = model.predict_potential_outcomes(&dataset.covariates()).unwrap();
    let result = CausalProbabilityCalculator::default()
        .compute(&dataset, &estimates)
        .unwrap();

    assert_eq!(result.pn, CausalQuantity::Undefined);
    assert_eq!(result.support.necessity, 0);
    assert!(result.ps.is_defined());
    assert_unit_interval(result.pns, "PNS");

    let truth = CausalProbabilityCalculator::ground_truth(&dataset).unwrap();
    assert_eq!(truth.pn, CausalQuantity::Undefined);
    assert_eq!(truth.ps, CausalQuantity::Defined(1.0));
}

#[test]
fn x_learner_variants_stay_in_range() {
    let dataset = threshold_dataset(600, 5);
    let rows = dataset.covariates();
    for weight in ["propensity", "0", "0.5", "1"] {
        for anchor in ["control", "treated"] {
            let config = StrategyConfig {
                combination_weight: weight.parse().unwrap(),
                anchor: anchor.parse().unwrap(),
                ..knn_config()
            };
            let mut model = Strategy::XLearner.build(&config);
            model.fit(&dataset).unwrap();
            for po in model.predict_potential_outcomes(&rows).unwrap() {
                assert_unit_interval(po.control, "p0");
                assert_unit_interval(po.treated, "p1");
            }
        }
    }
}
