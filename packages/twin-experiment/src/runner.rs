use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use twin_core::evaluation::evaluate_with;
use twin_core::synthetic::{latent_class, threshold};
use twin_core::{CausalProbabilityCalculator, Dataset, Strategy};

use crate::config::{DatasetConfig, ExperimentConfig};
use crate::report::{DatasetSummary, ExperimentReport, SkippedStrategy, StrategyReport};

pub fn generate(config: &DatasetConfig) -> Result<Dataset> {
    let dataset = match config {
        DatasetConfig::Latent(latent) => {
            latent_class(latent).context("failed to generate latent-class dataset")?
        }
        DatasetConfig::Threshold(mechanism) => {
            threshold(mechanism).context("failed to generate threshold dataset")?
        }
    };
    Ok(dataset)
}

/// Generate, split, then evaluate every requested strategy in parallel.
pub fn run(config: &ExperimentConfig) -> Result<ExperimentReport> {
    config
        .strategy_config
        .validate()
        .context("invalid learner configuration")?;

    let dataset = generate(&config.dataset)?;
    let (train, test) = dataset
        .split(config.split)
        .with_context(|| format!("cannot split {} samples at {}", dataset.len(), config.split))?;
    info!(
        n = dataset.len(),
        train = train.len(),
        test = test.len(),
        treated = dataset.treated_count(),
        "dataset ready"
    );

    let (runnable, skipped) = partition_strategies(&config.strategies, &train);
    let calculator = CausalProbabilityCalculator::new(config.scoring);

    let strategies = runnable
        .par_iter()
        .map(|&strategy| run_strategy(strategy, config, &calculator, &train, &test))
        .collect::<Result<Vec<_>>>()?;

    Ok(ExperimentReport {
        dataset: DatasetSummary::new(config, &dataset, &train, &test),
        learners: config.strategy_config.clone(),
        scoring: calculator.scoring(),
        strategies,
        skipped,
    })
}

/// Baseline needs counterfactual labels; it is skipped, not failed, without them.
fn partition_strategies(
    requested: &[Strategy],
    train: &Dataset,
) -> (Vec<Strategy>, Vec<SkippedStrategy>) {
    let mut runnable = Vec::with_capacity(requested.len());
    let mut skipped = Vec::new();
    for &strategy in requested {
        if strategy.requires_counterfactuals() && !train.has_counterfactuals() {
            warn!(%strategy, "skipping: training data has no counterfactual labels");
            skipped.push(SkippedStrategy {
                strategy: strategy.as_str(),
                reason: "training data has no counterfactual labels".to_string(),
            });
        } else {
            runnable.push(strategy);
        }
    }
    (runnable, skipped)
}

fn run_strategy(
    strategy: Strategy,
    config: &ExperimentConfig,
    calculator: &CausalProbabilityCalculator,
    train: &Dataset,
    test: &Dataset,
) -> Result<StrategyReport> {
    let mut model = strategy.build(&config.strategy_config);
    let evaluation = evaluate_with(model.as_mut(), train, test, config.threshold, calculator)
        .with_context(|| format!("{strategy} failed"))?;

    let bootstrap = if config.bootstrap > 0 {
        let estimates = model
            .predict_potential_outcomes(&test.covariates())
            .with_context(|| format!("{strategy} failed to predict the test split"))?;
        let summary = calculator
            .bootstrap(test, &estimates, config.bootstrap, config.seed)
            .with_context(|| format!("{strategy} bootstrap failed"))?;
        Some(summary)
    } else {
        None
    };

    Ok(StrategyReport {
        evaluation,
        bootstrap,
    })
}
