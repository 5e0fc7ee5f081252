use anyhow::Context;
use clap::Parser;

use twin_experiment::logging::init_tracing;
use twin_experiment::{run, Args};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();
    let _file_log_guard = init_tracing(&args.log_level);

    let config = args.into_config();
    tracing::info!(
        dataset = ?config.dataset.kind(),
        strategies = config.strategies.len(),
        seed = config.seed,
        "twin-experiment starting"
    );

    let report = run(&config)?;
    let json = report.to_json().context("failed to serialize report")?;
    println!("{json}");
    Ok(())
}
