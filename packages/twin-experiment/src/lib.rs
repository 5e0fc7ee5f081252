//! Experiment driver: synthetic data in, one JSON evaluation report out.

pub mod config;
pub mod logging;
pub mod report;
pub mod runner;

pub use config::{Args, ExperimentConfig};
pub use report::ExperimentReport;
pub use runner::run;
