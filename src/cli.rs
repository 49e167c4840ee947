//! Command-line interface for the headless scenario runner.

use std::path::PathBuf;

use clap::Parser;

/// Run an isometric action-RPG simulation scenario headlessly.
#[derive(Parser, Debug)]
#[command(name = "jianghu-sim")]
#[command(about = "Headless isometric action-RPG simulation core")]
#[command(version)]
pub struct Args {
    /// Scenario file to run (RON format; see `ScenarioConfig`).
    #[arg(value_name = "SCENARIO_FILE")]
    pub scenario: PathBuf,

    /// Deterministic PRNG seed, overriding the one in the scenario file.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of ticks to run before reporting final state.
    #[arg(long, default_value = "600")]
    pub ticks: u32,
}

pub fn parse_args() -> Args {
    Args::parse()
}
