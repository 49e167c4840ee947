//! jianghu-sim - headless scenario runner entry point

use bevy::log::{error, info};

use jianghu_sim::cli;
use jianghu_sim::headless::config::ScenarioConfig;
use jianghu_sim::headless::runner::run_scenario;

fn main() {
    let args = cli::parse_args();

    let config = match ScenarioConfig::load_from_file(&args.scenario) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load scenario {}: {}", args.scenario.display(), e);
            std::process::exit(1);
        }
    };

    let seed = args.seed.or(config.seed);
    let config = ScenarioConfig { seed, ..config };

    let report = run_scenario(&config, args.ticks);

    info!("ran {} ticks in zone {}", report.ticks_run, config.zone_file);
    for c in &report.characters {
        info!("{}: life={} death={} tile=({}, {})", c.name, c.life, c.is_death, c.tile.x, c.tile.y);
    }
}
