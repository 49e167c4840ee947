//! Headless scenario runner
//!
//! Runs a simulation scenario with no graphical output: construct a
//! `WorldContext` from a RON scenario file, drive it for a fixed number
//! of ticks, and report final character/object state. Used by the
//! `jianghu-sim` binary and by the scenario integration tests.
//!
//! ## Scenario file (RON)
//!
//! ```text
//! (
//!     seed: Some(42),
//!     map_cols: 32,
//!     map_rows: 32,
//!     zone_file: "test_zone.map",
//!     characters: [
//!         (name: "hero", def_key: "hero_def", tile: (x: 5, y: 5), group: 0, is_player: true),
//!     ],
//! )
//! ```

pub mod config;
pub mod runner;

pub use config::ScenarioConfig;
pub use runner::{run_scenario, ScenarioReport};
