//! RON scenario configuration for the headless runner.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geometry::TilePos;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioCharacter {
    pub name: String,
    pub def_key: String,
    pub tile: TilePos,
    pub group: u16,
    #[serde(default)]
    pub is_player: bool,
    #[serde(default = "default_life")]
    pub life: f32,
}

fn default_life() -> f32 {
    100.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_map_dim")]
    pub map_cols: i32,
    #[serde(default = "default_map_dim")]
    pub map_rows: i32,
    pub zone_file: String,
    #[serde(default)]
    pub characters: Vec<ScenarioCharacter>,
}

fn default_map_dim() -> i32 {
    32
}

impl ScenarioConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, crate::error::SimError> {
        let contents = std::fs::read_to_string(path)?;
        let config: ScenarioConfig =
            ron::from_str(&contents).map_err(|e| crate::error::SimError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), crate::error::SimError> {
        if self.map_cols <= 0 || self.map_rows <= 0 {
            return Err(crate::error::SimError::Config("map dimensions must be positive".to_string()));
        }
        if self.zone_file.is_empty() {
            return Err(crate::error::SimError::Config("zone_file must not be empty".to_string()));
        }
        Ok(())
    }
}
