//! Scenario execution: build a `WorldContext` from a `ScenarioConfig` and
//! drive it for a fixed tick count, suitable for automated testing.

use bevy::log::info;

use crate::assets::InMemoryAssetRegistry;
use crate::character::{CharKind, Character, CharacterState, CombatStats, StatusEffects};
use crate::context::WorldContext;
use crate::geometry::Direction8;
use crate::npc_ai::NpcData;
use crate::script::NullScriptRunner;
use crate::sprite::SpriteState;
use crate::terrain::MapBase;

use super::config::ScenarioConfig;

/// Final per-character state after a scenario run, for assertions.
#[derive(Debug, Clone)]
pub struct CharacterReport {
    pub name: String,
    pub life: f32,
    pub is_death: bool,
    pub tile: crate::geometry::TilePos,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub ticks_run: u32,
    pub characters: Vec<CharacterReport>,
}

/// Run `config` for `ticks` simulation ticks against an empty in-memory
/// asset registry and a no-op script runner (real asset/script content is
/// supplied by the embedder; this entry point is for smoke-testing core
/// behavior without one).
pub fn run_scenario(config: &ScenarioConfig, ticks: u32) -> ScenarioReport {
    let seed = config.seed;
    let map = MapBase::new(config.map_cols, config.map_rows);
    let registry = Box::new(InMemoryAssetRegistry::default());
    let runner = Box::new(NullScriptRunner);

    let mut ctx = WorldContext::new(seed, map, registry, runner, config.zone_file.clone());

    info!("starting scenario in zone {} for {} ticks", config.zone_file, ticks);

    let mut entities = Vec::new();
    for sc in &config.characters {
        let kind = if sc.is_player { CharKind::Player } else { CharKind::Npc(NpcData::default()) };
        let character = Character {
            name: sc.name.clone(),
            def_key: sc.def_key.clone(),
            kind,
            character_kind: crate::assets::CharacterKind::Normal,
            relation: crate::assets::Relation::None,
            group: sc.group,
            sprite: SpriteState::new(sc.tile, Direction8::S),
            state: CharacterState::Stand,
            life: sc.life,
            life_max: sc.life,
            mana: 0.0,
            mana_max: 0.0,
            thew: 0.0,
            thew_max: 0.0,
            combat: CombatStats::default(),
            walk_speed: 1.0,
            level: 1,
            exp: 0,
            status: StatusEffects::default(),
            cached_path: Vec::new(),
            follow_target: None,
            pending_attack_dest: None,
            script_file: None,
            is_death: false,
            is_death_invoked: false,
            is_in_loop_walk: false,
            is_visible: true,
            invincible_seconds: 0.0,
            death_timer_ms: 0.0,
            revive_ms: 0.0,
        };
        entities.push((sc.name.clone(), ctx.spawn_character(character)));
    }

    ctx.run_ticks(ticks);

    let characters = entities
        .iter()
        .filter_map(|(name, e)| {
            ctx.world().get::<Character>(*e).map(|c| CharacterReport {
                name: name.clone(),
                life: c.life,
                is_death: c.is_death,
                tile: c.sprite.tile_pos,
            })
        })
        .collect();

    ScenarioReport { ticks_run: ticks, characters }
}
