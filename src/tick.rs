//! SimPlugin: per-tick system ordering (spec §4.10)
//!
//! Order each tick: NPC AI decisions -> object update -> magic update ->
//! command buffer drain -> script queue drain -> view cache rebuild. Every
//! stage reads a stable snapshot of the previous stage's output through
//! `CommandBuffer`, never mutating entities outside its own pass.

use bevy::prelude::*;

use crate::character::{CharKind, Character};
use crate::collision::apply_damage;
use crate::commands::{CommandBuffer, SimCommand};
use crate::context::{AssetRegistryHandle, CurrentZone, MapResource, ScriptRunnerHandle};
use crate::geometry::{neighbors, view_tile_distance, TilePos};
use crate::magic::engine as magic_engine;
use crate::magic::MagicSprite;
use crate::npc_ai::{self, AiDecision, SelfView};
use crate::npc_manager::NpcManager;
use crate::object::{self, Obj, ObjManager};
use crate::script::ScriptQueue;

/// Normalize any frame delta to the simulation's fixed 60 FPS tick (spec
/// §4.10: "dt is always normalized to a 1/60s tick regardless of host
/// frame rate").
pub const TICK_MS: f32 = 1000.0 / 60.0;

/// Fallbacks used when an NPC's `CharacterDef` can't be found (the core
/// never panics on a missing asset, spec §7).
const DEFAULT_ATTACK_RADIUS: i32 = 1;
const DEFAULT_VISION_RADIUS: i32 = 10;

pub struct SimPlugin;

impl Plugin for SimPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                run_npc_ai,
                update_objects_system,
                update_magic_system,
                drain_commands,
                drain_scripts,
                rebuild_view_cache,
            )
                .chain(),
        );
    }
}

struct VisibleCombatant {
    entity: Entity,
    tile: TilePos,
    is_fighter: bool,
}

fn is_fighter(c: &Character) -> bool {
    matches!(c.kind, CharKind::Player) || c.relation == crate::assets::Relation::Friend
}

/// Evaluate each live NPC's AI decision against a snapshot of the world
/// taken before any AI pushes a command, so one NPC's move this tick never
/// affects another's decision within the same tick (spec §8 determinism
/// invariant).
fn run_npc_ai(
    characters: Query<(Entity, &Character)>,
    npc_manager: Res<NpcManager>,
    map: Res<MapResource>,
    registry: Res<AssetRegistryHandle>,
    mut commands: ResMut<CommandBuffer>,
) {
    if !npc_manager.ai_globally_enabled {
        return;
    }

    let snapshot: Vec<VisibleCombatant> = characters
        .iter()
        .filter(|(_, c)| c.is_alive() && c.is_visible)
        .map(|(e, c)| VisibleCombatant { entity: e, tile: c.sprite.tile_pos, is_fighter: is_fighter(c) })
        .collect();

    for (entity, character) in characters.iter() {
        if character.is_death || !character.is_visible {
            continue;
        }
        let CharKind::Npc(npc_data) = &character.kind else { continue };
        if !npc_data.ai_enabled {
            continue;
        }

        let self_is_fighter = is_fighter(character);
        let enemy = snapshot
            .iter()
            .filter(|v| v.entity != entity && v.is_fighter != self_is_fighter && !map.0.is_obstacle(v.tile))
            .min_by_key(|v| view_tile_distance(character.sprite.tile_pos, v.tile))
            .map(|v| (v.entity, v.tile));

        let def = registry.0.character_def(&character.def_key);
        if def.is_none() {
            bevy::log::warn!("missing character def '{}', falling back to default AI ranges", character.def_key);
        }
        let view = SelfView {
            tile: character.sprite.tile_pos,
            life: character.life,
            life_max: character.life_max,
            life_low_percent: def.map(|d| d.life_low_percent).unwrap_or(20.0),
            attack_radius: def.map(|d| d.attack_radius).unwrap_or(DEFAULT_ATTACK_RADIUS),
            vision_radius: def.map(|d| d.vision_radius).unwrap_or(DEFAULT_VISION_RADIUS),
            keep_radius_when_life_low: def.map(|d| d.keep_radius_when_life_low).unwrap_or(3),
            keep_radius_when_friend_death: def.map(|d| d.keep_radius_when_friend_death).unwrap_or(3),
        };

        let friend_death = npc_manager.nearest_friend_death(
            character.sprite.tile_pos,
            character.group,
            view.keep_radius_when_friend_death,
        );
        let keep_distance = npc_data.ai_type.contains(npc_ai::AiType::KEEP_DISTANCE_ON_FRIEND_DEATH);

        let magic_to_use_when_life_low = def.and_then(|d| d.magic_to_use_when_life_low.as_deref());
        let decision = npc_ai::decide(view, npc_data, magic_to_use_when_life_low, enemy, friend_death, keep_distance);

        match decision {
            AiDecision::Attack { target } => {
                commands.push(SimCommand::Damage {
                    target,
                    amount: character.combat.total_attack(),
                    attacker: Some(entity),
                });
            }
            AiDecision::Chase { target_tile, .. } => {
                let style = crate::character::choose_path_finder_style(
                    character.character_kind,
                    def.map(|d| d.path_finder).unwrap_or(0),
                    npc_data.is_partner,
                    npc_data.is_loop_walk,
                    true,
                );
                commands.push(SimCommand::Reposition {
                    entity,
                    tile: step_toward(character.sprite.tile_pos, target_tile, &map.0, style),
                });
            }
            AiDecision::CastLifeLowMagic { magic, .. } => {
                commands.push(SimCommand::SpawnMagic {
                    caster: entity,
                    magic_key: magic,
                    level: 1,
                    origin: character.sprite.tile_pos,
                    destination: character.sprite.tile_pos,
                });
            }
            AiDecision::RetreatFromFriendDeath { away_from } => {
                commands.push(SimCommand::Reposition {
                    entity,
                    tile: step_away(character.sprite.tile_pos, away_from, &map.0),
                });
            }
            AiDecision::PatrolFixedPath { next } => {
                commands.push(SimCommand::Reposition { entity, tile: next });
            }
            AiDecision::RandomWalk | AiDecision::Idle => {}
        }
    }
}

/// Greedy single-step move toward `to` (spec §4.3 `PathOneStep`/
/// `PerfectMaxNpcTry`/`PerfectMaxPlayerTry`: this crate doesn't implement
/// full A* search, just the one shared per-tick step every style reduces
/// to absent a cached route). `PathStraightLine` (Flyer) ignores terrain;
/// every other style refuses to step onto an obstacle tile.
fn step_toward(from: TilePos, to: TilePos, map: &crate::terrain::MapBase, style: crate::character::PathFinderStyle) -> TilePos {
    let ignore_terrain = style == crate::character::PathFinderStyle::PathStraightLine;
    neighbors(from)
        .into_iter()
        .filter(|n| ignore_terrain || !map.is_character_obstacle(*n))
        .min_by_key(|n| view_tile_distance(*n, to))
        .unwrap_or(from)
}

fn step_away(from: TilePos, away_from: TilePos, map: &crate::terrain::MapBase) -> TilePos {
    neighbors(from)
        .into_iter()
        .filter(|n| !map.is_character_obstacle(*n))
        .max_by_key(|n| view_tile_distance(*n, away_from))
        .unwrap_or(from)
}

fn update_objects_system(
    objs: Query<(Entity, &mut Obj)>,
    characters: Query<(Entity, &Character)>,
    current_zone: Res<CurrentZone>,
    mut obj_manager: ResMut<ObjManager>,
    mut commands: ResMut<CommandBuffer>,
    registry: Res<AssetRegistryHandle>,
    mut rng: ResMut<crate::rng::GameRng>,
) {
    let dt_ms = TICK_MS;
    let fighters_at = |tile: TilePos| -> Vec<Entity> {
        characters.iter().filter(|(_, c)| c.is_alive() && c.sprite.tile_pos == tile).map(|(e, _)| e).collect()
    };
    object::update_objects(dt_ms, objs, &current_zone.0, &mut obj_manager, fighters_at, &mut commands, registry.0.as_ref(), &mut rng);
}

fn update_magic_system(
    sprites: Query<(Entity, &mut MagicSprite)>,
    registry: Res<AssetRegistryHandle>,
    map: Res<MapResource>,
    characters: Query<(Entity, &Character)>,
    mut commands: ResMut<CommandBuffer>,
) {
    let dt_ms = TICK_MS;
    let hits_at = |_source: Entity, tile: TilePos| -> Vec<Entity> {
        characters.iter().filter(|(_, c)| c.is_alive() && c.sprite.tile_pos == tile).map(|(e, _)| e).collect()
    };
    let wait_frame_by_key = |key: &str| -> u32 { registry.0.magic_def(key).map(|d| d.wait_frame).unwrap_or(1) };
    magic_engine::update_magic(dt_ms, sprites, registry.0.as_ref(), &map.0, wait_frame_by_key, hits_at, &mut commands);
}

/// Apply every buffered `SimCommand` from this tick's AI/object/magic
/// passes, in insertion order (spec §9 "Deep callbacks during iteration").
/// `SpawnMagic` commands are left in the buffer for `WorldContext::tick`'s
/// caller to resolve, since spawning a new entity needs `&mut World`
/// rather than the narrower queries this system holds.
fn drain_commands(
    mut commands: ResMut<CommandBuffer>,
    mut characters: Query<&mut Character>,
    registry: Res<AssetRegistryHandle>,
    mut npc_manager: ResMut<NpcManager>,
    mut script_queue: ResMut<ScriptQueue>,
) {
    let mut deferred = CommandBuffer::default();
    for command in commands.drain() {
        match command {
            SimCommand::Damage { target, amount, attacker } => {
                let attacker_tile = attacker.and_then(|a| characters.get(a).ok()).map(|c| c.sprite.tile_pos);
                if let Ok(mut c) = characters.get_mut(target) {
                    apply_damage(&mut c, amount, attacker_tile, registry.0.as_ref(), target, &mut deferred);
                    if c.is_death {
                        npc_manager.record_death(c.sprite.tile_pos, c.group, &c.name, 10_000.0, &mut deferred);
                    }
                }
            }
            SimCommand::Reposition { entity, tile } => {
                if let Ok(mut c) = characters.get_mut(entity) {
                    c.sprite.set_tile(tile);
                }
            }
            SimCommand::QueueScript { path, subject } => {
                script_queue.enqueue(path, subject);
            }
            SimCommand::AddBody { .. } => {
                // Spawning the body `Obj` is the embedder's job, since it
                // owns the drop-table definitions; the core only records
                // that one is due (already pushed by `record_death`).
                deferred.push(command);
            }
            SimCommand::SpawnMagic { .. } => {
                deferred.push(command);
            }
            SimCommand::PlaySound { .. } => {
                // Actual audio playback is the embedder's job; left in the
                // buffer for `WorldContext::take_pending_sounds`.
                deferred.push(command);
            }
        }
    }
    for leftover in deferred.drain() {
        commands.push(leftover);
    }
}

fn drain_scripts(mut script_queue: ResMut<ScriptQueue>, runner: Res<ScriptRunnerHandle>) {
    script_queue.drain(runner.0.as_ref());
}

fn rebuild_view_cache(
    mut cache: ResMut<crate::view::ViewCache>,
    characters: Query<(Entity, &Character)>,
    objs: Query<(Entity, &Obj)>,
    magic: Query<(Entity, &MagicSprite)>,
    mut npc_manager: ResMut<NpcManager>,
) {
    cache.rebuild(&characters, &objs, &magic);
    npc_manager.update_npcs_in_view(&characters);
    npc_manager.decay_deaths();
}
