//! NPC lifecycle + spatial queries (spec §4.7)
//!
//! Owns nothing about any single `Character` beyond its `Entity` index;
//! the manager's job is cross-entity bookkeeping: who is whose enemy, who
//! just died where, the per-row view cache, and the global AI on/off
//! switch used by cutscenes.

use std::collections::HashMap;

use bevy::prelude::*;

use crate::assets::Relation;
use crate::character::{Character, CharKind};
use crate::commands::{CommandBuffer, SimCommand};
use crate::geometry::{self, TilePos};

/// A death recorded for `keep_radius_when_friend_death` reactions. Entries
/// decay after `DEATH_INFO_TICKS` ticks (spec §4.4, §8 scenario S5).
#[derive(Debug, Clone)]
pub struct DeathInfo {
    pub tile: TilePos,
    pub group: u16,
    pub ticks_remaining: u8,
}

pub const DEATH_INFO_TICKS: u8 = 2;

/// Cross-entity NPC bookkeeping (spec §3 NpcManager).
#[derive(Resource, Default)]
pub struct NpcManager {
    pub ai_globally_enabled: bool,
    pub recent_deaths: Vec<DeathInfo>,
    /// `entity -> row` for the last `updateNpcsInView` pass.
    view_rows: HashMap<Entity, i32>,
}

impl NpcManager {
    pub fn new() -> Self {
        Self { ai_globally_enabled: true, recent_deaths: Vec::new(), view_rows: HashMap::new() }
    }

    /// `isEnemy(a, b)` (spec §4.7): non-fighters are never enemies to
    /// anyone. A player or a fighter on the player's side (`Relation::Friend`)
    /// is the enemy of anyone not on that side. Otherwise two characters
    /// are enemies iff they belong to different groups.
    pub fn is_enemy(a: &Character, b: &Character) -> bool {
        let a_is_fighter = matches!(a.kind, CharKind::Player) || a.relation == Relation::Friend;
        let b_is_fighter = matches!(b.kind, CharKind::Player) || b.relation == Relation::Friend;
        if !a_is_fighter && !b_is_fighter {
            return false;
        }
        if a_is_fighter != b_is_fighter {
            return true;
        }
        a.group != b.group
    }

    /// Record a death for friend-reaction purposes and queue a body object
    /// to spawn at its tile (spec §4.7, §4.4 priority 2).
    pub fn record_death(&mut self, tile: TilePos, group: u16, npc_name: &str, revive_ms: f32, commands: &mut CommandBuffer) {
        self.recent_deaths.push(DeathInfo { tile, group, ticks_remaining: DEATH_INFO_TICKS });
        commands.push(SimCommand::AddBody { tile, npc_name: npc_name.to_string(), revive_ms });
    }

    /// Age out death records; call once per tick.
    pub fn decay_deaths(&mut self) {
        for d in self.recent_deaths.iter_mut() {
            d.ticks_remaining = d.ticks_remaining.saturating_sub(1);
        }
        self.recent_deaths.retain(|d| d.ticks_remaining > 0);
    }

    /// The tile of the nearest still-live death record within
    /// `radius` of `group`'s perspective (friend death means *same*
    /// group as the caller, i.e. the caller's own faction).
    pub fn nearest_friend_death(&self, from: TilePos, group: u16, radius: i32) -> Option<TilePos> {
        self.recent_deaths
            .iter()
            .filter(|d| d.group == group)
            .map(|d| (d.tile, geometry::view_tile_distance(from, d.tile)))
            .filter(|(_, dist)| *dist <= radius)
            .min_by_key(|(_, dist)| *dist)
            .map(|(tile, _)| tile)
    }

    pub fn disable_ai(&mut self) {
        self.ai_globally_enabled = false;
    }

    pub fn enable_ai(&mut self) {
        self.ai_globally_enabled = true;
    }

    /// Cancel every fighter's pending attack command (called alongside
    /// `disable_ai`, spec §4.7: cutscene start).
    pub fn cancel_all_fighter_attacks(&self, mut characters: Query<&mut Character>) {
        for mut c in characters.iter_mut() {
            if let CharKind::Npc(npc) = &mut c.kind {
                npc.destination_attack_tile = None;
            }
            c.pending_attack_dest = None;
        }
    }

    /// Recompute the per-row view bucket for every live character (spec
    /// §4.7 "updateNpcsInView"). Dead/invisible characters are dropped.
    pub fn update_npcs_in_view(&mut self, characters: &Query<(Entity, &Character)>) {
        self.view_rows.clear();
        for (entity, c) in characters.iter() {
            if !c.is_visible || c.is_death {
                continue;
            }
            self.view_rows.insert(entity, c.sprite.tile_pos.y);
        }
    }

    pub fn entities_on_row(&self, row: i32) -> Vec<Entity> {
        self.view_rows.iter().filter(|(_, r)| **r == row).map(|(e, _)| *e).collect()
    }
}

/// Find the closest living enemy to `from` among `characters`, within
/// `radius` view-tiles (spec §4.7 `getClosestEnemy`).
pub fn get_closest_enemy(
    from: &Character,
    from_tile: TilePos,
    characters: &Query<(Entity, &Character)>,
    radius: i32,
) -> Option<(Entity, TilePos)> {
    characters
        .iter()
        .filter(|(_, c)| c.is_alive() && NpcManager::is_enemy(from, c))
        .map(|(e, c)| (e, c.sprite.tile_pos, geometry::view_tile_distance(from_tile, c.sprite.tile_pos)))
        .filter(|(_, _, dist)| *dist <= radius)
        .min_by_key(|(_, _, dist)| *dist)
        .map(|(e, tile, _)| (e, tile))
}

/// Any living enemy within `radius`, preferring none in particular (spec
/// §4.7 `getEnemy`): first match wins, used where the legacy caller didn't
/// care about distance ordering.
pub fn get_enemy(
    from: &Character,
    from_tile: TilePos,
    characters: &Query<(Entity, &Character)>,
    radius: i32,
) -> Option<Entity> {
    characters
        .iter()
        .find(|(_, c)| {
            c.is_alive()
                && NpcManager::is_enemy(from, c)
                && geometry::view_tile_distance(from_tile, c.sprite.tile_pos) <= radius
        })
        .map(|(e, _)| e)
}

/// A living `Fighter`/`Player` friend within `radius` (spec §4.7
/// `getFighter`/`getPlayerOrFighterFriend`).
pub fn get_player_or_fighter_friend(
    from: &Character,
    from_tile: TilePos,
    characters: &Query<(Entity, &Character)>,
    radius: i32,
) -> Option<Entity> {
    characters
        .iter()
        .find(|(_, c)| {
            c.is_alive()
                && (matches!(c.kind, CharKind::Player) || c.relation == Relation::Friend)
                && c.group == from.group
                && geometry::view_tile_distance(from_tile, c.sprite.tile_pos) <= radius
        })
        .map(|(e, _)| e)
}

/// A living `Eventer`-kind character within `radius` (spec §4.7 `getEventer`).
pub fn get_eventer(
    from_tile: TilePos,
    characters: &Query<(Entity, &Character)>,
    radius: i32,
) -> Option<Entity> {
    use crate::assets::CharacterKind;
    characters
        .iter()
        .find(|(_, c)| {
            c.is_alive()
                && c.character_kind == CharacterKind::Eventer
                && geometry::view_tile_distance(from_tile, c.sprite.tile_pos) <= radius
        })
        .map(|(e, _)| e)
}

/// Every living enemy within `radius` view-tiles (spec §4.7
/// `findEnemiesInTileDistance`). A handful of hits is the common case, so
/// this avoids a heap allocation the way the teacher's dispel-index
/// lookup does.
pub fn find_enemies_in_tile_distance(
    from: &Character,
    from_tile: TilePos,
    characters: &Query<(Entity, &Character)>,
    radius: i32,
) -> smallvec::SmallVec<[Entity; 8]> {
    characters
        .iter()
        .filter(|(_, c)| {
            c.is_alive()
                && NpcManager::is_enemy(from, c)
                && geometry::view_tile_distance(from_tile, c.sprite.tile_pos) <= radius
        })
        .map(|(e, _)| e)
        .collect()
}

/// A living enemy on one of `tile`'s 8 immediate neighbors (spec §4.7
/// `getNeighborEnemy`), used to decide melee-attack eligibility.
pub fn get_neighbor_enemy(
    from: &Character,
    tile: TilePos,
    characters: &Query<(Entity, &Character)>,
) -> Option<Entity> {
    let ring = geometry::neighbors(tile);
    characters
        .iter()
        .find(|(_, c)| c.is_alive() && NpcManager::is_enemy(from, c) && ring.contains(&c.sprite.tile_pos))
        .map(|(e, _)| e)
}
