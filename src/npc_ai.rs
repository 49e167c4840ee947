//! NPC AI scheduler (spec §4.4)
//!
//! Per-NPC behavior state machine: life-low retreat/cast, friend-death
//! reaction, chase/attack, and idle patrol — evaluated in priority order
//! every tick, skipped for dead/invisible/AI-disabled NPCs.

use bevy::prelude::Entity;

use crate::geometry::TilePos;

bitflags_like::bitflags! {
    /// AI behavior bitmask (spec §4.4: "AI types (bitmask of behaviors)").
    pub struct AiType: u8 {
        const NORMAL = 0;
        const RAND_MOVE_RAND_ATTACK = 1 << 0;
        const NEVER_FIGHT_BACK = 1 << 1;
        const KEEP_DISTANCE_ON_FRIEND_DEATH = 1 << 2;
    }
}

/// Where a death-cast/be-attacked-cast magic aims (spec §4.4, §4.6 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MagicAimDirection {
    CurrentFacing,
    TowardKiller,
    AtKillerPosition,
}

impl MagicAimDirection {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => MagicAimDirection::TowardKiller,
            2 => MagicAimDirection::AtKillerPosition,
            _ => MagicAimDirection::CurrentFacing,
        }
    }
}

/// NPC-only runtime data (the `NpcData` variant of `CharKind`).
#[derive(Debug, Clone)]
pub struct NpcData {
    pub ai_type: AiType,
    pub ai_enabled: bool,
    pub stop_finding_target: bool,
    pub is_partner: bool,
    pub is_summoned_by_magic: bool,

    pub fixed_path: Vec<TilePos>,
    pub fixed_path_cursor: usize,
    pub is_loop_walk: bool,

    pub magic_cache: Vec<String>,
    pub destination_attack_tile: Option<TilePos>,
}

impl Default for NpcData {
    fn default() -> Self {
        Self {
            ai_type: AiType::NORMAL,
            ai_enabled: true,
            stop_finding_target: false,
            is_partner: false,
            is_summoned_by_magic: false,
            fixed_path: Vec::new(),
            fixed_path_cursor: 0,
            is_loop_walk: false,
            magic_cache: Vec::new(),
            destination_attack_tile: None,
        }
    }
}

/// Parse a fixed patrol path from the legacy "hex pairs" encoding: a
/// whitespace-separated list of `XXYY` hex quads, each decoding to a
/// relative `(dx, dy)` tile step from the previous point.
pub fn parse_fixed_path(origin: TilePos, hex_pairs: &str) -> Vec<TilePos> {
    let mut path = vec![origin];
    let mut cursor = origin;
    for token in hex_pairs.split_whitespace() {
        if token.len() != 4 {
            continue;
        }
        let (dx_hex, dy_hex) = token.split_at(2);
        let (Ok(dx), Ok(dy)) = (
            i8::from_str_radix(dx_hex, 16),
            i8::from_str_radix(dy_hex, 16),
        ) else {
            continue;
        };
        cursor = TilePos::new(cursor.x + dx as i32, cursor.y + dy as i32);
        path.push(cursor);
    }
    path
}

/// The outcome of one AI evaluation pass (spec §4.4 priority order). The
/// caller (the NpcManager update system) turns this into actual state
/// mutation + `CommandBuffer` pushes, keeping this function pure and
/// independently testable.
#[derive(Debug, Clone, PartialEq)]
pub enum AiDecision {
    CastLifeLowMagic { magic: String, retreat_tiles: i32 },
    RetreatFromFriendDeath { away_from: TilePos },
    Chase { target: Entity, target_tile: TilePos },
    Attack { target: Entity },
    PatrolFixedPath { next: TilePos },
    RandomWalk,
    Idle,
}

/// Inputs the decision flow needs about the NPC itself.
#[derive(Debug, Clone, Copy)]
pub struct SelfView {
    pub tile: TilePos,
    pub life: f32,
    pub life_max: f32,
    pub life_low_percent: f32,
    pub attack_radius: i32,
    pub vision_radius: i32,
    pub keep_radius_when_life_low: i32,
    pub keep_radius_when_friend_death: i32,
}

/// Evaluate the priority-ordered decision flow from spec §4.4.
///
/// `enemy` is the nearest visible enemy (if any), `friend_death_tile` is
/// the tile of a friend that died within `keep_radius_when_friend_death`
/// in the last 2 ticks (spec §8 scenario S5), and `magic_to_use_when_life_low`
/// mirrors the static `CharacterDef` field.
#[allow(clippy::too_many_arguments)]
pub fn decide(
    view: SelfView,
    npc: &NpcData,
    magic_to_use_when_life_low: Option<&str>,
    enemy: Option<(Entity, TilePos)>,
    friend_death_tile: Option<TilePos>,
    keep_distance_on_friend_death: bool,
) -> AiDecision {
    // Priority 1: life-low cast/retreat.
    if view.life_max > 0.0 {
        let pct = view.life / view.life_max * 100.0;
        if pct <= view.life_low_percent {
            if let Some(magic) = magic_to_use_when_life_low {
                return AiDecision::CastLifeLowMagic {
                    magic: magic.to_string(),
                    retreat_tiles: view.keep_radius_when_life_low,
                };
            }
        }
    }

    // Priority 2: friend died nearby and this AI keeps distance.
    if keep_distance_on_friend_death {
        if let Some(death_tile) = friend_death_tile {
            return AiDecision::RetreatFromFriendDeath { away_from: death_tile };
        }
    }

    // Priority 3: enemy in vision, not stopped from finding targets.
    if !npc.stop_finding_target {
        if let Some((target, target_tile)) = enemy {
            let dist = crate::geometry::view_tile_distance(view.tile, target_tile);
            if dist <= view.attack_radius {
                return AiDecision::Attack { target };
            }
            if dist <= view.vision_radius {
                return AiDecision::Chase { target, target_tile };
            }
        }
    }

    // Priority 4: idle path.
    if npc.is_loop_walk && !npc.fixed_path.is_empty() {
        let next = npc.fixed_path[npc.fixed_path_cursor % npc.fixed_path.len()];
        return AiDecision::PatrolFixedPath { next };
    }
    if npc.ai_type.contains(AiType::RAND_MOVE_RAND_ATTACK) {
        return AiDecision::RandomWalk;
    }
    AiDecision::Idle
}

mod bitflags_like {
    //! A tiny hand-rolled bitflags macro, kept local rather than pulling in
    //! the `bitflags` crate for a single small type.
    macro_rules! bitflags {
        (
            $(#[$meta:meta])*
            pub struct $name:ident: $ty:ty {
                $(const $flag:ident = $value:expr;)*
            }
        ) => {
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
            pub struct $name($ty);

            impl $name {
                $(pub const $flag: $name = $name($value);)*

                pub fn contains(self, other: $name) -> bool {
                    (self.0 & other.0) == other.0 || other.0 == 0
                }

                pub fn bits(self) -> $ty {
                    self.0
                }

                pub fn from_bits(bits: $ty) -> Self {
                    Self(bits)
                }
            }

            impl std::ops::BitOr for $name {
                type Output = Self;
                fn bitor(self, rhs: Self) -> Self {
                    Self(self.0 | rhs.0)
                }
            }
        };
    }
    pub(crate) use bitflags;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_pair_fixed_path() {
        let path = parse_fixed_path(TilePos::new(10, 10), "0102 FF00");
        assert_eq!(path[0], TilePos::new(10, 10));
        assert_eq!(path[1], TilePos::new(11, 12));
        // FF == -1 as i8
        assert_eq!(path[2], TilePos::new(10, 12));
    }

    #[test]
    fn life_low_cast_beats_chase() {
        let view = SelfView {
            tile: TilePos::new(0, 1),
            life: 5.0,
            life_max: 100.0,
            life_low_percent: 20.0,
            attack_radius: 1,
            vision_radius: 10,
            keep_radius_when_life_low: 3,
            keep_radius_when_friend_death: 5,
        };
        let npc = NpcData::default();
        let decision = decide(
            view,
            &npc,
            Some("heal_self"),
            Some((Entity::from_raw(1), TilePos::new(0, 3))),
            None,
            false,
        );
        assert_eq!(
            decision,
            AiDecision::CastLifeLowMagic { magic: "heal_self".to_string(), retreat_tiles: 3 }
        );
    }

    #[test]
    fn attacks_when_enemy_within_attack_radius() {
        let view = SelfView {
            tile: TilePos::new(0, 1),
            life: 100.0,
            life_max: 100.0,
            life_low_percent: 20.0,
            attack_radius: 1,
            vision_radius: 10,
            keep_radius_when_life_low: 3,
            keep_radius_when_friend_death: 5,
        };
        let npc = NpcData::default();
        let target = Entity::from_raw(7);
        let decision = decide(view, &npc, None, Some((target, TilePos::new(0, 3))), None, false);
        assert_eq!(decision, AiDecision::Attack { target });
    }

    #[test]
    fn chases_enemy_within_vision_but_outside_attack_radius() {
        let view = SelfView {
            tile: TilePos::new(0, 0),
            life: 100.0,
            life_max: 100.0,
            life_low_percent: 20.0,
            attack_radius: 1,
            vision_radius: 10,
            keep_radius_when_life_low: 3,
            keep_radius_when_friend_death: 5,
        };
        let npc = NpcData::default();
        let target = Entity::from_raw(7);
        let target_tile = TilePos::new(0, 6);
        let decision = decide(view, &npc, None, Some((target, target_tile)), None, false);
        assert_eq!(decision, AiDecision::Chase { target, target_tile });
    }

    #[test]
    fn ignores_enemy_beyond_vision_radius() {
        let view = SelfView {
            tile: TilePos::new(0, 0),
            life: 100.0,
            life_max: 100.0,
            life_low_percent: 20.0,
            attack_radius: 1,
            vision_radius: 3,
            keep_radius_when_life_low: 3,
            keep_radius_when_friend_death: 5,
        };
        let npc = NpcData::default();
        let target = Entity::from_raw(7);
        let decision = decide(view, &npc, None, Some((target, TilePos::new(0, 20))), None, false);
        assert_eq!(decision, AiDecision::Idle);
    }
}
