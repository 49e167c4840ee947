//! Character runtime (spec §3 Character, §4.3 state machine)
//!
//! Flattens the legacy `Sprite -> Character -> {Npc, Player}` inheritance
//! chain (spec §9 redesign item) into a single `Character` component
//! tagged by `CharKind`. NPC-only fields live in `NpcData`
//! (`crate::npc_ai::NpcData`); per-kind behavior dispatches through plain
//! functions rather than a vtable.

use bevy::prelude::{Component, Entity};
use serde::{Deserialize, Serialize};

use crate::assets::{CharacterKind, Relation};
use crate::geometry::TilePos;
use crate::sprite::SpriteState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharacterState {
    Stand,
    Walk,
    Run,
    Jump,
    FightStand,
    Hurt,
    Death,
    Attack,
    Attack1,
    Attack2,
    Magic,
}

impl CharacterState {
    /// One-shot animation states that fire a completion callback.
    pub fn is_one_shot(self) -> bool {
        matches!(
            self,
            CharacterState::Attack
                | CharacterState::Attack1
                | CharacterState::Attack2
                | CharacterState::Magic
                | CharacterState::Hurt
                | CharacterState::Death
        )
    }
}

/// A sparse transition table enforcing spec §4.3's permitted moves.
/// Returns `true` if `to` is reachable from `from` by a direct command
/// (ignoring the forced `Hurt`/`Death` preemptions, which bypass this
/// table entirely via `Character::apply_damage`/`Character::kill`).
pub fn is_valid_transition(from: CharacterState, to: CharacterState) -> bool {
    use CharacterState::*;
    match (from, to) {
        (Stand, Walk) | (Stand, Run) => true,
        (Walk, Stand) | (Walk, Run) | (Run, Walk) | (Run, Stand) => true,
        (Walk, FightStand) | (Run, FightStand) | (Stand, FightStand) => true,
        (FightStand, Attack) | (FightStand, Attack1) | (FightStand, Attack2) | (FightStand, Magic) => true,
        (FightStand, Stand) | (FightStand, Walk) => true,
        (Attack, FightStand) | (Attack1, FightStand) | (Attack2, FightStand) | (Magic, FightStand) => true,
        (Stand, Jump) | (Walk, Jump) | (Run, Jump) | (Jump, Stand) => true,
        (a, b) if a == b => true,
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathFinderStyle {
    /// Flyer: ignores terrain, walks a straight line.
    PathStraightLine,
    PerfectMaxNpcTry,
    PerfectMaxPlayerTry,
    PathOneStep,
}

/// Movement/pathing style selection for an NPC (spec §4.3).
pub fn choose_path_finder_style(
    kind: CharacterKind,
    path_finder: u8,
    is_partner: bool,
    is_in_loop_walk: bool,
    is_enemy: bool,
) -> PathFinderStyle {
    if kind == CharacterKind::Flyer {
        return PathFinderStyle::PathStraightLine;
    }
    if path_finder == 1 || is_partner {
        return PathFinderStyle::PerfectMaxNpcTry;
    }
    if kind == CharacterKind::Normal || kind == CharacterKind::Eventer {
        return PathFinderStyle::PerfectMaxPlayerTry;
    }
    if path_finder == 0 || is_in_loop_walk || is_enemy {
        return PathFinderStyle::PathOneStep;
    }
    PathFinderStyle::PerfectMaxNpcTry
}

/// Status effects carried by a character (spec §3, §4.6 step 5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusEffects {
    pub poison_seconds: f32,
    pub petrified_seconds: f32,
    pub frozen_seconds: f32,
    pub poison_visual: bool,
    pub petrified_visual: bool,
    pub frozen_visual: bool,
    pub poison_by_character_name: Option<String>,
}

impl StatusEffects {
    /// Merge a newly-applied carried effect: durations take the max of
    /// existing vs. carried, and the corresponding visual flag latches.
    pub fn apply_poison(&mut self, seconds: f32, by: Option<String>) {
        if seconds > 0.0 {
            self.poison_seconds = self.poison_seconds.max(seconds);
            self.poison_visual = true;
            if by.is_some() {
                self.poison_by_character_name = by;
            }
        }
    }

    pub fn apply_petrified(&mut self, seconds: f32) {
        if seconds > 0.0 {
            self.petrified_seconds = self.petrified_seconds.max(seconds);
            self.petrified_visual = true;
        }
    }

    pub fn apply_frozen(&mut self, seconds: f32) {
        if seconds > 0.0 {
            self.frozen_seconds = self.frozen_seconds.max(seconds);
            self.frozen_visual = true;
        }
    }

    pub fn tick(&mut self, dt_secs: f32) {
        self.poison_seconds = (self.poison_seconds - dt_secs).max(0.0);
        self.petrified_seconds = (self.petrified_seconds - dt_secs).max(0.0);
        self.frozen_seconds = (self.frozen_seconds - dt_secs).max(0.0);
        if self.poison_seconds == 0.0 {
            self.poison_visual = false;
        }
        if self.petrified_seconds == 0.0 {
            self.petrified_visual = false;
        }
        if self.frozen_seconds == 0.0 {
            self.frozen_visual = false;
        }
    }
}

/// Combat attack/defend tiers (spec §3: `attack[1..3]`, `defend[1..3]`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CombatStats {
    pub attack: [f32; 3],
    pub defend: [f32; 3],
    pub evade: f32,
}

impl CombatStats {
    pub fn total_attack(&self) -> f32 {
        self.attack.iter().sum()
    }

    pub fn total_defend(&self) -> f32 {
        self.defend.iter().sum()
    }
}

/// `Player` vs `Npc(NpcData)` — the only per-kind data split left after
/// flattening the inheritance chain.
#[derive(Debug, Clone)]
pub enum CharKind {
    Player,
    Npc(crate::npc_ai::NpcData),
}

/// The runtime character (spec §3 Character).
#[derive(Component, Debug, Clone)]
pub struct Character {
    pub name: String,
    pub def_key: String,
    pub kind: CharKind,
    pub character_kind: CharacterKind,
    pub relation: Relation,
    pub group: u16,

    pub sprite: SpriteState,
    pub state: CharacterState,

    pub life: f32,
    pub life_max: f32,
    pub mana: f32,
    pub mana_max: f32,
    pub thew: f32,
    pub thew_max: f32,
    pub combat: CombatStats,
    pub walk_speed: f32,
    pub level: u32,
    pub exp: u64,

    pub status: StatusEffects,

    pub cached_path: Vec<TilePos>,
    pub follow_target: Option<Entity>,
    pub pending_attack_dest: Option<TilePos>,
    /// Script run on interaction, set via `WorldContext::set_npc_script`
    /// (spec §6.4 `setNpcScript`).
    pub script_file: Option<String>,

    pub is_death: bool,
    pub is_death_invoked: bool,
    pub is_in_loop_walk: bool,
    pub is_visible: bool,
    pub invincible_seconds: f32,

    pub death_timer_ms: f32,
    pub revive_ms: f32,
}

impl Character {
    /// `0 <= life <= life_max` is enforced on every mutation (spec §8 invariant 1).
    pub fn set_life(&mut self, value: f32) {
        self.life = value.clamp(0.0, self.life_max);
    }

    pub fn is_alive(&self) -> bool {
        !self.is_death && self.life > 0.0
    }

    /// Attempt a direct state command; damage/death preemptions are
    /// handled separately and always win (spec §4.3 tie-break rule).
    pub fn try_set_state(&mut self, to: CharacterState) -> bool {
        if self.is_death || self.is_death_invoked {
            return false;
        }
        if is_valid_transition(self.state, to) {
            if self.state != to {
                self.sprite.reset_animation();
            }
            self.state = to;
            true
        } else {
            false
        }
    }

    /// Forced transition to `Hurt`: cancels any pending attack/magic cast
    /// (spec §4.3: "simultaneous attack+damage => damage wins").
    pub fn force_hurt(&mut self) {
        if self.is_death {
            return;
        }
        self.pending_attack_dest = None;
        self.state = CharacterState::Hurt;
        self.sprite.reset_animation();
    }

    /// One-shot, idempotent transition into `Death` (spec §3 invariant).
    pub fn force_death(&mut self) -> bool {
        if self.is_death {
            return false;
        }
        self.is_death = true;
        self.state = CharacterState::Death;
        self.sprite.reset_animation();
        self.pending_attack_dest = None;
        self.follow_target = None;
        true
    }
}
