//! Magic sprite engine (spec §4.5) — the hardest subsystem.
//!
//! Spawning formations selected by `MoveKind`, per-tick kinematic
//! integration, lifetime, and collision all live under this module:
//! `formations` builds the initial sprite set for a cast, `engine` steps
//! sprites forward each tick.

pub mod engine;
pub mod formations;

use bevy::prelude::{Component, Entity, Resource};
use serde::{Deserialize, Serialize};

use crate::assets::Relation;
use crate::geometry::PixelPos;

/// Lifecycle phase of a single magic sprite (spec §4.5 "Per-tick update").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagicPhase {
    Waiting,
    Flying,
    Vanish,
    Done,
}

/// Sentinel `delay_ms` meaning "wait until the cast sprite reaches `Done`"
/// (SuperMode target sprites, spec §4.5 item 15 and §8 scenario S6).
pub const WAIT_FOR_CAST_SENTINEL: f32 = -1.0;

/// One live magic sprite (spec §3 MagicSprite).
#[derive(Component, Debug, Clone)]
pub struct MagicSprite {
    pub magic_key: String,
    pub level: u8,
    pub owner: Entity,
    pub alignment: Relation,

    pub pos: PixelPos,
    pub vel: (f32, f32),
    pub aim_dir32: u8,

    pub frame: u32,
    pub vanish_frame: u32,
    pub phase: MagicPhase,

    /// Milliseconds before this sprite starts flying. `WAIT_FOR_CAST_SENTINEL`
    /// means "wait for `waits_on` to reach `Done`" instead of a literal delay.
    pub delay_ms: f32,
    pub elapsed_ms: f32,
    pub waits_on: Option<Entity>,

    pub life_frames_remaining: i32,
    pub bounces: u8,
    pub trace_target: Option<Entity>,
    pub is_static: bool,
}

impl MagicSprite {
    pub fn tile(&self) -> crate::geometry::TilePos {
        crate::geometry::pixel_to_tile(self.pos)
    }
}

/// Resource tracking which entities are "cast sprites" other sprites might
/// be waiting on (SuperMode), and the set of currently-static magic tiles
/// magic obstacle queries consult (spec §4.5: "MagicManager.isObstacle").
#[derive(Resource, Default)]
pub struct MagicManager {
    pub active: Vec<Entity>,
}

impl MagicManager {
    /// True iff a live **static** magic sprite (FixedPosition, FixedWall,
    /// SuperMode cast, …) occupies `tile`. Moving sprites never block
    /// pathing.
    pub fn is_obstacle(
        &self,
        tile: crate::geometry::TilePos,
        sprites: &bevy::prelude::Query<&MagicSprite>,
    ) -> bool {
        self.active.iter().any(|e| {
            sprites
                .get(*e)
                .map(|s| s.is_static && s.phase != MagicPhase::Done && s.tile() == tile)
                .unwrap_or(false)
        })
    }
}

/// Integer tag selecting one of the 20+ magic spawn formations (spec §4.5).
#[allow(non_upper_case_globals)]
pub mod move_kind {
    pub const NoMove: u8 = 0;
    pub const FixedPosition: u8 = 1;
    pub const SingleMove: u8 = 2;
    pub const LineMove: u8 = 3;
    pub const CircleMove: u8 = 4;
    pub const HeartMove: u8 = 5;
    pub const SpiralMove: u8 = 6;
    pub const SectorMove: u8 = 7;
    pub const RandomSector: u8 = 8;
    pub const FixedWall: u8 = 9;
    pub const WallMove: u8 = 10;
    pub const RegionBased: u8 = 11;
    pub const Follow: u8 = 13;
    pub const SuperMode: u8 = 15;
    pub const FollowTraceB: u8 = 16;
    pub const Throw: u8 = 17;
    pub const Kind19: u8 = 19;
    pub const Transport: u8 = 20;
    pub const FollowTraceC: u8 = 21;
    pub const Summon: u8 = 22;
    pub const TimeStop: u8 = 23;
    pub const VMove: u8 = 24;
}
