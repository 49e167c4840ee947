//! Interactive objects + ObjManager (spec §3 Obj, §4.8)

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assets::{AssetRegistry, ObjKind};
use crate::commands::{CommandBuffer, SimCommand};
use crate::geometry::TilePos;
use crate::rng::GameRng;

/// A single interactive object instance (spec §3 Obj).
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct Obj {
    pub name: String,
    pub def_key: String,
    pub kind: ObjKind,
    pub tile_pos: TilePos,
    pub current_frame_index: u32,
    pub frame_begin: u32,
    pub frame_end: u32,
    pub script_file: Option<String>,
    pub script_file_right: Option<String>,
    pub timer_script_file: Option<String>,
    pub timer_script_interval_ms: f32,
    pub timer_elapsed_ms: f32,
    pub anim_elapsed_ms: f32,
    pub damage: f32,
    pub milliseconds_to_remove: Option<f32>,
    pub is_removed: bool,
    pub owner_team: u16,
    pub trigger_radius: f32,
}

impl Obj {
    /// Obstacle iff kind is Dynamic/Static/Door and not removed (spec §3).
    pub fn is_obstacle(&self) -> bool {
        !self.is_removed
            && matches!(self.kind, ObjKind::Dynamic | ObjKind::Static | ObjKind::Door)
    }

    /// Animation step; `dt_ms` advances `current_frame_index` within
    /// `[frame_begin, frame_end]`, wrapping for looping objects.
    pub fn step_animation(&mut self, interval_ms: f32, dt_ms: f32) {
        if interval_ms <= 0.0 || self.frame_end <= self.frame_begin {
            return;
        }
        self.anim_elapsed_ms += dt_ms;
        while self.anim_elapsed_ms >= interval_ms {
            self.anim_elapsed_ms -= interval_ms;
            self.current_frame_index += 1;
            if self.current_frame_index > self.frame_end {
                self.current_frame_index = self.frame_begin;
            }
        }
    }
}

/// Survives across zone reloads for a specific obj (keyed
/// `"{zone_file}_{obj_id}"`, spec §4.8/§4.9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedObjState {
    pub script_file: Option<String>,
    pub is_removed: bool,
    pub current_frame_index: u32,
}

/// Owns every object instance plus the per-zone saved-state map (spec §4.8).
#[derive(Resource, Default)]
pub struct ObjManager {
    pub saved_states: HashMap<String, SavedObjState>,
    next_seq: u64,
}

impl ObjManager {
    pub fn state_key(zone_file: &str, obj_name: &str) -> String {
        format!("{zone_file}_{obj_name}")
    }

    /// Restore saved state for an obj being (re)loaded into a zone.
    ///
    /// `open_box`/`close_box` persist the *target* frame (begin/end), not
    /// the current one, so that the restored state survives a later
    /// `set_obj_script` call overwriting the script but not the frame
    /// (spec §4.8, scenario S4).
    pub fn restore(&self, zone_file: &str, obj: &mut Obj) {
        let key = Self::state_key(zone_file, &obj.name);
        if let Some(saved) = self.saved_states.get(&key) {
            obj.is_removed = saved.is_removed;
            obj.current_frame_index = saved.current_frame_index;
            if saved.script_file.is_some() {
                obj.script_file = saved.script_file.clone();
            }
        }
    }

    pub fn record_frame(&mut self, zone_file: &str, obj: &Obj) {
        let key = Self::state_key(zone_file, &obj.name);
        let entry = self.saved_states.entry(key).or_default();
        entry.current_frame_index = obj.current_frame_index;
        entry.is_removed = obj.is_removed;
    }

    pub fn next_name(&mut self, prefix: &str) -> String {
        self.next_seq += 1;
        format!("{prefix}_{}", self.next_seq)
    }
}

/// `openBox(name)`: animate toward `frame_end` and persist that target.
pub fn open_box(zone_file: &str, obj: &mut Obj, mgr: &mut ObjManager) {
    obj.current_frame_index = obj.frame_end;
    mgr.record_frame(zone_file, obj);
}

/// `closeBox(name)`: animate back toward `frame_begin` and persist it.
pub fn close_box(zone_file: &str, obj: &mut Obj, mgr: &mut ObjManager) {
    obj.current_frame_index = obj.frame_begin;
    mgr.record_frame(zone_file, obj);
}

/// `setObjScript(name, path)`: idempotent — a second identical call is a
/// no-op (spec §8 round-trip law).
pub fn set_obj_script(obj: &mut Obj, path: &str) -> bool {
    if obj.script_file.as_deref() == Some(path) {
        return false;
    }
    obj.script_file = Some(path.to_string());
    true
}

/// Bernoulli probability a `RandSound` object triggers in a given tick
/// (spec §4.8).
pub const RAND_SOUND_CHANCE: f32 = 1.0 / 200.0;

/// Per-tick object update (spec §4.8): animation, removal clock, timer
/// script, trap damage, and looping/random ambient sound. Iterates a
/// stable snapshot; mutations beyond the object's own fields are deferred
/// to `commands`.
#[allow(clippy::too_many_arguments)]
pub fn update_objects(
    dt_ms: f32,
    mut objs: Query<(Entity, &mut Obj)>,
    zone_file: &str,
    mgr: &mut ObjManager,
    fighters_at: impl Fn(TilePos) -> Vec<Entity>,
    commands: &mut CommandBuffer,
    registry: &dyn AssetRegistry,
    rng: &mut GameRng,
) {
    for (entity, mut obj) in objs.iter_mut() {
        if obj.is_removed {
            continue;
        }

        obj.step_animation(100.0, dt_ms);
        obj.timer_elapsed_ms += dt_ms;

        if let Some(remaining) = obj.milliseconds_to_remove.as_mut() {
            *remaining -= dt_ms;
            if *remaining <= 0.0 {
                obj.is_removed = true;
                mgr.record_frame(zone_file, &obj);
                continue;
            }
        }

        if let Some(script) = obj.timer_script_file.clone() {
            if obj.timer_script_interval_ms > 0.0 && obj.timer_elapsed_ms >= obj.timer_script_interval_ms {
                obj.timer_elapsed_ms -= obj.timer_script_interval_ms;
                commands.push(SimCommand::QueueScript { path: script, subject: Some(entity) });
            }
        }

        if matches!(obj.kind, ObjKind::Trap) && obj.damage > 0.0 && obj.current_frame_index == obj.frame_begin {
            for fighter in fighters_at(obj.tile_pos) {
                commands.push(SimCommand::Damage {
                    target: fighter,
                    amount: obj.damage,
                    attacker: Some(entity),
                });
            }
        }

        match obj.kind {
            ObjKind::LoopingSound => {
                if let Some(sound) = registry.object_resource(&obj.def_key).and_then(|r| r.sound.clone()) {
                    commands.push(SimCommand::PlaySound { tile: obj.tile_pos, sound });
                }
            }
            ObjKind::RandSound => {
                if rng.chance(RAND_SOUND_CHANCE) {
                    if let Some(sound) = registry.object_resource(&obj.def_key).and_then(|r| r.sound.clone()) {
                        commands.push(SimCommand::PlaySound { tile: obj.tile_pos, sound });
                    }
                }
            }
            _ => {}
        }
    }
}
