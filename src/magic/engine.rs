//! Per-tick magic sprite update (spec §4.5 "Per-tick update", §4.6).

use bevy::prelude::*;

use crate::assets::{AssetRegistry, Relation};
use crate::commands::{CommandBuffer, SimCommand};
use crate::geometry::{self, TilePos};
use crate::rng::GameRng;
use crate::terrain::MapBase;

use super::formations::{self, SpriteSpawn};
use super::{MagicManager, MagicPhase, MagicSprite};

/// Cast `magic_key` at `level` from `caster` (with `alignment`), producing
/// every `MagicSprite` the formation spawns. Returns an empty vec if the
/// key is unknown (spec §8: "casting an unknown magic key is a no-op, not
/// a panic").
pub fn cast(
    registry: &dyn AssetRegistry,
    magic_key: &str,
    level: u8,
    owner: Entity,
    alignment: Relation,
    origin: TilePos,
    destination: TilePos,
    rng: &mut GameRng,
) -> Vec<MagicSprite> {
    let Some(def) = registry.magic_def(magic_key) else {
        return vec![];
    };

    let spawns = formations::build(def.move_kind, level, origin, destination, def.region, def.range_radius, rng);
    let speed = def.speed;

    spawns
        .into_iter()
        .map(|s: SpriteSpawn| {
            let (vx, vy) = geometry::direction32_to_vector(s.dir32);
            MagicSprite {
                magic_key: magic_key.to_string(),
                level,
                owner,
                alignment,
                pos: s.pos,
                vel: (vx * speed * s.speed_scale, vy * speed * s.speed_scale),
                aim_dir32: s.dir32,
                frame: 0,
                vanish_frame: 0,
                phase: if s.start_vanished { MagicPhase::Vanish } else { MagicPhase::Waiting },
                delay_ms: s.delay_ms,
                elapsed_ms: 0.0,
                waits_on: None,
                life_frames_remaining: def.life_frame as i32,
                bounces: 0,
                trace_target: None,
                is_static: s.is_static,
            }
        })
        .collect()
}

/// Step every live sprite forward by `dt_ms`. Bounds/terrain collision
/// schedules `Vanish`; `Vanish` runs for `wait_frame` ticks then `Done`.
/// Damage application is deferred through `commands` so the caller can
/// resolve hit targets without this function borrowing the world.
#[allow(clippy::too_many_arguments)]
pub fn update_magic(
    dt_ms: f32,
    mut sprites: Query<(Entity, &mut MagicSprite)>,
    registry: &dyn AssetRegistry,
    map: &MapBase,
    wait_frame_by_key: impl Fn(&str) -> u32,
    hits_at: impl Fn(Entity, TilePos) -> Vec<Entity>,
    commands: &mut CommandBuffer,
) {
    let mut newly_done_casts = Vec::new();

    for (entity, mut sprite) in sprites.iter_mut() {
        match sprite.phase {
            MagicPhase::Done => continue,
            MagicPhase::Waiting => {
                sprite.elapsed_ms += dt_ms;
                if sprite.delay_ms >= 0.0 && sprite.elapsed_ms >= sprite.delay_ms {
                    sprite.phase = MagicPhase::Flying;
                }
                // `delay_ms < 0.0` (WAIT_FOR_CAST_SENTINEL) sprites never
                // satisfy that check; they're released below, once their
                // `waits_on` cast sprite reaches `Done` this same tick.
            }
            MagicPhase::Flying => {
                let prev_pos = sprite.pos;
                let dt_s = dt_ms / 1000.0;
                if !sprite.is_static {
                    sprite.pos.x += sprite.vel.0 * dt_s;
                    sprite.pos.y += sprite.vel.1 * dt_s;
                }

                let tile = sprite.tile();
                let def = registry.magic_def(&sprite.magic_key);
                let pass_wall = def.map(|d| d.pass_through_wall).unwrap_or(false);
                let bounce = def.map(|d| d.bounce).unwrap_or(false);
                let terrain_blocked = !pass_wall && map.is_magic_obstacle(tile);

                // Bounce off terrain: negate whichever axis actually carried
                // the sprite into the obstacle (spec §4.5: "negating the
                // offending axis when the obstacle is terrain").
                if terrain_blocked && bounce && !sprite.is_static {
                    let moved_x_only = geometry::PixelPos::new(prev_pos.x + sprite.vel.0 * dt_s, prev_pos.y);
                    if map.is_magic_obstacle(geometry::pixel_to_tile(moved_x_only)) {
                        sprite.vel.0 = -sprite.vel.0;
                    } else {
                        sprite.vel.1 = -sprite.vel.1;
                    }
                    sprite.pos = prev_pos;
                    sprite.bounces += 1;
                    sprite.life_frames_remaining -= 1;
                    if sprite.life_frames_remaining <= 0 {
                        sprite.phase = MagicPhase::Vanish;
                        sprite.frame = 0;
                    }
                    continue;
                }

                sprite.life_frames_remaining -= 1;
                if terrain_blocked || sprite.life_frames_remaining <= 0 {
                    sprite.phase = MagicPhase::Vanish;
                    sprite.frame = 0;
                    continue;
                }

                let hits = hits_at(entity, tile);
                if !hits.is_empty() {
                    let base_damage = def.map(|d| d.level_effect(sprite.level).damage).unwrap_or(0.0);
                    let bounce_hurt = def.map(|d| d.bounce_hurt).unwrap_or(0.0);
                    let amount = (base_damage - bounce_hurt * sprite.bounces as f32).max(0.0);
                    if amount > 0.0 {
                        for target in &hits {
                            commands.push(SimCommand::Damage { target: *target, amount, attacker: Some(sprite.owner) });
                        }
                    }
                }

                let pass_through = def.map(|d| d.pass_through).unwrap_or(false);
                if !pass_through && !hits.is_empty() {
                    // Bounce off a character hit: rotate the aim direction
                    // +90 degrees (8 of 32 steps) rather than vanishing
                    // (spec §4.5, Open Question resolved in favor of +90).
                    if bounce {
                        sprite.aim_dir32 = (sprite.aim_dir32 + 8) % 32;
                        let (vx, vy) = geometry::direction32_to_vector(sprite.aim_dir32);
                        let speed = (sprite.vel.0 * sprite.vel.0 + sprite.vel.1 * sprite.vel.1).sqrt();
                        sprite.vel = (vx * speed, vy * speed);
                        sprite.bounces += 1;
                    } else {
                        sprite.phase = MagicPhase::Vanish;
                        sprite.frame = 0;
                    }
                }
            }
            MagicPhase::Vanish => {
                sprite.frame += 1;
                if sprite.frame >= wait_frame_by_key(&sprite.magic_key) {
                    sprite.phase = MagicPhase::Done;
                    newly_done_casts.push(entity);
                }
            }
        }
    }

    // SuperMode (spec §4.5 item 15, §8 scenario S6): every target sprite
    // waiting on a cast sprite jumps straight to `Vanish` the instant the
    // cast reaches `Done`, in the same tick.
    if !newly_done_casts.is_empty() {
        for (_, mut sprite) in sprites.iter_mut() {
            if sprite.phase == MagicPhase::Waiting {
                if let Some(waits_on) = sprite.waits_on {
                    if newly_done_casts.contains(&waits_on) {
                        sprite.phase = MagicPhase::Vanish;
                        sprite.frame = 0;
                    }
                }
            }
        }
    }
}

/// Drop `Done` sprites from `manager.active` so obstacle queries stop
/// seeing them. Actual entity despawn is the caller's responsibility.
pub fn sweep_done(manager: &mut MagicManager, sprites: &Query<&MagicSprite>) {
    manager.active.retain(|e| {
        sprites.get(*e).map(|s| s.phase != MagicPhase::Done).unwrap_or(false)
    });
}
