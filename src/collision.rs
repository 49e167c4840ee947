//! Damage pipeline + combined obstacle queries (spec §4.6, §4.3)

use bevy::prelude::*;

use crate::assets::{AssetRegistry, CharacterKind};
use crate::character::{Character, CharKind};
use crate::commands::{CommandBuffer, SimCommand};
use crate::geometry::TilePos;
use crate::magic::{MagicManager, MagicSprite};
use crate::npc_ai::MagicAimDirection;
use crate::object::Obj;
use crate::terrain::MapBase;

/// Is `tile` blocked for character movement, aggregating terrain, other
/// characters, objects, and static magic (spec §4.3 "obstacle query").
/// `exclude` is typically the querying character itself.
pub fn is_character_obstacle(
    tile: TilePos,
    map: &MapBase,
    characters: &Query<(Entity, &Character)>,
    objs: &Query<&Obj>,
    magic: &MagicManager,
    magic_sprites: &Query<&MagicSprite>,
    exclude: Entity,
) -> bool {
    if map.is_character_obstacle(tile) {
        return true;
    }
    if characters
        .iter()
        .any(|(e, c)| e != exclude && c.is_alive() && c.sprite.tile_pos == tile)
    {
        return true;
    }
    if objs.iter().any(|o| o.is_obstacle() && o.tile_pos == tile) {
        return true;
    }
    magic.is_obstacle(tile, magic_sprites)
}

/// Apply one hit of damage to `target` (spec §4.6 "take damage pipeline"):
///
/// 1. invincible characters take no damage;
/// 2. defense reduces the raw amount, floored at a minimum of 1;
/// 3. life is clamped to `[0, life_max]`;
/// 4. life reaching zero forces `Death` (idempotent) and fires the
///    death-magic/death-script reaction; otherwise a non-lethal hit that
///    doesn't kill forces `Hurt` and may fire the be-attacked reaction.
#[allow(clippy::too_many_arguments)]
pub fn apply_damage(
    target: &mut Character,
    raw_amount: f32,
    attacker_tile: Option<TilePos>,
    registry: &dyn AssetRegistry,
    target_entity: Entity,
    commands: &mut CommandBuffer,
) {
    if target.invincible_seconds > 0.0 || !target.is_alive() {
        return;
    }

    // spec §4.6 step 2: a landed hit always deals at least 1 damage, even
    // when defense fully absorbs the raw amount.
    let defend = target.combat.total_defend();
    let amount = (raw_amount - defend).max(1.0);

    target.set_life(target.life - amount);

    let Some(def) = registry.character_def(&target.def_key) else {
        if target.life <= 0.0 {
            target.force_death();
        } else {
            target.force_hurt();
        }
        return;
    };

    if target.life <= 0.0 {
        let was_alive = target.force_death();
        if was_alive {
            if let Some(magic) = &def.magic_to_use_when_death {
                let dest = death_cast_destination(target.sprite.tile_pos, attacker_tile, def.magic_direction_when_death);
                commands.push(SimCommand::SpawnMagic {
                    caster: target_entity,
                    magic_key: magic.clone(),
                    level: 1,
                    origin: target.sprite.tile_pos,
                    destination: dest,
                });
            }
            if let Some(script) = &def.death_script {
                commands.push(SimCommand::QueueScript { path: script.clone(), subject: Some(target_entity) });
            }
        }
    } else {
        target.force_hurt();
        if let Some(magic) = &def.magic_to_use_when_be_attacked {
            let dest = death_cast_destination(target.sprite.tile_pos, attacker_tile, def.magic_direction_when_be_attacked);
            commands.push(SimCommand::SpawnMagic {
                caster: target_entity,
                magic_key: magic.clone(),
                level: 1,
                origin: target.sprite.tile_pos,
                destination: dest,
            });
        }
    }
}

fn death_cast_destination(own_tile: TilePos, attacker_tile: Option<TilePos>, direction_code: u8) -> TilePos {
    match MagicAimDirection::from_code(direction_code) {
        MagicAimDirection::AtKillerPosition => attacker_tile.unwrap_or(own_tile),
        MagicAimDirection::TowardKiller => attacker_tile.unwrap_or(own_tile),
        MagicAimDirection::CurrentFacing => own_tile,
    }
}

/// Is `attacker` allowed to melee `target` this tick (spec §4.6): both
/// alive, not `Player` attacking `Player`-kind, adjacent or at
/// `attack_radius`, and `target` is an enemy of `attacker`.
pub fn can_attack(attacker: &Character, target: &Character) -> bool {
    if !attacker.is_alive() || !target.is_alive() {
        return false;
    }
    if matches!(attacker.kind, CharKind::Player) && matches!(target.kind, CharKind::Player) {
        return false;
    }
    if matches!(attacker.character_kind, CharacterKind::GroundAnimal) {
        return false;
    }
    crate::npc_manager::NpcManager::is_enemy(attacker, target)
}
