//! Scenario-level integration tests (spec §8).
//!
//! Each test builds a `WorldContext` directly (bypassing the RON loader,
//! since these don't need a scenario file on disk) and drives a handful
//! of ticks, asserting on the externally observable outcome.

use bevy::prelude::Mut;
use jianghu_sim::assets::{
    CharacterDef, CharacterKind, InMemoryAssetRegistry, MagicDef, MagicLevelEffect, RegionShape, Relation,
};
use jianghu_sim::character::{CharKind, Character, CharacterState, CombatStats, StatusEffects};
use jianghu_sim::context::WorldContext;
use jianghu_sim::geometry::{Direction8, TilePos};
use jianghu_sim::npc_ai::NpcData;
use jianghu_sim::script::NullScriptRunner;
use jianghu_sim::sprite::SpriteState;
use jianghu_sim::terrain::MapBase;

fn wolf_def() -> CharacterDef {
    CharacterDef {
        name: "wolf".to_string(),
        sprite_sheet_key: "wolf_sheet".to_string(),
        kind: CharacterKind::Normal,
        relation: Relation::Enemy,
        path_finder: 0,
        vision_radius: 10,
        chase_radius: 10,
        attack_radius: 1,
        life_low_percent: 20.0,
        magic_to_use_when_life_low: None,
        keep_radius_when_life_low: 3,
        keep_radius_when_friend_death: 3,
        magic_to_use_when_death: None,
        magic_direction_when_death: 0,
        magic_to_use_when_be_attacked: None,
        magic_direction_when_be_attacked: 0,
        death_script: None,
        drop_table_key: None,
    }
}

fn npc_character(name: &str, group: u16, tile: TilePos, life: f32) -> Character {
    Character {
        name: name.to_string(),
        def_key: "wolf".to_string(),
        kind: CharKind::Npc(NpcData::default()),
        character_kind: CharacterKind::Normal,
        relation: Relation::Enemy,
        group,
        sprite: SpriteState::new(tile, Direction8::S),
        state: CharacterState::Stand,
        life,
        life_max: 100.0,
        mana: 0.0,
        mana_max: 0.0,
        thew: 0.0,
        thew_max: 0.0,
        combat: CombatStats { attack: [5.0, 0.0, 0.0], defend: [0.0, 0.0, 0.0], evade: 0.0 },
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
    }
}

fn player_character(tile: TilePos) -> Character {
    Character {
        name: "hero".to_string(),
        def_key: "hero".to_string(),
        kind: CharKind::Player,
        character_kind: CharacterKind::Player,
        relation: Relation::None,
        group: 0,
        sprite: SpriteState::new(tile, Direction8::S),
        state: CharacterState::Stand,
        life: 100.0,
        life_max: 100.0,
        mana: 50.0,
        mana_max: 50.0,
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
    }
}

fn new_context() -> WorldContext {
    let mut registry = InMemoryAssetRegistry::default();
    registry.characters.insert("wolf".to_string(), wolf_def());
    registry.magics.insert(
        "fireball".to_string(),
        MagicDef {
            name: "fireball".to_string(),
            move_kind: jianghu_sim::magic::move_kind::CircleMove,
            speed: 300.0,
            life_frame: 40,
            wait_frame: 4,
            range_radius: 0,
            region: RegionShape::Square,
            pass_through: false,
            pass_through_wall: false,
            attack_all: false,
            trace_enemy: false,
            bounce: false,
            bounce_hurt: 0.0,
            vibrating_screen: false,
            alpha_blend: true,
            frames_per_direction: 4,
            interval_ms: 80.0,
            levels: vec![MagicLevelEffect { damage: 15.0, mana_cost: 10.0, extra: 0.0 }],
        },
    );
    registry.magics.insert(
        "bounce_bolt".to_string(),
        MagicDef {
            name: "bounce_bolt".to_string(),
            move_kind: jianghu_sim::magic::move_kind::SingleMove,
            speed: 2000.0,
            life_frame: 1000,
            wait_frame: 4,
            range_radius: 0,
            region: RegionShape::Square,
            pass_through: false,
            pass_through_wall: false,
            attack_all: false,
            trace_enemy: false,
            bounce: true,
            bounce_hurt: 1.0,
            vibrating_screen: false,
            alpha_blend: true,
            frames_per_direction: 4,
            interval_ms: 80.0,
            levels: vec![MagicLevelEffect { damage: 20.0, mana_cost: 10.0, extra: 0.0 }],
        },
    );
    WorldContext::new(Some(42), MapBase::new(32, 32), Box::new(registry), Box::new(NullScriptRunner), "test_zone.map")
}

/// S2: a `CircleMove` cast spawns exactly 32 distinct-direction sprites.
#[test]
fn circle_move_cast_spawns_32_distinct_sprites() {
    let mut ctx = new_context();
    let caster = ctx.spawn_character(player_character(TilePos::new(5, 5)));
    let sprites =
        ctx.cast_magic(caster, "fireball", 1, TilePos::new(5, 5), TilePos::new(5, 5), Relation::None);
    assert_eq!(sprites.len(), 32);
}

/// Casting an unknown magic key is a no-op rather than a panic (spec §8).
#[test]
fn unknown_magic_cast_is_noop() {
    let mut ctx = new_context();
    let caster = ctx.spawn_character(player_character(TilePos::new(0, 0)));
    let sprites = ctx.cast_magic(caster, "nonexistent", 1, TilePos::new(0, 0), TilePos::new(1, 0), Relation::None);
    assert!(sprites.is_empty());
}

/// Running several ticks with no enemies in range leaves an idle NPC's
/// life and position untouched.
#[test]
fn idle_npc_survives_uncontested_ticks() {
    let mut ctx = new_context();
    let wolf = ctx.spawn_character(npc_character("lone_wolf", 9, TilePos::new(4, 4), 100.0));
    ctx.run_ticks(20);
    let c = ctx.world().get::<Character>(wolf).unwrap();
    assert!(c.is_alive());
    assert_eq!(c.sprite.tile_pos, TilePos::new(4, 4));
}

/// Disabling AI globally freezes NPC decision-making (spec §4.7).
#[test]
fn disabling_ai_stops_chase_behavior() {
    let mut ctx = new_context();
    let wolf = ctx.spawn_character(npc_character("wolf_1", 9, TilePos::new(0, 0), 100.0));
    let _hero = ctx.spawn_character(player_character(TilePos::new(0, 1)));
    ctx.disable_ai();
    ctx.run_ticks(10);
    let c = ctx.world().get::<Character>(wolf).unwrap();
    assert_eq!(c.sprite.tile_pos, TilePos::new(0, 0));
}

/// `cancel_all_fighter_attacks` clears a pending attack destination.
#[test]
fn cancel_all_fighter_attacks_clears_pending_attacks() {
    let mut ctx = new_context();
    let wolf = ctx.spawn_character({
        let mut c = npc_character("wolf_1", 9, TilePos::new(0, 0), 100.0);
        c.pending_attack_dest = Some(TilePos::new(1, 0));
        c
    });
    ctx.cancel_all_fighter_attacks();
    let c = ctx.world().get::<Character>(wolf).unwrap();
    assert!(c.pending_attack_dest.is_none());
}

/// Snapshotting and restoring an NPC preserves its saved fields exactly
/// (spec §4.9, scenario S3).
#[test]
fn snapshot_round_trips_npc_state() {
    use jianghu_sim::snapshot::{NpcSaveItem, SnapshotStore};

    let mut store = SnapshotStore::new();
    let item = NpcSaveItem {
        name: "wolf_1".to_string(),
        def_key: "wolf".to_string(),
        relation: Relation::Enemy,
        group: 9,
        tile: TilePos::new(7, 7),
        state: CharacterState::Hurt,
        life: 12.0,
        life_max: 100.0,
        mana: 0.0,
        mana_max: 0.0,
        thew: 0.0,
        thew_max: 0.0,
        combat: CombatStats::default(),
        level: 2,
        exp: 50,
        status: StatusEffects::default(),
        is_death: false,
        ai_enabled: true,
        fixed_path_cursor: 0,
        script_file: None,
    };
    store.save_npc("zone_a.map", item);
    let restored = store.load_npc("zone_a.map", "wolf_1").unwrap();
    assert_eq!(restored.life, 12.0);
    assert_eq!(restored.tile, TilePos::new(7, 7));
}

/// A `bounce` magic reflects off the map edge instead of vanishing, and
/// flips the velocity axis that carried it into the obstacle (spec §4.5).
#[test]
fn bounce_magic_reflects_off_map_edge_instead_of_vanishing() {
    use jianghu_sim::magic::{MagicPhase, MagicSprite};

    let mut ctx = new_context();
    let caster = ctx.spawn_character(player_character(TilePos::new(5, 2)));
    let sprites = ctx.cast_magic(
        caster,
        "bounce_bolt",
        1,
        TilePos::new(5, 2),
        TilePos::new(5, 1),
        Relation::None,
    );
    assert_eq!(sprites.len(), 1);
    let sprite_entity = sprites[0];

    ctx.run_ticks(3);

    let sprite = ctx.world().get::<MagicSprite>(sprite_entity).unwrap();
    assert_eq!(sprite.phase, MagicPhase::Flying);
    assert_eq!(sprite.bounces, 1);
    assert!(sprite.vel.1 > 0.0, "vertical velocity should flip away from the edge after bouncing");
}

/// S1: a wolf closes to attack range and lands exactly one hit's worth of
/// damage on the player (spec §8).
#[test]
fn chasing_npc_deals_exactly_its_attack_stat_on_contact() {
    let mut ctx = new_context();
    let player = ctx.spawn_character(player_character(TilePos::new(10, 10)));
    ctx.spawn_character(npc_character("wolf_1", 9, TilePos::new(10, 18), 100.0));

    let starting_life = ctx.world().get::<Character>(player).unwrap().life;
    let mut life_after_hit = None;
    for _ in 0..40 {
        ctx.run_ticks(1);
        let life = ctx.world().get::<Character>(player).unwrap().life;
        if life < starting_life {
            life_after_hit = Some(life);
            break;
        }
    }

    let life_after_hit = life_after_hit.expect("wolf never closed to attack range within 40 ticks");
    assert_eq!(starting_life - life_after_hit, 5.0, "damage should equal the wolf's total attack stat");
}

/// S4: an opened box's frame survives a despawn/respawn (simulating a zone
/// reload) via `ObjManager`'s saved-state map, without ever calling
/// `saveObj` explicitly (spec §4.8/§4.9).
#[test]
fn open_box_frame_persists_across_simulated_zone_reload() {
    use jianghu_sim::assets::ObjKind;
    use jianghu_sim::object::{self, Obj, ObjManager};

    let mut ctx = new_context();
    let zone = ctx.current_zone();

    let chest = Obj {
        name: "chest".to_string(),
        def_key: "chest01".to_string(),
        kind: ObjKind::Static,
        tile_pos: TilePos::new(3, 3),
        current_frame_index: 0,
        frame_begin: 0,
        frame_end: 7,
        script_file: None,
        script_file_right: None,
        timer_script_file: None,
        timer_script_interval_ms: 0.0,
        timer_elapsed_ms: 0.0,
        anim_elapsed_ms: 0.0,
        damage: 0.0,
        milliseconds_to_remove: None,
        is_removed: false,
        owner_team: 0,
        trigger_radius: 0.0,
    };
    let chest_entity = ctx.spawn_obj(chest);

    ctx.world_mut().resource_scope(|world, mut mgr: Mut<ObjManager>| {
        let mut obj = world.get_mut::<Obj>(chest_entity).unwrap();
        object::open_box(&zone, &mut obj, &mut mgr);
    });

    // Simulate a zone reload: despawn the live entity, spawn a fresh one at
    // its default (closed) frame, then restore from the saved-state map.
    ctx.world_mut().despawn(chest_entity);
    let reloaded_entity = ctx.spawn_obj(Obj {
        name: "chest".to_string(),
        def_key: "chest01".to_string(),
        kind: ObjKind::Static,
        tile_pos: TilePos::new(3, 3),
        current_frame_index: 0,
        frame_begin: 0,
        frame_end: 7,
        script_file: None,
        script_file_right: None,
        timer_script_file: None,
        timer_script_interval_ms: 0.0,
        timer_elapsed_ms: 0.0,
        anim_elapsed_ms: 0.0,
        damage: 0.0,
        milliseconds_to_remove: None,
        is_removed: false,
        owner_team: 0,
        trigger_radius: 0.0,
    });
    ctx.world_mut().resource_scope(|world, mgr: Mut<ObjManager>| {
        let mut obj = world.get_mut::<Obj>(reloaded_entity).unwrap();
        mgr.restore(&zone, &mut obj);
    });

    let reloaded = ctx.world().get::<Obj>(reloaded_entity).unwrap();
    assert_eq!(reloaded.current_frame_index, 7);
}

/// S5: when a friend dies within `keepRadiusWhenFriendDeath`, the
/// survivor's AI retreats away from the death tile within the next couple
/// of ticks (spec §8).
#[test]
fn npc_retreats_from_nearby_friend_death() {
    use jianghu_sim::commands::SimCommand;
    use jianghu_sim::npc_ai::AiType;

    let mut ctx = new_context();
    let a_tile = TilePos::new(0, 0);
    let b_tile = TilePos::new(0, 6);

    let npc_with_keep_distance = |name: &str, tile: TilePos, life: f32| {
        let mut c = npc_character(name, 1, tile, life);
        if let CharKind::Npc(data) = &mut c.kind {
            data.ai_type = AiType::KEEP_DISTANCE_ON_FRIEND_DEATH;
        }
        c
    };

    let a = ctx.spawn_character(npc_with_keep_distance("friend_a", a_tile, 1.0));
    let b = ctx.spawn_character(npc_with_keep_distance("friend_b", b_tile, 100.0));

    ctx.world_mut().resource_mut::<jianghu_sim::commands::CommandBuffer>().push(SimCommand::Damage {
        target: a,
        amount: 9999.0,
        attacker: None,
    });
    ctx.run_ticks(1);
    assert!(ctx.world().get::<Character>(a).unwrap().is_death);

    let tile_before = ctx.world().get::<Character>(b).unwrap().sprite.tile_pos;
    ctx.run_ticks(1);
    let tile_after = ctx.world().get::<Character>(b).unwrap().sprite.tile_pos;

    assert_ne!(tile_before, tile_after, "b should have taken a retreat step");
    let dist_before = jianghu_sim::geometry::view_tile_distance(tile_before, a_tile);
    let dist_after = jianghu_sim::geometry::view_tile_distance(tile_after, a_tile);
    assert!(dist_after > dist_before, "b should have moved farther from a's death tile");
}

/// S6: a SuperMode cast's target sprites jump straight from `Waiting` to
/// `Vanish` (frame 0) the instant the cast sprite reaches `Done`, in the
/// same tick (spec §8).
#[test]
fn super_mode_target_vanishes_the_instant_cast_finishes() {
    use jianghu_sim::magic::{MagicPhase, MagicSprite};

    let mut ctx = new_context();
    ctx.world_mut().resource_mut::<jianghu_sim::context::AssetRegistryHandle>().0 = Box::new({
        let mut reg = InMemoryAssetRegistry::default();
        reg.magics.insert(
            "super_strike".to_string(),
            MagicDef {
                name: "super_strike".to_string(),
                move_kind: jianghu_sim::magic::move_kind::SuperMode,
                speed: 0.0,
                life_frame: 2,
                wait_frame: 1,
                range_radius: 0,
                region: RegionShape::Square,
                pass_through: true,
                pass_through_wall: true,
                attack_all: false,
                trace_enemy: false,
                bounce: false,
                bounce_hurt: 0.0,
                vibrating_screen: false,
                alpha_blend: true,
                frames_per_direction: 4,
                interval_ms: 80.0,
                levels: vec![MagicLevelEffect { damage: 0.0, mana_cost: 0.0, extra: 0.0 }],
            },
        );
        reg
    });

    let caster = ctx.spawn_character(player_character(TilePos::new(2, 2)));
    let sprites = ctx.cast_magic(
        caster,
        "super_strike",
        1,
        TilePos::new(2, 2),
        TilePos::new(6, 2),
        Relation::None,
    );
    assert_eq!(sprites.len(), 2);
    let (cast_sprite, target_sprite) = (sprites[0], sprites[1]);

    // Tick 1: cast sprite Waiting -> Flying (delay_ms == 0).
    ctx.run_ticks(1);
    assert_eq!(ctx.world().get::<MagicSprite>(target_sprite).unwrap().phase, MagicPhase::Waiting);

    // Ticks 2-3: cast sprite's life_frame (2) counts down to 0 -> Vanish.
    ctx.run_ticks(2);
    assert_eq!(ctx.world().get::<MagicSprite>(cast_sprite).unwrap().phase, MagicPhase::Vanish);
    assert_eq!(ctx.world().get::<MagicSprite>(target_sprite).unwrap().phase, MagicPhase::Waiting);

    // Tick 4: cast sprite's single Vanish wait_frame elapses -> Done, and
    // the target sprite must flip to Vanish in this same tick.
    ctx.run_ticks(1);
    assert_eq!(ctx.world().get::<MagicSprite>(cast_sprite).unwrap().phase, MagicPhase::Done);
    let target = ctx.world().get::<MagicSprite>(target_sprite).unwrap();
    assert_eq!(target.phase, MagicPhase::Vanish);
    assert_eq!(target.frame, 0);
}

/// `add_npc` spawns from a registered `CharacterDef`; an unknown key is a
/// no-op (spec §6.4 `addNpc`).
#[test]
fn add_npc_spawns_from_registered_def_and_rejects_unknown_key() {
    let mut ctx = new_context();
    let wolf = ctx.add_npc("wolf", TilePos::new(3, 3), Direction8::S, 9).unwrap();
    assert_eq!(ctx.get_npc(wolf).unwrap().def_key, "wolf");
    assert_eq!(ctx.get_npc(wolf).unwrap().sprite.tile_pos, TilePos::new(3, 3));
    assert!(ctx.add_npc("does_not_exist", TilePos::new(0, 0), Direction8::S, 0).is_none());
}

/// `delete_npc` removes the entity outright; `add_npc` then `delete_npc`
/// leaves no trace behind (spec §6.4, §8 "size unchanged" property).
#[test]
fn delete_npc_removes_the_entity() {
    let mut ctx = new_context();
    let wolf = ctx.add_npc("wolf", TilePos::new(1, 1), Direction8::S, 9).unwrap();
    assert!(ctx.delete_npc(wolf));
    assert!(ctx.get_npc(wolf).is_none());
    assert!(!ctx.delete_npc(wolf));
}

/// `set_npc_relation`/`set_npc_script`/`show_npc` mutate the targeted
/// NPC only (spec §6.4).
#[test]
fn set_relation_script_and_visibility_mutate_the_npc() {
    let mut ctx = new_context();
    let wolf = ctx.add_npc("wolf", TilePos::new(1, 1), Direction8::S, 9).unwrap();

    ctx.set_npc_relation(wolf, Relation::Friend);
    assert_eq!(ctx.get_npc(wolf).unwrap().relation, Relation::Friend);

    ctx.set_npc_script(wolf, "on_talk.lua");
    assert_eq!(ctx.get_npc(wolf).unwrap().script_file.as_deref(), Some("on_talk.lua"));

    ctx.show_npc(wolf, false);
    assert!(!ctx.get_npc(wolf).unwrap().is_visible);
}

/// `kill_all_enemies` force-kills every living enemy of the player and
/// leaves friends untouched (spec §6.4).
#[test]
fn kill_all_enemies_kills_enemies_and_spares_friends() {
    let mut ctx = new_context();
    let _hero = ctx.spawn_character(player_character(TilePos::new(0, 0)));
    let enemy = ctx.spawn_character(npc_character("bandit", 9, TilePos::new(1, 0), 100.0));
    let friend = ctx.add_npc("wolf", TilePos::new(2, 0), Direction8::S, 0).unwrap();
    ctx.set_npc_relation(friend, Relation::Friend);

    ctx.kill_all_enemies();

    assert!(ctx.get_npc(enemy).unwrap().is_death);
    assert!(!ctx.get_npc(friend).unwrap().is_death);
}

/// `add_obj_by_file`/`delete_obj` mirror `add_npc`/`delete_npc` for
/// objects (spec §6.4 `addObjByFile`/`deleteObj`).
#[test]
fn add_obj_by_file_spawns_from_registered_def() {
    use jianghu_sim::assets::{ObjConfig, ObjKind};
    use jianghu_sim::object::Obj;

    let mut ctx = new_context();
    ctx.world_mut().resource_mut::<jianghu_sim::context::AssetRegistryHandle>().0 = Box::new({
        let mut reg = InMemoryAssetRegistry::default();
        reg.characters.insert("wolf".to_string(), wolf_def());
        reg.objects.insert(
            "chest01".to_string(),
            ObjConfig {
                kind: ObjKind::Static,
                frame_begin: 0,
                frame_end: 7,
                damage: 0.0,
                script_file: None,
                script_file_right: None,
                timer_script_file: None,
                timer_script_interval_ms: 0.0,
            },
        );
        reg
    });

    let chest = ctx.add_obj_by_file("chest01", TilePos::new(4, 4), "chest_1").unwrap();
    let obj = ctx.world().get::<Obj>(chest).unwrap();
    assert_eq!(obj.tile_pos, TilePos::new(4, 4));
    assert_eq!(obj.frame_end, 7);

    assert!(ctx.delete_obj(chest));
    assert!(ctx.world().get::<Obj>(chest).is_none());
}

/// `save_npc`/`save_partner` split live NPCs by their `is_partner` flag
/// into the right `SnapshotStore` bucket (spec §4.9, §6.4).
#[test]
fn save_npc_and_save_partner_split_by_partner_flag() {
    let mut ctx = new_context();
    ctx.spawn_character(npc_character("bandit", 9, TilePos::new(1, 0), 100.0));
    let partner = ctx.add_npc("wolf", TilePos::new(2, 0), Direction8::S, 0).unwrap();
    if let Some(mut c) = ctx.world_mut().get_mut::<Character>(partner) {
        if let jianghu_sim::character::CharKind::Npc(npc) = &mut c.kind {
            npc.is_partner = true;
        }
    }

    ctx.save_npc("zone_a.map");
    ctx.save_partner("zone_a.map");

    let store = ctx.world().resource::<jianghu_sim::snapshot::SnapshotStore>();
    let zone = store.load_zone("zone_a.map").unwrap();
    assert_eq!(zone.npcs.len(), 1);
    assert_eq!(zone.npcs[0].name, "bandit");
    assert_eq!(zone.partners.len(), 1);
    assert_eq!(zone.partners[0].name, "wolf");
}
