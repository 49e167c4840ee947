//! WorldContext (spec §6.4, §9 redesign item: "replace global singletons")
//!
//! The legacy engine reached every manager through process-wide statics.
//! `WorldContext` replaces that with one explicit owner: a headless bevy
//! `App` plus the asset/script collaborators handed in at construction.
//! Callers drive the simulation entirely through this type's methods —
//! nothing outside it reaches into the `App` directly.

use bevy::app::ScheduleRunnerPlugin;
use bevy::prelude::*;

use crate::assets::AssetRegistry;
use crate::commands::{CommandBuffer, SimCommand};
use crate::magic::{MagicManager, MagicSprite};
use crate::npc_manager::NpcManager;
use crate::object::ObjManager;
use crate::rng::GameRng;
use crate::script::{ScriptQueue, ScriptRunner};
use crate::snapshot::SnapshotStore;
use crate::terrain::MapBase;
use crate::tick::SimPlugin;
use crate::view::ViewCache;

/// Wraps the asset registry so it can live in the ECS world as a `Resource`
/// (trait objects don't implement `Resource` on their own).
#[derive(Resource)]
pub struct AssetRegistryHandle(pub Box<dyn AssetRegistry>);

#[derive(Resource)]
pub struct ScriptRunnerHandle(pub Box<dyn ScriptRunner>);

#[derive(Resource)]
pub struct MapResource(pub MapBase);

/// Current zone file name, used to key saved object/NPC state (spec §4.8,
/// §4.9).
#[derive(Resource, Default, Clone)]
pub struct CurrentZone(pub String);

/// Owns the whole simulation: ECS world, every manager resource, the
/// asset/script collaborators, and the deterministic PRNG.
pub struct WorldContext {
    app: App,
}

impl WorldContext {
    pub fn new(
        seed: Option<u64>,
        map: MapBase,
        registry: Box<dyn AssetRegistry>,
        script_runner: Box<dyn ScriptRunner>,
        zone_file: impl Into<String>,
    ) -> Self {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(
            std::time::Duration::from_secs_f64(1.0 / 60.0),
        )));

        let rng = match seed {
            Some(s) => GameRng::from_seed(s),
            None => GameRng::from_entropy(),
        };

        app.insert_resource(rng)
            .insert_resource(MapResource(map))
            .insert_resource(AssetRegistryHandle(registry))
            .insert_resource(ScriptRunnerHandle(script_runner))
            .insert_resource(CurrentZone(zone_file.into()))
            .insert_resource(CommandBuffer::default())
            .insert_resource(ScriptQueue::default())
            .insert_resource(NpcManager::new())
            .insert_resource(ObjManager::default())
            .insert_resource(MagicManager::default())
            .insert_resource(ViewCache::default())
            .insert_resource(SnapshotStore::new())
            .add_plugins(SimPlugin);

        Self { app }
    }

    /// Advance the simulation by one fixed tick (spec §4.10 order:
    /// NPC AI -> objects -> magic -> view cache), then resolve any
    /// `SpawnMagic` commands the tick produced (life-low casts, death
    /// magic, be-attacked magic) so they're live before the next tick.
    pub fn tick(&mut self) {
        self.app.update();
        self.resolve_pending_casts();
    }

    fn resolve_pending_casts(&mut self) {
        let drained = self.world_mut().resource_mut::<CommandBuffer>().drain();
        let (to_cast, rest): (Vec<_>, Vec<_>) =
            drained.into_iter().partition(|c| matches!(c, SimCommand::SpawnMagic { .. }));

        for command in rest {
            self.world_mut().resource_mut::<CommandBuffer>().push(command);
        }

        for command in to_cast {
            let SimCommand::SpawnMagic { caster, magic_key, level, origin, destination } = command else {
                unreachable!()
            };
            let alignment = self
                .world()
                .get::<crate::character::Character>(caster)
                .map(|c| c.relation)
                .unwrap_or(crate::assets::Relation::None);
            self.cast_magic(caster, &magic_key, level, origin, destination, alignment);
        }
    }

    /// Advance by `n` ticks, e.g. for scenario scripts that assert on
    /// state after a fixed number of frames.
    pub fn run_ticks(&mut self, n: u32) {
        for _ in 0..n {
            self.tick();
        }
    }

    pub fn world(&self) -> &World {
        self.app.world()
    }

    pub fn world_mut(&mut self) -> &mut World {
        self.app.world_mut()
    }

    pub fn current_zone(&self) -> String {
        self.world().resource::<CurrentZone>().0.clone()
    }

    pub fn set_zone(&mut self, zone_file: impl Into<String>) {
        self.world_mut().resource_mut::<CurrentZone>().0 = zone_file.into();
    }

    pub fn spawn_character(&mut self, character: crate::character::Character) -> Entity {
        self.world_mut().spawn(character).id()
    }

    pub fn spawn_obj(&mut self, obj: crate::object::Obj) -> Entity {
        self.world_mut().spawn(obj).id()
    }

    /// Cast `magic_key` from `caster`, spawning whatever sprites the
    /// formation produces (spec §4.5). A no-op if the key is unknown.
    pub fn cast_magic(
        &mut self,
        caster: Entity,
        magic_key: &str,
        level: u8,
        origin: crate::geometry::TilePos,
        destination: crate::geometry::TilePos,
        alignment: crate::assets::Relation,
    ) -> Vec<Entity> {
        let world = self.world_mut();
        let sprites = world.resource_scope(|world, registry: Mut<AssetRegistryHandle>| {
            let mut rng = world.resource_mut::<GameRng>();
            crate::magic::engine::cast(registry.0.as_ref(), magic_key, level, caster, alignment, origin, destination, &mut rng)
        });

        let mut entities = Vec::with_capacity(sprites.len());
        let mut statics = Vec::new();
        let mut cast_entity = None;
        let mut waiters = Vec::new();
        for s in sprites {
            let is_static = s.is_static;
            let is_waiter = s.delay_ms == crate::magic::WAIT_FOR_CAST_SENTINEL;
            let e = world.spawn(s).id();
            entities.push(e);
            if is_static {
                statics.push(e);
            }
            if is_waiter {
                waiters.push(e);
            } else if is_static {
                cast_entity = Some(e);
            }
        }
        // SuperMode (spec §4.5 item 15): wire each waiting target sprite to
        // the cast sprite spawned alongside it in this same batch, now that
        // both have real entity ids.
        if let Some(cast_e) = cast_entity {
            for waiter in &waiters {
                if let Some(mut sprite) = world.get_mut::<MagicSprite>(*waiter) {
                    sprite.waits_on = Some(cast_e);
                }
            }
        }
        world.resource_mut::<MagicManager>().active.extend(statics);
        entities
    }

    /// Drain every `AddBody` command queued since the last call (spec
    /// §4.7: death -> body object). The embedder owns the drop-table
    /// lookup, so it spawns the actual `Obj` itself from these requests.
    pub fn take_pending_bodies(&mut self) -> Vec<SimCommand> {
        let mut buffer = self.world_mut().resource_mut::<CommandBuffer>();
        let drained = buffer.drain();
        let (bodies, rest): (Vec<_>, Vec<_>) = drained.into_iter().partition(|c| matches!(c, SimCommand::AddBody { .. }));
        for command in rest {
            buffer.push(command);
        }
        bodies
    }

    /// Drain every `PlaySound` command queued since the last call (spec
    /// §4.8: `LoopingSound`/`RandSound` objects). The embedder owns actual
    /// audio playback.
    pub fn take_pending_sounds(&mut self) -> Vec<SimCommand> {
        let mut buffer = self.world_mut().resource_mut::<CommandBuffer>();
        let drained = buffer.drain();
        let (sounds, rest): (Vec<_>, Vec<_>) = drained.into_iter().partition(|c| matches!(c, SimCommand::PlaySound { .. }));
        for command in rest {
            buffer.push(command);
        }
        sounds
    }

    /// Globally disable NPC AI (spec §4.7: cutscene entry). Also drops
    /// every fighter's pending attack target, per spec §4.7/§8 invariant 7
    /// ("disableAI also cancels pending attacks").
    pub fn disable_ai(&mut self) {
        self.world_mut().resource_mut::<NpcManager>().disable_ai();
        self.cancel_all_fighter_attacks();
    }

    pub fn enable_ai(&mut self) {
        self.world_mut().resource_mut::<NpcManager>().enable_ai();
    }

    /// Clear every fighter's pending melee/ranged attack target (spec
    /// §4.7, typically paired with `disable_ai` at a cutscene's start).
    pub fn cancel_all_fighter_attacks(&mut self) {
        let world = self.world_mut();
        let mut query = world.query::<&mut crate::character::Character>();
        for mut c in query.iter_mut(world) {
            if let crate::character::CharKind::Npc(npc) = &mut c.kind {
                npc.destination_attack_tile = None;
            }
            c.pending_attack_dest = None;
        }
    }

    /// Spawn a new NPC from `def_key`'s `CharacterDef` at `tile` (spec §6.4
    /// `addNpc`). Returns `None` if the def is unknown. Stats default to a
    /// flat baseline, since `CharacterDef` carries AI tuning, not level
    /// stats — the embedder is expected to adjust them after spawn if it
    /// needs something else.
    pub fn add_npc(
        &mut self,
        def_key: &str,
        tile: crate::geometry::TilePos,
        facing: crate::geometry::Direction8,
        group: u16,
    ) -> Option<Entity> {
        let def = self.world().resource::<AssetRegistryHandle>().0.character_def(def_key)?.clone();
        let character = crate::character::Character {
            name: def.name.clone(),
            def_key: def_key.to_string(),
            kind: crate::character::CharKind::Npc(crate::npc_ai::NpcData::default()),
            character_kind: def.kind,
            relation: def.relation,
            group,
            sprite: crate::sprite::SpriteState::new(tile, facing),
            state: crate::character::CharacterState::Stand,
            life: 100.0,
            life_max: 100.0,
            mana: 0.0,
            mana_max: 0.0,
            thew: 0.0,
            thew_max: 0.0,
            combat: crate::character::CombatStats::default(),
            walk_speed: 1.0,
            level: 1,
            exp: 0,
            status: crate::character::StatusEffects::default(),
            cached_path: Vec::new(),
            follow_target: None,
            pending_attack_dest: None,
            is_death: false,
            is_death_invoked: false,
            is_in_loop_walk: false,
            is_visible: true,
            invincible_seconds: 0.0,
            death_timer_ms: 0.0,
            revive_ms: 0.0,
            script_file: None,
        };
        Some(self.spawn_character(character))
    }

    /// Despawn an NPC (spec §6.4 `deleteNpc`). Returns `false` if the
    /// entity was already gone.
    pub fn delete_npc(&mut self, entity: Entity) -> bool {
        self.world_mut().despawn(entity)
    }

    pub fn get_npc(&self, entity: Entity) -> Option<&crate::character::Character> {
        self.world().get::<crate::character::Character>(entity)
    }

    pub fn set_npc_relation(&mut self, entity: Entity, relation: crate::assets::Relation) {
        if let Some(mut c) = self.world_mut().get_mut::<crate::character::Character>(entity) {
            c.relation = relation;
        }
    }

    /// Set the script an NPC runs on interaction (spec §6.4 `setNpcScript`).
    pub fn set_npc_script(&mut self, entity: Entity, path: impl Into<String>) {
        if let Some(mut c) = self.world_mut().get_mut::<crate::character::Character>(entity) {
            c.script_file = Some(path.into());
        }
    }

    pub fn show_npc(&mut self, entity: Entity, visible: bool) {
        if let Some(mut c) = self.world_mut().get_mut::<crate::character::Character>(entity) {
            c.is_visible = visible;
        }
    }

    /// Force-kill every living enemy of the player (spec §6.4
    /// `killAllEnemies`). A no-op if there's no player character yet.
    pub fn kill_all_enemies(&mut self) {
        let world = self.world_mut();
        let mut query = world.query::<&crate::character::Character>();
        let Some(player) = query.iter(world).find(|c| matches!(c.kind, crate::character::CharKind::Player)).cloned()
        else {
            return;
        };
        let targets: Vec<Entity> = {
            let mut with_entity = world.query::<(Entity, &crate::character::Character)>();
            with_entity
                .iter(world)
                .filter(|(_, c)| c.is_alive() && NpcManager::is_enemy(&player, c))
                .map(|(e, _)| e)
                .collect()
        };

        world.resource_scope(|world, mut npc_manager: Mut<NpcManager>| {
            world.resource_scope(|world, mut commands: Mut<CommandBuffer>| {
                for entity in targets {
                    if let Some(mut c) = world.get_mut::<crate::character::Character>(entity) {
                        if c.force_death() {
                            npc_manager.record_death(c.sprite.tile_pos, c.group, &c.name, 10_000.0, &mut commands);
                        }
                    }
                }
            });
        });
    }

    /// Spawn a new `Obj` from `def_key`'s `ObjConfig` at `tile` (spec §6.4
    /// `addObjByFile`). Returns `None` if the def is unknown.
    pub fn add_obj_by_file(
        &mut self,
        def_key: &str,
        tile: crate::geometry::TilePos,
        name: impl Into<String>,
    ) -> Option<Entity> {
        let def = self.world().resource::<AssetRegistryHandle>().0.object_def(def_key)?.clone();
        let obj = crate::object::Obj {
            name: name.into(),
            def_key: def_key.to_string(),
            kind: def.kind,
            tile_pos: tile,
            current_frame_index: def.frame_begin,
            frame_begin: def.frame_begin,
            frame_end: def.frame_end,
            script_file: def.script_file.clone(),
            script_file_right: def.script_file_right.clone(),
            timer_script_file: def.timer_script_file.clone(),
            timer_script_interval_ms: def.timer_script_interval_ms,
            timer_elapsed_ms: 0.0,
            anim_elapsed_ms: 0.0,
            damage: def.damage,
            milliseconds_to_remove: None,
            is_removed: false,
            owner_team: 0,
            trigger_radius: 0.0,
        };
        Some(self.spawn_obj(obj))
    }

    /// Despawn an object (spec §6.4 `deleteObj`). Returns `false` if the
    /// entity was already gone.
    pub fn delete_obj(&mut self, entity: Entity) -> bool {
        self.world_mut().despawn(entity)
    }

    /// Gather every live non-partner, non-magic-summoned NPC's state into
    /// the zone snapshot keyed `file_name` (spec §4.9, §6.4 `saveNpc`).
    pub fn save_npc(&mut self, file_name: &str) {
        self.save_npcs_filtered(file_name, false);
    }

    /// Same as `save_npc`, restricted to partner-flagged NPCs (spec §6.4
    /// `savePartner`).
    pub fn save_partner(&mut self, file_name: &str) {
        self.save_npcs_filtered(file_name, true);
    }

    fn save_npcs_filtered(&mut self, file_name: &str, partners_only: bool) {
        let world = self.world_mut();
        let mut query = world.query::<&crate::character::Character>();
        let items: Vec<crate::snapshot::NpcSaveItem> = query
            .iter(world)
            .filter_map(|c| {
                let crate::character::CharKind::Npc(npc) = &c.kind else { return None };
                if npc.is_partner != partners_only || npc.is_summoned_by_magic {
                    return None;
                }
                Some(crate::snapshot::NpcSaveItem {
                    name: c.name.clone(),
                    def_key: c.def_key.clone(),
                    relation: c.relation,
                    group: c.group,
                    tile: c.sprite.tile_pos,
                    state: c.state,
                    life: c.life,
                    life_max: c.life_max,
                    mana: c.mana,
                    mana_max: c.mana_max,
                    thew: c.thew,
                    thew_max: c.thew_max,
                    combat: c.combat,
                    level: c.level,
                    exp: c.exp,
                    status: c.status.clone(),
                    is_death: c.is_death,
                    ai_enabled: npc.ai_enabled,
                    fixed_path_cursor: npc.fixed_path_cursor,
                    script_file: c.script_file.clone(),
                })
            })
            .collect();

        let mut store = world.resource_mut::<SnapshotStore>();
        for item in items {
            if partners_only {
                store.save_partner(file_name, item);
            } else {
                store.save_npc(file_name, item);
            }
        }
    }
}
