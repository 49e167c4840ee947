//! Asset registry boundary (spec §6.1)
//!
//! The real asset store (decoded sprite sheets, NPC/object/magic
//! definitions keyed by file name) is an external collaborator. This
//! module defines the static config types it hands back and the
//! `AssetRegistry` trait the core queries them through, plus an
//! in-memory reference implementation used by tests and the headless
//! scenario runner.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::character::CharacterState;

/// `Kind` from spec §3 CharacterDef.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterKind {
    Player = 9,
    Normal = 0,
    Fighter = 1,
    Follower = 3,
    GroundAnimal = 4,
    Eventer = 5,
    AfraidPlayer = 6,
    Flyer = 7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    Friend,
    Enemy,
    Neutral,
    None,
}

/// Immutable, file-backed character configuration (spec §3 CharacterDef).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDef {
    pub name: String,
    pub sprite_sheet_key: String,
    pub kind: CharacterKind,
    pub relation: Relation,
    /// 0 = PathOneStep-ish default, 1 = PerfectMaxNpcTry preference.
    pub path_finder: u8,
    pub vision_radius: i32,
    pub chase_radius: i32,
    pub attack_radius: i32,
    pub life_low_percent: f32,
    pub magic_to_use_when_life_low: Option<String>,
    pub keep_radius_when_life_low: i32,
    pub keep_radius_when_friend_death: i32,
    pub magic_to_use_when_death: Option<String>,
    pub magic_direction_when_death: u8,
    pub magic_to_use_when_be_attacked: Option<String>,
    pub magic_direction_when_be_attacked: u8,
    pub death_script: Option<String>,
    pub drop_table_key: Option<String>,
}

/// Per-state sound/image reference for a loaded NPC sprite sheet band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcResourceEntry {
    pub image: String,
    pub sound: Option<String>,
}

pub type NpcResource = HashMap<CharacterState, NpcResourceEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjKind {
    Dynamic,
    Static,
    Body,
    LoopingSound,
    RandSound,
    Door,
    Trap,
    Drop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjConfig {
    pub kind: ObjKind,
    pub frame_begin: u32,
    pub frame_end: u32,
    pub damage: f32,
    pub script_file: Option<String>,
    pub script_file_right: Option<String>,
    pub timer_script_file: Option<String>,
    pub timer_script_interval_ms: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectResource {
    pub image: String,
    pub sound: Option<String>,
}

/// One of the `Region` shapes for `RegionBased` magic (spec §3 MagicDef).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegionShape {
    Square,
    Cross,
    Rectangle,
    IsoTriangle,
    V,
}

/// Per-level effect magnitudes for a `MagicDef`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MagicLevelEffect {
    pub damage: f32,
    pub mana_cost: f32,
    pub extra: f32,
}

/// Static magic shape/behavior configuration (spec §3 MagicDef, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MagicDef {
    pub name: String,
    pub move_kind: u8,
    pub speed: f32,
    pub life_frame: u32,
    pub wait_frame: u32,
    pub range_radius: i32,
    pub region: RegionShape,
    pub pass_through: bool,
    pub pass_through_wall: bool,
    pub attack_all: bool,
    pub trace_enemy: bool,
    pub bounce: bool,
    pub bounce_hurt: f32,
    pub vibrating_screen: bool,
    pub alpha_blend: bool,
    pub frames_per_direction: u32,
    pub interval_ms: f32,
    /// Index 0 = level 1 .. index 9 = level 10.
    pub levels: Vec<MagicLevelEffect>,
}

impl MagicDef {
    pub fn level_effect(&self, level: u8) -> MagicLevelEffect {
        let idx = (level.clamp(1, 10) - 1) as usize;
        self.levels
            .get(idx)
            .copied()
            .unwrap_or(MagicLevelEffect { damage: 0.0, mana_cost: 0.0, extra: 0.0 })
    }
}

/// Decoded sprite sheet metadata handed back by the asset store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsfData {
    pub width: u32,
    pub height: u32,
    pub directions: u32,
    pub frames_per_direction: u32,
    pub interval_ms: f32,
    pub left: i32,
    pub bottom: i32,
}

/// Read-only mapping from key to decoded definition, provided externally.
pub trait AssetRegistry: Send + Sync {
    fn character_def(&self, key: &str) -> Option<&CharacterDef>;
    fn npc_resource(&self, key: &str) -> Option<&NpcResource>;
    fn object_def(&self, key: &str) -> Option<&ObjConfig>;
    fn object_resource(&self, key: &str) -> Option<&ObjectResource>;
    fn magic_def(&self, key: &str) -> Option<&MagicDef>;
    fn sprite_sheet(&self, path: &str) -> Option<&AsfData>;
}

/// Reference in-memory registry: satisfies `AssetRegistry` for tests and
/// the headless scenario runner. Production embedders supply their own
/// (decoding real `.asf`/`.ini` assets), since the real store is external.
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    pub characters: HashMap<String, CharacterDef>,
    pub npc_resources: HashMap<String, NpcResource>,
    pub objects: HashMap<String, ObjConfig>,
    pub object_resources: HashMap<String, ObjectResource>,
    pub magics: HashMap<String, MagicDef>,
    pub sprite_sheets: HashMap<String, AsfData>,
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn character_def(&self, key: &str) -> Option<&CharacterDef> {
        self.characters.get(key)
    }

    fn npc_resource(&self, key: &str) -> Option<&NpcResource> {
        self.npc_resources.get(key)
    }

    fn object_def(&self, key: &str) -> Option<&ObjConfig> {
        self.objects.get(key)
    }

    fn object_resource(&self, key: &str) -> Option<&ObjectResource> {
        self.object_resources.get(key)
    }

    fn magic_def(&self, key: &str) -> Option<&MagicDef> {
        self.magics.get(key)
    }

    fn sprite_sheet(&self, path: &str) -> Option<&AsfData> {
        self.sprite_sheets.get(path)
    }
}
