//! Save/restore across zone transitions (spec §4.9, §6.5, §8 scenario S3)
//!
//! Zone-keyed groups of character and object state, so re-entering a zone
//! restores exactly what was there when it was left — including NPCs the
//! player killed, moved, or whose AI was toggled off mid-fight.

use std::collections::HashMap;

use bevy::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::assets::Relation;
use crate::character::{CharacterState, CombatStats, StatusEffects};
use crate::geometry::TilePos;
use crate::npc_ai::NpcData;

/// Everything needed to rebuild one NPC `Character` on zone re-entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcSaveItem {
    pub name: String,
    pub def_key: String,
    pub relation: Relation,
    pub group: u16,
    pub tile: TilePos,
    pub state: CharacterState,
    pub life: f32,
    pub life_max: f32,
    pub mana: f32,
    pub mana_max: f32,
    pub thew: f32,
    pub thew_max: f32,
    pub combat: CombatStats,
    pub level: u32,
    pub exp: u64,
    pub status: StatusEffects,
    pub is_death: bool,
    pub ai_enabled: bool,
    pub fixed_path_cursor: usize,
    pub script_file: Option<String>,
}

impl NpcSaveItem {
    pub fn npc_data_template(&self, ai_type: crate::npc_ai::AiType, fixed_path: Vec<TilePos>, is_partner: bool) -> NpcData {
        NpcData {
            ai_type,
            ai_enabled: self.ai_enabled,
            stop_finding_target: false,
            is_partner,
            is_summoned_by_magic: false,
            fixed_path,
            fixed_path_cursor: self.fixed_path_cursor,
            is_loop_walk: false,
            magic_cache: Vec::new(),
            destination_attack_tile: None,
        }
    }
}

/// Object state saved per zone (mirrors `crate::object::SavedObjState` but
/// keyed by name within the zone's own group rather than the manager's
/// global flat map, so a whole zone's snapshot round-trips atomically).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjSaveItem {
    pub name: String,
    pub script_file: Option<String>,
    pub is_removed: bool,
    pub current_frame_index: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub npcs: Vec<NpcSaveItem>,
    pub partners: Vec<NpcSaveItem>,
    pub objs: Vec<ObjSaveItem>,
}

/// All zones' snapshots, keyed by zone file name (spec §4.9: "keyed by
/// zone file name").
#[derive(Debug, Default, Resource)]
pub struct SnapshotStore {
    zones: HashMap<String, ZoneSnapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_npc(&mut self, zone_file: &str, item: NpcSaveItem) {
        let zone = self.zones.entry(zone_file.to_string()).or_default();
        if let Some(existing) = zone.npcs.iter_mut().find(|n| n.name == item.name) {
            *existing = item;
        } else {
            zone.npcs.push(item);
        }
    }

    pub fn save_partner(&mut self, zone_file: &str, item: NpcSaveItem) {
        let zone = self.zones.entry(zone_file.to_string()).or_default();
        if let Some(existing) = zone.partners.iter_mut().find(|n| n.name == item.name) {
            *existing = item;
        } else {
            zone.partners.push(item);
        }
    }

    pub fn save_obj(&mut self, zone_file: &str, item: ObjSaveItem) {
        let zone = self.zones.entry(zone_file.to_string()).or_default();
        if let Some(existing) = zone.objs.iter_mut().find(|o| o.name == item.name) {
            *existing = item;
        } else {
            zone.objs.push(item);
        }
    }

    pub fn load_zone(&self, zone_file: &str) -> Option<&ZoneSnapshot> {
        self.zones.get(zone_file)
    }

    pub fn load_npc(&self, zone_file: &str, name: &str) -> Option<&NpcSaveItem> {
        self.zones.get(zone_file)?.npcs.iter().find(|n| n.name == name)
    }

    pub fn load_partner(&self, zone_file: &str, name: &str) -> Option<&NpcSaveItem> {
        self.zones.get(zone_file)?.partners.iter().find(|n| n.name == name)
    }

    /// Serialize every zone to a single JSON document (spec §6.5: the
    /// durable on-disk form uses `serde_json`).
    pub fn to_json(&self) -> Result<String, crate::error::SimError> {
        serde_json::to_string(&self.zones).map_err(|e| crate::error::SimError::SerializationMismatch(e.to_string()))
    }

    pub fn from_json(data: &str) -> Result<Self, crate::error::SimError> {
        let zones: HashMap<String, ZoneSnapshot> =
            serde_json::from_str(data).map_err(|e| crate::error::SimError::SerializationMismatch(e.to_string()))?;
        Ok(Self { zones })
    }
}
