//! Deferred command buffer (spec §9 redesign item: "Deep callbacks during
//! iteration")
//!
//! AI, traps, and magic collisions all want to mutate entities other than
//! the one currently being iterated (damage a target, spawn a retaliation
//! sprite, add a body object, queue a death script). Doing that inline
//! would invalidate the iterator or re-enter a manager mid-update. Instead
//! each system pushes a `SimCommand` here; the owning manager drains the
//! buffer once its iteration pass completes.

use bevy::prelude::{Entity, Resource};

use crate::geometry::TilePos;

#[derive(Debug, Clone)]
pub enum SimCommand {
    /// Cast a magic formation from `caster` toward `destination`.
    SpawnMagic {
        caster: Entity,
        magic_key: String,
        level: u8,
        origin: TilePos,
        destination: TilePos,
    },
    /// Apply damage to `target`. `attacker` is `None` for environmental
    /// sources (e.g. trap damage with no owning character).
    Damage {
        target: Entity,
        amount: f32,
        attacker: Option<Entity>,
    },
    /// Spawn a `Body` object at `tile` for a just-dead NPC.
    AddBody {
        tile: TilePos,
        npc_name: String,
        revive_ms: f32,
    },
    /// Enqueue a script for serialized, later execution.
    QueueScript { path: String, subject: Option<Entity> },
    /// Move an entity to a new tile outright (e.g. life-low retreat).
    Reposition { entity: Entity, tile: TilePos },
    /// Play `sound` positionally at `tile` (spec §4.8: `LoopingSound`/
    /// `RandSound` objects). Actual playback is the embedder's job.
    PlaySound { tile: TilePos, sound: String },
}

/// Per-tick command queue. Cleared by `drain` after its owning manager's
/// update pass.
#[derive(Debug, Default, Resource)]
pub struct CommandBuffer {
    commands: Vec<SimCommand>,
}

impl CommandBuffer {
    pub fn push(&mut self, command: SimCommand) {
        self.commands.push(command);
    }

    pub fn drain(&mut self) -> Vec<SimCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
