//! jianghu-sim - core simulation engine for a 2D isometric action-RPG
//!
//! Headless, deterministic, and embedder-agnostic: rendering, audio,
//! input, and the scripting interpreter are all external collaborators
//! reached through trait boundaries (`AssetRegistry`, `ScriptRunner`).
//! This crate owns world state, tick order, and the rules for how
//! characters, objects, and magic sprites interact.

pub mod assets;
pub mod character;
pub mod cli;
pub mod collision;
pub mod commands;
pub mod context;
pub mod error;
pub mod geometry;
pub mod headless;
pub mod magic;
pub mod npc_ai;
pub mod npc_manager;
pub mod object;
pub mod rng;
pub mod script;
pub mod snapshot;
pub mod sprite;
pub mod terrain;
pub mod tick;
pub mod view;

pub use context::WorldContext;
pub use error::SimError;
