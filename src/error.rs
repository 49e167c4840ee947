//! Error taxonomy (see spec §7: Error Handling Design).
//!
//! The core never propagates errors out of a tick `update`; these variants
//! are for the boundary-facing operations that do return `Result`
//! (snapshot load, scenario/config parsing). Internal per-tick recoveries
//! are logged via `bevy::log::warn!`/`error!` and the call locally no-ops.

use std::fmt;

#[derive(Debug)]
pub enum SimError {
    /// `getX(key)` on the asset registry returned nothing.
    MissingAsset { kind: &'static str, key: String },
    /// An operation was given an out-of-map tile.
    InvalidPosition { x: i32, y: i32 },
    /// A cross-invariant was violated (e.g. `death()` called twice).
    CrossInvariant(String),
    /// A snapshot referenced an unknown key and could not be reconstructed.
    SerializationMismatch(String),
    /// The script collaborator rejected a launch.
    ScriptLaunchFailed(String),
    /// Scenario/config file could not be parsed.
    Config(String),
    /// Underlying I/O failure loading a scenario file.
    Io(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::MissingAsset { kind, key } => {
                write!(f, "missing asset: {kind} '{key}'")
            }
            SimError::InvalidPosition { x, y } => write!(f, "invalid position ({x}, {y})"),
            SimError::CrossInvariant(msg) => write!(f, "cross invariant violated: {msg}"),
            SimError::SerializationMismatch(msg) => write!(f, "serialization mismatch: {msg}"),
            SimError::ScriptLaunchFailed(msg) => write!(f, "script launch failed: {msg}"),
            SimError::Config(msg) => write!(f, "invalid configuration: {msg}"),
            SimError::Io(msg) => write!(f, "i/o error: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

impl From<std::io::Error> for SimError {
    fn from(e: std::io::Error) -> Self {
        SimError::Io(e.to_string())
    }
}
