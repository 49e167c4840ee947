//! Script collaborator boundary (spec §6.2, §9 re-entrancy item)
//!
//! The scripting interpreter itself is out of scope. `ScriptRunner` is the
//! trait a host embeds to actually execute a script; `queue_script` is the
//! *only* sanctioned entry point from within a tick (serializes death
//! scripts so N simultaneous NPC deaths still fire in deterministic
//! insertion order). `run_script` is fire-and-forget and may only be
//! invoked from outside the simulation loop.

use bevy::prelude::{Entity, Resource};

pub trait ScriptRunner: Send + Sync {
    fn run_script(&self, path: &str, subject: Option<Entity>);
    fn script_base_path(&self) -> &str;
}

/// A `ScriptRunner` that drops every script — used by tests and the
/// headless scenario runner, where no real interpreter is wired up.
#[derive(Default)]
pub struct NullScriptRunner;

impl ScriptRunner for NullScriptRunner {
    fn run_script(&self, _path: &str, _subject: Option<Entity>) {}

    fn script_base_path(&self) -> &str {
        ""
    }
}

#[derive(Debug, Clone)]
pub struct QueuedScript {
    pub path: String,
    pub subject: Option<Entity>,
}

/// FIFO queue draining serially (spec §5: "death scripts are queued, not
/// executed immediately").
#[derive(Resource, Default)]
pub struct ScriptQueue {
    queue: std::collections::VecDeque<QueuedScript>,
}

impl ScriptQueue {
    pub fn enqueue(&mut self, path: String, subject: Option<Entity>) {
        self.queue.push_back(QueuedScript { path, subject });
    }

    /// Drain the queue, running each script through `runner` in insertion
    /// order. Call once per tick, outside any entity iteration.
    pub fn drain(&mut self, runner: &dyn ScriptRunner) {
        while let Some(script) = self.queue.pop_front() {
            runner.run_script(&script.path, script.subject);
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
