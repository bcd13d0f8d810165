//! Typed command stream consumed by the battlefield.
//!
//! A script line becomes one [`Batch`]: a tick to a new time followed by the
//! commands on that line, executed left to right against post-tick state.
//! Names and ids are kept as raw strings; validating them is the engine's
//! job, because an invalid id is a silent no-op while an unknown archetype
//! is fatal.

use serde::{Deserialize, Serialize};

use crate::geometry::Coord;

/// One command against the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Create a unit of an archetype at a tile.
    Spawn {
        /// Archetype name.
        kind: String,
        /// Requested unit id.
        id: String,
        /// Zero-based target tile.
        at: Coord,
    },

    /// Walk a unit to a tile.
    Move {
        /// Unit to move.
        id: String,
        /// Zero-based target tile.
        to: Coord,
    },

    /// Attack along a named direction.
    Attack {
        /// Attacking unit.
        id: String,
        /// Direction name from the unit's attack set.
        direction: String,
    },

    /// Emit a snapshot of every living unit.
    State,
}

impl Command {
    /// Command word as written in scripts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "spawn",
            Self::Move { .. } => "move",
            Self::Attack { .. } => "attack",
            Self::State => "state",
        }
    }
}

/// A tick followed by the commands issued at that time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Batch {
    /// Time the battlefield advances to before running the commands.
    pub time: i64,
    /// Commands in execution order.
    pub commands: Vec<Command>,
}

impl Batch {
    /// Create a batch with no commands.
    #[must_use]
    pub const fn new(time: i64) -> Self {
        Self {
            time,
            commands: Vec::new(),
        }
    }

    /// Builder method to append a command.
    #[must_use]
    pub fn with(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder_keeps_order() {
        let batch = Batch::new(3)
            .with(Command::State)
            .with(Command::Attack {
                id: "a".into(),
                direction: "up".into(),
            });
        assert_eq!(batch.time, 3);
        let names: Vec<_> = batch.commands.iter().map(Command::name).collect();
        assert_eq!(names, vec!["state", "attack"]);
    }

    #[test]
    fn test_command_json_shape() {
        let cmd = Command::Move {
            id: "a".into(),
            to: Coord::new(0, 1),
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, r#"{"cmd":"move","id":"a","to":{"row":0,"col":1}}"#);
        let back: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cmd);
    }
}
