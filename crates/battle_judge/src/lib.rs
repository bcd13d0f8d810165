//! Script-driven judge for height-grid battles.
//!
//! This crate turns a text script into a typed command stream, runs it
//! against a [`battle_core::battlefield::BattleField`] and prints snapshots.
//!
//! # Streams
//!
//! - **stdin** (or `--input`): the script
//! - **stdout**: snapshots, as text blocks or JSON lines
//! - **stderr**: logs
//!
//! # Example
//!
//! ```bash
//! printf '1 3\n0 0 0\n1 spawn footman a 1 1\n2 state\n' | cargo run -p battle_judge -- run
//!
//! # Check that replays agree
//! cargo run -p battle_judge -- verify --input duel.txt --runs 5
//! ```

pub mod error;
pub mod runner;
pub mod script;

pub use error::{JudgeError, ScriptError};
pub use runner::{Judge, JudgeConfig, OutputFormat, RunSummary};
pub use script::{parse_line, Header, ScriptLine, ScriptReader};
