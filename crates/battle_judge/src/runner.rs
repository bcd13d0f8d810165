//! Script runner.
//!
//! Reads a script line by line and executes each batch against a single
//! [`BattleField`] before reading the next line. Snapshots are written to the
//! output as soon as a `state` command produces them, so a fatal error later
//! in the script never swallows earlier output.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use battle_core::battlefield::{BattleField, CommandOutcome};
use battle_core::config::BattleConfig;
use battle_core::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

use crate::error::{JudgeError, Result};
use crate::script::{ScriptLine, ScriptReader};

/// How snapshots are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One line per unit followed by `---`.
    #[default]
    Text,
    /// One JSON object per snapshot.
    Json,
}

/// Judge configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct JudgeConfig {
    /// Engine settings.
    pub battle: BattleConfig,
    /// Snapshot format.
    pub format: OutputFormat,
}

/// Totals for a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Script lines executed.
    pub batches: usize,
    /// Snapshots written.
    pub snapshots: usize,
    /// Simulation time at the end.
    pub final_time: i64,
    /// Units alive at the end.
    pub units_alive: usize,
    /// Hash of the final battlefield state.
    pub state_hash: u64,
}

/// Runs scripts against a fresh battlefield.
#[derive(Debug, Clone, Default)]
pub struct Judge {
    config: JudgeConfig,
}

impl Judge {
    /// Create a judge with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a judge with custom configuration.
    pub fn with_config(config: JudgeConfig) -> Self {
        Self { config }
    }

    /// The active configuration.
    pub fn config(&self) -> &JudgeConfig {
        &self.config
    }

    /// Run a whole script, writing snapshots to `output`.
    ///
    /// # Errors
    ///
    /// Stops at the first fatal error. Everything written before it stays
    /// written.
    pub fn run<R: BufRead, W: Write>(&self, input: R, output: &mut W) -> Result<RunSummary> {
        let mut reader = ScriptReader::new(input);
        let header = reader.read_header()?;
        let mut field = BattleField::from_heights(
            header.rows,
            header.cols,
            header.heights,
            self.config.battle,
        )?;
        tracing::debug!(
            rows = header.rows,
            cols = header.cols,
            policy = %field.policy(),
            "battlefield ready"
        );

        let mut batches = 0usize;
        let mut snapshots = 0usize;
        while let Some(line) = reader.next_batch()? {
            snapshots += self.execute_line(&mut field, line, output)?;
            batches += 1;
        }
        output.flush()?;

        Ok(RunSummary {
            batches,
            snapshots,
            final_time: field.time(),
            units_alive: field.units().len(),
            state_hash: field.state_hash(),
        })
    }

    /// Tick, run the line's commands, then raise its fault if it has one.
    fn execute_line<W: Write>(
        &self,
        field: &mut BattleField,
        line: ScriptLine,
        output: &mut W,
    ) -> Result<usize> {
        let ScriptLine { line, batch, fault } = line;
        let at_line = |source| JudgeError::Battle { line, source };

        let events = field.tick(batch.time).map_err(at_line)?;
        if !events.deaths.is_empty() {
            tracing::debug!(time = batch.time, deaths = events.deaths.len(), "tick");
        }

        let mut written = 0;
        for command in &batch.commands {
            if let CommandOutcome::State(snapshot) = field.execute(command).map_err(at_line)? {
                self.write_snapshot(&snapshot, output)?;
                written += 1;
            }
        }
        output.flush()?;

        match fault {
            Some(fault) => Err(fault.into()),
            None => Ok(written),
        }
    }

    fn write_snapshot<W: Write>(&self, snapshot: &Snapshot, output: &mut W) -> io::Result<()> {
        match self.config.format {
            OutputFormat::Text => write!(output, "{snapshot}"),
            OutputFormat::Json => writeln!(output, "{}", snapshot.to_json_line()),
        }
    }

    /// Run a script `runs` times and check every run ends in the same state.
    ///
    /// # Errors
    ///
    /// Propagates the first run's error, and returns
    /// [`JudgeError::Nondeterministic`] if final hashes differ.
    pub fn verify(&self, script: &str, runs: u32) -> Result<RunSummary> {
        let mut hashes = BTreeSet::new();
        let mut last = None;
        for run in 0..runs.max(1) {
            let summary = self.run(script.as_bytes(), &mut io::sink())?;
            tracing::debug!(run, hash = summary.state_hash, "verification run");
            hashes.insert(summary.state_hash);
            last = Some(summary);
        }

        if hashes.len() > 1 {
            return Err(JudgeError::Nondeterministic {
                runs,
                distinct: hashes.len(),
            });
        }
        last.ok_or(JudgeError::Nondeterministic { runs, distinct: 0 })
    }
}
