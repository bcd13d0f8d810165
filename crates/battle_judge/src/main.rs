//! Height-grid battle judge.
//!
//! Reads a battle script, executes it and prints a snapshot for every
//! `state` command.
//!
//! # Usage
//!
//! ```bash
//! # Read the script from stdin
//! cargo run -p battle_judge -- run < duel.txt
//!
//! # Shared tiles, JSON snapshots
//! cargo run -p battle_judge -- run --input duel.txt --occupancy shared --format json
//!
//! # Replay a script several times and compare final states
//! cargo run -p battle_judge -- verify --input duel.txt --runs 5
//! ```
//!
//! A non-increasing tick time stops the run with exit status 1.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use battle_core::config::BattleConfig;
use battle_core::occupancy::OccupancyPolicy;
use battle_judge::error::Result;
use battle_judge::{Judge, JudgeConfig, OutputFormat};

#[derive(Parser)]
#[command(name = "battle-judge")]
#[command(about = "Deterministic judge for scripted height-grid battles")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script and print snapshots
    Run {
        /// Script file (stdin when absent)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// RON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Tile occupancy policy, overrides the configuration file
        #[arg(long, value_parser = parse_policy)]
        occupancy: Option<OccupancyPolicy>,

        /// Snapshot format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Verify determinism by replaying a script several times
    Verify {
        /// Script file (stdin when absent)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// RON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,
    },
}

fn parse_policy(value: &str) -> std::result::Result<OccupancyPolicy, String> {
    value.parse()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr, stdout carries snapshots
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            occupancy,
            format,
        } => cmd_run(input.as_deref(), config.as_deref(), occupancy, format),
        Commands::Verify {
            input,
            config,
            runs,
        } => cmd_verify(input.as_deref(), config.as_deref(), runs),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run aborted");
            eprintln!("battle-judge: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<BattleConfig> {
    match path {
        Some(path) => Ok(BattleConfig::load(path)?),
        None => Ok(BattleConfig::default()),
    }
}

fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    Ok(match path {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(BufReader::new(io::stdin())),
    })
}

/// Run a script and print snapshots
fn cmd_run(
    input: Option<&Path>,
    config: Option<&Path>,
    occupancy: Option<OccupancyPolicy>,
    format: OutputFormat,
) -> Result<()> {
    let mut battle = load_config(config)?;
    if let Some(policy) = occupancy {
        battle = battle.with_occupancy(policy);
    }

    let judge = Judge::with_config(JudgeConfig { battle, format });
    let stdout = io::stdout();
    let summary = judge.run(open_input(input)?, &mut stdout.lock())?;

    tracing::info!(
        batches = summary.batches,
        snapshots = summary.snapshots,
        final_time = summary.final_time,
        "run complete"
    );
    Ok(())
}

/// Verify determinism by replaying a script several times
fn cmd_verify(input: Option<&Path>, config: Option<&Path>, runs: u32) -> Result<()> {
    let battle = load_config(config)?;
    let mut script = String::new();
    open_input(input)?.read_to_string(&mut script)?;

    let judge = Judge::with_config(JudgeConfig {
        battle,
        format: OutputFormat::Text,
    });
    let summary = judge.verify(&script, runs)?;

    eprintln!("PASS: All {runs} runs produced identical results");
    eprintln!("  Final time: {}", summary.final_time);
    eprintln!("  Units alive: {}", summary.units_alive);
    eprintln!("  State hash: {:016x}", summary.state_hash);
    Ok(())
}
