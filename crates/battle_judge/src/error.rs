//! Error types for the judge.

use battle_core::error::BattleError;
use thiserror::Error;

/// Exit status for a non-increasing tick time.
pub const EXIT_TIME_VIOLATION: u8 = 1;
/// Exit status for an unsupported archetype name.
pub const EXIT_UNSUPPORTED_KIND: u8 = 2;
/// Exit status for input that does not follow the script grammar.
pub const EXIT_MALFORMED: u8 = 3;
/// Exit status when replays of one script disagree.
pub const EXIT_NONDETERMINISTIC: u8 = 4;
/// Exit status for an engine invariant violation (`EX_SOFTWARE`).
pub const EXIT_INTERNAL: u8 = 70;
/// Exit status for read or write failures (`EX_IOERR`).
pub const EXIT_IO: u8 = 74;
/// Exit status for an unreadable configuration (`EX_CONFIG`).
pub const EXIT_CONFIG: u8 = 78;

/// Input that does not follow the script grammar.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Input ended inside the header.
    #[error("Unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    /// A header value is not a valid number.
    #[error("Invalid {what} in header: '{token}'")]
    InvalidHeader {
        /// Which header field.
        what: &'static str,
        /// Offending token.
        token: String,
    },

    /// A command word the judge does not know.
    #[error("Line {line}: unsupported command '{word}'")]
    UnsupportedCommand {
        /// 1-based input line.
        line: usize,
        /// Offending word.
        word: String,
    },

    /// A known command with missing or unparsable arguments.
    #[error("Line {line}: {message}")]
    Malformed {
        /// 1-based input line.
        line: usize,
        /// What was wrong.
        message: String,
    },

    /// The script could not be read.
    #[error("Failed to read script: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error type for a judge run.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The script could not be parsed.
    #[error(transparent)]
    Script(#[from] ScriptError),

    /// The engine rejected a command.
    #[error("Line {line}: {source}")]
    Battle {
        /// 1-based input line of the failing batch.
        line: usize,
        /// Engine error.
        #[source]
        source: BattleError,
    },

    /// Building the battlefield or loading configuration failed.
    #[error(transparent)]
    Setup(#[from] BattleError),

    /// Reading the script or writing snapshots failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Replays of the same script ended in different states.
    #[error("Non-determinism detected: {distinct} distinct final states over {runs} runs")]
    Nondeterministic {
        /// Number of replays.
        runs: u32,
        /// Number of distinct final hashes.
        distinct: usize,
    },
}

impl JudgeError {
    /// Process exit status for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Script(ScriptError::Io(_)) | Self::Io(_) => EXIT_IO,
            Self::Script(_) => EXIT_MALFORMED,
            Self::Battle { source, .. } | Self::Setup(source) => battle_exit_code(source),
            Self::Nondeterministic { .. } => EXIT_NONDETERMINISTIC,
        }
    }
}

fn battle_exit_code(error: &BattleError) -> u8 {
    match error {
        BattleError::NonIncreasingTime { .. } => EXIT_TIME_VIOLATION,
        BattleError::UnsupportedKind(_) => EXIT_UNSUPPORTED_KIND,
        BattleError::GridSizeMismatch { .. } => EXIT_MALFORMED,
        BattleError::ConfigParseError { .. } => EXIT_CONFIG,
        _ => EXIT_INTERNAL,
    }
}

/// Result type alias using [`JudgeError`].
pub type Result<T> = std::result::Result<T, JudgeError>;
