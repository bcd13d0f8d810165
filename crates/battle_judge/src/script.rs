//! Command script reader.
//!
//! A script starts with a header of whitespace-separated integers: `M N`
//! followed by `M * N` tile heights in row-major order. The header may span
//! any number of lines. Everything after it is line oriented:
//!
//! ```text
//! 1 3
//! 0 0 0
//! 1 spawn footman a 1 1; spawn footman b 1 3
//! 2 attack a right; state
//! ```
//!
//! Each non-blank line is split on `;`. The first segment starts with the
//! tick time; any segment may hold several commands back to back. Script
//! coordinates are 1-based.
//!
//! The reader is streaming: [`ScriptReader::next_batch`] reads exactly one
//! line, so the caller can execute it before anything else is consumed.
//!
//! A bad command word or argument does not discard the line. Parsing stops
//! there and the error travels with the commands that came before it, so they
//! still run before the script is aborted.

use std::io::BufRead;
use std::str::SplitWhitespace;

use battle_core::command::{Batch, Command};
use battle_core::geometry::Coord;

use crate::error::ScriptError;

/// Word that separates commands without doing anything.
pub const NO_OP_WORD: &str = "new_command";

/// Grid dimensions and heights from the script header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Number of rows (M).
    pub rows: usize,
    /// Number of columns (N).
    pub cols: usize,
    /// `rows * cols` heights, row-major.
    pub heights: Vec<i32>,
}

/// A parsed script line.
#[derive(Debug)]
pub struct ScriptLine {
    /// 1-based line number in the input.
    pub line: usize,
    /// Tick and every command before the first fault.
    pub batch: Batch,
    /// Fatal error found after `batch.commands`.
    pub fault: Option<ScriptError>,
}

/// Streaming reader over a script.
pub struct ScriptReader<R> {
    input: R,
    line: usize,
    /// Text left over on the last header line.
    pending: Option<String>,
}

impl<R: BufRead> ScriptReader<R> {
    /// Wrap an input stream.
    pub fn new(input: R) -> Self {
        Self {
            input,
            line: 0,
            pending: None,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn read_line(&mut self) -> Result<Option<String>, ScriptError> {
        let mut buf = String::new();
        if self.input.read_line(&mut buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        Ok(Some(buf))
    }

    /// Read the grid header. Must be called once, before any batch.
    ///
    /// # Errors
    ///
    /// Fails if input ends early or a value is not an integer.
    pub fn read_header(&mut self) -> Result<Header, ScriptError> {
        let mut tokens: Vec<String> = Vec::new();
        let mut needed: Option<usize> = None;

        loop {
            if let Some(n) = needed {
                if tokens.len() >= n {
                    break;
                }
            }
            let Some(text) = self.read_line()? else {
                return Err(ScriptError::UnexpectedEof(if needed.is_some() {
                    "heights"
                } else {
                    "grid dimensions"
                }));
            };

            let mut words = text.split_whitespace();
            for word in words.by_ref() {
                tokens.push(word.to_string());
                if needed.is_none() && tokens.len() == 2 {
                    let rows = parse_dimension(&tokens[0], "row count")?;
                    let cols = parse_dimension(&tokens[1], "column count")?;
                    needed = Some(rows.saturating_mul(cols).saturating_add(2));
                }
                if needed.is_some_and(|n| tokens.len() == n) {
                    break;
                }
            }

            let rest: Vec<&str> = words.collect();
            if !rest.is_empty() {
                self.pending = Some(rest.join(" "));
            }
        }

        let rows = parse_dimension(&tokens[0], "row count")?;
        let cols = parse_dimension(&tokens[1], "column count")?;
        let heights = tokens[2..]
            .iter()
            .map(|t| {
                t.parse::<i32>().map_err(|_| ScriptError::InvalidHeader {
                    what: "height",
                    token: t.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(rows, cols, "read grid header");
        Ok(Header {
            rows,
            cols,
            heights,
        })
    }

    /// Read and parse the next non-blank line.
    ///
    /// Returns `None` at end of input. Command errors are carried in
    /// [`ScriptLine::fault`].
    ///
    /// # Errors
    ///
    /// Fails if the input cannot be read or the line has no valid tick time.
    pub fn next_batch(&mut self) -> Result<Option<ScriptLine>, ScriptError> {
        if let Some(text) = self.pending.take() {
            if let Some(parsed) = parse_line(&text, self.line)? {
                return Ok(Some(parsed));
            }
        }
        while let Some(text) = self.read_line()? {
            if let Some(parsed) = parse_line(&text, self.line)? {
                return Ok(Some(parsed));
            }
        }
        Ok(None)
    }
}

fn parse_dimension(token: &str, what: &'static str) -> Result<usize, ScriptError> {
    token.parse::<usize>().map_err(|_| ScriptError::InvalidHeader {
        what,
        token: token.to_string(),
    })
}

/// Parse one script line. Blank lines yield `None`.
///
/// An unknown command word or a command with bad arguments ends parsing and
/// is returned as the line's fault, after the commands already parsed.
///
/// # Errors
///
/// Fails if the line does not start with an integer time.
pub fn parse_line(text: &str, line: usize) -> Result<Option<ScriptLine>, ScriptError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let mut segments = text.split(';');
    let mut first = segments.next().unwrap_or_default().split_whitespace();

    let time_token = first.next().ok_or_else(|| ScriptError::Malformed {
        line,
        message: "missing tick time".to_string(),
    })?;
    let time = time_token.parse::<i64>().map_err(|_| ScriptError::Malformed {
        line,
        message: format!("invalid tick time '{time_token}'"),
    })?;

    let mut commands = Vec::new();
    let fault = parse_segment(&mut first, line, &mut commands)
        .and_then(|()| {
            segments.try_for_each(|segment| {
                parse_segment(&mut segment.split_whitespace(), line, &mut commands)
            })
        })
        .err();

    Ok(Some(ScriptLine {
        line,
        batch: Batch { time, commands },
        fault,
    }))
}

fn parse_segment(
    words: &mut SplitWhitespace<'_>,
    line: usize,
    commands: &mut Vec<Command>,
) -> Result<(), ScriptError> {
    while let Some(word) = words.next() {
        let mut args = Args {
            words: &mut *words,
            line,
            word,
        };
        let command = match word {
            "spawn" => Command::Spawn {
                kind: args.text("kind")?,
                id: args.text("id")?,
                at: args.coord()?,
            },
            "move" => Command::Move {
                id: args.text("id")?,
                to: args.coord()?,
            },
            "attack" => Command::Attack {
                id: args.text("id")?,
                direction: args.text("direction")?,
            },
            "state" => Command::State,
            NO_OP_WORD => continue,
            other => {
                return Err(ScriptError::UnsupportedCommand {
                    line,
                    word: other.to_string(),
                })
            }
        };
        commands.push(command);
    }
    Ok(())
}

/// Argument cursor for one command.
struct Args<'a, 'b> {
    words: &'a mut SplitWhitespace<'b>,
    line: usize,
    word: &'a str,
}

impl Args<'_, '_> {
    fn text(&mut self, what: &str) -> Result<String, ScriptError> {
        self.words
            .next()
            .map(str::to_string)
            .ok_or_else(|| ScriptError::Malformed {
                line: self.line,
                message: format!("{} is missing its {what}", self.word),
            })
    }

    fn number(&mut self, what: &str) -> Result<i32, ScriptError> {
        let token = self.text(what)?;
        token.parse().map_err(|_| ScriptError::Malformed {
            line: self.line,
            message: format!("{} has invalid {what} '{token}'", self.word),
        })
    }

    fn coord(&mut self) -> Result<Coord, ScriptError> {
        let x = self.number("row")?;
        let y = self.number("column")?;
        Ok(Coord::from_one_based(x, y))
    }
}
