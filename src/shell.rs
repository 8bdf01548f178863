//! Interactive line shell over a [`DriveFs`].
//!
//! Commands run one at a time: a line is read only after the previous command
//! finished. A line ending in a tab character asks for completions instead of
//! running the command.

use std::collections::VecDeque;
use std::io::{self, Write};

use log::debug;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::config::HISTORY_SIZE;
use crate::core::{AutocompleteResult, DriveFs, autocomplete, execute_line};

/// Whether the shell keeps reading after a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandStatus {
    Continue,
    Quit,
}

/// Shell driver: reads lines, executes them, writes their output.
pub struct Shell<W: Write> {
    fs: DriveFs,
    /// Working directory token handed to the drive
    cwd: String,
    prompt: String,
    /// Executed lines, oldest first, at most [`HISTORY_SIZE`]
    history: VecDeque<String>,
    writer: W,
}

impl<W: Write> Shell<W> {
    pub fn new(fs: DriveFs, prompt: impl Into<String>, writer: W) -> Self {
        Self {
            fs,
            cwd: "/".to_string(),
            prompt: prompt.into(),
            history: VecDeque::new(),
            writer,
        }
    }

    /// Read and execute lines until EOF or `exit`.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, reader: R) -> io::Result<()> {
        let mut lines = reader.lines();
        loop {
            write!(self.writer, "{}", self.prompt)?;
            self.writer.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(self.writer)?;
                break;
            };

            if let Some(partial) = line.strip_suffix('\t') {
                self.complete(partial)?;
                continue;
            }
            if self.execute(&line).await? == CommandStatus::Quit {
                break;
            }
        }
        Ok(())
    }

    /// Execute a single command line.
    pub async fn execute(&mut self, line: &str) -> io::Result<CommandStatus> {
        debug!("exec {:?}", line);
        self.remember(line);
        let Self {
            fs, cwd, writer, ..
        } = &mut *self;

        let mut failed: Option<io::Error> = None;
        let mut progress = |msg: &str| {
            if failed.is_none() {
                failed = writeln!(writer, "{}", msg).and_then(|()| writer.flush()).err();
            }
        };
        let result = execute_line(line, fs, cwd, &mut progress).await;
        if let Some(e) = failed {
            return Err(e);
        }

        for out in &result.output {
            writeln!(self.writer, "{}", out)?;
        }
        self.writer.flush()?;

        Ok(if result.exit {
            CommandStatus::Quit
        } else {
            CommandStatus::Continue
        })
    }

    fn remember(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || self.history.back().is_some_and(|last| last == line) {
            return;
        }
        if self.history.len() == HISTORY_SIZE {
            self.history.pop_front();
        }
        self.history.push_back(line.to_string());
    }

    /// Executed command lines, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.history.iter().map(String::as_str)
    }

    /// Print completions for a partial line.
    pub fn complete(&mut self, partial: &str) -> io::Result<()> {
        match autocomplete(partial, &self.cwd, &self.fs) {
            AutocompleteResult::Single(line) => writeln!(self.writer, "{}", line),
            AutocompleteResult::Multiple(common, options) => {
                writeln!(self.writer, "{}", options.join("  "))?;
                writeln!(self.writer, "{}", common)
            }
            AutocompleteResult::None => Ok(()),
        }
    }

    /// Consume the shell and return its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
