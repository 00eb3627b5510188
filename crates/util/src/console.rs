//! Injectable terminal streams and interactive prompts.
//!
//! Commands never touch `std::io::stdin`/`stdout` directly. They receive a
//! [`Console`], which the binary builds over the process streams and tests
//! build over in-memory buffers.

use std::{
    io::{self, BufRead, BufReader, IsTerminal, Write},
    sync::{Arc, Mutex},
};

/// Result of a confirmation prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptOutcome {
    Confirmed,
    Declined,
}

impl PromptOutcome {
    pub fn is_confirmed(self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

pub struct Console {
    input: Box<dyn BufRead + Send>,
    out: Box<dyn Write + Send>,
    err: Box<dyn Write + Send>,
    interactive: bool,
}

impl Console {
    pub fn new(
        input: Box<dyn BufRead + Send>,
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        interactive: bool,
    ) -> Self {
        Self {
            input,
            out,
            err,
            interactive,
        }
    }

    /// Console over the process streams; interactive when stdout is a terminal.
    pub fn stdio() -> Self {
        let interactive = io::stdout().is_terminal();
        Self::new(
            Box::new(BufReader::new(io::stdin())),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            interactive,
        )
    }

    /// Whether stdout is a terminal (colour and prompts make sense).
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    pub fn err(&mut self) -> &mut dyn Write {
        &mut self.err
    }

    /// Ask for a value. An empty answer selects `default` when one is given.
    pub fn prompt(&mut self, label: &str, default: Option<&str>) -> io::Result<String> {
        match default {
            Some(default) => write!(self.out, "{label} [{default}]: ")?,
            None => write!(self.out, "{label}: ")?,
        }
        self.out.flush()?;
        let answer = self.read_answer()?;
        if answer.is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    /// Print `message` and read one line; `true` only for a literal `y`.
    pub fn confirm(&mut self, message: &str) -> io::Result<bool> {
        write!(self.out, "{message}")?;
        self.out.flush()?;
        Ok(self.read_answer()? == "y")
    }

    /// Skip the question when `yes` (`-y`) was given on the command line.
    pub fn confirm_or_skip(&mut self, yes: bool, message: &str) -> io::Result<PromptOutcome> {
        if yes || self.confirm(message)? {
            Ok(PromptOutcome::Confirmed)
        } else {
            Ok(PromptOutcome::Declined)
        }
    }

    fn read_answer(&mut self) -> io::Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(trimmed.to_string())
    }
}

/// Cloneable in-memory writer; every clone appends to the same buffer.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| io::Error::other("shared buffer lock poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
