//! Terminal I/O used by the `READ` and `WRTE` instructions and by interactive program entry.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use color_eyre::eyre::{bail, Result, WrapErr};

/// The machine's view of the terminal.
///
/// Input is consumed one whitespace separated token at a time.
pub trait Terminal {
    /// Shows `prompt` without a line break and reads the next token
    fn read_token(&mut self, prompt: &str) -> Result<String>;

    /// Writes a single line of output
    fn write_line(&mut self, line: &str) -> Result<()>;
}

/// Terminal backed by the process' standard input and output
#[derive(Debug, Default)]
pub struct StdTerminal {
    pending: VecDeque<String>,
}

impl StdTerminal {
    /// Creates a terminal on stdin and stdout
    pub fn new() -> Self {
        Self::default()
    }
}

impl Terminal for StdTerminal {
    fn read_token(&mut self, prompt: &str) -> Result<String> {
        let mut stdout = io::stdout();
        stdout.write_all(prompt.as_bytes())?;
        stdout.flush()?;

        let stdin = io::stdin();
        let mut input = stdin.lock();
        while self.pending.is_empty() {
            let mut line = String::new();
            let read = input
                .read_line(&mut line)
                .wrap_err("Failed to read from the terminal")?;
            if read == 0 {
                bail!("Unexpected end of terminal input");
            }
            self.pending
                .extend(line.split_whitespace().map(ToOwned::to_owned));
        }

        Ok(self.pending.pop_front().unwrap_or_default())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", line).wrap_err("Failed to write to the terminal")
    }
}

/// Terminal fed from a fixed list of tokens, recording everything written to it
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptedTerminal {
    input: VecDeque<String>,
    /// Prompts shown so far, in order
    pub prompts: Vec<String>,
    /// Lines written so far, in order
    pub output: Vec<String>,
}

impl ScriptedTerminal {
    pub fn new<I, S>(input: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Number of tokens not consumed yet
    pub fn remaining(&self) -> usize {
        self.input.len()
    }
}

impl Terminal for ScriptedTerminal {
    fn read_token(&mut self, prompt: &str) -> Result<String> {
        self.prompts.push(prompt.to_owned());
        match self.input.pop_front() {
            Some(token) => Ok(token),
            None => bail!("Unexpected end of terminal input"),
        }
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.output.push(line.to_owned());
        Ok(())
    }
}
