//! Loads programs written as one hexadecimal word per line:
//!
//! ```text
//! # print 5
//! 5102
//! FF00
//! 0005
//! ```

use std::borrow::Cow;
use std::error;
use std::{fmt, str::Lines};

use crate::terminal::Terminal;

use super::{Memory, Word, MEMORY_SIZE};

/// Token that ends interactive program entry
pub const SENTINEL: &str = "-99999";

macro_rules! propagate {
    ( $res:expr ) => {
        match $res {
            Ok(value) => value,
            Err(err) => return Some(Err(err)),
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    InvalidWord,
    WordOutOfRange,
    MemoryFull,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::InvalidWord => f.write_str("not a hexadecimal word"),
            ParseErrorKind::WordOutOfRange => f.write_str("word outside of [0000-FFFF]"),
            ParseErrorKind::MemoryFull => {
                write!(f, "program does not fit into {} words", MEMORY_SIZE)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: ParseErrorKind,
    context: Option<Cow<'static, str>>,
    line_nr: usize,
    address: usize,
}

impl ParseError {
    fn new<C, S>(kind: ParseErrorKind, context: C, line_nr: usize, address: usize) -> Self
    where
        C: Into<Option<S>>,
        S: Into<Cow<'static, str>>,
    {
        Self {
            kind,
            context: context.into().map(|inner| inner.into()),
            line_nr,
            address,
        }
    }

    pub fn kind(&self) -> ParseErrorKind {
        self.kind
    }

    /// 1-based line of the offending token
    pub fn line_nr(&self) -> usize {
        self.line_nr
    }

    /// Memory address the offending token would have been stored at
    pub fn address(&self) -> usize {
        self.address
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BAD INSTRUCTION ON LINE {:02X} [ln: {}]: {}",
            self.address, self.line_nr, self.kind
        )?;
        if let Some(context) = &self.context {
            write!(f, " - {}", context)?;
        }
        Ok(())
    }
}

impl error::Error for ParseError {}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// Parses a single unprefixed hexadecimal word.
fn parse_word(token: &str, line_nr: usize, address: usize) -> Result<Word> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    let negative = digits.strip_prefix('-');
    let digits = negative.unwrap_or(digits);

    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidWord,
            format!("`{}`", token),
            line_nr,
            address,
        ));
    }

    let out_of_range = || {
        ParseError::new(
            ParseErrorKind::WordOutOfRange,
            format!("`{}`", token),
            line_nr,
            address,
        )
    };

    if negative.is_some() && digits.bytes().any(|byte| byte != b'0') {
        return Err(out_of_range());
    }

    // Every digit is valid here, so a failure can only be an overflow.
    u32::from_str_radix(digits, 16)
        .ok()
        .filter(|&value| value <= Word::MAX as u32)
        .map(|value| value as Word)
        .ok_or_else(out_of_range)
}

#[derive(Debug, Clone)]
pub struct Parser<'a> {
    lines: Lines<'a>,
    line_nr: usize,
    address: usize,
    memory: Memory,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for `data` which will try to populate `memory`.
    pub fn new(data: &'a str, memory: Memory) -> Self {
        Self {
            lines: data.lines(),
            line_nr: 0,
            address: 0,
            memory,
        }
    }

    /// Consumes `self` and tries to parse all of the data into memory.
    ///
    /// # Errors
    ///
    /// All errors which may occur are collected and returned at the end.
    pub fn parse(mut self) -> Result<Memory, Vec<ParseError>> {
        let mut errors = Vec::new();

        while let Some(res) = self.parse_next_line() {
            if let Err(err) = res {
                log::error!("{}", err);
                errors.push(err);
            }
        }

        if errors.is_empty() {
            log::debug!("Loaded {} words", self.address);
            Ok(self.memory)
        } else {
            Err(errors)
        }
    }

    /// Tries to parse the next line. Each word should be located on it's own line.
    fn parse_next_line(&mut self) -> Option<Result<()>> {
        let line = self.lines.next()?.trim();
        self.line_nr += 1;

        if line.is_empty() || line.starts_with('#') {
            // Comment or empty line; skip
            return Some(Ok(()));
        }

        let word = propagate!(parse_word(line, self.line_nr, self.address));
        log::trace!("[{}] {:02X}: {:04X}", self.line_nr, self.address, word);

        Some(self.write_word(word))
    }

    /// Writes `word` at the current address and moves on to the next one.
    ///
    /// # Errors
    ///
    /// Fails once every address of the memory is in use. The address still
    /// advances so that following lines report their own position.
    fn write_word(&mut self, word: Word) -> Result<()> {
        let address = self.address;
        self.address += 1;

        match self.memory.data.get_mut(address) {
            Some(slot) => {
                *slot = word;
                Ok(())
            }
            None => Err(ParseError::new::<_, &'static str>(
                ParseErrorKind::MemoryFull,
                None,
                self.line_nr,
                address,
            )),
        }
    }
}

/// Reads a program word by word from `terminal` until [`SENTINEL`] is entered.
///
/// Every word is prompted with the address it will be stored at. Loading stops
/// at the first invalid word.
pub fn read_interactive<T: Terminal>(terminal: &mut T) -> color_eyre::eyre::Result<Memory> {
    let mut memory = Memory::default();

    for address in 0.. {
        let token = terminal.read_token(&format!("{:02X}    ", address))?;
        if token == SENTINEL {
            log::debug!("Loaded {} words", address);
            break;
        }

        let word = parse_word(&token, address + 1, address)?;
        match memory.data.get_mut(address) {
            Some(slot) => *slot = word,
            None => {
                return Err(ParseError::new::<_, &'static str>(
                    ParseErrorKind::MemoryFull,
                    None,
                    address + 1,
                    address,
                )
                .into())
            }
        }
    }

    Ok(memory)
}
