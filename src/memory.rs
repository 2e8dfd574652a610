use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use color_eyre::eyre::{eyre, Result, WrapErr};

pub mod parse;

pub type Byte = u8; // 1 byte
pub type Word = u16; // 2 bytes
pub type SignedWord = i16; // accumulator

/// Number of addressable words
pub const MEMORY_SIZE: usize = 256;

/// Reinterprets the bit pattern of a memory word as a signed value
pub fn to_signed(word: Word) -> SignedWord {
    word as SignedWord
}

/// Reinterprets a signed value as the bit pattern stored in memory
pub fn to_word(value: SignedWord) -> Word {
    value as Word
}

/// Emulates the 256 word memory of the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Memory {
    /// The actual data of the memory
    pub data: [Word; MEMORY_SIZE],
}

impl Default for Memory {
    /// Initializes the memory with zeroes
    fn default() -> Self {
        Memory {
            data: [0; MEMORY_SIZE],
        }
    }
}

impl Memory {
    /// Reads a word from the memory
    pub fn read_word(&self, address: Byte) -> Word {
        self.data[address as usize]
    }

    /// Writes a word to the memory
    pub fn write_word(&mut self, address: Byte, value: Word) {
        self.data[address as usize] = value;
    }

    /// Writes an array of words to the memory, starting at `address`.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not fit between `address` and the end of memory.
    pub fn write_array(&mut self, address: Byte, data: &[Word]) {
        self.data[address as usize..address as usize + data.len()].copy_from_slice(data);
    }

    /// Loads a program from a file containing one hexadecimal word per line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read program `{}`", path.display()))?;

        data.parse::<Memory>().map_err(|errors| {
            let lines: Vec<String> = errors.iter().map(ToString::to_string).collect();
            eyre!(
                "Failed to load program `{}`:\n{}",
                path.display(),
                lines.join("\n")
            )
        })
    }
}

impl FromStr for Memory {
    type Err = Vec<parse::ParseError>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        parse::Parser::new(s, Memory::default()).parse()
    }
}

impl fmt::Display for Memory {
    /// Renders the memory as a 16x16 matrix with hexadecimal row and column headers
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    ")?;
        for column in 0..16 {
            write!(f, "{:5X}   ", column)?;
        }

        for (row, words) in self.data.chunks(16).enumerate() {
            write!(f, "\n{:2X}   ", row * 16)?;
            for word in words {
                write!(f, "{:04X}    ", word)?;
            }
        }

        Ok(())
    }
}

/// Writes a block of instructions directly into the memory
#[macro_export]
macro_rules! write_instructions {
    ( $mem:ident : $pos:expr => $( $instruction:ident $operand:expr ),+ ) => {
        $mem.write_array($pos, &[
            $(
                $crate::processor::Instruction::$instruction.encode($operand as $crate::memory::Byte),
            )+
        ]);
    };
}
