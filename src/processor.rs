use std::convert::TryFrom;
use std::fmt;

use crate::memory::{to_signed, to_word, Byte, Memory, SignedWord, Word};
use crate::terminal::Terminal;
use color_eyre::eyre::Result;
use log::*;
use num_enum::IntoPrimitive;
use num_enum::TryFromPrimitive;

/// Prompt shown by the `READ` instruction
pub const READ_PROMPT: &str = "INPUT A SIGNED SHORT INT (BASE 16, USE - FOR NEGATIVE):  ";

/// Diagnostic written when `READ` rejects its input
pub const READ_OUT_OF_RANGE: &str = "Value out of range (-32768 to 32767, base 10)";

/// Conditions that stop the machine for good
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    AccumulatorOverflow,
    DivideByZero,
    UndefinedOpcode(Byte),
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::AccumulatorOverflow => f.write_str("ACCUMULATOR OVERFLOW"),
            Fault::DivideByZero => f.write_str("ATTEMPT TO DIVIDE BY ZERO"),
            Fault::UndefinedOpcode(_) => f.write_str("UNDEFINED HATCHLING OPCODE"),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// A `HALT` instruction was executed
    Halted,
    /// Execution was abnormally terminated
    Fault(Fault),
}

/// Splits an instruction word into its opcode (high byte) and operand (low byte)
pub fn decode(word: Word) -> (Byte, Byte) {
    ((word >> 8) as Byte, (word & 0xFF) as Byte)
}

/// Parses the answer to a `READ` prompt as a hexadecimal number.
///
/// Like C's `strtol`, leading whitespace, a sign and a `0x` prefix are
/// accepted and parsing stops at the first character that is not a hex digit.
/// Input without any digits reads as 0. Returns `None` if the value does not
/// fit into a signed word.
fn parse_signed(token: &str) -> Option<SignedWord> {
    let token = token.trim_start();
    let (negative, rest) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    // `0x` only counts as a prefix when a digit follows it
    let rest = match rest.get(..2) {
        Some("0x") | Some("0X")
            if rest[2..].starts_with(|c: char| c.is_ascii_hexdigit()) =>
        {
            &rest[2..]
        }
        _ => rest,
    };

    let end = rest
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or_else(|| rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return Some(0);
    }

    let magnitude = i64::from_str_radix(digits, 16).ok()?;
    let value = if negative { -magnitude } else { magnitude };

    SignedWord::try_from(value).ok()
}

/// Emulates the Hatchling CPU
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Processor {
    /// Accumulator
    pub accumulator: SignedWord,
    /// Address of the instruction to execute next
    pub instruction_counter: Byte,
    /// Most recently fetched instruction word
    pub instruction_register: Word,
    /// High byte of the instruction register
    pub op_code: Byte,
    /// Low byte of the instruction register
    pub operand: Byte,
    /// Set once a `HALT` instruction was executed
    pub halted: bool,
    /// Set once execution was abnormally terminated. Nothing executes afterwards.
    pub fault: Option<Fault>,
}

impl Processor {
    /// Initializes a new CPU with every register cleared
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether execution was abnormally terminated
    pub fn fatal_error(&self) -> bool {
        self.fault.is_some()
    }

    /// Whether the processor neither halted nor faulted yet
    pub fn is_running(&self) -> bool {
        !self.halted && self.fault.is_none()
    }

    /// How the run ended, or `None` while the processor is still running
    pub fn status(&self) -> Option<Status> {
        match self.fault {
            Some(fault) => Some(Status::Fault(fault)),
            None if self.halted => Some(Status::Halted),
            None => None,
        }
    }

    fn advance(&mut self) {
        self.instruction_counter = self.instruction_counter.wrapping_add(1);
    }

    fn branch_if(&mut self, condition: bool) {
        if condition {
            self.instruction_counter = self.operand;
        } else {
            self.advance();
        }
    }

    /// Commits an arithmetic result computed with extra precision
    fn accumulate(&mut self, result: i32) -> Result<(), Fault> {
        self.accumulator =
            SignedWord::try_from(result).map_err(|_| Fault::AccumulatorOverflow)?;
        self.advance();
        Ok(())
    }

    fn fail(&mut self, fault: Fault) {
        error!(
            "{:02X}: {} (instruction {:04X})",
            self.instruction_counter, fault, self.instruction_register
        );
        self.fault = Some(fault);
    }

    /// Loads the word at the instruction counter into the instruction register
    pub fn fetch(&mut self, memory: &Memory) {
        self.instruction_register = memory.read_word(self.instruction_counter);
        let (op_code, operand) = decode(self.instruction_register);
        self.op_code = op_code;
        self.operand = operand;
    }

    /// Executes a single, already fetched instruction
    pub fn execute_instruction<T: Terminal>(
        &mut self,
        instruction: Instruction,
        memory: &mut Memory,
        terminal: &mut T,
    ) -> Result<()> {
        debug!(
            "{:02X}: {} {:02X} [acc: {}]",
            self.instruction_counter, instruction, self.operand, self.accumulator
        );

        let word = memory.read_word(self.operand);
        let accumulator = i32::from(self.accumulator);
        let value = i32::from(to_signed(word));

        let outcome = match instruction {
            Instruction::ADD => self.accumulate(accumulator + value),
            Instruction::SUB => self.accumulate(accumulator - value),
            Instruction::MUL => self.accumulate(accumulator * value),
            Instruction::DIV if word == 0 => Err(Fault::DivideByZero),
            Instruction::DIV => self.accumulate(accumulator / value),
            Instruction::MOD if word == 0 => Err(Fault::DivideByZero),
            Instruction::MOD => self.accumulate(accumulator % value),
            Instruction::AND => {
                self.accumulator = to_signed(to_word(self.accumulator) & word);
                self.advance();
                Ok(())
            }
            Instruction::ORR => {
                self.accumulator = to_signed(to_word(self.accumulator) | word);
                self.advance();
                Ok(())
            }
            Instruction::NOT => {
                // logical, not bitwise
                self.accumulator = SignedWord::from(self.accumulator == 0);
                self.advance();
                Ok(())
            }
            Instruction::XOR => {
                self.accumulator = to_signed(to_word(self.accumulator) ^ word);
                self.advance();
                Ok(())
            }
            Instruction::LSR => {
                // shifts in the sign bit, so negative values stay negative
                self.accumulator >>= 1;
                self.advance();
                Ok(())
            }
            Instruction::ASR => {
                self.accumulator = if self.accumulator < 0 {
                    !(!self.accumulator >> 1)
                } else {
                    self.accumulator >> 1
                };
                self.advance();
                Ok(())
            }
            Instruction::LSL => {
                self.accumulator = self.accumulator.wrapping_shl(1);
                self.advance();
                Ok(())
            }
            Instruction::B => {
                self.instruction_counter = self.operand;
                Ok(())
            }
            Instruction::BNEG => {
                self.branch_if(self.accumulator < 0);
                Ok(())
            }
            Instruction::BPOS => {
                self.branch_if(self.accumulator > 0);
                Ok(())
            }
            Instruction::BZRO => {
                self.branch_if(self.accumulator == 0);
                Ok(())
            }
            Instruction::LOAD => {
                self.accumulator = to_signed(word);
                self.advance();
                Ok(())
            }
            Instruction::STOR => {
                memory.write_word(self.operand, to_word(self.accumulator));
                self.advance();
                Ok(())
            }
            Instruction::READ => {
                let token = terminal.read_token(READ_PROMPT)?;
                match parse_signed(token.trim()) {
                    Some(value) => {
                        memory.write_word(self.operand, to_word(value));
                        self.advance();
                    }
                    None => {
                        // The counter stays put, so the same READ runs again.
                        warn!("READ rejected `{}`", token);
                        terminal.write_line(READ_OUT_OF_RANGE)?;
                    }
                }
                Ok(())
            }
            Instruction::WRTE => {
                terminal.write_line(&format!(
                    "OUTPUT: {:04X} (REPRESENTED IN BASE 16, 2'S COMPLEMENT)",
                    word
                ))?;
                self.advance();
                Ok(())
            }
            Instruction::HALT => {
                self.halted = true;
                Ok(())
            }
        };

        if let Err(fault) = outcome {
            self.fail(fault);
        }

        Ok(())
    }

    /// Runs one fetch, decode and execute cycle. Does nothing once the
    /// processor has stopped.
    pub fn execute<T: Terminal>(&mut self, memory: &mut Memory, terminal: &mut T) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        self.fetch(memory);
        match Instruction::try_from(self.op_code) {
            Ok(instruction) => self.execute_instruction(instruction, memory, terminal),
            Err(_) => {
                self.fail(Fault::UndefinedOpcode(self.op_code));
                Ok(())
            }
        }
    }

    /// Run program until it halts or faults
    ///
    /// There is no instruction limit: a program that never halts never returns.
    ///
    /// # Errors
    ///
    /// Only terminal I/O failures are errors. Faults of the program itself are
    /// reported through the returned [`Status`].
    pub fn execute_until_halt<T: Terminal>(
        &mut self,
        memory: &mut Memory,
        terminal: &mut T,
    ) -> Result<Status> {
        loop {
            if let Some(status) = self.status() {
                info!(
                    "Program terminated at {:02X}: {:?} [acc: {:04X}]",
                    self.instruction_counter,
                    status,
                    to_word(self.accumulator)
                );
                return Ok(status);
            }

            self.execute(memory, terminal)?;
        }
    }
}

impl fmt::Display for Processor {
    /// Renders the register dump
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "REGISTERS")?;
        writeln!(f, "ACC         {:04X}", to_word(self.accumulator))?;
        writeln!(f, "InstCtr       {:02X}", self.instruction_counter)?;
        writeln!(f, "InstReg     {:04X}", self.instruction_register)?;
        writeln!(f, "OpCode        {:02X}", self.op_code)?;
        write!(f, "Operand       {:02X}", self.operand)
    }
}

macro_rules! instructions {
    ( $( $( #[doc = $doc:expr] )+ $name:ident = $repr:literal , )+ ) => {
        /// Defines the instructions. Every instruction takes a memory address as operand,
        /// though some of them ignore it.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
        #[derive(TryFromPrimitive, IntoPrimitive)]
        pub enum Instruction {
            $(
                $( #[doc = $doc] )+
                $name = $repr,
            )+
        }

        impl Instruction {
            pub const ALL: &'static [Self] = &[
                $( Self::$name , )+
            ];

            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$name => stringify!($name) , )+
                }
            }
        }

        impl ::std::fmt::Display for Instruction {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }
    }
}

instructions! {
    /// Add the word at the operand address to the accumulator
    ADD = 0x10,
    /// Subtract the word at the operand address from the accumulator
    SUB = 0x11,
    /// Multiply the accumulator by the word at the operand address
    MUL = 0x12,
    /// Divide the accumulator by the word at the operand address
    DIV = 0x13,
    /// Remainder of dividing the accumulator by the word at the operand address
    MOD = 0x14,
    /// Bitwise AND of the accumulator and the word at the operand address
    AND = 0x20,
    /// Bitwise OR of the accumulator and the word at the operand address
    ORR = 0x21,
    /// Logical NOT of the accumulator
    NOT = 0x22,
    /// Bitwise XOR of the accumulator and the word at the operand address
    XOR = 0x23,
    /// Shift the accumulator right by one bit
    LSR = 0x24,
    /// Shift the accumulator right by one bit, keeping its sign
    ASR = 0x25,
    /// Shift the accumulator left by one bit
    LSL = 0x26,
    /// Branch to the operand address
    B = 0x30,
    /// Branch to the operand address if the accumulator is negative
    BNEG = 0x31,
    /// Branch to the operand address if the accumulator is positive
    BPOS = 0x32,
    /// Branch to the operand address if the accumulator is zero
    BZRO = 0x33,
    /// Load the word at the operand address into the accumulator
    LOAD = 0x40,
    /// Store the accumulator at the operand address
    STOR = 0x41,
    /// Read a word from the terminal into the operand address
    READ = 0x50,
    /// Write the word at the operand address to the terminal
    WRTE = 0x51,
    /// Stop the execution of the program
    HALT = 0xFF,
}

impl Instruction {
    /// Builds the instruction word for this instruction and `operand`
    pub fn encode(self, operand: Byte) -> Word {
        (Byte::from(self) as Word) << 8 | operand as Word
    }
}
