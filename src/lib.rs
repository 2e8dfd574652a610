//! Emulator for the Hatchling accumulator machine.
//!
//! A program is a [`Memory`](memory::Memory) image of 256 words, loaded from hexadecimal text by
//! [`memory::parse`] and run by a [`Processor`](processor::Processor) until it halts or faults.

pub mod config;
pub mod memory;
pub mod processor;
pub mod terminal;
