//! Program files, assembler and disassembler.
//!
//! This module provides:
//! - The `.ls8` text format (one 8-digit binary byte per line)
//! - A simple two-pass assembler (mnemonics → bytes)
//! - A disassembler (bytes → readable text)

pub mod assembler;
pub mod disasm;
pub mod program;

pub use assembler::{assemble, AssemblerError};
pub use disasm::disassemble;
pub use program::{Program, ProgramError, load_program, parse_program, save_program};
