//! # LS-8 Emulator
//!
//! An emulator for the LS-8, a tiny 8-bit teaching computer.
//!
//! Programs are byte sequences loaded at address 0. The CPU fetches one
//! opcode byte at a time, reads up to two operand bytes after it and
//! executes until HLT, an unrecognized opcode, or a fault.

pub mod cpu;
pub mod asm;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuState, CpuError, HaltReason, Memory, RegisterFile, Flags, Instruction, Opcode};
pub use asm::{assemble, disassemble, AssemblerError, Program, ProgramError, load_program, parse_program, save_program};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
