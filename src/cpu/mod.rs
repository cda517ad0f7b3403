//! CPU emulation for the LS-8.
//!
//! This module implements the complete LS-8 architecture:
//! - 128 byte-wide memory cells shared by code, data and the stack
//! - 8 general-purpose registers, a stack pointer and the FL flags register
//! - 14-instruction set with 0-2 operand bytes per instruction

pub mod memory;
pub mod registers;
pub mod alu;
pub mod decode;
pub mod execute;

pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{RegisterFile, Flags, Comparison, RegisterError, STACK_BASE};
pub use alu::AluOp;
pub use decode::{Instruction, Opcode, DecodeError};
pub use execute::{Cpu, CpuError, CpuState, HaltReason};
