//! Arithmetic/logic unit.
//!
//! All arithmetic is on 8-bit unsigned values and wraps modulo 256.

use crate::cpu::decode::Opcode;
use crate::cpu::registers::{Flags, RegisterError, RegisterFile};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Operations the ALU knows how to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AluOp {
    Add,
    Sub,
    Mul,
    Cmp,
}

impl TryFrom<Opcode> for AluOp {
    type Error = AluError;

    fn try_from(op: Opcode) -> Result<Self, Self::Error> {
        match op {
            Opcode::Add => Ok(AluOp::Add),
            Opcode::Sub => Ok(AluOp::Sub),
            Opcode::Mul => Ok(AluOp::Mul),
            Opcode::Cmp => Ok(AluOp::Cmp),
            other => Err(AluError::UnsupportedOperation(other)),
        }
    }
}

/// Apply `op` to registers `a` and `b`.
///
/// Arithmetic results go to `a`; CMP only touches `flags`. Both indices are
/// checked before anything is written.
pub fn execute(
    op: AluOp,
    regs: &mut RegisterFile,
    flags: &mut Flags,
    a: u8,
    b: u8,
) -> Result<(), AluError> {
    let lhs = regs.get(a)?;
    let rhs = regs.get(b)?;

    match op {
        AluOp::Add => regs.set(a, lhs.wrapping_add(rhs))?,
        AluOp::Sub => regs.set(a, lhs.wrapping_sub(rhs))?,
        AluOp::Mul => regs.set(a, lhs.wrapping_mul(rhs))?,
        AluOp::Cmp => flags.set_from_comparison(lhs, rhs),
    }

    Ok(())
}

/// Errors raised by the ALU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AluError {
    /// The dispatcher routed a non-ALU opcode here.
    #[error("unsupported ALU operation: {0}")]
    UnsupportedOperation(Opcode),

    #[error(transparent)]
    Register(#[from] RegisterError),
}
