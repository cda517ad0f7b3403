//! LS-8 registers.
//!
//! The LS-8 has:
//! - R0-R7: eight 8-bit general-purpose registers
//! - SP: the stack pointer, kept apart from R0-R7
//! - FL: the comparison flags written by CMP

use serde::{Serialize, Deserialize};
use std::cmp::Ordering;
use thiserror::Error;

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 8;

/// Initial stack pointer. The stack grows downward from here toward 0.
pub const STACK_BASE: u8 = 48;

/// The LS-8 register file: R0-R7 plus SP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterFile {
    gpr: [u8; REGISTER_COUNT],
    sp: u8,
}

impl RegisterFile {
    /// Create a register file with R0-R7 zeroed and SP at [`STACK_BASE`].
    pub fn new() -> Self {
        Self {
            gpr: [0; REGISTER_COUNT],
            sp: STACK_BASE,
        }
    }

    /// Reset to the constructed state.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Read register `index`.
    #[inline]
    pub fn get(&self, index: u8) -> Result<u8, RegisterError> {
        self.gpr
            .get(index as usize)
            .copied()
            .ok_or(RegisterError::InvalidRegister(index))
    }

    /// Write `value` to register `index`.
    #[inline]
    pub fn set(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        let reg = self.gpr
            .get_mut(index as usize)
            .ok_or(RegisterError::InvalidRegister(index))?;
        *reg = value;
        Ok(())
    }

    /// Check that `index` names a register without touching it.
    #[inline]
    pub fn check(index: u8) -> Result<u8, RegisterError> {
        if (index as usize) < REGISTER_COUNT {
            Ok(index)
        } else {
            Err(RegisterError::InvalidRegister(index))
        }
    }

    /// All eight general-purpose registers.
    pub fn values(&self) -> &[u8; REGISTER_COUNT] {
        &self.gpr
    }

    /// Current stack pointer.
    #[inline]
    pub fn sp(&self) -> u8 {
        self.sp
    }

    /// Number of bytes currently on the stack.
    pub fn stack_depth(&self) -> usize {
        (STACK_BASE - self.sp) as usize
    }

    /// The slot a push would write to (SP - 1), without moving SP.
    pub fn next_push_slot(&self) -> Result<u8, RegisterError> {
        self.sp.checked_sub(1).ok_or(RegisterError::StackOverflow)
    }

    /// The slot a pop would read from (SP), without moving SP.
    pub fn next_pop_slot(&self) -> Result<u8, RegisterError> {
        if self.sp >= STACK_BASE {
            return Err(RegisterError::StackUnderflow);
        }
        Ok(self.sp)
    }

    /// Decrement SP and return the new top-of-stack address.
    pub fn push_slot(&mut self) -> Result<u8, RegisterError> {
        self.sp = self.next_push_slot()?;
        Ok(self.sp)
    }

    /// Return the top-of-stack address and increment SP.
    pub fn pop_slot(&mut self) -> Result<u8, RegisterError> {
        let slot = self.next_pop_slot()?;
        self.sp += 1;
        Ok(slot)
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of the most recent comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    Greater,
    Equal,
}

impl From<Ordering> for Comparison {
    fn from(ord: Ordering) -> Self {
        match ord {
            Ordering::Less => Comparison::Less,
            Ordering::Greater => Comparison::Greater,
            Ordering::Equal => Comparison::Equal,
        }
    }
}

/// The FL register.
///
/// Empty until the first CMP; afterwards exactly one of less-than,
/// greater-than and equal holds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flags {
    last: Option<Comparison>,
}

impl Flags {
    /// Bit set in [`Flags::bits`] when the last comparison was equal.
    pub const EQUAL: u8 = 0b001;
    /// Bit set in [`Flags::bits`] when the left operand was greater.
    pub const GREATER: u8 = 0b010;
    /// Bit set in [`Flags::bits`] when the left operand was less.
    pub const LESS: u8 = 0b100;

    /// Flags with nothing set.
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Record the comparison of `a` against `b`.
    pub fn set_from_comparison(&mut self, a: u8, b: u8) {
        self.last = Some(a.cmp(&b).into());
    }

    pub fn is_less(&self) -> bool {
        self.last == Some(Comparison::Less)
    }

    pub fn is_greater(&self) -> bool {
        self.last == Some(Comparison::Greater)
    }

    pub fn is_equal(&self) -> bool {
        self.last == Some(Comparison::Equal)
    }

    /// The last comparison, if any.
    pub fn comparison(&self) -> Option<Comparison> {
        self.last
    }

    /// Packed `00000LGE` byte form.
    pub fn bits(&self) -> u8 {
        match self.last {
            None => 0,
            Some(Comparison::Less) => Self::LESS,
            Some(Comparison::Greater) => Self::GREATER,
            Some(Comparison::Equal) => Self::EQUAL,
        }
    }

    pub fn clear(&mut self) {
        self.last = None;
    }
}

impl std::fmt::Display for Flags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bit = |set: bool, c: char| if set { c } else { '-' };
        write!(
            f,
            "{}{}{}",
            bit(self.is_less(), 'L'),
            bit(self.is_greater(), 'G'),
            bit(self.is_equal(), 'E')
        )
    }
}

/// Errors from register and stack-pointer access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register R{0} (expected R0-R7)")]
    InvalidRegister(u8),

    #[error("stack overflow: SP would drop below address 0")]
    StackOverflow,

    #[error("stack underflow: pop with SP at the stack base ({STACK_BASE})")]
    StackUnderflow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_register_file() {
        let regs = RegisterFile::new();
        assert_eq!(regs.values(), &[0; REGISTER_COUNT]);
        assert_eq!(regs.sp(), STACK_BASE);
        assert_eq!(regs.stack_depth(), 0);
    }

    #[test]
    fn test_get_set() {
        let mut regs = RegisterFile::new();
        regs.set(3, 200).unwrap();
        assert_eq!(regs.get(3).unwrap(), 200);
        assert_eq!(regs.get(7).unwrap(), 0);
    }

    #[test]
    fn test_invalid_register() {
        let mut regs = RegisterFile::new();
        assert_eq!(regs.get(8), Err(RegisterError::InvalidRegister(8)));
        assert_eq!(regs.set(255, 1), Err(RegisterError::InvalidRegister(255)));
        assert_eq!(RegisterFile::check(9), Err(RegisterError::InvalidRegister(9)));
        assert_eq!(RegisterFile::check(7), Ok(7));
    }

    #[test]
    fn test_stack_slots() {
        let mut regs = RegisterFile::new();

        assert_eq!(regs.pop_slot(), Err(RegisterError::StackUnderflow));

        assert_eq!(regs.push_slot().unwrap(), STACK_BASE - 1);
        assert_eq!(regs.push_slot().unwrap(), STACK_BASE - 2);
        assert_eq!(regs.stack_depth(), 2);

        assert_eq!(regs.pop_slot().unwrap(), STACK_BASE - 2);
        assert_eq!(regs.pop_slot().unwrap(), STACK_BASE - 1);
        assert_eq!(regs.sp(), STACK_BASE);
    }

    #[test]
    fn test_stack_overflow() {
        let mut regs = RegisterFile::new();
        for _ in 0..STACK_BASE {
            regs.push_slot().unwrap();
        }
        assert_eq!(regs.sp(), 0);
        assert_eq!(regs.push_slot(), Err(RegisterError::StackOverflow));
        // A failed push leaves SP alone
        assert_eq!(regs.sp(), 0);
    }

    #[test]
    fn test_flags_start_clear() {
        let flags = Flags::new();
        assert!(!flags.is_less() && !flags.is_greater() && !flags.is_equal());
        assert_eq!(flags.bits(), 0);
        assert_eq!(flags.to_string(), "---");
    }

    #[test]
    fn test_flags_from_comparison() {
        let mut flags = Flags::new();

        flags.set_from_comparison(1, 2);
        assert!(flags.is_less());
        assert_eq!(flags.bits(), Flags::LESS);

        flags.set_from_comparison(2, 1);
        assert!(flags.is_greater());
        assert!(!flags.is_less());
        assert_eq!(flags.to_string(), "-G-");

        flags.set_from_comparison(7, 7);
        assert!(flags.is_equal());
        assert_eq!(flags.bits(), Flags::EQUAL);

        flags.clear();
        assert_eq!(flags.comparison(), None);
    }
}
