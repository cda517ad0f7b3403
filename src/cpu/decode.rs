//! Instruction decoder for the LS-8.
//!
//! Every instruction is one opcode byte followed by zero, one or two operand
//! bytes. The opcode byte is laid out as `AABCDDDD`:
//! - `AA`: number of operands
//! - `B`: handled by the ALU
//! - `C`: sets the PC directly
//! - `DDDD`: instruction identifier

use serde::{Serialize, Deserialize};
use thiserror::Error;

/// The closed set of LS-8 opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Hlt = 0b0000_0001,
    Ret = 0b0001_0001,
    Push = 0b0100_0101,
    Pop = 0b0100_0110,
    Prn = 0b0100_0111,
    Call = 0b0101_0000,
    Jmp = 0b0101_0100,
    Jeq = 0b0101_0101,
    Jne = 0b0101_0110,
    Ldi = 0b1000_0010,
    Add = 0b1010_0000,
    Sub = 0b1010_0001,
    Mul = 0b1010_0010,
    Cmp = 0b1010_0111,
}

impl Opcode {
    /// Every opcode, in table order.
    pub const ALL: [Opcode; 14] = [
        Opcode::Hlt,
        Opcode::Ret,
        Opcode::Push,
        Opcode::Pop,
        Opcode::Prn,
        Opcode::Call,
        Opcode::Jmp,
        Opcode::Jeq,
        Opcode::Jne,
        Opcode::Ldi,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Cmp,
    ];

    /// Look up an opcode byte. `None` for bytes outside the table.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.byte() == byte)
    }

    #[inline]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Number of operand bytes that follow the opcode.
    #[inline]
    pub const fn operand_count(self) -> usize {
        (self.byte() >> 6) as usize
    }

    /// Encoded length including the opcode byte.
    #[inline]
    pub const fn len(self) -> usize {
        1 + self.operand_count()
    }

    /// Whether the ALU carries out this instruction.
    #[inline]
    pub const fn is_alu(self) -> bool {
        self.byte() & 0b0010_0000 != 0
    }

    /// Whether the instruction may set the PC itself.
    #[inline]
    pub const fn sets_pc(self) -> bool {
        self.byte() & 0b0001_0000 != 0
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Hlt => "HLT",
            Opcode::Ret => "RET",
            Opcode::Push => "PUSH",
            Opcode::Pop => "POP",
            Opcode::Prn => "PRN",
            Opcode::Call => "CALL",
            Opcode::Jmp => "JMP",
            Opcode::Jeq => "JEQ",
            Opcode::Jne => "JNE",
            Opcode::Ldi => "LDI",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Cmp => "CMP",
        }
    }

    /// Look up a mnemonic, ignoring case.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Decoded LS-8 instruction.
///
/// Register operands are raw bytes here; they are checked against R0-R7
/// when the instruction executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Data ====================

    /// Load immediate: R[reg] := value
    Ldi { reg: u8, value: u8 },

    /// Print R[reg] in decimal
    Prn { reg: u8 },

    // ==================== ALU ====================

    /// R[a] := R[a] + R[b]
    Add { a: u8, b: u8 },

    /// R[a] := R[a] - R[b]
    Sub { a: u8, b: u8 },

    /// R[a] := R[a] * R[b]
    Mul { a: u8, b: u8 },

    /// Compare R[a] with R[b] and set FL
    Cmp { a: u8, b: u8 },

    // ==================== Stack ====================

    /// SP := SP - 1; [SP] := R[reg]
    Push { reg: u8 },

    /// R[reg] := [SP]; SP := SP + 1
    Pop { reg: u8 },

    /// Push the return address, then PC := R[reg]
    Call { reg: u8 },

    /// Pop the return address into PC
    Ret,

    // ==================== Control Flow ====================

    /// PC := R[reg]
    Jmp { reg: u8 },

    /// If E: PC := R[reg]
    Jeq { reg: u8 },

    /// If not E: PC := R[reg]
    Jne { reg: u8 },

    /// Halt execution
    Hlt,
}

impl Instruction {
    /// Build an instruction from its opcode and operand bytes.
    ///
    /// `operands` must hold at least `op.operand_count()` bytes.
    pub fn from_parts(op: Opcode, operands: &[u8]) -> Result<Self, DecodeError> {
        if operands.len() < op.operand_count() {
            return Err(DecodeError::Truncated {
                opcode: op,
                expected: op.operand_count(),
                found: operands.len(),
            });
        }

        let a = operands.first().copied().unwrap_or(0);
        let b = operands.get(1).copied().unwrap_or(0);

        let instr = match op {
            Opcode::Ldi => Instruction::Ldi { reg: a, value: b },
            Opcode::Prn => Instruction::Prn { reg: a },
            Opcode::Add => Instruction::Add { a, b },
            Opcode::Sub => Instruction::Sub { a, b },
            Opcode::Mul => Instruction::Mul { a, b },
            Opcode::Cmp => Instruction::Cmp { a, b },
            Opcode::Push => Instruction::Push { reg: a },
            Opcode::Pop => Instruction::Pop { reg: a },
            Opcode::Call => Instruction::Call { reg: a },
            Opcode::Ret => Instruction::Ret,
            Opcode::Jmp => Instruction::Jmp { reg: a },
            Opcode::Jeq => Instruction::Jeq { reg: a },
            Opcode::Jne => Instruction::Jne { reg: a },
            Opcode::Hlt => Instruction::Hlt,
        };

        Ok(instr)
    }

    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Ldi { .. } => Opcode::Ldi,
            Instruction::Prn { .. } => Opcode::Prn,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Cmp { .. } => Opcode::Cmp,
            Instruction::Push { .. } => Opcode::Push,
            Instruction::Pop { .. } => Opcode::Pop,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::Ret => Opcode::Ret,
            Instruction::Jmp { .. } => Opcode::Jmp,
            Instruction::Jeq { .. } => Opcode::Jeq,
            Instruction::Jne { .. } => Opcode::Jne,
            Instruction::Hlt => Opcode::Hlt,
        }
    }

    /// Encoded length in bytes.
    pub fn len(&self) -> usize {
        self.opcode().len()
    }

    /// Operand bytes in encoding order.
    pub fn operands(&self) -> Vec<u8> {
        match *self {
            Instruction::Ldi { reg, value } => vec![reg, value],
            Instruction::Add { a, b }
            | Instruction::Sub { a, b }
            | Instruction::Mul { a, b }
            | Instruction::Cmp { a, b } => vec![a, b],
            Instruction::Prn { reg }
            | Instruction::Push { reg }
            | Instruction::Pop { reg }
            | Instruction::Call { reg }
            | Instruction::Jmp { reg }
            | Instruction::Jeq { reg }
            | Instruction::Jne { reg } => vec![reg],
            Instruction::Ret | Instruction::Hlt => Vec::new(),
        }
    }
}

/// Decode the instruction at the start of `bytes`.
pub fn decode(bytes: &[u8]) -> Result<Instruction, DecodeError> {
    let (&byte, rest) = bytes.split_first().ok_or(DecodeError::Empty)?;
    let op = Opcode::from_byte(byte).ok_or(DecodeError::UnrecognizedOpcode(byte))?;
    Instruction::from_parts(op, rest)
}

/// Encode an instruction to its byte form.
pub fn encode(instr: &Instruction) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(instr.len());
    bytes.push(instr.opcode().byte());
    bytes.extend(instr.operands());
    bytes
}

/// Encode a whole program.
pub fn encode_all(instrs: &[Instruction]) -> Vec<u8> {
    instrs.iter().flat_map(encode).collect()
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unrecognized opcode {0:#010b}")]
    UnrecognizedOpcode(u8),

    #[error("{opcode} expects {expected} operand byte(s), found {found}")]
    Truncated { opcode: Opcode, expected: usize, found: usize },

    #[error("no bytes to decode")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hlt() {
        assert_eq!(decode(&[0b0000_0001]).unwrap(), Instruction::Hlt);
    }

    #[test]
    fn test_decode_ldi() {
        let instr = decode(&[0b1000_0010, 0, 8]).unwrap();
        assert_eq!(instr, Instruction::Ldi { reg: 0, value: 8 });
        assert_eq!(instr.len(), 3);
    }

    #[test]
    fn test_operand_count_matches_high_bits() {
        assert_eq!(Opcode::Hlt.operand_count(), 0);
        assert_eq!(Opcode::Ret.operand_count(), 0);
        assert_eq!(Opcode::Prn.operand_count(), 1);
        assert_eq!(Opcode::Call.operand_count(), 1);
        assert_eq!(Opcode::Ldi.operand_count(), 2);
        assert_eq!(Opcode::Cmp.operand_count(), 2);
    }

    #[test]
    fn test_alu_and_pc_bits() {
        for op in Opcode::ALL {
            let alu = matches!(op, Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Cmp);
            assert_eq!(op.is_alu(), alu, "{op}");
        }
        assert!(Opcode::Jmp.sets_pc());
        assert!(Opcode::Ret.sets_pc());
        assert!(!Opcode::Push.sets_pc());
    }

    #[test]
    fn test_unrecognized_opcode() {
        assert_eq!(decode(&[0xFF]), Err(DecodeError::UnrecognizedOpcode(0xFF)));
        assert_eq!(Opcode::from_byte(0), None);
    }

    #[test]
    fn test_truncated_operands() {
        assert!(matches!(
            decode(&[0b1010_0000, 1]),
            Err(DecodeError::Truncated { opcode: Opcode::Add, expected: 2, found: 1 })
        ));
        assert_eq!(decode(&[]), Err(DecodeError::Empty));
    }

    #[test]
    fn test_opcode_table_is_unique() {
        for (i, a) in Opcode::ALL.iter().enumerate() {
            assert_eq!(Opcode::from_byte(a.byte()), Some(*a));
            for b in &Opcode::ALL[i + 1..] {
                assert_ne!(a.byte(), b.byte());
            }
        }
    }

    #[test]
    fn test_mnemonic_lookup() {
        assert_eq!(Opcode::from_mnemonic("ldi"), Some(Opcode::Ldi));
        assert_eq!(Opcode::from_mnemonic("JNE"), Some(Opcode::Jne));
        assert_eq!(Opcode::from_mnemonic("NOP"), None);
    }

    #[test]
    fn test_encode_program() {
        let bytes = encode_all(&[
            Instruction::Ldi { reg: 1, value: 3 },
            Instruction::Push { reg: 1 },
            Instruction::Ret,
        ]);
        assert_eq!(bytes, vec![0b1000_0010, 1, 3, 0b0100_0101, 1, 0b0001_0001]);
    }
}
