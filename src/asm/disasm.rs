//! Disassembler for LS-8 programs.
//!
//! Converts program bytes back to readable assembly.

use crate::cpu::decode::{decode, Instruction};

/// Disassemble the instruction starting at `addr`.
///
/// Returns the text and the number of bytes it covers. Bytes that do not
/// start a complete instruction come back as a one-byte `DB`.
pub fn disassemble_at(bytes: &[u8], addr: usize) -> (String, usize) {
    let Some(rest) = bytes.get(addr..).filter(|rest| !rest.is_empty()) else {
        return (String::new(), 1);
    };

    match decode(rest) {
        Ok(instr) => (format_instruction(&instr), instr.len()),
        Err(_) => (format!("DB {:#04x}", rest[0]), 1),
    }
}

/// Disassemble a whole program into a listing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut output = String::new();
    output.push_str("; LS-8 Disassembly\n");
    output.push_str("; ----------------\n\n");

    let mut addr = 0;
    while addr < bytes.len() {
        let (line, len) = disassemble_at(bytes, addr);
        let end = (addr + len).min(bytes.len());
        let raw: Vec<String> = bytes[addr..end].iter().map(|b| format!("{:02X}", b)).collect();
        output.push_str(&format!("{:03}: {:<9} {}\n", addr, raw.join(" "), line));
        addr += len;
    }

    output
}

/// Format a decoded instruction as assembly text.
pub fn format_instruction(instr: &Instruction) -> String {
    let op = instr.opcode();
    match *instr {
        Instruction::Ldi { reg, value } => format!("{} R{},{}", op, reg, value),

        Instruction::Add { a, b }
        | Instruction::Sub { a, b }
        | Instruction::Mul { a, b }
        | Instruction::Cmp { a, b } => format!("{} R{},R{}", op, a, b),

        Instruction::Prn { reg }
        | Instruction::Push { reg }
        | Instruction::Pop { reg }
        | Instruction::Call { reg }
        | Instruction::Jmp { reg }
        | Instruction::Jeq { reg }
        | Instruction::Jne { reg } => format!("{} R{}", op, reg),

        Instruction::Ret | Instruction::Hlt => op.to_string(),
    }
}
