//! Simple assembler for LS-8 programs.
//!
//! Syntax:
//! ```text
//! ; Comment
//! LOOP:               ; Define a label
//!     LDI R0,8        ; Load immediate
//!     LDI R1,LOOP     ; Labels resolve to their address
//!     ADD R0,R1
//!     PRN R0
//!     JMP R1
//!     HLT
//!     DB 0x2A, 7      ; Raw data bytes
//! ```

use crate::cpu::decode::{encode, Instruction, Opcode};
use crate::cpu::registers::REGISTER_COUNT;
use std::collections::HashMap;
use thiserror::Error;

/// Assemble source code to program bytes.
pub fn assemble(source: &str) -> Result<Vec<u8>, AssemblerError> {
    let mut asm = Assembler::new();
    asm.assemble(source)
}

/// Output buffer plus the label bookkeeping needed to patch forward references.
struct Assembler {
    /// Label -> address.
    symbols: HashMap<String, usize>,
    /// Byte positions still waiting on a label.
    pending: Vec<(usize, String, usize)>, // (byte index, label, line)
    /// Output bytes.
    output: Vec<u8>,
}

/// An immediate that may still need a label resolved.
enum Immediate {
    Value(u8),
    Label(String),
}

impl Assembler {
    fn new() -> Self {
        Self {
            symbols: HashMap::new(),
            pending: Vec::new(),
            output: Vec::new(),
        }
    }

    fn assemble(&mut self, source: &str) -> Result<Vec<u8>, AssemblerError> {
        // Emit bytes, recording labels and any operand that names one
        for (line_num, line) in source.lines().enumerate() {
            self.process_line(line, line_num + 1)?;
        }

        // Patch label operands now that every address is known
        self.resolve_references()?;

        Ok(std::mem::take(&mut self.output))
    }

    fn process_line(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        // Remove comments
        let line = match line.find(&[';', '#'][..]) {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();

        if line.is_empty() {
            return Ok(());
        }

        // `NAME:` optionally followed by an instruction
        if let Some(colon_idx) = line.find(':') {
            let label = line[..colon_idx].trim().to_uppercase();
            if label.is_empty() || label.contains(char::is_whitespace) {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("invalid label {:?}", &line[..colon_idx]),
                });
            }
            if self.symbols.insert(label.clone(), self.output.len()).is_some() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: format!("label {} defined twice", label),
                });
            }

            let rest = line[colon_idx + 1..].trim();
            if !rest.is_empty() {
                return self.process_instruction(rest, line_num);
            }
            return Ok(());
        }

        self.process_instruction(line, line_num)
    }

    fn process_instruction(&mut self, line: &str, line_num: usize) -> Result<(), AssemblerError> {
        let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
            Some((m, r)) => (m, r.trim()),
            None => (line, ""),
        };
        let operands: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(',').map(str::trim).collect()
        };
        let mnemonic = mnemonic.to_uppercase();

        if mnemonic == "DB" {
            if operands.is_empty() {
                return Err(AssemblerError::SyntaxError {
                    line: line_num,
                    message: "DB requires at least one value".into(),
                });
            }
            for operand in operands {
                let value = self.parse_immediate(operand, line_num)?;
                self.emit_immediate(value, line_num);
            }
            return Ok(());
        }

        let op = Opcode::from_mnemonic(&mnemonic).ok_or_else(|| AssemblerError::UnknownMnemonic {
            line: line_num,
            mnemonic: mnemonic.clone(),
        })?;

        if operands.len() != op.operand_count() {
            return Err(AssemblerError::SyntaxError {
                line: line_num,
                message: format!(
                    "{} takes {} operand(s), found {}",
                    op, op.operand_count(), operands.len()
                ),
            });
        }

        if op == Opcode::Ldi {
            let reg = self.parse_register(operands[0], line_num)?;
            let value = self.parse_immediate(operands[1], line_num)?;
            self.output.push(op.byte());
            self.output.push(reg);
            self.emit_immediate(value, line_num);
            return Ok(());
        }

        let regs = operands
            .iter()
            .map(|operand| self.parse_register(operand, line_num))
            .collect::<Result<Vec<u8>, _>>()?;
        let instr = Instruction::from_parts(op, &regs).map_err(|e| AssemblerError::SyntaxError {
            line: line_num,
            message: e.to_string(),
        })?;
        self.output.extend(encode(&instr));

        Ok(())
    }

    fn parse_register(&self, operand: &str, line_num: usize) -> Result<u8, AssemblerError> {
        let index = operand
            .strip_prefix(&['R', 'r'][..])
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|&n| n < REGISTER_COUNT)
            .ok_or_else(|| AssemblerError::SyntaxError {
                line: line_num,
                message: format!("expected a register R0-R7, found {:?}", operand),
            })?;
        Ok(index as u8)
    }

    fn parse_immediate(&self, operand: &str, line_num: usize) -> Result<Immediate, AssemblerError> {
        let syntax = |message: &str| AssemblerError::SyntaxError {
            line: line_num,
            message: message.into(),
        };

        let value = if let Some(hex) = operand.strip_prefix("0x").or_else(|| operand.strip_prefix("0X")) {
            i64::from_str_radix(hex, 16).map_err(|_| syntax("invalid hex literal"))?
        } else if let Some(bin) = operand.strip_prefix("0b").or_else(|| operand.strip_prefix("0B")) {
            i64::from_str_radix(bin, 2).map_err(|_| syntax("invalid binary literal"))?
        } else if let Ok(num) = operand.parse::<i64>() {
            num
        } else if operand.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            // Must be a label reference - resolved in pass 2
            return Ok(Immediate::Label(operand.to_uppercase()));
        } else {
            return Err(syntax(&format!("invalid operand {:?}", operand)));
        };

        u8::try_from(value)
            .map(Immediate::Value)
            .map_err(|_| AssemblerError::ValueOutOfRange { line: line_num, value })
    }

    fn emit_immediate(&mut self, value: Immediate, line_num: usize) {
        match value {
            Immediate::Value(byte) => self.output.push(byte),
            Immediate::Label(label) => {
                self.pending.push((self.output.len(), label, line_num));
                self.output.push(0); // Placeholder, patched in pass 2
            }
        }
    }

    fn resolve_references(&mut self) -> Result<(), AssemblerError> {
        for (out_idx, label, line_num) in &self.pending {
            let addr = *self.symbols.get(label)
                .ok_or_else(|| AssemblerError::UndefinedLabel {
                    line: *line_num,
                    label: label.clone(),
                })?;

            self.output[*out_idx] = u8::try_from(addr)
                .map_err(|_| AssemblerError::ValueOutOfRange { line: *line_num, value: addr as i64 })?;
        }
        Ok(())
    }
}

/// Assembly failures, each tagged with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssemblerError {
    #[error("syntax error on line {line}: {message}")]
    SyntaxError { line: usize, message: String },

    #[error("unknown mnemonic on line {line}: {mnemonic}")]
    UnknownMnemonic { line: usize, mnemonic: String },

    #[error("undefined label on line {line}: {label}")]
    UndefinedLabel { line: usize, label: String },

    #[error("value out of range on line {line}: {value}")]
    ValueOutOfRange { line: usize, value: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Cpu;

    #[test]
    fn test_assemble_simple() {
        let source = r#"
            ; Print the number 8
            LDI R0,8
            PRN R0
            HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result, vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 0b0000_0001]);
    }

    #[test]
    fn test_assemble_with_labels() {
        let source = r#"
        START:
            LDI R1,END      ; forward reference
            JMP R1
            PRN R0
        END: HLT
        "#;

        let result = assemble(source).unwrap();
        assert_eq!(result[2], 7);
        assert_eq!(result[7], Opcode::Hlt.byte());
    }

    #[test]
    fn test_assemble_literals_and_data() {
        let result = assemble("LDI r2, 0x2A\nLDI R3,0b101\nDB 255, 0, 0x10\n").unwrap();
        assert_eq!(result, vec![0x82, 2, 42, 0x82, 3, 5, 255, 0, 16]);
    }

    #[test]
    fn test_assemble_errors() {
        assert_eq!(
            assemble("NOP"),
            Err(AssemblerError::UnknownMnemonic { line: 1, mnemonic: "NOP".into() })
        );
        assert!(matches!(assemble("\nLDI R8,1"), Err(AssemblerError::SyntaxError { line: 2, .. })));
        assert!(matches!(assemble("ADD R0"), Err(AssemblerError::SyntaxError { line: 1, .. })));
        assert_eq!(
            assemble("LDI R0,256"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: 256 })
        );
        assert_eq!(
            assemble("LDI R0,-1"),
            Err(AssemblerError::ValueOutOfRange { line: 1, value: -1 })
        );
        assert_eq!(
            assemble("LDI R0,NOWHERE"),
            Err(AssemblerError::UndefinedLabel { line: 1, label: "NOWHERE".into() })
        );
        assert!(matches!(assemble("A:\nA:\n"), Err(AssemblerError::SyntaxError { line: 2, .. })));
    }

    #[test]
    fn test_assembled_subroutine_runs() {
        let source = r#"
            LDI R0,6
            LDI R1,DOUBLE
            CALL R1
            PRN R0
            HLT
        DOUBLE:
            ADD R0,R0
            RET
        "#;

        let mut cpu = Cpu::new();
        cpu.load_program(&assemble(source).unwrap()).unwrap();
        let mut out = Vec::new();
        cpu.run(&mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "12\n");
    }
}
