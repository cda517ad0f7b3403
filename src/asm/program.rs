//! `.ls8` program files.
//!
//! The format is plain text, one byte per line:
//! - Each record is 8 binary digits, most significant bit first
//! - Anything after `#` on a line is a comment
//! - Blank lines and comment-only lines are ignored

use crate::asm::disasm::disassemble_at;
use std::path::Path;
use std::io::{BufRead, BufReader, Write};
use thiserror::Error;

/// A loaded program.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// The program bytes, to be placed at address 0.
    pub bytes: Vec<u8>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl Program {
    /// Create a new empty program.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let source_lines = bytes.iter().map(|b| format!("{:08b}", b)).collect();
        Self { bytes, source_lines }
    }

    /// Add a byte.
    pub fn push(&mut self, byte: u8, source: &str) {
        self.bytes.push(byte);
        self.source_lines.push(source.to_string());
    }

    /// Get the number of bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parse `.ls8` text.
pub fn parse_program(source: &str) -> Result<Program, ProgramError> {
    let mut program = Program::new();

    for (line_num, line) in source.lines().enumerate() {
        if let Some(byte) = parse_record(line, line_num + 1)? {
            program.push(byte, line.trim());
        }
    }

    Ok(program)
}

/// Load a `.ls8` file from disk.
pub fn load_program<P: AsRef<Path>>(path: P) -> Result<Program, ProgramError> {
    let file = std::fs::File::open(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;
    let reader = BufReader::new(file);

    let mut program = Program::new();

    for (line_num, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|e| ProgramError::IoError(e.to_string()))?;
        if let Some(byte) = parse_record(&line, line_num + 1)? {
            program.push(byte, line.trim());
        }
    }

    log::debug!("read {} byte(s) from {}", program.len(), path.as_ref().display());
    Ok(program)
}

/// Parse one line. `None` for blank and comment lines.
fn parse_record(line: &str, line_num: usize) -> Result<Option<u8>, ProgramError> {
    let record = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
    .trim();

    if record.is_empty() {
        return Ok(None);
    }

    if record.len() != 8 || !record.bytes().all(|b| b == b'0' || b == b'1') {
        return Err(ProgramError::ParseError {
            line: line_num,
            message: format!("expected 8 binary digits, found {:?}", record),
        });
    }

    // Checked above: exactly eight '0'/'1' characters
    u8::from_str_radix(record, 2)
        .map(Some)
        .map_err(|e| ProgramError::ParseError {
            line: line_num,
            message: e.to_string(),
        })
}

/// Render a program as `.ls8` text, annotated with its disassembly.
pub fn render_program(program: &Program) -> String {
    let mut text = String::new();
    text.push_str("# LS-8 program\n");
    text.push_str(&format!("# {} bytes\n\n", program.len()));

    let mut addr = 0;
    while addr < program.len() {
        let (line, len) = disassemble_at(&program.bytes, addr);
        for (i, byte) in program.bytes[addr..(addr + len).min(program.len())].iter().enumerate() {
            if i == 0 {
                text.push_str(&format!("{:08b} # {:03}: {}\n", byte, addr, line));
            } else {
                text.push_str(&format!("{:08b}\n", byte));
            }
        }
        addr += len;
    }

    text
}

/// Save a program to disk.
pub fn save_program<P: AsRef<Path>>(path: P, program: &Program) -> Result<(), ProgramError> {
    let mut file = std::fs::File::create(path.as_ref())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    file.write_all(render_program(program).as_bytes())
        .map_err(|e| ProgramError::IoError(e.to_string()))?;

    Ok(())
}

/// Errors that can occur while reading or writing program files.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINT8: &str = "\
# print8.ls8: Print the number 8 on the screen

10000010 # LDI R0,8
00000000
00001000
01000111 # PRN R0
00000000
00000001 # HLT
";

    #[test]
    fn test_parse_print8() {
        let program = parse_program(PRINT8).unwrap();
        assert_eq!(program.bytes, vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 1]);
        assert_eq!(program.source_lines[0], "10000010 # LDI R0,8");
    }

    #[test]
    fn test_comments_and_blanks_skipped() {
        let program = parse_program("\n   \n# only a comment\n   # indented comment\n00000001\n").unwrap();
        assert_eq!(program.bytes, vec![1]);
    }

    #[test]
    fn test_reject_malformed_records() {
        for (source, line) in [
            ("00000001\n1000001\n", 2),
            ("100000100\n", 1),
            ("1000002 0\n", 1),
            ("\n\nLDI R0,8\n", 3),
        ] {
            match parse_program(source) {
                Err(ProgramError::ParseError { line: l, .. }) => assert_eq!(l, line, "{source:?}"),
                other => panic!("expected parse error for {source:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_render_then_parse() {
        let program = parse_program(PRINT8).unwrap();
        let text = render_program(&program);

        assert!(text.contains("10000010 # 000: LDI R0,8"));
        assert!(text.contains("01000111 # 003: PRN R0"));
        assert_eq!(parse_program(&text).unwrap().bytes, program.bytes);
    }

    #[test]
    fn test_save_and_load_file() {
        let path = std::env::temp_dir().join(format!("ls8-test-{}.ls8", std::process::id()));
        let program = Program::from_bytes(vec![0b1000_0010, 1, 200, 1]);

        save_program(&path, &program).unwrap();
        let loaded = load_program(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.bytes, program.bytes);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_program("/definitely/not/here.ls8"),
            Err(ProgramError::IoError(_))
        ));
    }
}
