//! `wasm-bindgen` surface for driving an LS-8 from JavaScript.
//!
//! PRN output is buffered per line and read back with [`WasmCpu::output`].

use wasm_bindgen::prelude::*;
use crate::Cpu;
use crate::asm::assembler::assemble;
use crate::asm::disasm::{disassemble_at, format_instruction};
use crate::asm::program::parse_program;
use crate::cpu::MEMORY_SIZE;

/// Route panics to the browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// A CPU plus the program image it was loaded from.
#[wasm_bindgen]
pub struct WasmCpu {
    cpu: Cpu,
    program: Vec<u8>,
    output: Vec<String>,
}

#[wasm_bindgen]
impl WasmCpu {
    /// An empty machine with no program.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            program: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Load a program from assembly source code. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_asm(&mut self, source: &str) -> Result<usize, JsError> {
        let bytes = assemble(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.install(bytes)
    }

    /// Load a program from `.ls8` text. Returns its size in bytes.
    #[wasm_bindgen]
    pub fn load_ls8(&mut self, source: &str) -> Result<usize, JsError> {
        let program = parse_program(source)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.install(program.bytes)
    }

    fn install(&mut self, bytes: Vec<u8>) -> Result<usize, JsError> {
        let len = bytes.len();
        self.cpu = Cpu::new();
        self.cpu.load_program(&bytes)
            .map_err(|e| JsError::new(&e.to_string()))?;
        self.program = bytes;
        self.output.clear();
        Ok(len)
    }

    /// Execute one instruction and return its assembly text.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let mut printed = Vec::new();
        let result = self.cpu.step(&mut printed);
        self.collect(&printed);

        match result.map_err(|e| JsError::new(&e.to_string()))? {
            Some(instr) => Ok(format_instruction(&instr)),
            None => Ok(format!("{:?}", self.cpu.state)),
        }
    }

    /// Run at most `max_cycles` instructions. Returns the total cycle count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_cycles: u32) -> Result<u64, JsError> {
        let mut printed = Vec::new();
        let result = self.cpu.run_limited(&mut printed, max_cycles as u64);
        self.collect(&printed);
        result.map_err(|e| JsError::new(&e.to_string()))?;
        Ok(self.cpu.cycles)
    }

    fn collect(&mut self, printed: &[u8]) {
        self.output.extend(
            String::from_utf8_lossy(printed).lines().map(str::to_string)
        );
    }

    /// Reload the last program into a fresh CPU.
    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.output.clear();
        // The image already fitted once
        let _ = self.cpu.load_program(&self.program);
    }

    /// `true` until a halt or fault.
    #[wasm_bindgen]
    pub fn is_running(&self) -> bool {
        self.cpu.is_running()
    }

    /// `true` after HLT or an unrecognized opcode.
    #[wasm_bindgen]
    pub fn is_halted(&self) -> bool {
        self.cpu.is_halted()
    }

    /// Instructions executed so far.
    #[wasm_bindgen]
    pub fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    #[wasm_bindgen]
    pub fn pc(&self) -> u8 {
        self.cpu.pc
    }

    #[wasm_bindgen]
    pub fn sp(&self) -> u8 {
        self.cpu.regs.sp()
    }

    /// R0-R7; out-of-range indices read as 0.
    #[wasm_bindgen]
    pub fn register(&self, index: u8) -> u8 {
        self.cpu.regs.get(index).unwrap_or(0)
    }

    /// FL in `00000LGE` form.
    #[wasm_bindgen]
    pub fn flags(&self) -> u8 {
        self.cpu.flags.bits()
    }

    /// `Running`, `Halted(..)` or `Faulted`.
    #[wasm_bindgen]
    pub fn state(&self) -> String {
        format!("{:?}", self.cpu.state)
    }

    /// One memory cell; out-of-range addresses read as 0.
    #[wasm_bindgen]
    pub fn memory_at(&self, addr: usize) -> u8 {
        self.cpu.mem.read(addr).unwrap_or(0)
    }

    /// A copy of all 128 cells.
    #[wasm_bindgen]
    pub fn memory_all(&self) -> Vec<u8> {
        self.cpu.mem.as_slice().to_vec()
    }

    /// Lines printed by PRN so far.
    #[wasm_bindgen]
    pub fn output(&self) -> js_sys::Array {
        self.output.iter().map(|line| JsValue::from_str(line)).collect()
    }

    /// Registers, SP, PC, flags and state as a JSON object.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        let snapshot = serde_json::json!({
            "registers": self.cpu.regs.values(),
            "sp": self.cpu.regs.sp(),
            "pc": self.cpu.pc,
            "flags": self.cpu.flags.to_string(),
            "cycles": self.cpu.cycles,
            "state": self.cpu.state,
        });
        serde_json::to_string(&snapshot)
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for WasmCpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Assembled size of `source`, or the first assembly error.
#[wasm_bindgen]
pub fn wasm_assemble(source: &str) -> Result<usize, JsError> {
    assemble(source)
        .map(|bytes| bytes.len())
        .map_err(|e| JsError::new(&e.to_string()))
}

/// Disassemble the instruction at `addr` in `bytes`.
#[wasm_bindgen]
pub fn wasm_disassemble(bytes: &[u8], addr: usize) -> String {
    if addr >= MEMORY_SIZE {
        return String::new();
    }
    disassemble_at(bytes, addr).0
}
