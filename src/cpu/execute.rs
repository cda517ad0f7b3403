//! CPU execution engine for the LS-8.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use crate::cpu::{Memory, RegisterFile, Flags};
use crate::cpu::alu::{self, AluError, AluOp};
use crate::cpu::decode::{DecodeError, Instruction, Opcode};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::RegisterError;
use serde::{Serialize, Deserialize};
use std::io::Write;
use thiserror::Error;

/// Why the CPU stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    /// Executed HLT.
    Instruction,
    /// Fetched a byte that is not in the opcode table.
    UnrecognizedOpcode { opcode: u8, address: u8 },
}

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted; PC has been reset to 0.
    Halted(HaltReason),
    /// A cycle failed. State is left as it was before that cycle.
    Faulted,
}

/// What a handler wants done with the PC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// Continue at an absolute address.
    Jump(u8),
    Halt,
}

/// The LS-8 CPU.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cpu {
    /// R0-R7 and SP.
    pub regs: RegisterFile,
    /// FL register.
    pub flags: Flags,
    /// Main memory.
    pub mem: Memory,
    /// Program counter.
    pub pc: u8,
    /// Current execution state.
    pub state: CpuState,
    /// Instruction count.
    pub cycles: u64,
    /// Last executed instruction (for debugging).
    last_instr: Option<Instruction>,
}

impl Cpu {
    /// Create a new CPU: PC at 0, SP at the stack base, everything else zeroed.
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            flags: Flags::new(),
            mem: Memory::new(),
            pc: 0,
            state: CpuState::Running,
            cycles: 0,
            last_instr: None,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.flags.clear();
        self.mem.clear();
        self.pc = 0;
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_instr = None;
    }

    /// Load a program into memory at address 0.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), MemoryError> {
        self.mem.load_program(0, program)?;
        log::debug!("loaded {} byte(s) at address 0", program.len());
        Ok(())
    }

    /// Execute a single instruction, writing PRN output to `out`.
    ///
    /// Returns the instruction that was executed, or `None` if the CPU
    /// stopped on an unrecognized opcode. Any error leaves the CPU
    /// [`CpuState::Faulted`].
    pub fn step<W: Write>(&mut self, out: &mut W) -> Result<Option<Instruction>, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        self.cycle(out).map_err(|e| {
            self.state = CpuState::Faulted;
            e
        })
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run<W: Write>(&mut self, out: &mut W) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited<W: Write>(&mut self, out: &mut W, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles.saturating_add(max_cycles);

        while self.state == CpuState::Running && self.cycles < limit {
            self.step(out)?;
        }

        Ok(self.cycles - start_cycles)
    }

    fn cycle<W: Write>(&mut self, out: &mut W) -> Result<Option<Instruction>, CpuError> {
        // Fetch
        let pc = self.pc;
        let byte = self.mem.read(pc as usize)?;

        // Decode
        let Some(op) = Opcode::from_byte(byte) else {
            log::warn!("unrecognized instruction {:#010b} at address {}; halting", byte, pc);
            self.halt(HaltReason::UnrecognizedOpcode { opcode: byte, address: pc });
            return Ok(None);
        };

        let mut operands = [0u8; 2];
        for (i, slot) in operands.iter_mut().take(op.operand_count()).enumerate() {
            *slot = self.mem.read(pc as usize + 1 + i)?;
        }
        let instr = Instruction::from_parts(op, &operands[..op.operand_count()])?;

        // pc < MEMORY_SIZE, so this stays well inside u8
        let next_pc = pc + op.len() as u8;

        // Execute
        log::trace!("{:02X}: {:?}", pc, instr);
        match self.execute(instr, next_pc, out)? {
            Flow::Next => self.pc = next_pc,
            Flow::Jump(target) => self.pc = target,
            Flow::Halt => self.halt(HaltReason::Instruction),
        }

        self.cycles += 1;
        self.last_instr = Some(instr);

        Ok(Some(instr))
    }

    /// Execute a decoded instruction.
    ///
    /// Every check that can fail runs before the first write.
    fn execute<W: Write>(&mut self, instr: Instruction, next_pc: u8, out: &mut W) -> Result<Flow, CpuError> {
        let flow = match instr {
            // ==================== Data ====================

            Instruction::Ldi { reg, value } => {
                self.regs.set(reg, value)?;
                Flow::Next
            }

            Instruction::Prn { reg } => {
                let value = self.regs.get(reg)?;
                writeln!(out, "{}", value)
                    .and_then(|_| out.flush())
                    .map_err(|e| CpuError::Output(e.to_string()))?;
                Flow::Next
            }

            // ==================== ALU ====================

            Instruction::Add { a, b }
            | Instruction::Sub { a, b }
            | Instruction::Mul { a, b }
            | Instruction::Cmp { a, b } => {
                self.alu(instr.opcode(), a, b)?;
                Flow::Next
            }

            // ==================== Stack ====================

            Instruction::Push { reg } => {
                let value = self.regs.get(reg)?;
                self.push(value)?;
                Flow::Next
            }

            Instruction::Pop { reg } => {
                RegisterFile::check(reg)?;
                let value = self.pop()?;
                self.regs.set(reg, value)?;
                Flow::Next
            }

            Instruction::Call { reg } => {
                let target = self.regs.get(reg)?;
                self.push(next_pc)?;
                Flow::Jump(target)
            }

            Instruction::Ret => Flow::Jump(self.pop()?),

            // ==================== Control Flow ====================

            Instruction::Jmp { reg } => Flow::Jump(self.regs.get(reg)?),

            Instruction::Jeq { reg } => {
                let target = self.regs.get(reg)?;
                if self.flags.is_equal() { Flow::Jump(target) } else { Flow::Next }
            }

            Instruction::Jne { reg } => {
                let target = self.regs.get(reg)?;
                if !self.flags.is_equal() { Flow::Jump(target) } else { Flow::Next }
            }

            Instruction::Hlt => Flow::Halt,
        };

        Ok(flow)
    }

    fn alu(&mut self, op: Opcode, a: u8, b: u8) -> Result<(), CpuError> {
        let op = AluOp::try_from(op)?;
        alu::execute(op, &mut self.regs, &mut self.flags, a, b)?;
        Ok(())
    }

    /// SP := SP - 1; [SP] := value
    fn push(&mut self, value: u8) -> Result<(), CpuError> {
        let slot = self.regs.next_push_slot()?;
        self.mem.write(slot as usize, value)?;
        self.regs.push_slot()?;
        Ok(())
    }

    /// value := [SP]; SP := SP + 1
    fn pop(&mut self) -> Result<u8, CpuError> {
        let slot = self.regs.next_pop_slot()?;
        let value = self.mem.read(slot as usize)?;
        self.regs.pop_slot()?;
        Ok(value)
    }

    fn halt(&mut self, reason: HaltReason) {
        self.state = CpuState::Halted(reason);
        self.pc = 0;
        log::debug!("halted after {} cycle(s): {:?}", self.cycles, reason);
    }

    /// One-line dump of PC, the next three bytes and R0-R7, in hex.
    pub fn trace(&self) -> String {
        let byte = |offset: usize| {
            self.mem
                .read(self.pc as usize + offset)
                .map_or_else(|_| "--".to_string(), |b| format!("{:02X}", b))
        };

        let mut line = format!("TRACE: {:02X} | {} {} {} |", self.pc, byte(0), byte(1), byte(2));
        for value in self.regs.values() {
            line.push_str(&format!(" {:02X}", value));
        }
        line
    }

    /// Get the last executed instruction.
    pub fn last_instruction(&self) -> Option<Instruction> {
        self.last_instr
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        matches!(self.state, CpuState::Halted(_))
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("flags", &self.flags)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("register error: {0}")]
    Register(#[from] RegisterError),

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("unsupported ALU operation: {0}")]
    UnsupportedOperation(Opcode),

    #[error("output error: {0}")]
    Output(String),
}

impl From<AluError> for CpuError {
    fn from(e: AluError) -> Self {
        match e {
            AluError::UnsupportedOperation(op) => CpuError::UnsupportedOperation(op),
            AluError::Register(e) => CpuError::Register(e),
        }
    }
}
