//! Debugger state: the CPU under inspection plus breakpoints and captured output.

use crate::Cpu;
use crate::asm::disasm::{disassemble_at, format_instruction};
use crate::cpu::MEMORY_SIZE;
use std::collections::HashSet;

/// Bytes shown per memory row.
pub const MEMORY_ROW: usize = 8;

pub struct DebuggerApp {
    pub cpu: Cpu,
    /// Image reloaded on reset.
    pub program: Vec<u8>,
    /// Lines printed by PRN so far.
    pub output: Vec<String>,
    /// Addresses where continuous running pauses.
    pub breakpoints: HashSet<u8>,
    /// Free-running until a halt, fault or breakpoint.
    pub running: bool,
    pub should_quit: bool,
    pub status: String,
    /// Memory view scroll offset, in rows.
    pub mem_scroll: usize,
}

impl DebuggerApp {
    pub fn new(program: Vec<u8>) -> Self {
        let mut cpu = Cpu::new();
        let status = match cpu.load_program(&program) {
            Ok(()) => format!("Loaded {} byte(s). s: step, r: run, q: quit", program.len()),
            Err(e) => format!("Load failed: {}", e),
        };

        Self {
            cpu,
            program,
            output: Vec::new(),
            breakpoints: HashSet::new(),
            running: false,
            should_quit: false,
            status,
            mem_scroll: 0,
        }
    }

    /// Execute one instruction, capturing anything PRN writes.
    pub fn step(&mut self) {
        if !self.cpu.is_running() {
            self.running = false;
            self.status = format!("Not running ({:?}); x to reset", self.cpu.state);
            return;
        }

        let pc = self.cpu.pc;
        let mut printed = Vec::new();
        let result = self.cpu.step(&mut printed);
        self.output
            .extend(String::from_utf8_lossy(&printed).lines().map(str::to_string));

        self.status = match result {
            Ok(Some(instr)) => format!("{:03}: {}", pc, format_instruction(&instr)),
            Ok(None) => format!("{:?}", self.cpu.state),
            Err(e) => format!("Fault at {:03}: {}", pc, e),
        };
        if !self.cpu.is_running() {
            self.running = false;
        }
    }

    /// Start free-running. A breakpoint under PC is stepped over first.
    pub fn run(&mut self) {
        if self.breakpoints.contains(&self.cpu.pc) {
            self.step();
        }
        self.running = self.cpu.is_running();
        if self.running {
            self.status = "Running (p to pause)".into();
        }
    }

    /// Advance a free-running CPU by one instruction.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }

        let pc = self.cpu.pc;
        if self.breakpoints.contains(&pc) {
            self.running = false;
            self.status = format!("Breakpoint at {:03}", pc);
            return;
        }

        self.step();
    }

    /// Toggle a breakpoint at PC.
    pub fn toggle_breakpoint(&mut self) {
        let pc = self.cpu.pc;
        let verb = if self.breakpoints.insert(pc) {
            "Set"
        } else {
            self.breakpoints.remove(&pc);
            "Cleared"
        };
        self.status = format!("{} breakpoint at {:03}", verb, pc);
    }

    /// Reload the program into a fresh CPU. Breakpoints survive.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.status = match self.cpu.load_program(&self.program) {
            Ok(()) => "Reset".into(),
            Err(e) => format!("Load failed: {}", e),
        };
        self.output.clear();
        self.running = false;
    }

    /// Scroll the memory view, clamped to the last row.
    pub fn scroll_memory(&mut self, delta: isize) {
        let max = MEMORY_SIZE.div_ceil(MEMORY_ROW).saturating_sub(1);
        self.mem_scroll = self.mem_scroll.saturating_add_signed(delta).min(max);
    }

    /// Get disassembly around current PC.
    ///
    /// Instruction boundaries are found by decoding from address 0. If PC
    /// lands inside what that walk took for an operand, decoding restarts
    /// at PC.
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u8, String, bool)> {
        let bytes = self.cpu.mem.as_slice();
        let pc = self.cpu.pc as usize;

        let mut listing = walk(bytes, 0);
        if !listing.iter().any(|(addr, _)| *addr == pc) {
            listing.retain(|(addr, _)| *addr < pc);
            listing.extend(walk(bytes, pc));
        }

        let current = listing.iter().position(|(addr, _)| *addr == pc).unwrap_or(0);
        let start = current.saturating_sub(lines / 2);

        listing
            .into_iter()
            .skip(start)
            .take(lines)
            .map(|(addr, text)| (addr as u8, text, addr == pc))
            .collect()
    }

    /// Apply one key press.
    pub fn handle_key(&mut self, code: crossterm::event::KeyCode) {
        use crossterm::event::KeyCode;

        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('s') | KeyCode::Char(' ') => {
                self.running = false;
                self.step();
            }
            KeyCode::Char('r') => self.run(),
            KeyCode::Char('p') => {
                if self.running {
                    self.running = false;
                    self.status = format!("Paused at {:03}", self.cpu.pc);
                }
            }
            KeyCode::Char('b') => self.toggle_breakpoint(),
            KeyCode::Char('x') => self.reset(),
            KeyCode::Up => self.scroll_memory(-1),
            KeyCode::Down => self.scroll_memory(1),
            _ => {}
        }
    }
}

/// Decode instructions from `start` to the end of memory.
fn walk(bytes: &[u8], start: usize) -> Vec<(usize, String)> {
    let mut listing = Vec::new();
    let mut addr = start;
    while addr < bytes.len() {
        let (text, len) = disassemble_at(bytes, addr);
        listing.push((addr, text));
        addr += len;
    }
    listing
}

/// Open the terminal UI on `program` and block until the user quits.
pub fn run_debugger(program: Vec<u8>) -> std::io::Result<()> {
    use crossterm::{
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = event_loop(&mut terminal, DebuggerApp::new(program));

    // Leave raw mode even if the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn event_loop<B: ratatui::backend::Backend>(
    terminal: &mut ratatui::Terminal<B>,
    mut app: DebuggerApp,
) -> std::io::Result<()> {
    use crossterm::event::{self, Event, KeyEventKind};
    use std::time::Duration;

    while !app.should_quit {
        terminal.draw(|frame| super::ui::draw(frame, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        app.tick();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::assemble;

    fn app_for(source: &str) -> DebuggerApp {
        DebuggerApp::new(assemble(source).unwrap())
    }

    #[test]
    fn test_step_collects_output() {
        let mut app = app_for("LDI R0,8\nPRN R0\nHLT\n");
        app.step();
        app.step();
        assert_eq!(app.output, vec!["8".to_string()]);
        assert!(app.status.contains("PRN R0"));
    }

    #[test]
    fn test_breakpoint_stops_run() {
        let mut app = app_for("LDI R0,1\nLDI R1,2\nHLT\n");
        app.step();
        app.toggle_breakpoint();
        app.reset();

        app.run();
        for _ in 0..10 {
            app.tick();
        }
        assert!(!app.running);
        assert_eq!(app.cpu.pc, 3);
        assert!(app.status.contains("Breakpoint"));
    }

    #[test]
    fn test_disassembly_marks_pc() {
        let mut app = app_for("LDI R0,1\nPRN R0\nHLT\n");
        app.step();

        let listing = app.get_disassembly(5);
        let current: Vec<_> = listing.iter().filter(|(_, _, cur)| *cur).collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].0, 3);
        assert_eq!(current[0].1, "PRN R0");
    }

    #[test]
    fn test_disassembly_inside_operand() {
        let mut app = app_for("LDI R0,1\nHLT\n");
        app.cpu.pc = 2;
        let listing = app.get_disassembly(4);
        assert!(listing.iter().any(|(addr, _, cur)| *addr == 2 && *cur));
    }

    #[test]
    fn test_reset_clears_output() {
        let mut app = app_for("LDI R0,8\nPRN R0\nHLT\n");
        for _ in 0..3 {
            app.step();
        }
        assert!(app.cpu.is_halted());

        app.reset();
        assert!(app.output.is_empty());
        assert!(app.cpu.is_running());
        assert_eq!(app.cpu.mem.read(0).unwrap(), 0b1000_0010);
    }

    #[test]
    fn test_memory_scroll_clamped() {
        let mut app = app_for("HLT\n");
        app.scroll_memory(-3);
        assert_eq!(app.mem_scroll, 0);
        app.scroll_memory(1000);
        assert_eq!(app.mem_scroll, MEMORY_SIZE / MEMORY_ROW - 1);
    }

    #[test]
    fn test_run_resumes_past_breakpoint() {
        let mut app = app_for("LDI R0,1\nPRN R0\nHLT\n");
        app.step();
        app.toggle_breakpoint();

        app.run();
        assert_eq!(app.cpu.pc, 5);
        while app.running {
            app.tick();
        }
        assert!(app.cpu.is_halted());
        assert_eq!(app.output, vec!["1".to_string()]);
    }

    #[test]
    fn test_step_after_fault_reports_state() {
        let mut app = DebuggerApp::new(vec![0b0100_0110, 0]); // POP R0 on an empty stack
        app.step();
        assert!(app.status.starts_with("Fault at 000"));
        app.step();
        assert!(app.status.contains("Faulted"));
    }

    #[test]
    fn test_handle_keys() {
        use crossterm::event::KeyCode;

        let mut app = app_for("LDI R0,1\nHLT\n");
        app.handle_key(KeyCode::Char('s'));
        assert_eq!(app.cpu.pc, 3);

        app.handle_key(KeyCode::Char('b'));
        assert!(app.breakpoints.contains(&3));
        app.handle_key(KeyCode::Char('b'));
        assert!(app.breakpoints.is_empty());

        app.handle_key(KeyCode::Char('r'));
        assert!(app.running);
        app.handle_key(KeyCode::Char('p'));
        assert!(!app.running);
        assert_eq!(app.status, "Paused at 003");

        app.handle_key(KeyCode::Char('x'));
        assert_eq!(app.cpu.pc, 0);

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
    }
}
