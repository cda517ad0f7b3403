//! TUI debugger for the LS-8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register, SP and flag visualization
//! - Memory view highlighting PC and the stack
//! - Step/run/breakpoint controls
//! - Disassembly and PRN output views

mod app;
mod ui;

pub use app::{DebuggerApp, run_debugger};
