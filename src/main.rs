//! LS-8 Emulator - CLI Entry Point
//!
//! Usage:
//! - `ls8 <program>` - Run a `.ls8` or `.asm` file
//! - `ls8 debug <program>` - Interactive debugger
//! - `ls8 asm <source>` - Assemble to `.ls8`
//! - `ls8 disasm <program>` - Disassemble a `.ls8` file

use clap::{Args, CommandFactory, Parser, Subcommand};
use log::{LevelFilter, Log, Metadata, Record};
use std::path::Path;

#[derive(Parser)]
#[command(name = "ls8")]
#[command(author = "Yigit")]
#[command(version = "0.1.0")]
#[command(about = "An emulator for the LS-8, a tiny 8-bit teaching computer")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct RunArgs {
    /// Path to the .ls8 or .asm file to execute
    program: Option<String>,
    /// Stop after this many cycles
    #[arg(short, long)]
    max_cycles: Option<u64>,
    /// Print a trace line to stderr before every instruction
    #[arg(short, long)]
    trace: bool,
    /// Print the final CPU state as JSON to stderr
    #[arg(long)]
    dump_state: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the .ls8 or .asm file to debug
        program: String,
    },
    /// Assemble source to .ls8
    Asm {
        /// Path to the source file
        source: String,
        /// Output .ls8 file
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Disassemble a .ls8 file to readable text
    Disasm {
        /// Path to the .ls8 file
        program: String,
    },
    /// Run the built-in self-test
    Test,
}

/// Minimal stderr logger behind the `log` facade.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5} {}] {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        #[cfg(feature = "tui")]
        Some(Commands::Debug { program }) => {
            debug_program(&program);
        }
        Some(Commands::Asm { source, output }) => {
            assemble_file(&source, output);
        }
        Some(Commands::Disasm { program }) => {
            disassemble_file(&program);
        }
        Some(Commands::Test) => {
            run_self_test();
        }
        None => match cli.run.program.as_deref() {
            Some(program) => run_program(program, &cli.run),
            None => Cli::command()
                .error(
                    clap::error::ErrorKind::MissingRequiredArgument,
                    "a program file is required: ls8 <PROGRAM>",
                )
                .exit(),
        },
    }
}

/// Read program bytes from a `.ls8` file, or assemble a `.asm` file.
fn read_program(path: &str) -> Result<Vec<u8>, String> {
    if path.ends_with(".asm") {
        let source = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {}", path, e))?;
        let bytes = ls8::assemble(&source)
            .map_err(|e| format!("assembly error: {}", e))?;
        log::info!("assembled {} byte(s) from {}", bytes.len(), path);
        Ok(bytes)
    } else {
        let program = ls8::load_program(path)
            .map_err(|e| format!("failed to load {}: {}", path, e))?;
        log::info!("loaded {} byte(s) from {}", program.len(), path);
        Ok(program.bytes)
    }
}

fn exit_with(message: impl std::fmt::Display) -> ! {
    log::error!("{}", message);
    std::process::exit(1);
}

fn run_program(path: &str, args: &RunArgs) {
    use ls8::Cpu;

    let bytes = read_program(path).unwrap_or_else(|e| exit_with(e));

    let mut cpu = Cpu::new();
    if let Err(e) = cpu.load_program(&bytes) {
        exit_with(format!("failed to load program: {}", e));
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    while cpu.is_running() && args.max_cycles.map_or(true, |max| cpu.cycles < max) {
        if args.trace {
            eprintln!("{}", cpu.trace());
        }

        let pc = cpu.pc;
        if let Err(e) = cpu.step(&mut out) {
            exit_with(format!("CPU error at PC={:02X}: {}", pc, e));
        }
    }

    if cpu.is_running() {
        log::warn!(
            "stopped after reaching the cycle limit ({}); use --max-cycles to raise it",
            cpu.cycles
        );
    } else {
        log::info!("{:?} after {} cycle(s)", cpu.state, cpu.cycles);
    }

    if args.dump_state {
        match serde_json::to_string_pretty(&cpu) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => exit_with(format!("failed to serialize CPU state: {}", e)),
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(path: &str) {
    use ls8::tui::run_debugger;

    let bytes = read_program(path).unwrap_or_else(|e| exit_with(e));

    if bytes.is_empty() {
        exit_with("no instructions to execute");
    }

    if let Err(e) = run_debugger(bytes) {
        exit_with(format!("debugger error: {}", e));
    }
}

fn assemble_file(source_path: &str, output: Option<String>) {
    use ls8::{assemble, save_program, Program};

    let out_path = output.unwrap_or_else(|| {
        Path::new(source_path)
            .with_extension("ls8")
            .to_string_lossy()
            .into_owned()
    });

    println!("Assembling: {} -> {}", source_path, out_path);

    let source = std::fs::read_to_string(source_path)
        .unwrap_or_else(|e| exit_with(format!("failed to read {}: {}", source_path, e)));

    let bytes = assemble(&source)
        .unwrap_or_else(|e| exit_with(format!("assembly error: {}", e)));

    println!("Assembled {} bytes", bytes.len());

    if let Err(e) = save_program(&out_path, &Program::from_bytes(bytes)) {
        exit_with(format!("failed to save {}: {}", out_path, e));
    }

    println!("Saved to {}", out_path);
}

fn disassemble_file(path: &str) {
    use ls8::{disassemble, load_program};

    let program = load_program(path)
        .unwrap_or_else(|e| exit_with(format!("failed to load {}: {}", path, e)));

    println!("{}", disassemble(&program.bytes));
}

fn run_self_test() {
    use ls8::{assemble, Cpu, CpuState, HaltReason};

    println!("━━━ LS-8 Emulator Self-Test ━━━");
    println!();

    let cases: [(&str, &str, &str); 4] = [
        ("Add and print", "LDI R0,5\nLDI R1,3\nADD R0,R1\nPRN R0\nHLT", "8\n"),
        ("Multiply", "LDI R0,8\nLDI R1,9\nMUL R0,R1\nPRN R0\nHLT", "72\n"),
        (
            "Stack LIFO",
            "LDI R0,1\nLDI R1,2\nPUSH R0\nPUSH R1\nPOP R2\nPOP R3\nPRN R2\nPRN R3\nHLT",
            "2\n1\n",
        ),
        (
            "Call and equal branch",
            "LDI R0,9\nLDI R1,CHECK\nCALL R1\nLDI R2,YES\nJEQ R2\nHLT\n\
             YES: PRN R0\nHLT\nCHECK: CMP R0,R0\nRET",
            "9\n",
        ),
    ];

    let mut passed = 0;
    let mut failed = 0;

    for (name, source, expected) in cases {
        print!("{}... ", name);
        let mut cpu = Cpu::new();
        let mut out = Vec::new();
        let result = assemble(source)
            .map_err(|e| e.to_string())
            .and_then(|bytes| cpu.load_program(&bytes).map_err(|e| e.to_string()))
            .and_then(|_| cpu.run(&mut out).map_err(|e| e.to_string()));

        let got = String::from_utf8_lossy(&out);
        match result {
            Ok(_) if got == expected => {
                println!("✓");
                passed += 1;
            }
            Ok(_) => {
                println!("✗ (got {:?}, expected {:?})", got, expected);
                failed += 1;
            }
            Err(e) => {
                println!("✗ ({})", e);
                failed += 1;
            }
        }
    }

    print!("Unrecognized opcode halts... ");
    let mut cpu = Cpu::new();
    let halted = cpu.load_program(&[0xFF]).is_ok()
        && cpu.run(&mut std::io::sink()).is_ok()
        && cpu.state == CpuState::Halted(HaltReason::UnrecognizedOpcode { opcode: 0xFF, address: 0 });
    if halted {
        println!("✓");
        passed += 1;
    } else {
        println!("✗");
        failed += 1;
    }

    println!();
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed == 0 {
        println!("✓ All tests passed!");
    } else {
        std::process::exit(1);
    }
}

