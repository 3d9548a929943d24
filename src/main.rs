//! DCPU Emulator - CLI Entry Point
//!
//! Commands:
//! - `dcpu-emu run <listing>` - Run a hex listing
//! - `dcpu-emu debug <listing>` - Interactive debugger
//! - `dcpu-emu disasm <listing>` - Disassemble a hex listing

use clap::{Parser, Subcommand};
use dcpu::cpu::{Cpu, Driver, Reg};
use dcpu::{load_listing, ConfigOverrides, MachineConfig, Packet, Peripherals};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dcpu-emu")]
#[command(version)]
#[command(about = "An emulator of a 16-bit word-addressed virtual processor")]
struct Cli {
    /// JSON machine configuration
    #[arg(long, global = true)]
    config: Option<String>,
    /// Log filter (overrides RUST_LOG), e.g. `debug` or `dcpu=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Words of memory (overrides the config file)
    #[arg(long, global = true)]
    memory_words: Option<usize>,
    /// Steps per batch in continuous mode (overrides the config file)
    #[arg(long, global = true)]
    batch_size: Option<u64>,
    /// Milliseconds between batches (overrides the config file)
    #[arg(long, global = true)]
    tick_ms: Option<u64>,
    /// Network hub id of this machine (overrides the config file)
    #[arg(long, global = true)]
    hub_id: Option<u16>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program for a number of steps or a wall-clock duration
    Run {
        /// Path to the hex listing to execute
        listing: String,
        /// Execute exactly this many instructions on the main thread
        #[arg(short, long)]
        steps: Option<u64>,
        /// Run continuously for this many milliseconds (ignored with --steps)
        #[arg(short, long, default_value = "1000")]
        millis: u64,
        /// Show trace output
        #[arg(short, long)]
        trace: bool,
        /// Print the final registers as JSON
        #[arg(long)]
        json: bool,
    },
    /// Interactive debugger
    #[cfg(feature = "tui")]
    Debug {
        /// Path to the hex listing to debug
        listing: String,
    },
    /// Disassemble a hex listing
    Disasm {
        /// Path to the hex listing
        listing: String,
        /// Emit an annotated hex listing that can be loaded again
        #[arg(long)]
        hex: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let loaded = match &cli.config {
        Some(path) => match MachineConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => MachineConfig::default(),
    };
    let config = loaded.with_overrides(&ConfigOverrides {
        memory_words: cli.memory_words,
        batch_size: cli.batch_size,
        tick_ms: cli.tick_ms,
        hub_id: cli.hub_id,
    });

    match cli.command {
        Some(Commands::Run { listing, steps, millis, trace, json }) => {
            run_program(&config, &listing, steps, millis, trace, json);
        }
        #[cfg(feature = "tui")]
        Some(Commands::Debug { listing }) => {
            debug_program(&config, &listing);
        }
        Some(Commands::Disasm { listing, hex }) => {
            disassemble_file(&listing, hex);
        }
        None => {
            println!("DCPU Emulator v{}", env!("CARGO_PKG_VERSION"));
            println!("A 16-bit word-addressed virtual processor");
            println!();
            println!("Use --help for available commands");
        }
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_machine(config: &MachineConfig, path: &str) -> (Cpu<Peripherals>, Vec<u16>) {
    let listing = match load_listing(path) {
        Ok(listing) => listing,
        Err(e) => {
            eprintln!("❌ Failed to load listing: {}", e);
            std::process::exit(1);
        }
    };

    if listing.is_empty() {
        eprintln!("❌ No instructions to execute");
        std::process::exit(1);
    }
    println!("📂 Loaded {} words", listing.len());

    let mut cpu = config.build();
    if let Err(e) = cpu.load_program(&listing.words) {
        eprintln!("❌ Failed to load program: {}", e);
        std::process::exit(1);
    }
    (cpu, listing.words)
}

fn run_program(config: &MachineConfig, path: &str, steps: Option<u64>, millis: u64, trace: bool, json: bool) {
    use dcpu::asm::disassemble_instruction;

    println!("🔧 Running: {}", path);
    let (mut cpu, _) = load_machine(config, path);

    println!();
    println!("━━━ Execution ━━━");

    let mut packets = Vec::new();
    let mut cpu = match steps {
        Some(max_steps) => {
            for _ in 0..max_steps {
                let pc = cpu.regs.pc;
                let text = trace.then(|| {
                    let window: Vec<u16> = (0..3u16)
                        .map(|i| cpu.mem.peek(usize::from(pc.wrapping_add(i))).unwrap_or(0))
                        .collect();
                    disassemble_instruction(&window, 0).0
                });

                if let Err(e) = cpu.step() {
                    eprintln!("❌ CPU error at PC={:#06x}: {}", pc, e);
                    std::process::exit(1);
                }
                if let Some(text) = text {
                    println!(
                        "{:04x}: {:<24} A={:04x} B={:04x} C={:04x} SP={:04x} O={:04x}",
                        pc,
                        text,
                        cpu.regs.get(Reg::A),
                        cpu.regs.get(Reg::B),
                        cpu.regs.get(Reg::C),
                        cpu.regs.sp,
                        cpu.regs.o
                    );
                }
            }
            cpu
        }
        None => {
            if trace {
                cpu.set_step_hook(|step, regs| {
                    println!("{:>8}: PC={:04x} SP={:04x} O={:04x}", step, regs.pc, regs.sp, regs.o);
                });
            }
            let mut driver = Driver::new(cpu, config.run_config());
            if let Err(e) = driver.run() {
                eprintln!("❌ Failed to start: {}", e);
                std::process::exit(1);
            }
            // Drain while the guest runs
            let deadline = Instant::now() + Duration::from_millis(millis);
            let poll = Duration::from_millis(config.tick_ms.clamp(10, 100));
            loop {
                let now = Instant::now();
                if now >= deadline || !driver.is_running() {
                    break;
                }
                std::thread::sleep(poll.min(deadline - now));
                collect_outbound(&mut packets, driver.with_cpu(|cpu| cpu.mem.drain_outbound()));
            }
            match driver.into_cpu() {
                Ok(mut cpu) => {
                    cpu.clear_step_hook();
                    cpu
                }
                Err(e) => {
                    eprintln!("❌ Run failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    collect_outbound(&mut packets, cpu.mem.drain_outbound());

    if json {
        match serde_json::to_string_pretty(&cpu.regs) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("❌ Failed to encode registers: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!();
    println!("━━━ Result ━━━");
    println!("Steps: {}", cpu.steps());
    for reg in Reg::ALL {
        println!("{:<3} {:#06x} ({})", reg.name(), cpu.regs.get(reg), cpu.regs.get(reg));
    }

    let display = cpu.mem.observer().display.text();
    if display.lines().any(|line| !line.trim().is_empty()) {
        println!();
        println!("━━━ Display ━━━");
        println!("{}", display);
    }

    if !packets.is_empty() {
        println!();
        println!("━━━ Outbound ━━━");
        for packet in packets {
            println!("→ hub {}: {:#06x}", packet.peer, packet.data);
        }
    }
}

fn collect_outbound(packets: &mut Vec<Packet>, drained: Result<Vec<Packet>, dcpu::DeviceError>) {
    match drained {
        Ok(sent) => packets.extend(sent),
        Err(e) => {
            eprintln!("❌ Failed to drain network card: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "tui")]
fn debug_program(config: &MachineConfig, path: &str) {
    use dcpu::tui::run_debugger;

    println!("🔍 Loading: {}", path);
    let (cpu, program) = load_machine(config, path);

    println!("🚀 Launching debugger...");
    println!();

    if let Err(e) = run_debugger(cpu, program, config.batch_size) {
        eprintln!("❌ Debugger error: {}", e);
        std::process::exit(1);
    }
}

fn disassemble_file(path: &str, hex: bool) {
    use dcpu::asm::{disassemble, format_listing};

    if !hex {
        println!("📖 Disassembling: {}", path);
        println!();
    }

    let listing = match load_listing(path) {
        Ok(listing) => listing,
        Err(e) => {
            eprintln!("❌ Failed to load listing: {}", e);
            std::process::exit(1);
        }
    };

    if hex {
        println!("{}", format_listing(&listing.words));
    } else {
        println!("{}", disassemble(&listing.words));
    }
}
