//! # DCPU Emulator
//!
//! An emulator of a 16-bit word-addressed virtual processor.
//!
//! The machine has eight general registers, a stack pointer, a program
//! counter and an overflow register, a flat 65536-word memory, and a
//! bit-field instruction format with register, indirect, indexed, stack
//! and literal addressing. Peripherals (a text display, a keyboard ring
//! and a network card) live in memory-mapped windows and watch memory
//! through an observer instead of being called by the CPU.

pub mod cpu;
pub mod asm;
pub mod devices;
pub mod config;

#[cfg(feature = "tui")]
pub mod tui;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, Driver, DriverError, Instruction, Memory, MemoryError, MemoryObserver, Reg, Registers};
pub use asm::{disassemble, load_listing, parse_listing, Listing, ListingError};
pub use devices::{DeviceError, Packet, Peripherals};
pub use config::{ConfigError, ConfigOverrides, MachineConfig};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
