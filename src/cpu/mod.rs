//! CPU emulation.
//!
//! This module implements the virtual processor:
//! - 65536 sixteen-bit memory words, observed by peripherals
//! - 8 general registers plus SP, PC and O
//! - 15 basic two-operand instructions and the non-basic JSR
//! - synchronous stepping and batched continuous runs

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod driver;

pub use memory::{Memory, MemoryError, MemoryObserver, NoopObserver, MEMORY_SIZE};
pub use registers::{Reg, Registers};
pub use decode::{BasicOp, Instruction, NonBasicOp, Operand};
pub use execute::{Cpu, CpuError, Location, ResolvedOperand};
pub use driver::{Driver, DriverError, RunConfig, RunSummary};
