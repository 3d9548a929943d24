//! CPU registers.
//!
//! The register file holds:
//! - A, B, C, X, Y, Z, I, J: general purpose (operand codes 0x00-0x07)
//! - SP: stack pointer (0x1b), grows downward and wraps
//! - PC: program counter (0x1c)
//! - O: overflow / remainder register (0x1d)

use serde::{Deserialize, Serialize};

/// A register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    A,
    B,
    C,
    X,
    Y,
    Z,
    I,
    J,
    Sp,
    Pc,
    O,
}

impl Reg {
    /// The eight general purpose registers in encoding order.
    pub const GENERAL: [Reg; 8] = [Reg::A, Reg::B, Reg::C, Reg::X, Reg::Y, Reg::Z, Reg::I, Reg::J];

    /// Every register, general purpose first.
    pub const ALL: [Reg; 11] = [
        Reg::A,
        Reg::B,
        Reg::C,
        Reg::X,
        Reg::Y,
        Reg::Z,
        Reg::I,
        Reg::J,
        Reg::Sp,
        Reg::Pc,
        Reg::O,
    ];

    /// General purpose register for a 3-bit index.
    pub fn general(index: u8) -> Reg {
        Self::GENERAL[usize::from(index & 0x7)]
    }

    /// Operand code that names this register directly.
    pub fn code(self) -> u8 {
        match self {
            Reg::A => 0x00,
            Reg::B => 0x01,
            Reg::C => 0x02,
            Reg::X => 0x03,
            Reg::Y => 0x04,
            Reg::Z => 0x05,
            Reg::I => 0x06,
            Reg::J => 0x07,
            Reg::Sp => 0x1b,
            Reg::Pc => 0x1c,
            Reg::O => 0x1d,
        }
    }

    /// Assembly name.
    pub fn name(self) -> &'static str {
        match self {
            Reg::A => "A",
            Reg::B => "B",
            Reg::C => "C",
            Reg::X => "X",
            Reg::Y => "Y",
            Reg::Z => "Z",
            Reg::I => "I",
            Reg::J => "J",
            Reg::Sp => "SP",
            Reg::Pc => "PC",
            Reg::O => "O",
        }
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The register file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    /// A, B, C, X, Y, Z, I, J
    pub general: [u16; 8],

    /// Stack pointer. Starts at 0, so the first push lands on 0xFFFF.
    pub sp: u16,

    /// Program counter
    pub pc: u16,

    /// Overflow / remainder register
    pub o: u16,
}

impl Registers {
    /// Create a new register file with all values zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Read a register.
    pub fn get(&self, reg: Reg) -> u16 {
        match reg {
            Reg::Sp => self.sp,
            Reg::Pc => self.pc,
            Reg::O => self.o,
            general => self.general[usize::from(general.code())],
        }
    }

    /// Write a register.
    pub fn set(&mut self, reg: Reg, value: u16) {
        match reg {
            Reg::Sp => self.sp = value,
            Reg::Pc => self.pc = value,
            Reg::O => self.o = value,
            general => self.general[usize::from(general.code())] = value,
        }
    }

    /// Move SP down one word and return the new top.
    pub fn push_sp(&mut self) -> u16 {
        self.sp = self.sp.wrapping_sub(1);
        self.sp
    }

    /// Move SP up one word, returning the old top.
    pub fn pop_sp(&mut self) -> u16 {
        let top = self.sp;
        self.sp = self.sp.wrapping_add(1);
        top
    }

    /// Advance the program counter by `words`, wrapping.
    pub fn advance_pc(&mut self, words: u16) {
        self.pc = self.pc.wrapping_add(words);
    }
}
