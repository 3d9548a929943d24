//! Instruction decoder.
//!
//! An instruction word is laid out as `bbbbbbaaaaaaoooo`:
//! - bits 0-3: basic opcode
//! - bits 4-9: operand `a` (the target)
//! - bits 10-15: operand `b` (the source)
//!
//! When the basic opcode is zero the instruction is non-basic: bits 4-9
//! hold the non-basic opcode and bits 10-15 its single operand.

use crate::cpu::registers::Reg;
use serde::{Deserialize, Serialize};

/// Basic (two-operand) opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicOp {
    /// a := b
    Set,
    /// a := a + b, O := carry
    Add,
    /// a := a - b, O := borrow
    Sub,
    /// a := a * b, O := high word
    Mul,
    /// a := a / b, O := fractional part
    Div,
    /// a := a % b
    Mod,
    /// a := a << b, O := bits shifted out
    Shl,
    /// a := a >> b, O := bits shifted out
    Shr,
    /// a := a & b
    And,
    /// a := a | b
    Bor,
    /// a := a ^ b
    Xor,
    /// run next instruction only if a == b
    Ife,
    /// run next instruction only if a != b
    Ifn,
    /// run next instruction only if a > b
    Ifg,
    /// run next instruction only if (a & b) != 0
    Ifb,
}

impl BasicOp {
    /// Map a 4-bit opcode. Zero is not a basic opcode.
    pub fn from_code(code: u8) -> Option<Self> {
        let op = match code & 0xF {
            0x1 => BasicOp::Set,
            0x2 => BasicOp::Add,
            0x3 => BasicOp::Sub,
            0x4 => BasicOp::Mul,
            0x5 => BasicOp::Div,
            0x6 => BasicOp::Mod,
            0x7 => BasicOp::Shl,
            0x8 => BasicOp::Shr,
            0x9 => BasicOp::And,
            0xa => BasicOp::Bor,
            0xb => BasicOp::Xor,
            0xc => BasicOp::Ife,
            0xd => BasicOp::Ifn,
            0xe => BasicOp::Ifg,
            0xf => BasicOp::Ifb,
            _ => return None,
        };
        Some(op)
    }

    /// The 4-bit opcode.
    pub fn code(self) -> u8 {
        match self {
            BasicOp::Set => 0x1,
            BasicOp::Add => 0x2,
            BasicOp::Sub => 0x3,
            BasicOp::Mul => 0x4,
            BasicOp::Div => 0x5,
            BasicOp::Mod => 0x6,
            BasicOp::Shl => 0x7,
            BasicOp::Shr => 0x8,
            BasicOp::And => 0x9,
            BasicOp::Bor => 0xa,
            BasicOp::Xor => 0xb,
            BasicOp::Ife => 0xc,
            BasicOp::Ifn => 0xd,
            BasicOp::Ifg => 0xe,
            BasicOp::Ifb => 0xf,
        }
    }

    /// Whether the instruction stores into its first operand.
    pub fn writes_target(self) -> bool {
        !matches!(self, BasicOp::Ife | BasicOp::Ifn | BasicOp::Ifg | BasicOp::Ifb)
    }

    /// Mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            BasicOp::Set => "SET",
            BasicOp::Add => "ADD",
            BasicOp::Sub => "SUB",
            BasicOp::Mul => "MUL",
            BasicOp::Div => "DIV",
            BasicOp::Mod => "MOD",
            BasicOp::Shl => "SHL",
            BasicOp::Shr => "SHR",
            BasicOp::And => "AND",
            BasicOp::Bor => "BOR",
            BasicOp::Xor => "XOR",
            BasicOp::Ife => "IFE",
            BasicOp::Ifn => "IFN",
            BasicOp::Ifg => "IFG",
            BasicOp::Ifb => "IFB",
        }
    }
}

/// Non-basic (single-operand) opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NonBasicOp {
    /// Push the return address, then jump to the operand.
    Jsr,
    /// Any other 6-bit value. Executes as a no-op.
    Reserved(u8),
}

impl NonBasicOp {
    /// Map a 6-bit non-basic opcode.
    pub fn from_code(code: u8) -> Self {
        match code & 0x3F {
            0x01 => NonBasicOp::Jsr,
            other => NonBasicOp::Reserved(other),
        }
    }

    /// The 6-bit opcode.
    pub fn code(self) -> u8 {
        match self {
            NonBasicOp::Jsr => 0x01,
            NonBasicOp::Reserved(code) => code & 0x3F,
        }
    }
}

/// An operand's addressing form, decoded from its 6-bit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    /// 0x00-0x07, 0x1b-0x1d: the register itself
    Register(Reg),
    /// 0x08-0x0f: `[register]`
    Indirect(Reg),
    /// 0x10-0x17: `[next word + register]`
    IndexedIndirect(Reg),
    /// 0x18: `[SP++]`
    Pop,
    /// 0x19: `[SP]`
    Peek,
    /// 0x1a: `[--SP]`
    Push,
    /// 0x1e: `[next word]`
    NextWordIndirect,
    /// 0x1f: next word as a literal
    NextWordLiteral,
    /// 0x20-0x3f: literal 0-31
    Literal(u8),
}

impl Operand {
    /// Decode a 6-bit operand code. Every 6-bit value is meaningful.
    pub fn from_code(code: u8) -> Self {
        let code = code & 0x3F;
        match code {
            0x00..=0x07 => Operand::Register(Reg::general(code)),
            0x08..=0x0f => Operand::Indirect(Reg::general(code - 0x08)),
            0x10..=0x17 => Operand::IndexedIndirect(Reg::general(code - 0x10)),
            0x18 => Operand::Pop,
            0x19 => Operand::Peek,
            0x1a => Operand::Push,
            0x1b => Operand::Register(Reg::Sp),
            0x1c => Operand::Register(Reg::Pc),
            0x1d => Operand::Register(Reg::O),
            0x1e => Operand::NextWordIndirect,
            0x1f => Operand::NextWordLiteral,
            _ => Operand::Literal(code - 0x20),
        }
    }

    /// The 6-bit code for this operand.
    pub fn code(self) -> u8 {
        match self {
            Operand::Register(reg) => reg.code(),
            Operand::Indirect(reg) => 0x08 + (reg.code() & 0x7),
            Operand::IndexedIndirect(reg) => 0x10 + (reg.code() & 0x7),
            Operand::Pop => 0x18,
            Operand::Peek => 0x19,
            Operand::Push => 0x1a,
            Operand::NextWordIndirect => 0x1e,
            Operand::NextWordLiteral => 0x1f,
            Operand::Literal(value) => 0x20 + (value & 0x1F),
        }
    }

    /// Whether resolving this operand consumes the next instruction word.
    pub fn uses_next_word(self) -> bool {
        matches!(
            self,
            Operand::IndexedIndirect(_) | Operand::NextWordIndirect | Operand::NextWordLiteral
        )
    }
}

/// A decoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    /// Opcode and two operands.
    Basic { op: BasicOp, a: Operand, b: Operand },
    /// Non-basic opcode and one operand.
    NonBasic { op: NonBasicOp, a: Operand },
}

impl Instruction {
    /// Total length in words, including next-word operands.
    pub fn len(&self) -> u16 {
        let extra = match self {
            Instruction::Basic { a, b, .. } => {
                u16::from(a.uses_next_word()) + u16::from(b.uses_next_word())
            }
            Instruction::NonBasic { a, .. } => u16::from(a.uses_next_word()),
        };
        1 + extra
    }
}

/// Decode one instruction word. Every 16-bit value decodes.
pub fn decode(word: u16) -> Instruction {
    let low = (word & 0xF) as u8;
    let a = ((word >> 4) & 0x3F) as u8;
    let b = ((word >> 10) & 0x3F) as u8;

    match BasicOp::from_code(low) {
        Some(op) => Instruction::Basic {
            op,
            a: Operand::from_code(a),
            b: Operand::from_code(b),
        },
        None => Instruction::NonBasic {
            op: NonBasicOp::from_code(a),
            a: Operand::from_code(b),
        },
    }
}

/// Encode an instruction back to its first word.
pub fn encode(instr: &Instruction) -> u16 {
    match *instr {
        Instruction::Basic { op, a, b } => {
            u16::from(op.code()) | u16::from(a.code()) << 4 | u16::from(b.code()) << 10
        }
        Instruction::NonBasic { op, a } => u16::from(op.code()) << 4 | u16::from(a.code()) << 10,
    }
}
