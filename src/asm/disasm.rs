//! Disassembler.
//!
//! Converts instruction words back to readable assembly.

use crate::cpu::decode::{decode, Instruction, NonBasicOp, Operand};

/// Disassemble the instruction starting at `words[at]`.
///
/// Returns the text and the number of words the instruction spans. Next
/// words missing from the end of the slice are shown as `?`.
pub fn disassemble_instruction(words: &[u16], at: usize) -> (String, usize) {
    let Some(&word) = words.get(at) else {
        return ("???".to_string(), 1);
    };

    let instr = decode(word);
    let mut next = words.iter().skip(at + 1).copied();
    let text = match instr {
        Instruction::Basic { op, a, b } => {
            let target = format_operand(a, &mut next);
            let source = format_operand(b, &mut next);
            format!("{} {}, {}", op.mnemonic(), target, source)
        }
        Instruction::NonBasic { op: NonBasicOp::Jsr, a } => {
            format!("JSR {}", format_operand(a, &mut next))
        }
        Instruction::NonBasic { op: NonBasicOp::Reserved(code), a } => {
            format!("??? {code:#04x}, {}", format_operand(a, &mut next))
        }
    };

    (text, usize::from(instr.len()))
}

/// Disassemble a whole program.
pub fn disassemble(words: &[u16]) -> String {
    let mut output = String::new();
    output.push_str("; Disassembly\n");
    output.push_str("; -----------\n\n");

    let mut at = 0;
    while at < words.len() {
        let (line, len) = disassemble_instruction(words, at);
        output.push_str(&format!("{at:04x}: {line}\n"));
        at += len;
    }

    output
}

/// Format an operand, consuming a next word if it needs one.
fn format_operand(operand: Operand, next: &mut impl Iterator<Item = u16>) -> String {
    let mut next_word = || match next.next() {
        Some(word) => format!("0x{word:04x}"),
        None => "?".to_string(),
    };

    match operand {
        Operand::Register(reg) => reg.to_string(),
        Operand::Indirect(reg) => format!("[{reg}]"),
        Operand::IndexedIndirect(reg) => format!("[{}+{reg}]", next_word()),
        Operand::Pop => "POP".to_string(),
        Operand::Peek => "PEEK".to_string(),
        Operand::Push => "PUSH".to_string(),
        Operand::NextWordIndirect => format!("[{}]", next_word()),
        Operand::NextWordLiteral => next_word(),
        Operand::Literal(value) => format!("0x{value:02x}"),
    }
}
