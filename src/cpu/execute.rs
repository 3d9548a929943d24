//! CPU execution engine.
//!
//! Implements operand resolution, the fetch-decode-execute cycle and all
//! instruction behaviors.

use crate::cpu::decode::{self, BasicOp, Instruction, NonBasicOp, Operand};
use crate::cpu::memory::{Memory, MemoryError, MemoryObserver, NoopObserver};
use crate::cpu::registers::{Reg, Registers};
use thiserror::Error;

/// Where a resolved operand can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// A register slot.
    Register(Reg),
    /// A memory word.
    Memory(u16),
    /// A literal: nothing to write to.
    None,
}

/// An operand after addressing-mode resolution. Lives for one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOperand {
    /// The decoded addressing form (and so its original code).
    pub operand: Operand,
    /// Writable location, if any.
    pub location: Location,
    /// Value read at resolution time.
    pub value: u16,
    /// Whether resolution consumed an instruction word.
    pub next_word: bool,
}

/// Callback fired after every completed step with the new step count.
pub type StepHook = Box<dyn FnMut(u64, &Registers) + Send>;

/// The CPU: register file, memory and per-step decode state.
pub struct Cpu<O = NoopObserver> {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory<O>,
    /// Instructions completed (skipped ones included).
    steps: u64,
    /// Skip the body of the next instruction.
    skip: bool,
    /// PC was written by the current instruction.
    pc_written: bool,
    /// Length in words of the instruction being decoded.
    length: u16,
    on_step: Option<StepHook>,
}

impl Cpu<NoopObserver> {
    /// Create a CPU over a full, unobserved memory.
    pub fn unobserved() -> Self {
        Self::new(Memory::unobserved())
    }
}

impl<O: MemoryObserver> Cpu<O> {
    /// Create a new CPU with zeroed registers over `mem`.
    pub fn new(mem: Memory<O>) -> Self {
        Self {
            regs: Registers::new(),
            mem,
            steps: 0,
            skip: false,
            pc_written: false,
            length: 1,
            on_step: None,
        }
    }

    /// Reset registers, decode state and memory.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.reset();
        self.steps = 0;
        self.skip = false;
        self.pc_written = false;
        self.length = 1;
    }

    /// Load a program at address 0.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        self.mem.load_program(program)
    }

    /// Install the step-completed notification.
    pub fn set_step_hook<F>(&mut self, hook: F)
    where
        F: FnMut(u64, &Registers) + Send + 'static,
    {
        self.on_step = Some(Box::new(hook));
    }

    /// Remove the step-completed notification.
    pub fn clear_step_hook(&mut self) {
        self.on_step = None;
    }

    /// Execute a single instruction.
    ///
    /// Returns the decoded instruction. On error the step is abandoned
    /// before the PC advances, so PC still points at the faulting word.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        self.pc_written = false;
        self.length = 1;

        // Fetch
        let pc = self.regs.pc;
        let word = self.mem.read(usize::from(pc))?;

        // Decode, resolving operands (which may read further words)
        let instr = decode::decode(word);
        let skipped = match instr {
            Instruction::Basic { op, a, b } => {
                let target = self.resolve(a)?;
                let source = self.resolve(b)?;
                if self.take_skip() {
                    true
                } else {
                    if op.writes_target() && target.location == Location::None {
                        return Err(CpuError::InvalidTarget { code: a.code() });
                    }
                    self.apply_stack_effect(&target);
                    self.apply_stack_effect(&source);
                    self.execute_basic(op, &target, &source)?;
                    false
                }
            }
            Instruction::NonBasic { op, a } => {
                let operand = self.resolve(a)?;
                if self.take_skip() {
                    true
                } else {
                    self.apply_stack_effect(&operand);
                    self.execute_non_basic(op, &operand)?;
                    false
                }
            }
        };

        tracing::trace!(
            pc = format_args!("{pc:#06x}"),
            word = format_args!("{word:#06x}"),
            len = self.length,
            skipped,
            ?instr,
            "step"
        );

        if !self.pc_written {
            self.regs.advance_pc(self.length);
        }

        self.steps += 1;
        if let Some(hook) = self.on_step.as_mut() {
            hook(self.steps, &self.regs);
        }

        Ok(instr)
    }

    /// Execute up to `max_steps` instructions.
    ///
    /// Returns how many completed. There is no halt instruction, so this
    /// only stops early on error.
    pub fn run_batch(&mut self, max_steps: u64) -> Result<u64, CpuError> {
        for done in 0..max_steps {
            if let Err(e) = self.step() {
                tracing::warn!(
                    completed = done,
                    pc = format_args!("{:#06x}", self.regs.pc),
                    error = %e,
                    "batch aborted"
                );
                return Err(e);
            }
        }
        Ok(max_steps)
    }

    /// Resolve an operand against the current registers and memory.
    ///
    /// Stack operands report the slot they will touch but leave SP alone;
    /// SP moves only if the instruction executes.
    pub fn resolve(&mut self, operand: Operand) -> Result<ResolvedOperand, CpuError> {
        let (location, value) = match operand {
            Operand::Register(reg) => (Location::Register(reg), self.regs.get(reg)),
            Operand::Indirect(reg) => {
                let address = self.regs.get(reg);
                (Location::Memory(address), self.mem.read(usize::from(address))?)
            }
            Operand::IndexedIndirect(reg) => {
                let base = self.next_word()?;
                let address = base.wrapping_add(self.regs.get(reg));
                (Location::Memory(address), self.mem.read(usize::from(address))?)
            }
            Operand::Pop | Operand::Peek => {
                let address = self.regs.sp;
                (Location::Memory(address), self.mem.read(usize::from(address))?)
            }
            Operand::Push => {
                let address = self.regs.sp.wrapping_sub(1);
                (Location::Memory(address), self.mem.read(usize::from(address))?)
            }
            Operand::NextWordIndirect => {
                let address = self.next_word()?;
                (Location::Memory(address), self.mem.read(usize::from(address))?)
            }
            Operand::NextWordLiteral => (Location::None, self.next_word()?),
            Operand::Literal(value) => (Location::None, u16::from(value)),
        };

        Ok(ResolvedOperand {
            operand,
            location,
            value,
            next_word: operand.uses_next_word(),
        })
    }

    /// Store `value` where `target` points.
    pub fn write(&mut self, target: &ResolvedOperand, value: u16) -> Result<(), CpuError> {
        match target.location {
            Location::Register(reg) => {
                self.regs.set(reg, value);
                if reg == Reg::Pc {
                    self.pc_written = true;
                }
            }
            Location::Memory(address) => self.mem.write(usize::from(address), u32::from(value))?,
            Location::None => {
                return Err(CpuError::InvalidTarget { code: target.operand.code() });
            }
        }
        Ok(())
    }

    /// Fetch the word after the current instruction and grow its length.
    fn next_word(&mut self) -> Result<u16, CpuError> {
        let address = self.regs.pc.wrapping_add(self.length);
        self.length += 1;
        Ok(self.mem.read(usize::from(address))?)
    }

    fn take_skip(&mut self) -> bool {
        std::mem::replace(&mut self.skip, false)
    }

    fn apply_stack_effect(&mut self, operand: &ResolvedOperand) {
        match operand.operand {
            Operand::Pop => {
                self.regs.pop_sp();
            }
            Operand::Push => {
                self.regs.push_sp();
            }
            _ => {}
        }
    }

    fn execute_basic(
        &mut self,
        op: BasicOp,
        target: &ResolvedOperand,
        source: &ResolvedOperand,
    ) -> Result<(), CpuError> {
        let a = u32::from(target.value);
        let b = u32::from(source.value);

        match op {
            BasicOp::Set => self.write(target, source.value)?,

            // ==================== Arithmetic ====================
            BasicOp::Add => {
                let sum = a + b;
                if sum > 0xFFFF {
                    self.regs.o = 0x0001;
                }
                self.write(target, sum as u16)?;
            }

            BasicOp::Sub => {
                if a < b {
                    self.regs.o = 0xFFFF;
                }
                self.write(target, a.wrapping_sub(b) as u16)?;
            }

            BasicOp::Mul => {
                let product = a * b;
                self.write(target, product as u16)?;
                self.regs.o = (product >> 16) as u16;
            }

            BasicOp::Div => {
                if b == 0 {
                    self.write(target, 0)?;
                    self.regs.o = 0;
                } else {
                    self.write(target, (a / b) as u16)?;
                    self.regs.o = ((a << 16) / b) as u16;
                }
            }

            BasicOp::Mod => {
                let rem = if b == 0 { 0 } else { a % b };
                self.write(target, rem as u16)?;
            }

            // ==================== Shifts ====================
            BasicOp::Shl => {
                let shifted = shift_left(u64::from(a), b);
                self.write(target, shifted as u16)?;
                self.regs.o = (shifted >> 16) as u16;
            }

            BasicOp::Shr => {
                self.write(target, shift_right(u64::from(a), b) as u16)?;
                self.regs.o = shift_right(u64::from(a) << 16, b) as u16;
            }

            // ==================== Bitwise ====================
            BasicOp::And => self.write(target, (a & b) as u16)?,
            BasicOp::Bor => self.write(target, (a | b) as u16)?,
            BasicOp::Xor => self.write(target, (a ^ b) as u16)?,

            // ==================== Conditionals ====================
            BasicOp::Ife => self.skip = a != b,
            BasicOp::Ifn => self.skip = a == b,
            BasicOp::Ifg => self.skip = a <= b,
            BasicOp::Ifb => self.skip = (a & b) == 0,
        }

        Ok(())
    }

    fn execute_non_basic(&mut self, op: NonBasicOp, operand: &ResolvedOperand) -> Result<(), CpuError> {
        match op {
            NonBasicOp::Jsr => {
                let ret = self.regs.pc.wrapping_add(self.length);
                let sp = self.regs.push_sp();
                self.mem.write(usize::from(sp), u32::from(ret))?;
                self.regs.pc = operand.value;
                self.pc_written = true;
            }
            NonBasicOp::Reserved(code) => {
                tracing::debug!(
                    code = format_args!("{code:#04x}"),
                    pc = format_args!("{:#06x}", self.regs.pc),
                    "reserved non-basic opcode executed as no-op"
                );
            }
        }
        Ok(())
    }

    /// Instructions completed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Whether the next instruction will be skipped.
    pub fn skip_pending(&self) -> bool {
        self.skip
    }
}

/// `value << amount`, where shifting by 64 or more leaves nothing.
fn shift_left(value: u64, amount: u32) -> u64 {
    value.checked_shl(amount).unwrap_or(0)
}

/// `value >> amount`, where shifting by 64 or more leaves nothing.
fn shift_right(value: u64, amount: u32) -> u64 {
    value.checked_shr(amount).unwrap_or(0)
}

impl Default for Cpu<NoopObserver> {
    fn default() -> Self {
        Self::unobserved()
    }
}

impl<O> std::fmt::Debug for Cpu<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("steps", &self.steps)
            .field("skip", &self.skip)
            .field("regs", &self.regs)
            .field("mem", &self.mem)
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("cannot write to literal operand {code:#04x}")]
    InvalidTarget { code: u8 },
}
