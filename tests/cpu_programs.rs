//! Whole-program tests for the instruction set.
//!
//! Each test loads a short program at address 0, runs a fixed number of
//! steps and checks registers and memory afterwards.

use dcpu::cpu::{Cpu, CpuError, NoopObserver, Reg};

fn run(program: &[u16], steps: u64) -> Cpu<NoopObserver> {
    let mut cpu = Cpu::unobserved();
    cpu.load_program(program).unwrap();
    for _ in 0..steps {
        cpu.step().unwrap();
    }
    cpu
}

fn reg(cpu: &Cpu<NoopObserver>, reg: Reg) -> u16 {
    cpu.regs.get(reg)
}

fn mem(cpu: &Cpu<NoopObserver>, address: usize) -> u16 {
    cpu.mem.peek(address).unwrap()
}

// ========== SET and addressing modes ==========

#[test]
fn test_set_short_literal() {
    let cpu = run(&[0x9401], 1);
    assert_eq!(reg(&cpu, Reg::A), 5);
    assert_eq!(cpu.regs.pc, 1);
}

#[test]
fn test_set_next_word_literal() {
    let cpu = run(&[0x7c01, 0x0071], 1);
    assert_eq!(reg(&cpu, Reg::A), 113);
    assert_eq!(cpu.regs.pc, 2);
}

#[test]
fn test_set_register_from_register() {
    let cpu = run(&[0x9401, 0x0011], 2);
    assert_eq!(reg(&cpu, Reg::B), 5);
}

#[test]
fn test_register_indirect_target() {
    let cpu = run(&[0x7c01, 0x8000, 0x7c81, 0x0001], 2);
    assert_eq!(mem(&cpu, 0x8000), 1);
}

#[test]
fn test_indirect_to_indirect() {
    let program = [0x7c01, 0x1000, 0x7c11, 0x2000, 0x91e1, 0x1000, 0x85e1, 0x2000, 0x2481];
    let cpu = run(&program, 5);
    assert_eq!(mem(&cpu, 0x1000), 1);
}

#[test]
fn test_indexed_indirect_target() {
    let cpu = run(&[0x9401, 0x9d01, 0x2000], 2);
    assert_eq!(mem(&cpu, 0x2005), 7);
}

#[test]
fn test_indexed_indirect_source() {
    let cpu = run(&[0x9001, 0x95e1, 0x1004, 0x4011, 0x1000], 3);
    assert_eq!(reg(&cpu, Reg::B), 5);
}

#[test]
fn test_next_word_indirect_source() {
    let cpu = run(&[0x91e1, 0x5000, 0x7801, 0x5000], 2);
    assert_eq!(reg(&cpu, Reg::A), 4);
}

#[test]
fn test_loop_through_pc() {
    // ADD A, 1; SET B, A; SET PC, 0
    let cpu = run(&[0x8402, 0x0011, 0x7dc1, 0x0000], 10);
    assert_eq!(reg(&cpu, Reg::A), 4);
    assert_eq!(reg(&cpu, Reg::B), 3);
    assert_eq!(cpu.regs.pc, 1);
}

// ========== Arithmetic ==========

#[test]
fn test_add() {
    let cpu = run(&[0x9401, 0x0011, 0x0402], 3);
    assert_eq!(reg(&cpu, Reg::A), 10);
    assert_eq!(cpu.regs.o, 0);
}

#[test]
fn test_add_overflow() {
    let cpu = run(&[0x7c01, 0xfffe, 0x9402], 2);
    assert_eq!(reg(&cpu, Reg::A), 3);
    assert_eq!(cpu.regs.o, 1);
}

#[test]
fn test_sub() {
    let cpu = run(&[0x8c01, 0x9411, 0x0013], 3);
    assert_eq!(reg(&cpu, Reg::B), 2);
    assert_eq!(cpu.regs.o, 0);
}

#[test]
fn test_sub_underflow() {
    let cpu = run(&[0x9401, 0x8c11, 0x0013], 3);
    assert_eq!(reg(&cpu, Reg::B), 0xfffe);
    assert_eq!(cpu.regs.o, 0xffff);
}

#[test]
fn test_mul() {
    let cpu = run(&[0x8c01, 0x9404], 2);
    assert_eq!(reg(&cpu, Reg::A), 15);
}

#[test]
fn test_mul_overflow() {
    let cpu = run(&[0x8c01, 0x7c04, 0xffff], 2);
    assert_eq!(reg(&cpu, Reg::A), 0xfffd);
    assert_eq!(cpu.regs.o, 2);
}

#[test]
fn test_div() {
    let cpu = run(&[0x9801, 0x8805], 2);
    assert_eq!((reg(&cpu, Reg::A), cpu.regs.o), (3, 0));

    let cpu = run(&[0x9801, 0x9405], 2);
    assert_eq!((reg(&cpu, Reg::A), cpu.regs.o), (1, 0x3333));

    let cpu = run(&[0x9801, 0xac05], 2);
    assert_eq!((reg(&cpu, Reg::A), cpu.regs.o), (0, 0x8ba2));
}

#[test]
fn test_div_by_zero() {
    let cpu = run(&[0x9801, 0x8805, 0x8005], 3);
    assert_eq!(reg(&cpu, Reg::A), 0);
    assert_eq!(cpu.regs.o, 0);
}

#[test]
fn test_mod() {
    assert_eq!(reg(&run(&[0x9801, 0x9406], 2), Reg::A), 1);
    assert_eq!(reg(&run(&[0x9801, 0x8c06], 2), Reg::A), 0);
    assert_eq!(reg(&run(&[0x9801, 0x8006], 2), Reg::A), 0);
}

#[test]
fn test_shl() {
    let cpu = run(&[0x7c21, 0xffff, 0xa027], 2);
    assert_eq!(reg(&cpu, Reg::C), 0xff00);
    assert_eq!(cpu.regs.o, 0x00ff);
}

#[test]
fn test_shr_by_huge_amount_clears() {
    let cpu = run(&[0x7c21, 0xffff, 0x7c28, 0xffff], 2);
    assert_eq!(reg(&cpu, Reg::C), 0);
    assert_eq!(cpu.regs.o, 0);
}

// ========== Conditionals ==========

/// SET A, a; SET B, b; IFx A, B; SET B, 7; SET A, 9
fn conditional(set_a: u16, set_b: u16, op: u16) -> Cpu<NoopObserver> {
    run(&[set_a, set_b, op, 0x9c11, 0xa401], 5)
}

#[test]
fn test_ife() {
    assert_eq!(reg(&conditional(0x8c01, 0x9011, 0x040c), Reg::B), 4);
    assert_eq!(reg(&conditional(0x8c01, 0x8c11, 0x040c), Reg::B), 7);
}

#[test]
fn test_ifn() {
    assert_eq!(reg(&conditional(0x8c01, 0x9011, 0x040d), Reg::B), 7);
    assert_eq!(reg(&conditional(0x8c01, 0x8c11, 0x040d), Reg::B), 3);
}

#[test]
fn test_ifg() {
    assert_eq!(reg(&conditional(0x8c01, 0x9011, 0x040e), Reg::B), 4);
    assert_eq!(reg(&conditional(0x8c01, 0x8811, 0x040e), Reg::B), 7);
}

#[test]
fn test_ifb() {
    assert_eq!(reg(&conditional(0x8001, 0x9011, 0x040f), Reg::B), 4);
    assert_eq!(reg(&conditional(0x9401, 0x9011, 0x040f), Reg::B), 7);
}

#[test]
fn test_conditional_falls_through_to_next_instruction() {
    let cpu = conditional(0x8c01, 0x9011, 0x040c);
    assert_eq!(reg(&cpu, Reg::A), 9);
    assert_eq!(cpu.regs.pc, 5);
}

#[test]
fn test_skip_covers_whole_multiword_instruction() {
    // IFE A, 1; SET A, 0x30; SET B, 5
    let mut cpu = run(&[0x840c, 0x7c01, 0x0030, 0x9411], 1);
    assert!(cpu.skip_pending());

    cpu.step().unwrap();
    assert!(!cpu.skip_pending());
    assert_eq!(cpu.regs.pc, 3);
    assert_eq!(reg(&cpu, Reg::A), 0);

    cpu.step().unwrap();
    assert_eq!(reg(&cpu, Reg::B), 5);
    assert_eq!(cpu.steps(), 3);
}

#[test]
fn test_skipped_stack_operand_leaves_sp() {
    // IFE A, 1; SET PUSH, 10
    let cpu = run(&[0x840c, 0xa9a1], 2);
    assert_eq!(cpu.regs.sp, 0);
    assert_eq!(mem(&cpu, 0xffff), 0);
}

// ========== Stack ==========

#[test]
fn test_push_pop_peek() {
    let cpu = run(&[0xa9a1, 0xa5a1, 0xa1a1, 0x6001, 0x6411, 0x6411], 6);
    assert_eq!(reg(&cpu, Reg::A), 8);
    assert_eq!(reg(&cpu, Reg::B), 9);
    assert_eq!(cpu.regs.sp, 0xfffe);
}

#[test]
fn test_pop_back_to_empty() {
    let cpu = run(&[0xa9a1, 0xa5a1, 0x6001, 0x6011], 6);
    assert_eq!(reg(&cpu, Reg::A), 9);
    assert_eq!(reg(&cpu, Reg::B), 10);
    assert_eq!(cpu.regs.sp, 0);
}

#[test]
fn test_set_push_pop() {
    let cpu = run(&[0xa9a1, 0xa5a1, 0x61a1, 0x6011], 4);
    assert_eq!(reg(&cpu, Reg::B), 9);
    assert_eq!(cpu.regs.sp, 0xffff);
}

#[test]
fn test_set_pop_push() {
    let cpu = run(&[0xa9a1, 0xa5a1, 0x6981, 0x6011], 4);
    assert_eq!(reg(&cpu, Reg::B), 0);
    assert_eq!(cpu.regs.sp, 0xffff);
}

// ========== JSR ==========

#[test]
fn test_jsr_and_return() {
    let program = [0x7c10, 0x0005, 0x9401, 0x7dc1, 0x0007, 0x9011, 0x61c1, 0x8c21];
    let cpu = run(&program, 8);
    assert_eq!(reg(&cpu, Reg::A), 5);
    assert_eq!(reg(&cpu, Reg::B), 4);
    assert_eq!(reg(&cpu, Reg::C), 3);
    assert_eq!(cpu.regs.sp, 0);
    assert_eq!(mem(&cpu, 0xffff), 2);
}

#[test]
fn test_sample_program() {
    let program = [
        0x7c01, 0x0030, 0x7de1, 0x1000, 0x0020, 0x7803, 0x1000, 0xc00d, 0x7dc1, 0x001a, 0xa861, 0x7c01,
        0x2000, 0x2161, 0x2000, 0x8463, 0x806d, 0x7dc1, 0x000d, 0x9031, 0x7c10, 0x0018, 0x7dc1, 0x001a,
        0x9037, 0x61c1, 0x7dc1, 0x001a,
    ];
    let cpu = run(&program, 50);
    assert_eq!(reg(&cpu, Reg::A), 0x2000);
    assert_eq!(reg(&cpu, Reg::X), 0x40);
    assert_eq!(mem(&cpu, 0x1000), 0x20);
    assert_eq!(mem(&cpu, 0xffff), 0x16);
}

// ========== Faults and edge cases ==========

#[test]
fn test_write_to_literal_fails() {
    // SET 5, A
    let mut cpu = Cpu::unobserved();
    cpu.load_program(&[0x0251]).unwrap();
    assert_eq!(cpu.step(), Err(CpuError::InvalidTarget { code: 0x25 }));
    assert_eq!(cpu.regs.pc, 0);
}

#[test]
fn test_write_to_next_word_literal_fails() {
    // SET 0x1234, 1
    let mut cpu = Cpu::unobserved();
    cpu.load_program(&[0x85f1, 0x1234]).unwrap();
    assert_eq!(cpu.step(), Err(CpuError::InvalidTarget { code: 0x1f }));
}

#[test]
fn test_zero_word_is_not_a_halt() {
    let cpu = run(&[0x0000, 0x0000, 0x9401], 3);
    assert_eq!(reg(&cpu, Reg::A), 5);
    assert_eq!(cpu.regs.pc, 3);
}

#[test]
fn test_pc_wraps_at_end_of_memory() {
    let mut cpu = Cpu::unobserved();
    cpu.mem.write(0xffff, 0x9401).unwrap();
    cpu.regs.pc = 0xffff;
    cpu.step().unwrap();
    assert_eq!(reg(&cpu, Reg::A), 5);
    assert_eq!(cpu.regs.pc, 0);
}

#[test]
fn test_step_hook_sees_each_step() {
    use std::sync::{Arc, Mutex};

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut cpu = Cpu::unobserved();
    cpu.load_program(&[0x9401, 0x9811]).unwrap();
    cpu.set_step_hook(move |step, regs| sink.lock().unwrap().push((step, regs.pc)));
    cpu.run_batch(2).unwrap();
    assert_eq!(*seen.lock().unwrap(), vec![(1, 1), (2, 2)]);
}
