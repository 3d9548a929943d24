//! Guest programs talking to the memory-mapped peripherals.

use dcpu::cpu::{Cpu, Driver, Memory, Reg, RunConfig};
use dcpu::{MachineConfig, Packet, Peripherals};
use std::time::Duration;

fn machine(program: &[u16]) -> Cpu<Peripherals> {
    let mut cpu = Cpu::new(Memory::new(Peripherals::new(1)));
    cpu.load_program(program).unwrap();
    cpu
}

#[test]
fn test_guest_writes_to_display() {
    // SET [0x8000], 'H'; SET [0x8001], 'i'; SET [0x8020], '!'
    let mut cpu = machine(&[
        0x7de1, 0x8000, 0x0048, //
        0x7de1, 0x8001, 0x0069, //
        0x7de1, 0x8020, 0x0021,
    ]);
    cpu.run_batch(3).unwrap();

    let display = &mut cpu.mem.observer_mut().display;
    assert!(display.take_dirty());
    assert!(display.row_text(0).unwrap().starts_with("Hi"));
    assert!(display.row_text(1).unwrap().starts_with('!'));
    assert!(!display.take_dirty());
}

#[test]
fn test_guest_sends_packet() {
    // SET [0x6080], 14; SET [0x6081], 3
    let mut cpu = machine(&[0x7de1, 0x6080, 0x000e, 0x7de1, 0x6081, 0x0003]);
    cpu.run_batch(2).unwrap();

    let sent = cpu.mem.drain_outbound().unwrap();
    assert_eq!(sent, vec![Packet { peer: 14, data: 3 }]);
    assert_eq!(cpu.mem.peek(0x6080), Some(0));
    assert_eq!(cpu.mem.peek(0x6081), Some(0));
}

#[test]
fn test_reused_pair_delivers_both_packets() {
    // SET [0x6080], 14; SET [0x6081], 1; SET [0x6080], 14; SET [0x6081], 2
    let mut cpu = machine(&[
        0x7de1, 0x6080, 0x000e, //
        0x7de1, 0x6081, 0x0001, //
        0x7de1, 0x6080, 0x000e, //
        0x7de1, 0x6081, 0x0002,
    ]);
    cpu.run_batch(4).unwrap();

    let sent = cpu.mem.drain_outbound().unwrap();
    assert_eq!(sent, vec![Packet { peer: 14, data: 1 }, Packet { peer: 14, data: 2 }]);
    assert!(cpu.mem.drain_outbound().unwrap().is_empty());
}

#[test]
fn test_drain_between_receiver_and_data_keeps_packet() {
    // SET [0x6080], 14; SET [0x6081], 1; SET [0x6080], 14; SET [0x6081], 2
    let mut cpu = machine(&[
        0x7de1, 0x6080, 0x000e, //
        0x7de1, 0x6081, 0x0001, //
        0x7de1, 0x6080, 0x000e, //
        0x7de1, 0x6081, 0x0002,
    ]);
    cpu.run_batch(3).unwrap();
    assert_eq!(cpu.mem.drain_outbound().unwrap(), vec![Packet { peer: 14, data: 1 }]);
    assert_eq!(cpu.mem.peek(0x6080), Some(14));

    cpu.run_batch(1).unwrap();
    assert_eq!(cpu.mem.drain_outbound().unwrap(), vec![Packet { peer: 14, data: 2 }]);
    assert_eq!(cpu.mem.peek(0x6080), Some(0));
    assert_eq!(cpu.mem.peek(0x6081), Some(0));
}

#[test]
fn test_sending_loop_stays_bounded_without_drains() {
    use dcpu::devices::network::OUTBOX_LIMIT;

    // SET [0x6080], 14; SET [0x6081], 3; SET PC, 0
    let mut cpu = machine(&[0x7de1, 0x6080, 0x000e, 0x7de1, 0x6081, 0x0003, 0x7dc1, 0x0000]);
    cpu.run_batch(30_000).unwrap();

    let network = &mut cpu.mem.observer_mut().network;
    assert_eq!(network.outbox_len(), OUTBOX_LIMIT);
    assert_eq!(network.take_unzeroed().len(), 1);
}

#[test]
fn test_guest_reads_keyboard_and_network() {
    // SET A, [0x9000]; SET B, [0x6001]
    let mut cpu = machine(&[0x7801, 0x9000, 0x7811, 0x6001]);
    cpu.mem.press_key(u16::from(b'k')).unwrap();
    cpu.mem.receive_packet(Packet { peer: 5, data: 0x42 }).unwrap();
    cpu.run_batch(2).unwrap();

    assert_eq!(cpu.regs.get(Reg::A), u16::from(b'k'));
    assert_eq!(cpu.regs.get(Reg::B), 0x42);
}

#[test]
fn test_touched_rows_track_guest_writes() {
    // SET [0x1003], 1
    let mut cpu = machine(&[0x85e1, 0x1003]);
    cpu.run_batch(1).unwrap();
    let rows: Vec<u16> = cpu.mem.observer().touched_rows().collect();
    // Row 0 from loading the program, row 0x1000 from the guest
    assert_eq!(rows, vec![0x0000, 0x1000]);
}

#[test]
fn test_driver_runs_machine_with_peripherals() {
    // SET [0x8000], 'x'; SET PC, 0
    let cpu = machine(&[0x7de1, 0x8000, 0x0078, 0x7dc1, 0x0000]);
    let config = RunConfig {
        batch_size: 100,
        tick: Duration::from_millis(1),
    };
    let mut driver = Driver::new(cpu, config);
    driver.run().unwrap();
    std::thread::sleep(Duration::from_millis(20));
    let cpu = driver.into_cpu().unwrap();

    assert!(cpu.steps() > 0);
    assert!(cpu.mem.observer().display.text().starts_with('x'));
}

#[test]
fn test_config_builds_networked_machine() {
    let config = MachineConfig::from_json(r#"{ "hub_id": 42 }"#).unwrap();
    let mut cpu = config.build();
    assert_eq!(cpu.mem.observer().network.hub_id(), 42);
    assert!(cpu.mem.receive_packet(Packet { peer: 0, data: 1 }).is_err());
}
