//! Debugger application state and logic.

use crate::asm::disasm::disassemble_instruction;
use crate::cpu::Cpu;
use crate::devices::{Packet, Peripherals};

/// Debugger application state.
pub struct DebuggerApp {
    /// The machine being debugged.
    pub cpu: Cpu<Peripherals>,
    /// Original program, reloaded on reset.
    pub program: Vec<u16>,
    /// Steps per tick while running.
    pub batch_size: u64,
    /// Is the debugger running continuously?
    pub running: bool,
    /// Keys go to the guest keyboard instead of the debugger.
    pub capture: bool,
    /// Should we quit?
    pub should_quit: bool,
    /// Status message to display.
    pub status: String,
    /// Memory view scroll offset (in touched rows).
    pub mem_scroll: usize,
    /// Packets the guest has sent this session.
    pub sent_total: u64,
    /// The most recent packet the guest sent.
    pub last_sent: Option<Packet>,
}

impl DebuggerApp {
    /// Create a new debugger around a machine with its program loaded.
    pub fn new(cpu: Cpu<Peripherals>, program: Vec<u16>, batch_size: u64) -> Self {
        Self {
            cpu,
            program,
            batch_size: batch_size.max(1),
            running: false,
            capture: false,
            should_quit: false,
            status: "Ready. Press 's' to step, 'r' to run, 'q' to quit.".into(),
            mem_scroll: 0,
            sent_total: 0,
            last_sent: None,
        }
    }

    /// Step one instruction.
    pub fn step(&mut self) {
        let pc = self.cpu.regs.pc;
        let (text, _) = disassemble_instruction(&self.window(pc), 0);
        match self.cpu.step() {
            Ok(_) => {
                self.status = format!("PC={:04x}: {}", pc, text);
            }
            Err(e) => {
                self.status = format!("Error: {}", e);
                self.running = false;
            }
        }
        self.deliver_outbound();
    }

    /// Start continuous execution.
    pub fn run(&mut self) {
        self.running = true;
        self.status = "Running...".into();
    }

    /// Stop continuous execution.
    pub fn pause(&mut self) {
        self.running = false;
        self.status = format!("Paused after {} steps.", self.cpu.steps());
    }

    /// Run one batch of continuous execution.
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        if let Err(e) = self.cpu.run_batch(self.batch_size) {
            self.running = false;
            self.status = format!("Stopped at PC={:04x}: {}", self.cpu.regs.pc, e);
        }
        self.deliver_outbound();
    }

    /// Drain the packets the guest sent. There is no hub to forward them
    /// to, so they are counted and the latest is shown.
    pub fn deliver_outbound(&mut self) {
        match self.cpu.mem.drain_outbound() {
            Ok(packets) => {
                self.sent_total += packets.len() as u64;
                if let Some(last) = packets.last() {
                    self.last_sent = Some(*last);
                }
            }
            Err(e) => {
                self.running = false;
                self.status = format!("Network error: {}", e);
            }
        }
    }

    /// Toggle keyboard capture.
    pub fn toggle_capture(&mut self) {
        self.capture = !self.capture;
        self.status = if self.capture {
            "Keyboard captured. Esc to release.".into()
        } else {
            "Keyboard released.".into()
        };
    }

    /// Feed a key to the guest keyboard.
    pub fn press_key(&mut self, key: u16) {
        if let Err(e) = self.cpu.mem.press_key(key) {
            self.status = format!("Key dropped: {}", e);
        }
    }

    /// Reset the machine and reload the program.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.cpu.mem.observer_mut().reset();
        self.running = false;
        self.mem_scroll = 0;
        self.sent_total = 0;
        self.last_sent = None;
        self.status = match self.cpu.load_program(&self.program) {
            Ok(()) => "Reset. Ready.".into(),
            Err(e) => format!("Reload failed: {}", e),
        };
    }

    /// Get disassembly starting at the current PC.
    ///
    /// Each entry is (address, text, is_current).
    pub fn get_disassembly(&self, lines: usize) -> Vec<(u16, String, bool)> {
        let mut addr = self.cpu.regs.pc;
        let mut out = Vec::with_capacity(lines);
        for i in 0..lines {
            if usize::from(addr) >= self.cpu.mem.capacity() {
                break;
            }
            let (text, len) = disassemble_instruction(&self.window(addr), 0);
            out.push((addr, text, i == 0));
            addr = addr.wrapping_add(len.max(1) as u16);
        }
        out
    }

    /// The rows the memory panel shows: every touched row plus the PC row.
    pub fn memory_rows(&self) -> Vec<u16> {
        use crate::devices::ROW_WORDS;

        let pc_row = self.cpu.regs.pc - self.cpu.regs.pc % ROW_WORDS;
        let mut rows: Vec<u16> = self.cpu.mem.observer().touched_rows().collect();
        if let Err(at) = rows.binary_search(&pc_row) {
            rows.insert(at, pc_row);
        }
        rows
    }

    fn window(&self, addr: u16) -> [u16; 3] {
        let word = |i: u16| self.cpu.mem.peek(usize::from(addr.wrapping_add(i))).unwrap_or(0);
        [word(0), word(1), word(2)]
    }
}

/// Run the debugger on a machine whose program is already loaded.
pub fn run_debugger(cpu: Cpu<Peripherals>, program: Vec<u16>, batch_size: u64) -> std::io::Result<()> {
    use crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
        ExecutableCommand,
    };
    use ratatui::prelude::*;
    use std::io::stdout;
    use std::time::Duration;

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut app = DebuggerApp::new(cpu, program, batch_size);

    // Main loop
    loop {
        terminal.draw(|frame| {
            super::ui::draw(frame, &app);
        })?;

        let wait = if app.running { Duration::from_millis(1) } else { Duration::from_millis(50) };
        if event::poll(wait)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.capture {
                        match key.code {
                            KeyCode::Esc | KeyCode::Tab => app.toggle_capture(),
                            KeyCode::Enter => app.press_key(0x0A),
                            KeyCode::Backspace => app.press_key(0x08),
                            KeyCode::Char(c) if c.is_ascii() => app.press_key(c as u16),
                            _ => {}
                        }
                    } else {
                        match key.code {
                            KeyCode::Char('q') => app.should_quit = true,
                            KeyCode::Char('s') => {
                                app.running = false;
                                app.step();
                            }
                            KeyCode::Char('r') => app.run(),
                            KeyCode::Char('p') => app.pause(),
                            KeyCode::Char('x') => app.reset(),
                            KeyCode::Tab => app.toggle_capture(),
                            KeyCode::Up => app.mem_scroll = app.mem_scroll.saturating_sub(1),
                            KeyCode::Down => app.mem_scroll += 1,
                            _ => {}
                        }
                    }
                }
            }
        }

        if app.running {
            app.tick();
        }

        if app.should_quit {
            break;
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Memory;

    fn app(program: &[u16]) -> DebuggerApp {
        let mut cpu = Cpu::new(Memory::new(Peripherals::new(1)));
        cpu.load_program(program).unwrap();
        DebuggerApp::new(cpu, program.to_vec(), 10)
    }

    #[test]
    fn test_step_and_reset() {
        let mut app = app(&[0x9401, 0x9811]); // SET A, 5; SET B, 6
        app.step();
        assert_eq!(app.cpu.regs.get(crate::cpu::Reg::A), 5);
        assert!(app.status.contains("SET A"));
        app.reset();
        assert_eq!(app.cpu.regs.pc, 0);
        assert_eq!(app.cpu.regs.get(crate::cpu::Reg::A), 0);
        assert_eq!(app.cpu.mem.peek(0), Some(0x9401));
    }

    #[test]
    fn test_tick_runs_a_batch() {
        let mut app = app(&[0x8402, 0x7dc1, 0x0000]); // ADD A, 1; SET PC, 0
        app.run();
        app.tick();
        assert_eq!(app.cpu.steps(), 10);
        app.pause();
        app.tick();
        assert_eq!(app.cpu.steps(), 10);
    }

    #[test]
    fn test_running_drains_outbound_pairs() {
        // SET [0x6080], 14; SET [0x6081], 3; SET PC, 0
        let mut app = app(&[0x7de1, 0x6080, 0x000e, 0x7de1, 0x6081, 0x0003, 0x7dc1, 0x0000]);
        app.run();
        for _ in 0..30 {
            app.tick();
        }
        assert_eq!(app.sent_total, 100);
        assert_eq!(app.last_sent, Some(Packet { peer: 14, data: 3 }));
        assert_eq!(app.cpu.mem.observer().network.outbox_len(), 0);
    }

    #[test]
    fn test_disassembly_follows_instruction_lengths() {
        let app = app(&[0x7c01, 0x0030, 0x9401]);
        let lines = app.get_disassembly(2);
        assert_eq!(lines[0].0, 0);
        assert!(lines[0].2);
        assert_eq!(lines[1].0, 2);
    }

    #[test]
    fn test_captured_keys_reach_keyboard() {
        let mut app = app(&[0x9401]);
        app.toggle_capture();
        app.press_key(u16::from(b'h'));
        assert_eq!(app.cpu.mem.peek(0x9000), Some(u16::from(b'h')));
        assert!(app.memory_rows().contains(&0x9000));
    }
}
