//! WebAssembly bindings for the emulator.
//!
//! This module provides JavaScript-friendly wrappers around the core emulator.
//! The browser drives execution by calling [`WasmMachine::run`] once per
//! animation frame.

use crate::asm::disasm::disassemble_instruction;
use crate::asm::parse_listing;
use crate::config::MachineConfig;
use crate::cpu::{Cpu, Reg};
use crate::devices::{Packet, Peripherals};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsError {
    JsError::new(&e.to_string())
}

/// WebAssembly-friendly machine wrapper.
#[wasm_bindgen]
pub struct WasmMachine {
    cpu: Cpu<Peripherals>,
    program: Vec<u16>,
}

#[wasm_bindgen]
impl WasmMachine {
    /// Create a machine with the default configuration and network id `hub_id`.
    #[wasm_bindgen(constructor)]
    pub fn new(hub_id: u16) -> Self {
        let config = MachineConfig {
            hub_id,
            ..MachineConfig::default()
        };
        Self {
            cpu: config.build(),
            program: Vec::new(),
        }
    }

    /// Load a program from hex listing text. Returns the word count.
    #[wasm_bindgen]
    pub fn load_listing(&mut self, source: &str) -> Result<usize, JsError> {
        let listing = parse_listing(source).map_err(js_error)?;
        self.program = listing.words;
        self.reset().map(|()| self.program.len())
    }

    /// Step one instruction. Returns the disassembled instruction.
    #[wasm_bindgen]
    pub fn step(&mut self) -> Result<String, JsError> {
        let pc = self.cpu.regs.pc;
        let window: Vec<u16> = (0..3u16)
            .map(|i| self.cpu.mem.peek(usize::from(pc.wrapping_add(i))).unwrap_or(0))
            .collect();
        self.cpu.step().map_err(js_error)?;
        Ok(disassemble_instruction(&window, 0).0)
    }

    /// Run up to `max_steps` instructions. Returns the total step count.
    #[wasm_bindgen]
    pub fn run(&mut self, max_steps: u32) -> Result<u64, JsError> {
        self.cpu.run_batch(u64::from(max_steps)).map_err(js_error)?;
        Ok(self.cpu.steps())
    }

    /// Reset the machine and reload the program.
    #[wasm_bindgen]
    pub fn reset(&mut self) -> Result<(), JsError> {
        self.cpu.reset();
        self.cpu.mem.observer_mut().reset();
        self.cpu.load_program(&self.program).map_err(js_error)
    }

    /// Get step count.
    #[wasm_bindgen]
    pub fn steps(&self) -> u64 {
        self.cpu.steps()
    }

    /// Get program counter.
    #[wasm_bindgen]
    pub fn pc(&self) -> u16 {
        self.cpu.regs.pc
    }

    /// Get a register by index: 0-7 are A-J, then SP, PC, O.
    #[wasm_bindgen]
    pub fn register(&self, index: usize) -> Option<u16> {
        Reg::ALL.get(index).map(|reg| self.cpu.regs.get(*reg))
    }

    /// Get registers as JSON string.
    #[wasm_bindgen]
    pub fn registers_json(&self) -> Result<String, JsError> {
        serde_json::to_string(&self.cpu.regs).map_err(js_error)
    }

    /// Get a memory word without notifying peripherals.
    #[wasm_bindgen]
    pub fn memory_at(&self, address: usize) -> u16 {
        self.cpu.mem.peek(address).unwrap_or(0)
    }

    /// Display contents, one line per row.
    #[wasm_bindgen]
    pub fn display_text(&self) -> String {
        self.cpu.mem.observer().display.text()
    }

    /// Whether the display changed since the last call.
    #[wasm_bindgen]
    pub fn display_dirty(&mut self) -> bool {
        self.cpu.mem.observer_mut().display.take_dirty()
    }

    /// Feed a key code to the keyboard ring.
    #[wasm_bindgen]
    pub fn press_key(&mut self, key: u16) -> Result<(), JsError> {
        self.cpu.mem.press_key(key).map_err(js_error)
    }

    /// Deliver a packet from another hub.
    #[wasm_bindgen]
    pub fn receive(&mut self, peer: u16, data: u16) -> Result<(), JsError> {
        self.cpu.mem.receive_packet(Packet { peer, data }).map_err(js_error)
    }

    /// Collect outbound packets as a flat [peer, data, peer, data, ...] array.
    #[wasm_bindgen]
    pub fn drain_outbound(&mut self) -> Result<Vec<u16>, JsError> {
        let packets = self.cpu.mem.drain_outbound().map_err(js_error)?;
        Ok(packets.into_iter().flat_map(|p| [p.peer, p.data]).collect())
    }
}

/// Disassemble a single instruction (plus up to two operand words).
#[wasm_bindgen]
pub fn wasm_disassemble(words: Vec<u16>) -> String {
    disassemble_instruction(&words, 0).0
}
