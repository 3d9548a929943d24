//! Memory-mapped peripherals.
//!
//! Peripherals sit outside the CPU. They watch memory through the
//! [`MemoryObserver`] contract and, when the host asks them to, write into
//! their own windows with ordinary memory writes.
//!
//! | window        | device                                   |
//! |---------------|------------------------------------------|
//! | 0x6000-0x607F | inbound network ring (sender, data)      |
//! | 0x6080-0x60FF | outbound network pairs (receiver, data)  |
//! | 0x8000-0x817F | 12x32 text display                       |
//! | 0x9000-0x900F | keyboard ring                            |
//!
//! # Example
//!
//! ```rust
//! use dcpu::devices::Peripherals;
//! use dcpu::cpu::Memory;
//!
//! let mut mem = Memory::new(Peripherals::new(1));
//! mem.write(0x8000, u32::from(b'A')).unwrap();
//! assert!(mem.observer().display.text().starts_with('A'));
//! ```

pub mod display;
pub mod keyboard;
pub mod network;

pub use display::Display;
pub use keyboard::Keyboard;
pub use network::{NetworkCard, Packet};

use crate::cpu::memory::{Memory, MemoryError, MemoryObserver};
use std::collections::BTreeSet;
use thiserror::Error;

/// Words per row in a memory view.
pub const ROW_WORDS: u16 = 8;

/// The standard peripheral set, installed as the memory observer.
#[derive(Debug, Clone, Default)]
pub struct Peripherals {
    /// Text display window.
    pub display: Display,
    /// Keyboard ring cursor.
    pub keyboard: Keyboard,
    /// Network card.
    pub network: NetworkCard,
    /// Start addresses of every 8-word row that has been written.
    touched: BTreeSet<u16>,
}

impl Peripherals {
    /// Create the peripheral set for a machine with network id `hub_id`.
    pub fn new(hub_id: u16) -> Self {
        Self {
            network: NetworkCard::new(hub_id),
            ..Self::default()
        }
    }

    /// Rows (by start address) that have seen a write, ascending.
    pub fn touched_rows(&self) -> impl Iterator<Item = u16> + '_ {
        self.touched.iter().copied()
    }

    /// Return every device to its power-on state.
    pub fn reset(&mut self) {
        self.display.clear();
        self.keyboard.reset();
        self.network.reset();
        self.touched.clear();
    }
}

impl MemoryObserver for Peripherals {
    fn on_write(&mut self, address: u16, value: u16) {
        self.touched.insert(address - address % ROW_WORDS);
        self.display.on_write(address, value);
        self.network.on_write(address, value);
    }
}

impl Memory<Peripherals> {
    /// Put a key code into the next keyboard slot.
    pub fn press_key(&mut self, key: u16) -> Result<(), DeviceError> {
        let slot = self.observer_mut().keyboard.advance();
        self.write(usize::from(slot), u32::from(key))?;
        Ok(())
    }

    /// Deliver an inbound packet into the next ring pair.
    pub fn receive_packet(&mut self, packet: Packet) -> Result<(), DeviceError> {
        if packet.peer == 0 {
            return Err(DeviceError::InvalidSender);
        }
        let slot = self.observer_mut().network.advance_inbound();
        self.write(usize::from(slot), u32::from(packet.peer))?;
        self.write(usize::from(slot) + 1, u32::from(packet.data))?;
        tracing::debug!(
            from = packet.peer,
            data = packet.data,
            slot = format_args!("{slot:#06x}"),
            "packet received"
        );
        Ok(())
    }

    /// Collect the packets the guest sent and zero their pairs.
    ///
    /// If zeroing fails, the pairs not yet zeroed stay queued and the
    /// packets stay in the outbox for the next drain.
    pub fn drain_outbound(&mut self) -> Result<Vec<Packet>, DeviceError> {
        let mut unzeroed = self.observer_mut().network.take_unzeroed().into_iter();

        while let Some(data_addr) = unzeroed.next() {
            let data = usize::from(data_addr);
            let cleared = self.write(data - 1, 0).and_then(|()| self.write(data, 0));
            if let Err(e) = cleared {
                self.observer_mut()
                    .network
                    .requeue_unzeroed(std::iter::once(data_addr).chain(unzeroed));
                return Err(e.into());
            }
        }

        Ok(self.observer_mut().network.take_outbox())
    }
}

/// Errors from host-side device operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("sender id 0 is not a valid hub id")]
    InvalidSender,
}
