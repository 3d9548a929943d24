//! Word-addressed main memory.
//!
//! The machine sees a flat space of 65536 sixteen-bit words. Peripherals
//! never own memory; they watch it through a [`MemoryObserver`] installed
//! when the memory is built and filter the addresses they care about.

use thiserror::Error;

/// The number of words in a full address space.
pub const MEMORY_SIZE: usize = 0x10000;

/// Largest value a word can hold.
pub const WORD_MAX: u32 = 0xFFFF;

/// Callbacks fired for every read and write that goes through [`Memory`].
///
/// Both methods default to doing nothing, so an observer only implements
/// the side it cares about.
pub trait MemoryObserver {
    /// Called after a word has been read.
    fn on_read(&mut self, _address: u16, _value: u16) {}

    /// Called after a word has been stored. The value is already committed.
    fn on_write(&mut self, _address: u16, _value: u16) {}
}

/// Observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl MemoryObserver for NoopObserver {}

/// Main memory: a fixed block of words plus the observer watching it.
pub struct Memory<O = NoopObserver> {
    words: Vec<u16>,
    observer: O,
}

impl Memory<NoopObserver> {
    /// Create a full-size memory nobody observes.
    pub fn unobserved() -> Self {
        Self::new(NoopObserver)
    }
}

impl<O: MemoryObserver> Memory<O> {
    /// Create a full 65536-word memory with all words zeroed.
    pub fn new(observer: O) -> Self {
        Self::with_capacity(MEMORY_SIZE, observer)
    }

    /// Create a memory of `words` words (clamped to the 16-bit address space).
    pub fn with_capacity(words: usize, observer: O) -> Self {
        Self {
            words: vec![0; words.min(MEMORY_SIZE)],
            observer,
        }
    }

    /// Number of addressable words.
    pub fn capacity(&self) -> usize {
        self.words.len()
    }

    /// Read a word and notify the observer.
    pub fn read(&mut self, address: usize) -> Result<u16, MemoryError> {
        let value = *self.words.get(address).ok_or(MemoryError::OutOfRange {
            address,
            capacity: self.words.len(),
        })?;
        self.observer.on_read(address as u16, value);
        Ok(value)
    }

    /// Store a word, then notify the observer.
    pub fn write(&mut self, address: usize, value: u32) -> Result<(), MemoryError> {
        if value > WORD_MAX {
            return Err(MemoryError::ValueTooLarge { address, value });
        }
        let capacity = self.words.len();
        let slot = self
            .words
            .get_mut(address)
            .ok_or(MemoryError::OutOfRange { address, capacity })?;
        *slot = value as u16;
        self.observer.on_write(address as u16, value as u16);
        Ok(())
    }

    /// Look at a word without firing the read observer.
    pub fn peek(&self, address: usize) -> Option<u16> {
        self.words.get(address).copied()
    }

    /// Zero every word without notifying the observer.
    pub fn reset(&mut self) {
        self.words.fill(0);
    }

    /// Write `program` at consecutive addresses starting at 0.
    pub fn load_program(&mut self, program: &[u16]) -> Result<(), MemoryError> {
        if program.len() > self.words.len() {
            return Err(MemoryError::OutOfRange {
                address: program.len() - 1,
                capacity: self.words.len(),
            });
        }
        for (address, &word) in program.iter().enumerate() {
            self.write(address, u32::from(word))?;
        }
        Ok(())
    }

    /// The installed observer.
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// The installed observer, mutably.
    pub fn observer_mut(&mut self) -> &mut O {
        &mut self.observer
    }
}

impl Default for Memory<NoopObserver> {
    fn default() -> Self {
        Self::unobserved()
    }
}

impl<O> std::fmt::Debug for Memory<O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero words
        let non_zero = self.words.iter().filter(|&&w| w != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_words", &non_zero)
            .field("capacity", &self.words.len())
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Address is outside the memory.
    #[error("memory address {address:#06x} out of range (capacity {capacity:#x})")]
    OutOfRange { address: usize, capacity: usize },

    /// Value does not fit in a word.
    #[error("value {value:#x} written to {address:#06x} is larger than a word")]
    ValueTooLarge { address: usize, value: u32 },
}
