//! Machine configuration.
//!
//! Read from a JSON file; every field is optional and falls back to the
//! defaults below.
//!
//! ```json
//! { "memory_words": 65536, "batch_size": 1000, "tick_ms": 1, "hub_id": 1 }
//! ```

use crate::cpu::{Cpu, Memory, RunConfig, MEMORY_SIZE};
use crate::devices::Peripherals;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Settings for building and running a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Words of memory (at most 65536).
    pub memory_words: usize,
    /// Steps per batch in continuous mode.
    pub batch_size: u64,
    /// Milliseconds to pause between batches.
    pub tick_ms: u64,
    /// Network hub id of this machine.
    pub hub_id: u16,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            memory_words: MEMORY_SIZE,
            batch_size: 1000,
            tick_ms: 1,
            hub_id: 1,
        }
    }
}

impl MachineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json(&text)
    }

    /// Batch settings for the driver.
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            batch_size: self.batch_size.max(1),
            tick: Duration::from_millis(self.tick_ms),
        }
    }

    /// Build a machine with the standard peripherals installed.
    pub fn build(&self) -> Cpu<Peripherals> {
        Cpu::new(Memory::with_capacity(self.memory_words, Peripherals::new(self.hub_id)))
    }

    /// Layer command-line settings over this configuration.
    pub fn with_overrides(self, overrides: &ConfigOverrides) -> Self {
        Self {
            memory_words: overrides.memory_words.unwrap_or(self.memory_words),
            batch_size: overrides.batch_size.unwrap_or(self.batch_size),
            tick_ms: overrides.tick_ms.unwrap_or(self.tick_ms),
            hub_id: overrides.hub_id.unwrap_or(self.hub_id),
        }
    }
}

/// Settings given on the command line; `None` keeps the loaded value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub memory_words: Option<usize>,
    pub batch_size: Option<u64>,
    pub tick_ms: Option<u64>,
    pub hub_id: Option<u16>,
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid configuration: {0}")]
    Parse(String),
}
