//! TUI debugger.
//!
//! Provides an interactive terminal-based debugger with:
//! - Register and memory views
//! - Step/run/pause/reset controls
//! - The guest's text display
//! - Keyboard capture feeding the guest keyboard ring

mod app;
mod ui;

pub use app::{run_debugger, DebuggerApp};
