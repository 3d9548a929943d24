//! Program listings and disassembly.
//!
//! This module provides:
//! - A hex listing loader (text → program words)
//! - A disassembler (program words → readable text)

pub mod disasm;
pub mod listing;

pub use disasm::{disassemble, disassemble_instruction};
pub use listing::{format_listing, load_listing, parse_listing, Listing, ListingError};
