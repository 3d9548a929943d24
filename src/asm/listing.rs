//! Hex listing format for programs.
//!
//! A listing is plain text with one word per line:
//! - The first token on a line is the word in hex, with or without `0x`
//! - Anything after it (a mnemonic, a `;` or `//` comment) is ignored
//! - Blank lines and lines starting with `;`, `//` or `#` are skipped
//!
//! ```text
//! 0x7c01   ; SET A, 0x30
//! 0x0030
//! 9401     // SET A, 5
//! ```

use std::path::Path;
use thiserror::Error;

/// A parsed listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    /// The program words, to be loaded from address 0.
    pub words: Vec<u16>,
    /// Original source lines (for debugging).
    pub source_lines: Vec<String>,
}

impl Listing {
    /// Create a new empty listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a word.
    pub fn push(&mut self, word: u16, source: &str) {
        self.words.push(word);
        self.source_lines.push(source.to_string());
    }

    /// Get the number of words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Parse listing text.
pub fn parse_listing(source: &str) -> Result<Listing, ListingError> {
    let mut listing = Listing::new();

    for (line_num, line) in source.lines().enumerate() {
        let trimmed = line.trim();

        // Skip empty lines and comments
        if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with("//") || trimmed.starts_with('#') {
            continue;
        }

        let token = trimmed
            .split(|c: char| c.is_whitespace() || c == ';' || c == ',')
            .next()
            .unwrap_or_default();
        let digits = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            .unwrap_or(token);

        let word = u16::from_str_radix(digits, 16).map_err(|e| ListingError::Parse {
            line: line_num + 1,
            message: format!("invalid word {token:?}: {e}"),
        })?;

        listing.push(word, trimmed);
    }

    Ok(listing)
}

/// Load a listing file from disk.
pub fn load_listing<P: AsRef<Path>>(path: P) -> Result<Listing, ListingError> {
    let source = std::fs::read_to_string(path.as_ref()).map_err(|e| ListingError::Io(e.to_string()))?;
    parse_listing(&source)
}

/// Render words back into listing text, annotated with disassembly.
pub fn format_listing(words: &[u16]) -> String {
    let mut output = String::new();
    let mut at = 0;
    while at < words.len() {
        let (text, len) = super::disasm::disassemble_instruction(words, at);
        for (offset, word) in words[at..(at + len).min(words.len())].iter().enumerate() {
            if offset == 0 {
                output.push_str(&format!("0x{word:04x}   ; {text}\n"));
            } else {
                output.push_str(&format!("0x{word:04x}\n"));
            }
        }
        at += len;
    }
    output
}

/// Errors that can occur while reading a listing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}
