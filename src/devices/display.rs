//! Text display window.
//!
//! 12 rows of 32 columns mapped at 0x8000-0x817F, one word per cell.
//! The low byte of a cell is its character.

/// First display address.
pub const DISPLAY_START: u16 = 0x8000;
/// Rows on screen.
pub const DISPLAY_ROWS: usize = 12;
/// Columns per row.
pub const DISPLAY_COLS: usize = 32;
/// Last display address.
pub const DISPLAY_END: u16 = DISPLAY_START + (DISPLAY_ROWS * DISPLAY_COLS) as u16 - 1;

/// Mirror of the display window, kept current by memory writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    cells: Vec<u16>,
    dirty: bool,
}

impl Display {
    /// Create a blank display.
    pub fn new() -> Self {
        Self {
            cells: vec![0; DISPLAY_ROWS * DISPLAY_COLS],
            dirty: false,
        }
    }

    /// Whether `address` is inside the window.
    pub fn contains(address: u16) -> bool {
        (DISPLAY_START..=DISPLAY_END).contains(&address)
    }

    /// Row and column of a window address.
    pub fn position(address: u16) -> Option<(usize, usize)> {
        if !Self::contains(address) {
            return None;
        }
        let offset = usize::from(address - DISPLAY_START);
        Some((offset / DISPLAY_COLS, offset % DISPLAY_COLS))
    }

    /// Record a memory write. Addresses outside the window are ignored.
    pub fn on_write(&mut self, address: u16, value: u16) {
        if Self::contains(address) {
            self.cells[usize::from(address - DISPLAY_START)] = value;
            self.dirty = true;
        }
    }

    /// The word at a cell.
    pub fn cell(&self, row: usize, col: usize) -> Option<u16> {
        if row >= DISPLAY_ROWS || col >= DISPLAY_COLS {
            return None;
        }
        Some(self.cells[row * DISPLAY_COLS + col])
    }

    /// One row as text, or `None` past the last row.
    pub fn row_text(&self, row: usize) -> Option<String> {
        let start = row.checked_mul(DISPLAY_COLS)?;
        let cells = self.cells.get(start..start + DISPLAY_COLS)?;
        Some(cells.iter().map(|&cell| glyph(cell)).collect())
    }

    /// All rows, newline separated.
    pub fn text(&self) -> String {
        self.cells
            .chunks(DISPLAY_COLS)
            .map(|row| row.iter().map(|&cell| glyph(cell)).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether anything was drawn since the last [`Display::take_dirty`].
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Blank the screen.
    pub fn clear(&mut self) {
        self.cells.fill(0);
        self.dirty = true;
    }
}

impl Default for Display {
    fn default() -> Self {
        Self::new()
    }
}

/// Printable character for a cell; anything else shows as a space.
fn glyph(cell: u16) -> char {
    let ch = char::from((cell & 0xFF) as u8);
    if ch.is_ascii_graphic() {
        ch
    } else {
        ' '
    }
}
