//! Keyboard ring buffer.
//!
//! Key codes land in 16 slots at 0x9000-0x900F, written round-robin.
//! Guest programs poll the slots; the keyboard never reads them back.

/// First keyboard slot.
pub const KEYBOARD_START: u16 = 0x9000;
/// Number of slots in the ring.
pub const KEYBOARD_SLOTS: u16 = 16;

/// Write cursor for the keyboard ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Keyboard {
    index: u16,
}

impl Keyboard {
    /// Create a keyboard positioned at the first slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Address the next key press goes to.
    pub fn slot(&self) -> u16 {
        KEYBOARD_START + self.index
    }

    /// Claim the current slot and move the cursor, wrapping after 16.
    pub fn advance(&mut self) -> u16 {
        let slot = self.slot();
        self.index = (self.index + 1) % KEYBOARD_SLOTS;
        slot
    }

    /// Go back to the first slot.
    pub fn reset(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_wraps_after_sixteen() {
        let mut kb = Keyboard::new();
        let slots: Vec<u16> = (0..17).map(|_| kb.advance()).collect();
        assert_eq!(slots[0], 0x9000);
        assert_eq!(slots[15], 0x900F);
        assert_eq!(slots[16], 0x9000);
    }

    #[test]
    fn test_reset() {
        let mut kb = Keyboard::new();
        kb.advance();
        kb.advance();
        kb.reset();
        assert_eq!(kb.slot(), KEYBOARD_START);
    }
}
