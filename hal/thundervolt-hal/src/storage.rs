//! Byte-addressed persistent storage
//!
//! Abstracts the small EEPROM the board keeps its register defaults in.
//! Offsets are one byte wide; the store is at most 256 bytes.

/// Byte-addressed non-volatile store
///
/// Writes are expected to be durable when `persist` returns. Multi-byte
/// values are stored little-endian.
pub trait ByteStore {
    /// Read the byte at `offset`
    fn load(&mut self, offset: u8) -> u8;

    /// Write `value` at `offset`
    fn persist(&mut self, offset: u8, value: u8);

    /// Read a little-endian word starting at `offset`
    fn load_word_le(&mut self, offset: u8) -> u16 {
        let lo = self.load(offset);
        let hi = self.load(offset.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Write a little-endian word starting at `offset`
    fn persist_word_le(&mut self, offset: u8, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.persist(offset, lo);
        self.persist(offset.wrapping_add(1), hi);
    }
}

impl ByteStore for [u8; 256] {
    fn load(&mut self, offset: u8) -> u8 {
        self[offset as usize]
    }

    fn persist(&mut self, offset: u8, value: u8) {
        self[offset as usize] = value;
    }
}
