// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `checksum` module implements the CRC32 variant used to verify Ogg
//! page integrity: polynomial `0x04C11DB7`, MSB-first, no input or output
//! reflection, init and xor-out both zero.

const POLY: u32 = 0x04c1_1db7;

fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];

    let mut i = 0;
    while i < 256 {
        let mut c = (i as u32) << 24;

        let mut bit = 0;
        while bit < 8 {
            c = if c & 0x8000_0000 != 0 { (c << 1) ^ POLY } else { c << 1 };
            bit += 1;
        }

        table[i] = c;
        i += 1;
    }

    table
}

/// A running CRC32 accumulator using the Ogg page checksum variant.
///
/// Unlike the more common reflected CRC32 (used by zip/png/ethernet), this
/// variant processes each byte into the top of the register:
/// `c = (c << 8 ^ byte) ^ table[c >> 24]`.
pub struct Crc32 {
    table: [u32; 256],
    crc: u32,
}

impl Crc32 {
    /// Creates a new CRC32 accumulator seeded with `init`.
    pub fn new(init: u32) -> Crc32 {
        Crc32 { table: build_table(), crc: init }
    }

    /// Feeds a single byte into the accumulator.
    pub fn process_byte(&mut self, byte: u8) {
        let idx = ((self.crc >> 24) ^ u32::from(byte)) & 0xff;
        self.crc = (self.crc << 8) ^ self.table[idx as usize];
    }

    /// Feeds a buffer of bytes into the accumulator.
    pub fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }

    /// Returns the current checksum value.
    pub fn crc(&self) -> u32 {
        self.crc
    }
}

/// A `Monitor` observes bytes as they pass through a stream without
/// altering them, typically to accumulate a checksum.
pub trait Monitor {
    fn process_byte(&mut self, byte: u8);

    fn process_buf_bytes(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.process_byte(byte);
        }
    }
}

impl Monitor for Crc32 {
    fn process_byte(&mut self, byte: u8) {
        Crc32::process_byte(self, byte);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The non-reflected CRC32 of the reference ASCII string "123456789".
    /// This is the Ogg/Vorbis variant, distinct from the common reflected
    /// CRC-32/ISO-HDLC whose check value for the same string is
    /// `0xCBF43926`.
    #[test]
    fn verify_check_value() {
        let mut crc = Crc32::new(0);
        crc.process_buf_bytes(b"123456789");
        assert_eq!(crc.crc(), 0x89a1897f);
    }

    #[test]
    fn verify_empty_input_is_zero() {
        let crc = Crc32::new(0);
        assert_eq!(crc.crc(), 0);
    }

    #[test]
    fn verify_incremental_matches_bulk() {
        let data = b"an ogg page header goes here, zeroed checksum field included";

        let mut bulk = Crc32::new(0);
        bulk.process_buf_bytes(data);

        let mut incremental = Crc32::new(0);
        for &b in data {
            incremental.process_byte(b);
        }

        assert_eq!(bulk.crc(), incremental.crc());
    }
}
