// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Packed bit channel.
//!
//! Bits are appended least-significant first: the first bit written lands in
//! bit 0 of byte 0, the ninth in bit 0 of byte 1. A multi-bit value is split
//! the same way, low bits first, so a value may straddle a byte boundary.
//! The region always occupies `ceil(bits_written / 8)` bytes and unused high
//! bits of the final byte are zero.

use crate::CserError;

/// Append-only bit sink.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit_offset: u32,
}

impl BitWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            bit_offset: 0,
        }
    }

    /// Append the low `bits` bits of `value`. Higher bits of `value` are ignored.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(&mut self, bits: u32, value: u64) {
        debug_assert!(bits <= 64);
        let mut left = bits;
        let mut value = value;
        while left > 0 {
            if self.bit_offset == 0 {
                self.bytes.push(0);
            }
            let chunk = left.min(8 - self.bit_offset);
            let mask = (1u64 << chunk) - 1;
            if let Some(last) = self.bytes.last_mut() {
                *last |= ((value & mask) as u8) << self.bit_offset;
            }
            self.bit_offset = (self.bit_offset + chunk) % 8;
            left -= chunk;
            value >>= chunk;
        }
    }

    /// Number of bytes the region currently occupies.
    pub fn len_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Packed bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the writer and return the packed bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over a packed bit region.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    byte_offset: usize,
    bit_offset: u32,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the first bit of `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    /// Read `bits` bits (at most 64) and return them as the low bits of a `u64`.
    ///
    /// Fails with [`CserError::MalformedEncoding`] when fewer than `bits` bits remain;
    /// the cursor does not move in that case.
    pub fn read(&mut self, bits: u32) -> Result<u64, CserError> {
        if bits > 64 || bits as usize > self.non_read_bits() {
            return Err(CserError::MalformedEncoding);
        }
        let mut value = 0u64;
        let mut filled = 0u32;
        while filled < bits {
            let byte = self
                .bytes
                .get(self.byte_offset)
                .copied()
                .ok_or(CserError::MalformedEncoding)?;
            let chunk = (bits - filled).min(8 - self.bit_offset);
            let mask = (1u64 << chunk) - 1;
            value |= ((u64::from(byte) >> self.bit_offset) & mask) << filled;
            filled += chunk;
            self.bit_offset += chunk;
            if self.bit_offset == 8 {
                self.bit_offset = 0;
                self.byte_offset += 1;
            }
        }
        Ok(value)
    }

    /// Bytes not yet fully consumed, counting a partially read byte.
    pub fn non_read_bytes(&self) -> usize {
        self.bytes.len() - self.byte_offset
    }

    /// Bits not yet consumed.
    pub fn non_read_bits(&self) -> usize {
        self.non_read_bytes() * 8 - self.bit_offset as usize
    }
}
