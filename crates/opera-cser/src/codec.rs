// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical primitive encoders over the bit/byte region pair.
//!
//! Compact unsigned integers are written as `size` little-endian bytes into the
//! byte region, where `size` is the smallest count `>= min_size` that holds the
//! value, and `size - min_size` goes into a `bits_for_size`-wide selector in the
//! bit region. A decoded `size > min_size` whose top byte is zero is rejected.

use primitive_types::U256;

use crate::bits::{BitReader, BitWriter};
use crate::CserError;

/// Largest value `write_u64_from_zero` can describe: seven bytes, three selector bits.
const MAX_FROM_ZERO: u64 = (1 << 56) - 1;

/// Width of a [`U256`] in bytes.
const U256_BYTES: usize = 32;

/// Writer for one encode pass: a bit region and a byte region.
#[derive(Debug, Default)]
pub struct Writer {
    pub(crate) bits: BitWriter,
    pub(crate) bytes: Vec<u8>,
}

impl Writer {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bits: BitWriter::with_capacity(32),
            bytes: Vec::with_capacity(200),
        }
    }

    /// Bit region written so far.
    pub fn bits(&self) -> &BitWriter {
        &self.bits
    }

    /// Byte region written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_compact(&mut self, min_size: u32, bits_for_size: u32, value: u64) {
        let mut size = 0u32;
        let mut rest = value;
        while size < min_size || rest != 0 {
            self.bytes.push(rest as u8);
            size += 1;
            rest >>= 8;
        }
        self.bits.write(bits_for_size, u64::from(size - min_size));
    }

    /// Single flag bit.
    pub fn write_bool(&mut self, value: bool) {
        self.bits.write(1, u64::from(value));
    }

    /// Raw byte, no selector.
    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// 1..=2 bytes, 1 selector bit.
    pub fn write_u16(&mut self, value: u16) {
        self.write_compact(1, 1, u64::from(value));
    }

    /// 1..=4 bytes, 2 selector bits.
    pub fn write_u32(&mut self, value: u32) {
        self.write_compact(1, 2, u64::from(value));
    }

    /// 1..=8 bytes, 3 selector bits.
    pub fn write_u64(&mut self, value: u64) {
        self.write_compact(1, 3, value);
    }

    /// 0..=7 bytes, 3 selector bits; zero occupies no bytes at all.
    ///
    /// Used for lengths and counts. Values above `2^56 - 1` cannot be described
    /// and fail with [`CserError::TooBigEncoding`].
    pub fn write_u64_from_zero(&mut self, value: u64) -> Result<(), CserError> {
        if value > MAX_FROM_ZERO {
            return Err(CserError::TooBigEncoding);
        }
        self.write_compact(0, 3, value);
        Ok(())
    }

    /// Sign bit followed by the magnitude as [`Writer::write_u64`].
    pub fn write_i64(&mut self, value: i64) {
        self.write_bool(value < 0);
        self.write_u64(value.unsigned_abs());
    }

    /// Raw bytes, no length.
    pub fn write_fixed_bytes(&mut self, value: &[u8]) {
        self.bytes.extend_from_slice(value);
    }

    /// Length (as [`Writer::write_u64_from_zero`]) followed by the raw bytes.
    pub fn write_slice_bytes(&mut self, value: &[u8]) -> Result<(), CserError> {
        let len = u64::try_from(value.len()).map_err(|_| CserError::TooBigEncoding)?;
        self.write_u64_from_zero(len)?;
        self.write_fixed_bytes(value);
        Ok(())
    }

    /// Minimal big-endian bytes of `value` as a length-prefixed block; zero is empty.
    pub fn write_big_int(&mut self, value: &U256) -> Result<(), CserError> {
        let mut buf = [0u8; U256_BYTES];
        value.to_big_endian(&mut buf);
        let start = buf.iter().position(|b| *b != 0).unwrap_or(U256_BYTES);
        self.write_slice_bytes(&buf[start..])
    }
}

/// Reader for one decode pass over a bit region and a byte region.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bits: BitReader<'a>,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over an already split region pair.
    #[must_use]
    pub fn new(bits: &'a [u8], bytes: &'a [u8]) -> Self {
        Self {
            bits: BitReader::new(bits),
            bytes,
            offset: 0,
        }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CserError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(CserError::MalformedEncoding)?;
        let out = self
            .bytes
            .get(self.offset..end)
            .ok_or(CserError::MalformedEncoding)?;
        self.offset = end;
        Ok(out)
    }

    fn read_compact(&mut self, min_size: usize, bits_for_size: u32) -> Result<u64, CserError> {
        let extra = self.bits.read(bits_for_size)?;
        let extra = usize::try_from(extra).map_err(|_| CserError::MalformedEncoding)?;
        let size = min_size + extra;
        let buf = self.take(size)?;
        let mut value = 0u64;
        for (i, b) in buf.iter().enumerate() {
            value |= u64::from(*b) << (8 * i);
        }
        if size > min_size && buf.last() == Some(&0) {
            return Err(CserError::NonCanonicalEncoding);
        }
        Ok(value)
    }

    /// Single flag bit.
    pub fn read_bool(&mut self) -> Result<bool, CserError> {
        Ok(self.bits.read(1)? != 0)
    }

    /// Raw byte.
    pub fn read_u8(&mut self) -> Result<u8, CserError> {
        let chunk = self.take(1)?;
        Ok(chunk[0])
    }

    /// Counterpart of [`Writer::write_u16`].
    pub fn read_u16(&mut self) -> Result<u16, CserError> {
        let value = self.read_compact(1, 1)?;
        u16::try_from(value).map_err(|_| CserError::MalformedEncoding)
    }

    /// Counterpart of [`Writer::write_u32`].
    pub fn read_u32(&mut self) -> Result<u32, CserError> {
        let value = self.read_compact(1, 2)?;
        u32::try_from(value).map_err(|_| CserError::MalformedEncoding)
    }

    /// Counterpart of [`Writer::write_u64`].
    pub fn read_u64(&mut self) -> Result<u64, CserError> {
        self.read_compact(1, 3)
    }

    /// Counterpart of [`Writer::write_u64_from_zero`].
    pub fn read_u64_from_zero(&mut self) -> Result<u64, CserError> {
        self.read_compact(0, 3)
    }

    /// Counterpart of [`Writer::write_i64`].
    ///
    /// `-0` and magnitudes outside the `i64` range are non-canonical: each would
    /// give a second spelling of a value that already has one.
    pub fn read_i64(&mut self) -> Result<i64, CserError> {
        let negative = self.read_bool()?;
        let magnitude = self.read_u64()?;
        if negative {
            if magnitude == 0 {
                return Err(CserError::NonCanonicalEncoding);
            }
            0i64
                .checked_sub_unsigned(magnitude)
                .ok_or(CserError::NonCanonicalEncoding)
        } else {
            i64::try_from(magnitude).map_err(|_| CserError::NonCanonicalEncoding)
        }
    }

    /// Fill `out` with exactly `out.len()` raw bytes.
    pub fn read_fixed_bytes(&mut self, out: &mut [u8]) -> Result<(), CserError> {
        let chunk = self.take(out.len())?;
        out.copy_from_slice(chunk);
        Ok(())
    }

    /// Read exactly `N` raw bytes into an array.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CserError> {
        let mut out = [0u8; N];
        self.read_fixed_bytes(&mut out)?;
        Ok(out)
    }

    /// Counterpart of [`Writer::write_slice_bytes`].
    pub fn read_slice_bytes(&mut self) -> Result<Vec<u8>, CserError> {
        let len = self.read_u64_from_zero()?;
        let len = usize::try_from(len).map_err(|_| CserError::MalformedEncoding)?;
        Ok(self.take(len)?.to_vec())
    }

    /// Counterpart of [`Writer::write_big_int`].
    ///
    /// A leading zero byte is non-canonical; more than 32 bytes cannot be a [`U256`].
    pub fn read_big_int(&mut self) -> Result<U256, CserError> {
        let buf = self.read_slice_bytes()?;
        match buf.first() {
            None => Ok(U256::zero()),
            Some(0) => Err(CserError::NonCanonicalEncoding),
            Some(_) if buf.len() > U256_BYTES => Err(CserError::MalformedEncoding),
            Some(_) => Ok(U256::from_big_endian(&buf)),
        }
    }

    /// Verify that the whole input was consumed.
    ///
    /// Only the zero padding of the final bit-region byte may remain; any set
    /// padding bit, any whole unread bit-region byte, or any unread byte-region
    /// byte is [`CserError::NonCanonicalEncoding`].
    pub fn check_consumed(&mut self) -> Result<(), CserError> {
        let tail_bits = self.bits.non_read_bits();
        if tail_bits >= 8 {
            return Err(CserError::NonCanonicalEncoding);
        }
        #[allow(clippy::cast_possible_truncation)]
        let tail = self.bits.read(tail_bits as u32)?;
        if tail != 0 {
            return Err(CserError::NonCanonicalEncoding);
        }
        if self.offset != self.bytes.len() {
            return Err(CserError::NonCanonicalEncoding);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reader_for(writer: &Writer) -> Reader<'_> {
        Reader::new(writer.bits.as_bytes(), &writer.bytes)
    }

    #[test]
    fn compact_u64_boundaries() {
        let mut w = Writer::new();
        w.write_u64(0);
        assert_eq!(w.bytes(), &[0x00]);
        assert_eq!(w.bits().as_bytes(), &[0b000]);

        let mut w = Writer::new();
        w.write_u64(256);
        assert_eq!(w.bytes(), &[0x00, 0x01]);
        assert_eq!(w.bits().as_bytes(), &[0b001]);

        let mut w = Writer::new();
        w.write_u64(u64::MAX);
        assert_eq!(w.bytes(), &[0xff; 8]);
        assert_eq!(w.bits().as_bytes(), &[0b111]);
    }

    #[test]
    fn from_zero_writes_nothing_for_zero() {
        let mut w = Writer::new();
        w.write_u64_from_zero(0).unwrap();
        assert!(w.bytes().is_empty());
        assert_eq!(w.bits().len_bytes(), 1);
        assert_eq!(reader_for(&w).read_u64_from_zero().unwrap(), 0);
    }

    #[test]
    fn from_zero_rejects_single_zero_byte() {
        // selector 1, payload 0x00: zero must be encoded with no bytes
        let mut r = Reader::new(&[0b001], &[0x00]);
        assert_eq!(
            r.read_u64_from_zero(),
            Err(CserError::NonCanonicalEncoding)
        );
    }

    #[test]
    fn from_zero_caps_at_seven_bytes() {
        let mut w = Writer::new();
        assert!(w.write_u64_from_zero(MAX_FROM_ZERO).is_ok());
        assert_eq!(w.bytes().len(), 7);
        assert_eq!(
            w.write_u64_from_zero(MAX_FROM_ZERO + 1),
            Err(CserError::TooBigEncoding)
        );
    }

    #[test]
    fn redundant_top_byte_is_rejected() {
        let mut r = Reader::new(&[0b001], &[0x00, 0x00]);
        assert_eq!(r.read_u64(), Err(CserError::NonCanonicalEncoding));

        let mut r = Reader::new(&[0b01], &[0x05, 0x00]);
        assert_eq!(r.read_u32(), Err(CserError::NonCanonicalEncoding));

        let mut r = Reader::new(&[0b1], &[0x05, 0x00]);
        assert_eq!(r.read_u16(), Err(CserError::NonCanonicalEncoding));
    }

    #[test]
    fn integer_widths_round_trip() {
        let mut w = Writer::new();
        w.write_u8(0xfe);
        w.write_u16(0x1234);
        w.write_u32(u32::MAX);
        w.write_u32(0);
        w.write_u64(1 << 40);
        w.write_i64(i64::MIN);
        w.write_i64(i64::MAX);
        w.write_i64(-1);
        w.write_i64(0);

        let mut r = reader_for(&w);
        assert_eq!(r.read_u8().unwrap(), 0xfe);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), u32::MAX);
        assert_eq!(r.read_u32().unwrap(), 0);
        assert_eq!(r.read_u64().unwrap(), 1 << 40);
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert_eq!(r.read_i64().unwrap(), i64::MAX);
        assert_eq!(r.read_i64().unwrap(), -1);
        assert_eq!(r.read_i64().unwrap(), 0);
        r.check_consumed().unwrap();
    }

    #[test]
    fn negative_zero_is_rejected() {
        // sign bit set, selector 0, magnitude byte 0x00
        let mut r = Reader::new(&[0b0001], &[0x00]);
        assert_eq!(r.read_i64(), Err(CserError::NonCanonicalEncoding));
    }

    #[test]
    fn signed_magnitude_out_of_range_is_rejected() {
        let mut w = Writer::new();
        w.write_bool(false);
        w.write_u64(1 << 63);
        assert_eq!(
            reader_for(&w).read_i64(),
            Err(CserError::NonCanonicalEncoding)
        );

        let mut w = Writer::new();
        w.write_bool(true);
        w.write_u64((1 << 63) + 1);
        assert_eq!(
            reader_for(&w).read_i64(),
            Err(CserError::NonCanonicalEncoding)
        );
    }

    #[test]
    fn slices_and_fixed_blocks() {
        let mut w = Writer::new();
        w.write_slice_bytes(b"").unwrap();
        w.write_slice_bytes(b"payload").unwrap();
        w.write_fixed_bytes(&[9, 8, 7]);

        let mut r = reader_for(&w);
        assert!(r.read_slice_bytes().unwrap().is_empty());
        assert_eq!(r.read_slice_bytes().unwrap(), b"payload");
        assert_eq!(r.read_array::<3>().unwrap(), [9, 8, 7]);
        r.check_consumed().unwrap();
    }

    #[test]
    fn short_byte_region_is_malformed() {
        let mut r = Reader::new(&[], &[1, 2]);
        let mut out = [0u8; 3];
        assert_eq!(
            r.read_fixed_bytes(&mut out),
            Err(CserError::MalformedEncoding)
        );
        assert_eq!(r.read_bool(), Err(CserError::MalformedEncoding));

        // selector claims 3 bytes, only 2 present
        let mut r = Reader::new(&[0b010], &[1, 2]);
        assert_eq!(r.read_u64(), Err(CserError::MalformedEncoding));
    }

    #[test]
    fn big_int_is_minimal_big_endian() {
        let mut w = Writer::new();
        w.write_big_int(&U256::zero()).unwrap();
        w.write_big_int(&U256::from(0x0102u64)).unwrap();
        w.write_big_int(&U256::MAX).unwrap();
        // len 0, then len 2 + [01 02], then len 32 + 32 x ff
        assert_eq!(&w.bytes()[..3], &[0x02, 0x01, 0x02]);
        assert_eq!(w.bytes().len(), 3 + 1 + 32);

        let mut r = reader_for(&w);
        assert_eq!(r.read_big_int().unwrap(), U256::zero());
        assert_eq!(r.read_big_int().unwrap(), U256::from(0x0102u64));
        assert_eq!(r.read_big_int().unwrap(), U256::MAX);
        r.check_consumed().unwrap();
    }

    #[test]
    fn big_int_with_leading_zero_is_rejected() {
        let mut w = Writer::new();
        w.write_slice_bytes(&[0x00, 0x01]).unwrap();
        assert_eq!(
            reader_for(&w).read_big_int(),
            Err(CserError::NonCanonicalEncoding)
        );
    }

    #[test]
    fn big_int_wider_than_256_bits_is_malformed() {
        let mut w = Writer::new();
        w.write_slice_bytes(&[0x01; 33]).unwrap();
        assert_eq!(
            reader_for(&w).read_big_int(),
            Err(CserError::MalformedEncoding)
        );
    }

    #[test]
    fn check_consumed_rules() {
        // one flag bit, padding clear
        let mut r = Reader::new(&[0b1], &[]);
        assert!(r.read_bool().unwrap());
        r.check_consumed().unwrap();

        // padding bit set
        let mut r = Reader::new(&[0b11], &[]);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.check_consumed(), Err(CserError::NonCanonicalEncoding));

        // a whole zero byte left in the bit region
        let mut r = Reader::new(&[0b1, 0x00], &[]);
        assert!(r.read_bool().unwrap());
        assert_eq!(r.check_consumed(), Err(CserError::NonCanonicalEncoding));

        // unread byte-region byte
        let mut r = Reader::new(&[], &[0x00]);
        assert_eq!(r.check_consumed(), Err(CserError::NonCanonicalEncoding));
    }
}
