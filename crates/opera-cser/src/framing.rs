// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Framing of the region pair into one buffer.
//!
//! Layout: `byte region || bit region || len(bit region)` where the trailing
//! length is a single byte and never exceeds [`MAX_BITS_BYTES`].

use tracing::trace;

use crate::{CserError, Reader, Writer};

/// Maximum size of the bit region in bytes (1024 bits).
pub const MAX_BITS_BYTES: usize = 128;

/// Run `encode` against a fresh writer and frame the result.
///
/// Fails with [`CserError::TooBigEncoding`] when the bit region grows beyond
/// [`MAX_BITS_BYTES`]; errors from `encode` are returned unchanged.
pub fn marshal<E, F>(encode: F) -> Result<Vec<u8>, E>
where
    F: FnOnce(&mut Writer) -> Result<(), E>,
    E: From<CserError>,
{
    let mut writer = Writer::new();
    encode(&mut writer)?;
    let Writer { bits, mut bytes } = writer;
    let bits_len = bits.len_bytes();
    if bits_len > MAX_BITS_BYTES {
        trace!(bits_len, "bit region over cap");
        return Err(CserError::TooBigEncoding.into());
    }
    #[allow(clippy::cast_possible_truncation)]
    let len_byte = bits_len as u8;
    bytes.extend_from_slice(bits.as_bytes());
    bytes.push(len_byte);
    Ok(bytes)
}

/// Split a framed buffer into `(bit region, byte region)`.
///
/// An empty buffer, a length byte larger than the rest of the buffer, or a
/// length byte above [`MAX_BITS_BYTES`] is [`CserError::MalformedEncoding`].
pub fn split(raw: &[u8]) -> Result<(&[u8], &[u8]), CserError> {
    let (&bits_len, body) = raw.split_last().ok_or(CserError::MalformedEncoding)?;
    let bits_len = usize::from(bits_len);
    if bits_len > MAX_BITS_BYTES || bits_len > body.len() {
        return Err(CserError::MalformedEncoding);
    }
    let (bytes, bits) = body.split_at(body.len() - bits_len);
    Ok((bits, bytes))
}

/// Run `decode` over the regions of `raw`, then require that it consumed them
/// exactly (see [`Reader::check_consumed`]).
pub fn unmarshal<T, E, F>(raw: &[u8], decode: F) -> Result<T, E>
where
    F: FnOnce(&mut Reader<'_>) -> Result<T, E>,
    E: From<CserError>,
{
    let (bits, bytes) = split(raw)?;
    let mut reader = Reader::new(bits, bytes);
    let value = decode(&mut reader)?;
    reader.check_consumed()?;
    Ok(value)
}
