// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Compact canonical binary serialization (CSER).
//!
//! A value is encoded into two regions at once:
//!
//! - the **bit region** carries booleans and the size selectors of compact
//!   integers, packed least-significant bit first;
//! - the **byte region** carries integer payload bytes, fixed-width blocks and
//!   length-prefixed blocks.
//!
//! [`marshal`] frames the pair as `bytes || bits || len(bits)`; [`unmarshal`]
//! splits it back and, after the caller's decoder has run, checks that the
//! input was consumed exactly. Together with the per-primitive checks in
//! [`Reader`] this gives every value a single accepted byte sequence, which is
//! what lets peers hash and sign encodings without agreeing on anything but
//! the values themselves.

pub mod bits;
mod codec;
mod framing;

pub use codec::{Reader, Writer};
pub use framing::{marshal, split, unmarshal, MAX_BITS_BYTES};
pub use primitive_types::U256;

use thiserror::Error;

/// Errors produced while encoding or decoding CSER buffers.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum CserError {
    /// Input ended early or is structurally inconsistent.
    #[error("malformed encoding")]
    MalformedEncoding,
    /// Input decodes, but is not the unique canonical form of the value.
    #[error("non canonical encoding")]
    NonCanonicalEncoding,
    /// Bit region exceeds [`MAX_BITS_BYTES`], or a length exceeds what the
    /// format can describe.
    #[error("too big encoding")]
    TooBigEncoding,
}

/// Types that write themselves into a CSER [`Writer`].
pub trait Encode {
    /// Error produced by [`Encode::encode`]; must absorb codec errors.
    type Error: From<CserError>;

    /// Append `self` to both regions of `writer`.
    fn encode(&self, writer: &mut Writer) -> Result<(), Self::Error>;
}

/// Types that read themselves from a CSER [`Reader`].
pub trait Decode: Sized {
    /// Error produced by [`Decode::decode`]; must absorb codec errors.
    type Error: From<CserError>;

    /// Consume one value from the front of both regions of `reader`.
    fn decode(reader: &mut Reader<'_>) -> Result<Self, Self::Error>;
}

/// Encode a value into a fresh framed buffer.
pub fn encode_to_vec<T: Encode + ?Sized>(value: &T) -> Result<Vec<u8>, T::Error> {
    marshal(|writer| value.encode(writer))
}

/// Decode a value from a framed buffer, rejecting anything but its canonical form.
pub fn decode_from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, T::Error> {
    unmarshal(bytes, T::decode)
}
