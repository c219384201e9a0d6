// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Fixed-width identifiers: hashes, event ids, addresses and event signatures.

use std::fmt;

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

/// 32-byte hash.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// All-zero hash. A valid value, not a sentinel.
    pub const ZERO: Self = Self([0u8; 32]);

    /// View the hash as a byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.0)
    }
}

/// BLAKE3 hash of `bytes`, no domain prefix.
pub fn content_hash(bytes: &[u8]) -> Hash {
    Hash(*blake3::hash(bytes).as_bytes())
}

/// Identifier of a DAG event.
///
/// Layout: `epoch (u32 BE) || lamport (u32 BE) || suffix (24 bytes)`. The
/// prefix makes ids sort by epoch then lamport; the suffix is the tail of the
/// event's content hash. Encoders only ever see the three parts through
/// [`EventId::epoch`], [`EventId::lamport`] and [`EventId::suffix`].
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct EventId(pub [u8; 32]);

impl EventId {
    /// Length of the opaque part that follows the epoch/lamport prefix.
    pub const SUFFIX_LEN: usize = 24;

    /// Assemble an id from its parts.
    pub fn from_parts(epoch: u32, lamport: u32, suffix: &[u8; Self::SUFFIX_LEN]) -> Self {
        let mut out = [0u8; 32];
        out[0..4].copy_from_slice(&epoch.to_be_bytes());
        out[4..8].copy_from_slice(&lamport.to_be_bytes());
        out[8..].copy_from_slice(suffix);
        Self(out)
    }

    /// Derive the id of an event from its content hash.
    pub fn from_hash(epoch: u32, lamport: u32, hash: &Hash) -> Self {
        let mut suffix = [0u8; Self::SUFFIX_LEN];
        suffix.copy_from_slice(&hash.0[8..]);
        Self::from_parts(epoch, lamport, &suffix)
    }

    /// Epoch the event belongs to.
    pub fn epoch(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[0..4]);
        u32::from_be_bytes(raw)
    }

    /// Lamport time of the event.
    pub fn lamport(&self) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.0[4..8]);
        u32::from_be_bytes(raw)
    }

    /// Opaque tail of the id.
    pub fn suffix(&self) -> [u8; Self::SUFFIX_LEN] {
        let mut out = [0u8; Self::SUFFIX_LEN];
        out.copy_from_slice(&self.0[8..]);
        out
    }

    /// View the id as a byte array.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.epoch(), self.lamport())?;
        write_hex(f, &self.0[8..14])
    }
}

/// 20-byte account address.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// View the address as a byte array.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("0x")?;
        write_hex(f, &self.0)
    }
}

/// Creator's 65-byte signature over an event, carried opaquely.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Signature(pub [u8; 65]);

impl Signature {
    /// View the signature as a byte array.
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 65])
    }
}
