// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Value-transfer / contract-call transactions and their wire format.
//!
//! Field order on the wire: nonce, gas, gas price, value, recipient presence
//! bit + 20 bytes, data (length-prefixed), then the 65-byte packed signature.

use opera_cser::{decode_from_bytes, encode_to_vec, CserError, Decode, Encode, Reader, Writer, U256};

use crate::ids::{content_hash, Address, Hash};

/// Raw `(v, r, s)` signature values as carried by a transaction.
///
/// No cryptographic meaning is attached here; validity is checked by whoever
/// recovers the sender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawSignature {
    /// Recovery id.
    pub v: u8,
    /// `r` component.
    pub r: U256,
    /// `s` component.
    pub s: U256,
}

impl RawSignature {
    /// Packed length: `r (32) || s (32) || v (1)`.
    pub const PACKED_LEN: usize = 65;

    /// Pack as `r || s || v`, each left-padded with zeros to its width.
    pub fn pack(&self) -> [u8; Self::PACKED_LEN] {
        let mut out = [0u8; Self::PACKED_LEN];
        self.r.to_big_endian(&mut out[0..32]);
        self.s.to_big_endian(&mut out[32..64]);
        out[64] = self.v;
        out
    }

    /// Inverse of [`RawSignature::pack`].
    pub fn unpack(packed: &[u8; Self::PACKED_LEN]) -> Self {
        Self {
            r: U256::from_big_endian(&packed[0..32]),
            s: U256::from_big_endian(&packed[32..64]),
            v: packed[64],
        }
    }
}

/// A signed transaction embedded in an event payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transaction {
    /// Sender nonce.
    pub nonce: u64,
    /// Gas limit.
    pub gas: u64,
    /// Price per unit of gas.
    pub gas_price: U256,
    /// Transferred value.
    pub value: U256,
    /// Recipient; `None` creates a contract.
    pub to: Option<Address>,
    /// Call data or init code.
    pub data: Vec<u8>,
    /// Signature values.
    pub signature: RawSignature,
}

impl Transaction {
    /// `true` when the transaction has no recipient.
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }

    /// Content hash of the framed encoding.
    pub fn hash(&self) -> Result<Hash, CserError> {
        Ok(content_hash(&self.to_bytes()?))
    }

    /// Framed canonical encoding.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CserError> {
        encode_to_vec(self)
    }

    /// Decode from a framed buffer.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, CserError> {
        decode_from_bytes(raw)
    }
}

impl Encode for Transaction {
    type Error = CserError;

    fn encode(&self, w: &mut Writer) -> Result<(), CserError> {
        w.write_u64(self.nonce);
        w.write_u64(self.gas);
        w.write_big_int(&self.gas_price)?;
        w.write_big_int(&self.value)?;
        w.write_bool(self.to.is_some());
        if let Some(to) = &self.to {
            w.write_fixed_bytes(to.as_bytes());
        }
        w.write_slice_bytes(&self.data)?;
        w.write_fixed_bytes(&self.signature.pack());
        Ok(())
    }
}

impl Decode for Transaction {
    type Error = CserError;

    fn decode(r: &mut Reader<'_>) -> Result<Self, CserError> {
        let nonce = r.read_u64()?;
        let gas = r.read_u64()?;
        let gas_price = r.read_big_int()?;
        let value = r.read_big_int()?;
        let to = if r.read_bool()? {
            Some(Address(r.read_array()?))
        } else {
            None
        };
        let data = r.read_slice_bytes()?;
        let signature = RawSignature::unpack(&r.read_array()?);
        Ok(Self {
            nonce,
            gas,
            gas_price,
            value,
            to,
            data,
            signature,
        })
    }
}
