// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CSER wire format of event headers and payloads.
//!
//! Header field order:
//!
//! | field                         | encoding                         |
//! |-------------------------------|----------------------------------|
//! | epoch, lamport, creator, seq, frame | `u32` each                 |
//! | is_root                       | bit                              |
//! | creation_time                 | `u64`                            |
//! | creation_time - median_time   | `i64` (two's complement wrap)    |
//! | gas_power_used, left[0], left[1] | `u64` each                    |
//! | parent count                  | `u32`                            |
//! | per parent                    | `u32` lamport delta + 24 bytes   |
//! | prev_epoch_hash               | bit + 32 bytes when set          |
//! | tx_hash                       | bit + 32 bytes when not empty    |
//! | extra                         | length-prefixed bytes            |
//!
//! Parents must share the event's epoch and have a lamport time no greater
//! than the event's; anything else is [`InterError::MalformedEvent`].
//!
//! A payload appends the 65-byte signature and, when the header's tx hash is
//! not empty, a transaction count followed by the inline transactions.

use opera_cser::{CserError, Decode, Encode, Reader, Writer};

use crate::event::{GasPowerLeft, MutableEvent, MutableEventPayload, EMPTY_TX_HASH};
use crate::ids::{EventId, Hash, Signature};
use crate::transaction::Transaction;
use crate::InterError;

impl Encode for MutableEvent {
    type Error = InterError;

    #[allow(clippy::cast_possible_wrap)]
    fn encode(&self, w: &mut Writer) -> Result<(), InterError> {
        w.write_u32(self.epoch);
        w.write_u32(self.lamport);
        w.write_u32(self.creator);
        w.write_u32(self.seq);
        w.write_u32(self.frame);
        w.write_bool(self.is_root);
        w.write_u64(self.creation_time);
        w.write_i64(self.creation_time.wrapping_sub(self.median_time) as i64);

        w.write_u64(self.gas_power_used);
        w.write_u64(self.gas_power_left.gas[0]);
        w.write_u64(self.gas_power_left.gas[1]);

        let count = u32::try_from(self.parents.len()).map_err(|_| CserError::TooBigEncoding)?;
        w.write_u32(count);
        for parent in &self.parents {
            if parent.epoch() != self.epoch {
                return Err(InterError::MalformedEvent);
            }
            let delta = self
                .lamport
                .checked_sub(parent.lamport())
                .ok_or(InterError::MalformedEvent)?;
            w.write_u32(delta);
            w.write_fixed_bytes(&parent.suffix());
        }

        w.write_bool(self.prev_epoch_hash.is_some());
        if let Some(hash) = &self.prev_epoch_hash {
            w.write_fixed_bytes(hash.as_bytes());
        }

        w.write_bool(!self.no_txs());
        if !self.no_txs() {
            w.write_fixed_bytes(self.tx_hash.as_bytes());
        }

        w.write_slice_bytes(&self.extra)?;
        Ok(())
    }
}

impl Decode for MutableEvent {
    type Error = InterError;

    #[allow(clippy::cast_sign_loss)]
    fn decode(r: &mut Reader<'_>) -> Result<Self, InterError> {
        let epoch = r.read_u32()?;
        let lamport = r.read_u32()?;
        let creator = r.read_u32()?;
        let seq = r.read_u32()?;
        let frame = r.read_u32()?;
        let is_root = r.read_bool()?;
        let creation_time = r.read_u64()?;
        let median_delta = r.read_i64()?;

        let gas_power_used = r.read_u64()?;
        let gas_power_left = GasPowerLeft {
            gas: [r.read_u64()?, r.read_u64()?],
        };

        let count = r.read_u32()?;
        let mut parents = Vec::new();
        for _ in 0..count {
            let delta = r.read_u32()?;
            let suffix = r.read_array::<{ EventId::SUFFIX_LEN }>()?;
            let parent_lamport = lamport
                .checked_sub(delta)
                .ok_or(CserError::MalformedEncoding)?;
            parents.push(EventId::from_parts(epoch, parent_lamport, &suffix));
        }

        let prev_epoch_hash = if r.read_bool()? {
            Some(Hash(r.read_array()?))
        } else {
            None
        };

        let tx_hash = if r.read_bool()? {
            let hash = Hash(r.read_array()?);
            if hash == EMPTY_TX_HASH {
                return Err(CserError::NonCanonicalEncoding.into());
            }
            hash
        } else {
            EMPTY_TX_HASH
        };

        let extra = r.read_slice_bytes()?;

        Ok(Self {
            epoch,
            lamport,
            creator,
            seq,
            frame,
            is_root,
            creation_time,
            median_time: creation_time.wrapping_sub(median_delta as u64),
            gas_power_used,
            gas_power_left,
            parents,
            prev_epoch_hash,
            tx_hash,
            extra,
        })
    }
}

impl Encode for MutableEventPayload {
    type Error = InterError;

    fn encode(&self, w: &mut Writer) -> Result<(), InterError> {
        if self.event.no_txs() != self.txs.is_empty() {
            return Err(InterError::MalformedEvent);
        }
        self.event.encode(w)?;
        w.write_fixed_bytes(self.sig.as_bytes());
        if !self.event.no_txs() {
            let count = u64::try_from(self.txs.len()).map_err(|_| CserError::TooBigEncoding)?;
            w.write_u64_from_zero(count)?;
            for tx in &self.txs {
                tx.encode(w)?;
            }
        }
        Ok(())
    }
}

impl Decode for MutableEventPayload {
    type Error = InterError;

    fn decode(r: &mut Reader<'_>) -> Result<Self, InterError> {
        let event = MutableEvent::decode(r)?;
        let sig = Signature(r.read_array()?);
        let mut txs = Vec::new();
        if !event.no_txs() {
            let count = r.read_u64_from_zero()?;
            if count == 0 {
                return Err(InterError::MalformedEvent);
            }
            for _ in 0..count {
                txs.push(Transaction::decode(r)?);
            }
        }
        Ok(Self { event, sig, txs })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use opera_cser::{decode_from_bytes, encode_to_vec, marshal};

    fn header() -> MutableEvent {
        MutableEvent {
            epoch: 4,
            lamport: 100,
            creator: 3,
            seq: 9,
            frame: 12,
            is_root: true,
            creation_time: 1_700_000_000_000,
            median_time: 1_699_999_999_000,
            gas_power_used: 25_000,
            gas_power_left: GasPowerLeft {
                gas: [1_000_000, 5_000_000],
            },
            parents: vec![
                EventId::from_parts(4, 99, &[0x11; 24]),
                EventId::from_parts(4, 40, &[0x22; 24]),
            ],
            prev_epoch_hash: None,
            tx_hash: EMPTY_TX_HASH,
            extra: b"x".to_vec(),
        }
    }

    #[test]
    fn parent_is_delta_plus_suffix() {
        let mut e = MutableEvent {
            lamport: 50,
            ..MutableEvent::default()
        };
        let base_len = encode_to_vec(&e).unwrap().len();
        e.parents.push(EventId::from_parts(0, 48, &[0xaa; 24]));
        let raw = encode_to_vec(&e).unwrap();
        // count stays one byte, plus one delta byte and the 24-byte suffix
        assert_eq!(raw.len(), base_len + 1 + 24);
        assert_eq!(decode_from_bytes::<MutableEvent>(&raw).unwrap(), e);
    }

    #[test]
    fn parents_reuse_event_epoch() {
        let e = header();
        let raw = encode_to_vec(&e).unwrap();
        let back: MutableEvent = decode_from_bytes(&raw).unwrap();
        assert_eq!(back.parents[0].epoch(), 4);
        assert_eq!(back.parents[1].lamport(), 40);
        assert_eq!(back, e);
    }

    #[test]
    fn parent_from_other_epoch_is_rejected() {
        let mut e = header();
        e.parents.push(EventId::from_parts(3, 1, &[0x33; 24]));
        assert_eq!(encode_to_vec(&e), Err(InterError::MalformedEvent));
    }

    #[test]
    fn median_time_after_creation_round_trips() {
        let e = MutableEvent {
            creation_time: 5,
            median_time: u64::MAX,
            ..MutableEvent::default()
        };
        let raw = encode_to_vec(&e).unwrap();
        assert_eq!(decode_from_bytes::<MutableEvent>(&raw).unwrap(), e);
    }

    #[test]
    fn delta_above_own_lamport_is_malformed() {
        // hand-write a header whose only parent claims lamport delta 11 on lamport 10
        let raw = marshal::<InterError, _>(|w| {
            for v in [0, 10, 0, 0, 0] {
                w.write_u32(v);
            }
            w.write_bool(false);
            w.write_u64(0);
            w.write_i64(0);
            for _ in 0..3 {
                w.write_u64(0);
            }
            w.write_u32(1);
            w.write_u32(11);
            w.write_fixed_bytes(&[0u8; 24]);
            w.write_bool(false);
            w.write_bool(false);
            w.write_slice_bytes(&[])?;
            Ok(())
        })
        .unwrap();
        assert_eq!(
            decode_from_bytes::<MutableEvent>(&raw),
            Err(InterError::Cser(CserError::MalformedEncoding))
        );
    }

    #[test]
    fn present_empty_tx_hash_is_non_canonical() {
        let mut e = header();
        e.tx_hash = Hash([0x77; 32]);
        let mut raw = encode_to_vec(&e).unwrap();
        // the tx hash block sits right before the one-byte extra length and 'x'
        let bits_len = usize::from(*raw.last().unwrap());
        let body_end = raw.len() - 1 - bits_len;
        let start = body_end - 2 - 32;
        raw[start..start + 32].copy_from_slice(EMPTY_TX_HASH.as_bytes());
        assert_eq!(
            decode_from_bytes::<MutableEvent>(&raw),
            Err(InterError::Cser(CserError::NonCanonicalEncoding))
        );
    }
}
