// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! DAG event headers and payloads.
//!
//! [`MutableEvent`] / [`MutableEventPayload`] are plain field bags used while
//! assembling or decoding. Building them yields the immutable [`Event`] /
//! [`EventPayload`], which carry the event id derived from the encoded header.

use opera_cser::{decode_from_bytes, encode_to_vec, CserError};

use crate::ids::{content_hash, EventId, Hash, Signature};
use crate::transaction::Transaction;
use crate::InterError;

/// Aggregate payload hash of an event without transactions (`blake3("")`).
pub const EMPTY_TX_HASH: Hash = Hash([
    0xaf, 0x13, 0x49, 0xb9, 0xf5, 0xf9, 0xa1, 0xa6, 0xa0, 0x40, 0x4d, 0xea, 0x36, 0xdc, 0xc9, 0x49,
    0x9b, 0xcb, 0x25, 0xc9, 0xad, 0xc1, 0x12, 0xb7, 0xcc, 0x9a, 0x93, 0xca, 0xe4, 0x1f, 0x32, 0x62,
]);

/// Aggregate hash of a transaction list: BLAKE3 over the concatenated
/// transaction hashes, in list order.
pub fn tx_list_hash(txs: &[Transaction]) -> Result<Hash, CserError> {
    let mut hasher = blake3::Hasher::new();
    for tx in txs {
        hasher.update(tx.hash()?.as_bytes());
    }
    Ok(Hash(*hasher.finalize().as_bytes()))
}

/// Remaining gas power of the creator, one counter per allocation window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GasPowerLeft {
    /// Short- and long-window counters.
    pub gas: [u64; 2],
}

/// Event header fields, freely editable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutableEvent {
    /// Epoch the event belongs to.
    pub epoch: u32,
    /// Lamport time; at least that of every parent.
    pub lamport: u32,
    /// Creator validator id.
    pub creator: u32,
    /// Sequence number within the creator's chain.
    pub seq: u32,
    /// Consensus frame.
    pub frame: u32,
    /// Whether the event is a frame root.
    pub is_root: bool,
    /// Creator's wall-clock timestamp.
    pub creation_time: u64,
    /// Median timestamp of the observed events.
    pub median_time: u64,
    /// Gas power consumed by the event.
    pub gas_power_used: u64,
    /// Gas power left after the event.
    pub gas_power_left: GasPowerLeft,
    /// Parent ids, in the event's own order.
    pub parents: Vec<EventId>,
    /// Hash of the previous epoch's final state, if this event carries it.
    pub prev_epoch_hash: Option<Hash>,
    /// Aggregate payload hash; [`EMPTY_TX_HASH`] when there are no transactions.
    pub tx_hash: Hash,
    /// Opaque extra data.
    pub extra: Vec<u8>,
}

impl Default for MutableEvent {
    fn default() -> Self {
        Self {
            epoch: 0,
            lamport: 0,
            creator: 0,
            seq: 0,
            frame: 0,
            is_root: false,
            creation_time: 0,
            median_time: 0,
            gas_power_used: 0,
            gas_power_left: GasPowerLeft::default(),
            parents: Vec::new(),
            prev_epoch_hash: None,
            tx_hash: EMPTY_TX_HASH,
            extra: Vec::new(),
        }
    }
}

impl MutableEvent {
    /// `true` when the header declares an empty transaction list.
    pub fn no_txs(&self) -> bool {
        self.tx_hash == EMPTY_TX_HASH
    }

    /// Encode the header and derive the event id from it.
    pub fn build(self) -> Result<Event, InterError> {
        let raw = encode_to_vec(&self)?;
        Ok(Event::with_encoding(self, &raw))
    }
}

/// Immutable event header with its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Event {
    base: MutableEvent,
    id: EventId,
}

impl Event {
    fn with_encoding(base: MutableEvent, raw: &[u8]) -> Self {
        let id = EventId::from_hash(base.epoch, base.lamport, &content_hash(raw));
        Self { base, id }
    }

    /// Decode a header and derive its id.
    ///
    /// The id is hashed straight from `raw`: a buffer that decodes at all is
    /// the one canonical encoding of the header, so re-encoding is unnecessary.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, InterError> {
        let base: MutableEvent = decode_from_bytes(raw)?;
        Ok(Self::with_encoding(base, raw))
    }

    /// Framed canonical encoding of the header.
    pub fn to_bytes(&self) -> Result<Vec<u8>, InterError> {
        encode_to_vec(&self.base)
    }

    /// Event id.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// Epoch.
    pub fn epoch(&self) -> u32 {
        self.base.epoch
    }

    /// Lamport time.
    pub fn lamport(&self) -> u32 {
        self.base.lamport
    }

    /// Creator validator id.
    pub fn creator(&self) -> u32 {
        self.base.creator
    }

    /// Sequence number.
    pub fn seq(&self) -> u32 {
        self.base.seq
    }

    /// Consensus frame.
    pub fn frame(&self) -> u32 {
        self.base.frame
    }

    /// Frame-root flag.
    pub fn is_root(&self) -> bool {
        self.base.is_root
    }

    /// Creation timestamp.
    pub fn creation_time(&self) -> u64 {
        self.base.creation_time
    }

    /// Median timestamp.
    pub fn median_time(&self) -> u64 {
        self.base.median_time
    }

    /// Gas power used.
    pub fn gas_power_used(&self) -> u64 {
        self.base.gas_power_used
    }

    /// Gas power left.
    pub fn gas_power_left(&self) -> GasPowerLeft {
        self.base.gas_power_left
    }

    /// Parent ids in declared order.
    pub fn parents(&self) -> &[EventId] {
        &self.base.parents
    }

    /// Previous epoch hash, if carried.
    pub fn prev_epoch_hash(&self) -> Option<&Hash> {
        self.base.prev_epoch_hash.as_ref()
    }

    /// Aggregate payload hash.
    pub fn tx_hash(&self) -> &Hash {
        &self.base.tx_hash
    }

    /// `true` when the event carries no transactions.
    pub fn no_txs(&self) -> bool {
        self.base.no_txs()
    }

    /// Extra data.
    pub fn extra(&self) -> &[u8] {
        &self.base.extra
    }

    /// Give back the editable fields.
    pub fn into_mutable(self) -> MutableEvent {
        self.base
    }
}

/// Event header plus signature and transactions, freely editable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MutableEventPayload {
    /// Header fields.
    pub event: MutableEvent,
    /// Creator's signature.
    pub sig: Signature,
    /// Transactions; must be empty exactly when `event.tx_hash` is [`EMPTY_TX_HASH`].
    pub txs: Vec<Transaction>,
}

impl MutableEventPayload {
    /// Replace the transaction list and update the header's payload hash.
    pub fn set_txs(&mut self, txs: Vec<Transaction>) -> Result<(), CserError> {
        self.event.tx_hash = tx_list_hash(&txs)?;
        self.txs = txs;
        Ok(())
    }

    /// Encode the payload and build the immutable form.
    pub fn build(self) -> Result<EventPayload, InterError> {
        let size = encode_to_vec(&self)?.len();
        let event = self.event.build()?;
        Ok(EventPayload {
            event,
            sig: self.sig,
            txs: self.txs,
            size,
        })
    }
}

/// Immutable event payload as exchanged between peers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventPayload {
    event: Event,
    sig: Signature,
    txs: Vec<Transaction>,
    size: usize,
}

impl EventPayload {
    /// Decode a payload; the header id is derived from the header's own encoding.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, InterError> {
        let payload: MutableEventPayload = decode_from_bytes(raw)?;
        let event = payload.event.build()?;
        Ok(Self {
            event,
            sig: payload.sig,
            txs: payload.txs,
            size: raw.len(),
        })
    }

    /// Framed canonical encoding of the whole payload.
    pub fn to_bytes(&self) -> Result<Vec<u8>, InterError> {
        encode_to_vec(&self.to_mutable())
    }

    /// Event header.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Event id.
    pub fn id(&self) -> EventId {
        self.event.id()
    }

    /// Creator's signature.
    pub fn sig(&self) -> &Signature {
        &self.sig
    }

    /// Transactions.
    pub fn txs(&self) -> &[Transaction] {
        &self.txs
    }

    /// Encoded payload size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Copy out the editable form.
    pub fn to_mutable(&self) -> MutableEventPayload {
        MutableEventPayload {
            event: self.event.base.clone(),
            sig: self.sig,
            txs: self.txs.clone(),
        }
    }
}
