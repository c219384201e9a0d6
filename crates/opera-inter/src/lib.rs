// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! DAG events and transactions with their canonical wire format.
//!
//! Every type here encodes through `opera-cser`, so each logical value has a
//! single accepted byte sequence. Event ids are derived from that sequence;
//! peers that agree on an event agree on its id.

mod event;
mod event_codec;
mod ids;
mod transaction;

pub use event::{
    tx_list_hash, Event, EventPayload, GasPowerLeft, MutableEvent, MutableEventPayload,
    EMPTY_TX_HASH,
};
pub use ids::{content_hash, Address, EventId, Hash, Signature};
pub use opera_cser::{CserError, U256};
pub use transaction::{RawSignature, Transaction};

use thiserror::Error;

/// Errors produced while encoding or decoding events.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum InterError {
    /// The event violates a structural invariant (a parent newer than the
    /// event, or a transaction list that disagrees with the header).
    #[error("serialization of malformed event")]
    MalformedEvent,
    /// Codec-level failure.
    #[error(transparent)]
    Cser(#[from] CserError),
}
