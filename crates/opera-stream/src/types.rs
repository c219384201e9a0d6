// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Messages of an event-stream session.

use opera_inter::{EventId, EventPayload};

use crate::metric::Metric;
use crate::StreamError;

/// A range of the seeder's event index, `[start, stop)` by key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    /// Session id chosen by the leecher.
    pub id: u32,
    /// First key, inclusive.
    pub start: Vec<u8>,
    /// Last key, exclusive.
    pub stop: Vec<u8>,
}

/// What the leecher wants back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    /// Event ids only.
    Ids = 0,
    /// Full event payloads.
    Events = 2,
}

impl TryFrom<u8> for RequestType {
    type Error = StreamError;

    fn try_from(value: u8) -> Result<Self, StreamError> {
        match value {
            0 => Ok(Self::Ids),
            2 => Ok(Self::Events),
            other => Err(StreamError::UnknownRequestType(other)),
        }
    }
}

impl From<RequestType> for u8 {
    fn from(kind: RequestType) -> Self {
        kind as Self
    }
}

/// One chunk request within a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    /// Session the chunk belongs to.
    pub session: Session,
    /// Upper bound on the chunk.
    pub limit: Metric,
    /// Ids or full events.
    pub kind: RequestType,
}

/// Seeder reply to a [`Request`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Response {
    /// Echoes [`Session::id`].
    pub session_id: u32,
    /// `true` when the session range is exhausted.
    pub done: bool,
    /// Ids, for [`RequestType::Ids`].
    pub ids: Vec<EventId>,
    /// Payloads, for [`RequestType::Events`].
    pub events: Vec<EventPayload>,
}

impl Response {
    /// Count and encoded size of the carried events.
    ///
    /// Ids weigh their fixed 32 bytes each.
    pub fn metric(&self) -> Metric {
        let id_size = self.ids.len().saturating_mul(32);
        let event_size = self
            .events
            .iter()
            .fold(0usize, |acc, e| acc.saturating_add(e.size()));
        let num = self.ids.len().saturating_add(self.events.len());
        Metric {
            num: u32::try_from(num).unwrap_or(u32::MAX),
            size: u64::try_from(id_size.saturating_add(event_size)).unwrap_or(u64::MAX),
        }
    }

    /// `true` when the response carries neither ids nor events.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.events.is_empty()
    }

    /// `true` when the carried items stay within `request`'s limit and match its kind.
    pub fn answers(&self, request: &Request) -> bool {
        if self.session_id != request.session.id {
            return false;
        }
        let kind_matches = match request.kind {
            RequestType::Ids => self.events.is_empty(),
            RequestType::Events => self.ids.is_empty(),
        };
        kind_matches && self.metric().fits_within(request.limit)
    }
}
