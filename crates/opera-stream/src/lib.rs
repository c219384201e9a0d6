// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event stream plumbing shared by leechers and seeders.
//!
//! - [`EventsSemaphore`] bounds how many events (and bytes) are in flight.
//! - [`Session`], [`Request`] and [`Response`] describe one stream session.
//! - [`config`] holds the persisted downloader settings.

pub mod config;
mod metric;
mod semaphore;
mod types;

pub use config::{
    ConfigError, ConfigService, ConfigStore, EpochDownloaderConfig, FsConfigStore,
    MemoryConfigStore, StreamConfig,
};
pub use metric::Metric;
pub use semaphore::{EventsSemaphore, WarningFn};
pub use types::{Request, RequestType, Response, Session};

use thiserror::Error;

/// Errors raised by stream message handling.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum StreamError {
    /// Request type byte outside the known set.
    #[error("unknown request type {0}")]
    UnknownRequestType(u8),
}
