// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stream settings and where they are persisted.
//!
//! Settings are JSON documents keyed by name. [`ConfigService`] does the
//! serde work and validation; a [`ConfigStore`] only moves raw bytes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::metric::Metric;
use crate::semaphore::EventsSemaphore;

/// Key under which [`StreamConfig`] is stored.
pub const STREAM_CONFIG_KEY: &str = "stream";

/// Error type for config operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Key not present in store.
    #[error("not found")]
    NotFound,
    /// I/O error while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Settings parse but make no sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Storage port for raw config blobs.
pub trait ConfigStore {
    /// Load a raw config blob. Returns `NotFound` when missing.
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
    /// Persist a raw config blob.
    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError>;
}

/// Serializes config values and delegates storage to a [`ConfigStore`].
pub struct ConfigService<S> {
    store: S,
}

impl<S> ConfigService<S> {
    /// Create a service over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.store
    }
}

impl<S: ConfigStore> ConfigService<S> {
    /// Load and deserialize `key`. Missing or empty blobs give `Ok(None)`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.store.load_raw(key) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(ConfigError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Serialize and persist `value` under `key`.
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), ConfigError> {
        let data = serde_json::to_vec_pretty(value)?;
        self.store.save_raw(key, &data)
    }

    /// Stored [`StreamConfig`], or the defaults when none is stored.
    pub fn stream_config(&self) -> Result<StreamConfig, ConfigError> {
        let config = match self.load::<StreamConfig>(STREAM_CONFIG_KEY)? {
            Some(config) => config,
            None => {
                debug!(key = STREAM_CONFIG_KEY, "no stored stream config, using defaults");
                StreamConfig::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate and persist a [`StreamConfig`].
    pub fn save_stream_config(&self, config: &StreamConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.save(STREAM_CONFIG_KEY, config)?;
        info!(key = STREAM_CONFIG_KEY, "stream config saved");
        Ok(())
    }
}

/// Chunked event download settings for one peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochDownloaderConfig {
    /// Pause between checks for chunks to request.
    #[serde(with = "millis")]
    pub recheck_interval: Duration,
    /// Limit sent with each chunk request.
    pub default_chunk_size: Metric,
    /// Chunks requested concurrently.
    pub parallel_chunks_download: usize,
}

impl Default for EpochDownloaderConfig {
    fn default() -> Self {
        Self {
            recheck_interval: Duration::from_millis(10),
            default_chunk_size: Metric::new(500, 512 * 1024),
            parallel_chunks_download: 6,
        }
    }
}

impl EpochDownloaderConfig {
    /// Reject settings under which no chunk could ever be requested.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_chunks_download == 0 {
            return Err(ConfigError::Invalid(
                "parallel_chunks_download must be at least 1".into(),
            ));
        }
        if self.default_chunk_size.num == 0 || self.default_chunk_size.size == 0 {
            return Err(ConfigError::Invalid(
                "default_chunk_size must be non-zero".into(),
            ));
        }
        if self.recheck_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "recheck_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Settings of the event stream as a whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Per-peer downloader settings.
    pub epoch_downloader: EpochDownloaderConfig,
    /// Cap on events being processed at once.
    pub max_processing: Metric,
    /// How long a producer waits for the semaphore before giving up.
    #[serde(with = "millis")]
    pub acquire_timeout: Duration,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            epoch_downloader: EpochDownloaderConfig::default(),
            max_processing: Metric::new(10_000, 10 * 1024 * 1024),
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl StreamConfig {
    /// Check the downloader settings, and that one chunk fits under the cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.epoch_downloader.validate()?;
        if !self
            .epoch_downloader
            .default_chunk_size
            .fits_within(self.max_processing)
        {
            return Err(ConfigError::Invalid(format!(
                "default_chunk_size {:?} exceeds max_processing {:?}",
                self.epoch_downloader.default_chunk_size, self.max_processing
            )));
        }
        Ok(())
    }

    /// Semaphore sized by `max_processing`.
    pub fn semaphore<F>(&self, warning: F) -> EventsSemaphore
    where
        F: Fn(Metric, Metric, Metric) + Send + Sync + 'static,
    {
        EventsSemaphore::new(self.max_processing, warning)
    }
}

/// Store configs as JSON files under a directory.
#[derive(Debug, Clone)]
pub struct FsConfigStore {
    base: PathBuf,
}

impl FsConfigStore {
    /// Create a store rooted at the user config directory (e.g. `~/.config/opera`).
    pub fn new() -> Result<Self, ConfigError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Opera")
            .ok_or_else(|| ConfigError::Invalid("could not resolve config dir".into()))?;
        Self::with_base(proj.config_dir())
    }

    /// Create a store rooted at `base`, creating the directory if needed.
    pub fn with_base(base: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// Directory holding the config files.
    pub fn base(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base.join(format!("{key}.json"))
    }
}

impl ConfigStore for FsConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(ConfigError::NotFound),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, data)?;
        Ok(())
    }
}

/// In-memory [`ConfigStore`]; clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` if `key` has been saved.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or(ConfigError::NotFound)
    }

    fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), data.to_vec());
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let service = ConfigService::new(MemoryConfigStore::new());
        assert_eq!(service.stream_config().unwrap(), StreamConfig::default());
    }

    #[test]
    fn save_then_load() {
        let store = MemoryConfigStore::new();
        let service = ConfigService::new(store.clone());
        let mut config = StreamConfig::default();
        config.epoch_downloader.parallel_chunks_download = 2;
        config.acquire_timeout = Duration::from_millis(1_500);
        service.save_stream_config(&config).unwrap();
        assert!(store.contains_key(STREAM_CONFIG_KEY));
        assert_eq!(service.stream_config().unwrap(), config);
    }

    #[test]
    fn durations_are_plain_milliseconds() {
        let json = serde_json::to_value(EpochDownloaderConfig::default()).unwrap();
        assert_eq!(json["recheck_interval"], 10);
        assert_eq!(json["default_chunk_size"]["num"], 500);
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let store = MemoryConfigStore::new();
        store
            .save_raw(STREAM_CONFIG_KEY, br#"{"epoch_downloader":{"parallel_chunks_download":3}}"#)
            .unwrap();
        let config = ConfigService::new(store).stream_config().unwrap();
        assert_eq!(config.epoch_downloader.parallel_chunks_download, 3);
        assert_eq!(
            config.epoch_downloader.recheck_interval,
            Duration::from_millis(10)
        );
        assert_eq!(config.max_processing, StreamConfig::default().max_processing);
    }

    #[test]
    fn chunk_larger_than_cap_is_invalid() {
        let config = StreamConfig {
            max_processing: Metric::new(100, 1 << 30),
            ..StreamConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let service = ConfigService::new(MemoryConfigStore::new());
        assert!(matches!(
            service.save_stream_config(&config),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_parallelism_is_invalid() {
        let config = EpochDownloaderConfig {
            parallel_chunks_download: 0,
            ..EpochDownloaderConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn garbage_json_is_a_serde_error() {
        let store = MemoryConfigStore::new();
        store.save_raw(STREAM_CONFIG_KEY, b"{not json").unwrap();
        let err = ConfigService::new(store).stream_config().unwrap_err();
        assert!(matches!(err, ConfigError::Serde(_)));
    }

    #[test]
    fn semaphore_uses_max_processing() {
        let config = StreamConfig {
            max_processing: Metric::new(1, 100),
            epoch_downloader: EpochDownloaderConfig {
                default_chunk_size: Metric::new(1, 100),
                ..EpochDownloaderConfig::default()
            },
            ..StreamConfig::default()
        };
        let sem = config.semaphore(|_, _, _| {});
        assert!(sem.try_acquire(Metric::new(1, 100)));
        assert!(!sem.try_acquire(Metric::new(1, 0)));
    }
}
