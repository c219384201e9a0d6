// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed config store round trips.
#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use opera_stream::{ConfigError, ConfigService, ConfigStore, FsConfigStore, Metric, StreamConfig};

fn scratch_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("opera-stream-{name}-{}-{nanos}", std::process::id()))
}

#[test]
fn stream_config_survives_a_new_store() {
    let dir = scratch_dir("roundtrip");
    let config = StreamConfig {
        max_processing: Metric::new(2_000, 8 << 20),
        acquire_timeout: Duration::from_millis(250),
        ..StreamConfig::default()
    };
    ConfigService::new(FsConfigStore::with_base(&dir).unwrap())
        .save_stream_config(&config)
        .unwrap();

    assert!(dir.join("stream.json").is_file());
    let reopened = ConfigService::new(FsConfigStore::with_base(&dir).unwrap());
    assert_eq!(reopened.stream_config().unwrap(), config);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_file_is_not_found() {
    let dir = scratch_dir("missing");
    let store = FsConfigStore::with_base(&dir).unwrap();
    assert_eq!(store.base(), dir.as_path());
    assert!(matches!(store.load_raw("absent"), Err(ConfigError::NotFound)));
    std::fs::remove_dir_all(&dir).unwrap();
}
