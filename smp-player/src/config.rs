//! Runtime engine configuration
//!
//! Derived from the bootstrap [`TomlConfig`] after CLI overrides have been
//! applied. Values are normalized here so the engine never sees an
//! out-of-range interval or volume.

use smp_common::config::TomlConfig;
use std::time::Duration;

use crate::playback::tick::{MAX_TICK_INTERVAL_MS, MIN_TICK_INTERVAL_MS};

/// Broadcast mirror capacity
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Settings for one engine session
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Media server endpoint passed to the transport
    pub endpoint: String,

    /// Upper bound on one connect attempt
    pub connect_timeout: Duration,

    /// Tick period in milliseconds, within [100, 1000]
    pub tick_interval_ms: u64,

    /// Wrap at either end of the playlist instead of ending it
    pub wrap_playlist: bool,

    /// Volume applied before any `set_volume` call, 0-100
    pub initial_volume: u8,

    pub playlist_name: String,

    pub event_capacity: usize,
}

impl EngineConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn from_toml(config: &TomlConfig) -> Self {
        Self {
            endpoint: config.server.endpoint.clone(),
            connect_timeout: Duration::from_millis(config.server.connect_timeout_ms),
            tick_interval_ms: config.playback.tick_interval_ms,
            wrap_playlist: config.playback.wrap_playlist,
            initial_volume: config.playback.initial_volume,
            playlist_name: config.playback.playlist_name.clone(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
        .normalized()
    }

    /// Clamp values into their supported ranges
    pub fn normalized(mut self) -> Self {
        self.tick_interval_ms = self
            .tick_interval_ms
            .clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS);
        self.initial_volume = self.initial_volume.min(100);
        self.event_capacity = self.event_capacity.max(1);
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let defaults = TomlConfig::default();
        Self {
            endpoint: defaults.server.endpoint,
            connect_timeout: Duration::from_millis(defaults.server.connect_timeout_ms),
            tick_interval_ms: defaults.playback.tick_interval_ms,
            wrap_playlist: defaults.playback.wrap_playlist,
            initial_volume: defaults.playback.initial_volume,
            playlist_name: defaults.playback.playlist_name,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}
