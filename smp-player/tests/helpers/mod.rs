//! Test helper modules for smp-player integration tests
//!
//! - MockTransport: scriptable in-memory stream transport
//! - EventRecorder: captures published events for assertions

#![allow(dead_code)]

pub mod event_recorder;
pub mod mock_transport;

pub use event_recorder::EventRecorder;
pub use mock_transport::MockTransport;

use smp_player::{EngineConfig, MediaPlayerEngine};
use std::sync::Arc;

pub const ENDPOINT: &str = "sim://test-server:1935";

/// Engine config with the slowest tick so tests drive sampling themselves
pub fn test_config(wrap: bool) -> EngineConfig {
    EngineConfig {
        tick_interval_ms: 1000,
        wrap_playlist: wrap,
        initial_volume: 50,
        ..EngineConfig::new(ENDPOINT)
    }
}

/// Engine with a recorder attached, not yet connected
pub fn engine_with(transport: Arc<MockTransport>, wrap: bool) -> (MediaPlayerEngine, EventRecorder) {
    let engine = MediaPlayerEngine::new(test_config(wrap), transport);
    let recorder = EventRecorder::attach(&engine);
    (engine, recorder)
}

/// Connected engine holding `locators`, recorder cleared
pub async fn connected_engine(
    locators: &[&str],
    wrap: bool,
) -> (MediaPlayerEngine, Arc<MockTransport>, EventRecorder) {
    let transport = Arc::new(MockTransport::new());
    let (engine, recorder) = engine_with(Arc::clone(&transport), wrap);

    engine.connect().await;
    let status = engine.wait_for_connection().await;
    assert!(status.is_connected, "test engine failed to connect");

    for locator in locators {
        engine.enqueue(*locator).await.unwrap();
    }
    recorder.clear();
    (engine, transport, recorder)
}
