//! # SMP Player Library (smp-player)
//!
//! Streaming media playback client engine.
//!
//! **Purpose:** Maintain a link to a media server, walk an ordered playlist,
//! and report transport state and position to observers through typed
//! events.
//!
//! **Architecture:** One async mutation lock around playlist + state machine,
//! a background connect worker, a periodic tick task, and a callback
//! dispatcher mirrored onto a broadcast channel.

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod playback;
pub mod transport;

pub use config::EngineConfig;
pub use dispatcher::{EventDispatcher, SubscriberResult, SubscriptionId};
pub use engine::MediaPlayerEngine;
pub use error::{Error, Result};
pub use playback::{CursorMove, InsertPosition, ItemRef};
pub use transport::{SimulatedTransport, StreamTransport};
