//! Media player engine
//!
//! **Module Structure:**
//! - `core.rs`: struct definition, connection lifecycle, ticks, snapshots
//! - `playback.rs`: transport intent (play, pause, stop, seek, next, previous, volume)
//! - `queue.rs`: playlist mutations and queries

mod core;
mod playback;
mod queue;

pub use self::core::MediaPlayerEngine;
