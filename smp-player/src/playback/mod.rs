//! Playback components
//!
//! - `playlist`: ordered items and the cursor
//! - `state_machine`: transition table and stream handle ownership
//! - `connection`: server link status and connect worker
//! - `tick`: periodic sampling timer

pub mod connection;
pub mod playlist;
pub mod state_machine;
pub mod tick;

pub use connection::{ConnectionSupervisor, LinkOutcome};
pub use playlist::{CursorMove, InsertPosition, ItemRef, PlaylistManager, Removal};
pub use state_machine::{transition, Command, PlaybackStateMachine, SeekRequest};
pub use tick::{clamp_interval, TickRelay, TickScheduler};
