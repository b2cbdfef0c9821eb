//! # SMP Common Library
//!
//! Shared code for the streaming media player crates:
//! - Media item identity
//! - Event types (PlayerEvent enum) and player/connection state
//! - Configuration loading
//! - Logging initialisation

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod media;

pub use error::{Error, Result};
pub use media::MediaItem;
