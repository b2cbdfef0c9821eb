//! Error types for smp-player
//!
//! Engine operations return [`Error`]. Errors raised on background tasks
//! (connect worker, tick sampling, seek) never cross into caller code; they
//! are logged and surfaced through events.

use smp_common::events::MediaplayerState;
use thiserror::Error;

use crate::transport::TransportError;

/// Main error type for smp-player
#[derive(Error, Debug)]
pub enum Error {
    /// Connect attempt could not establish a link
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation not permitted in the current state; engine unchanged
    #[error("Invalid transition: cannot {operation} while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: MediaplayerState,
    },

    /// Playlist index out of bounds; playlist unchanged
    #[error("Invalid index {index} for playlist of {len} items")]
    InvalidIndex { index: usize, len: usize },

    /// Playlist item not found by identity
    #[error("Media item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    /// Stream transport I/O failure
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Rejected argument (e.g. volume outside 0-100)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration errors
    #[error(transparent)]
    Common(#[from] smp_common::Error),
}

/// Convenience Result type using smp-player Error
pub type Result<T> = std::result::Result<T, Error>;
