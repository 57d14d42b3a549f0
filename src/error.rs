//! Error taxonomy
//!
//! Only fatal conditions become a `GlkError`. Stale generations, unknown
//! message types and dialog failures are logged and recovered where they
//! happen.

use std::io;
use thiserror::Error;

/// Fatal session errors
#[derive(Debug, Error)]
pub enum GlkError {
    /// Handshake attempted without a game interface to talk to
    #[error("No game interface object has been provided.")]
    NoInterface,

    /// The interpreter reported an error update
    #[error("{0}")]
    Host(String),

    /// Terminal or pipe I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The interpreter sent something that is not JSON
    #[error("malformed protocol message: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GlkError>;
