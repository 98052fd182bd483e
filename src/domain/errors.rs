//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    /// The remote service answered with a non-success status.
    #[error("remote fault {status}: {message}")]
    RemoteFault { status: u16, message: String },

    /// Network-level failure (connect, timeout, truncated body) before any status was seen.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// Response body did not match the expected shape (including unknown message types).
    #[error("decode error: {0}")]
    Decode(String),

    #[error("delivery sink is full")]
    SinkFull,

    #[error("delivery sink is closed")]
    SinkClosed,

    #[error("configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// Errors that spoil only the tick that produced them. The poller logs these and tries
    /// again on the next scheduled tick; everything else ends the loop.
    pub fn is_tick_local(&self) -> bool {
        matches!(
            self,
            DomainError::Transport(_) | DomainError::InvalidTimestamp(_) | DomainError::Decode(_)
        )
    }
}
