//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the timestamp codec and the polling state live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod poll_state;
pub mod timestamp;

pub use entities::{ChatId, Message, MessagePayload, UnreadCounts};
pub use errors::DomainError;
pub use poll_state::{ChatPollState, Phase, Watermark};
