//! Implements DeliverySink on tokio channels.
//!
//! Bounded senders use `try_send`, so a slow consumer surfaces as `SinkFull` instead of
//! stalling the poller.

use crate::domain::{DomainError, Message};
use crate::ports::DeliverySink;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

impl DeliverySink for mpsc::Sender<Message> {
    fn enqueue(&self, message: Message) -> Result<(), DomainError> {
        self.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => DomainError::SinkFull,
            TrySendError::Closed(_) => DomainError::SinkClosed,
        })
    }
}

impl DeliverySink for mpsc::UnboundedSender<Message> {
    fn enqueue(&self, message: Message) -> Result<(), DomainError> {
        self.send(message).map_err(|_| DomainError::SinkClosed)
    }
}
