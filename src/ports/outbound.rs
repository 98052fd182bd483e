//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{ChatId, DomainError, Message, UnreadCounts};

/// Optional bounds for a message fetch. All fields unset means "the newest page the server
/// is willing to return".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageQuery {
    /// Only messages older than this (seconds since epoch). Sent wire encoded.
    pub before: Option<f64>,
    /// Cache-busting marker newer than the last poll (seconds since epoch). Sent wire encoded.
    pub after: Option<f64>,
    /// Advisory page size. The server caps it (observed cap: 20).
    pub limit: Option<u32>,
    /// Drop messages authored by the session's own participant.
    pub only_incoming: bool,
}

impl MessageQuery {
    /// The newest `limit` messages.
    pub fn latest(limit: u32) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn incoming_only(mut self, only_incoming: bool) -> Self {
        self.only_incoming = only_incoming;
        self
    }
}

/// Remote chat service. Must tolerate concurrent use from several pollers.
#[async_trait::async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Cheap probe: unread message counts per conversation.
    ///
    /// - `filter`: when set, only these chats are reported
    /// - `include_others`: also report notification, feed and inbox counters
    async fn fetch_counts(
        &self,
        filter: Option<&[ChatId]>,
        include_others: bool,
    ) -> Result<UnreadCounts, DomainError>;

    /// Expensive fetch: an ordered slice of a conversation, oldest first.
    async fn fetch_messages(
        &self,
        chat_id: &ChatId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, DomainError>;
}

/// Ordered destination for delivered messages. `enqueue` never blocks: a sink that cannot
/// take the message right now reports [`DomainError::SinkFull`].
pub trait DeliverySink: Send + Sync {
    fn enqueue(&self, message: Message) -> Result<(), DomainError>;
}

/// Wall clock in seconds since epoch, the same scale as [`Message::date`].
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}
