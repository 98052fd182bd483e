//! Domain entities. Pure data structures for the core business.
//!
//! No HTTP/JSON wire types here; these are mapped from adapters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Opaque conversation identifier. The remote service uses numeric ids, but we never do
/// arithmetic on them, so they travel as strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChatId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChatId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A single message from a conversation, as delivered to the consumer.
///
/// Identity is the full record (author + date + payload); two messages comparing equal are
/// the same message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub chat_id: ChatId,
    /// Short user identifier (blog name without domain).
    pub author: String,
    /// Seconds since epoch. The fractional part is the server's ordering suffix.
    pub date: f64,
    pub payload: MessagePayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Text { body: String },
    Image { url: String },
    PostReference { post: serde_json::Value },
}

/// Result of the cheap counts probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnreadCounts {
    /// Unread messages per conversation. Chats absent from the map have zero unread.
    pub chats: BTreeMap<ChatId, u32>,
    /// Activity notifications (reblogs, likes). Only present when requested.
    pub notifications: Option<u64>,
    /// Unread dashboard posts. Only present when requested.
    pub feed_unread: Option<u64>,
    /// Asks and submissions. Only present when requested.
    pub inbox: Option<u64>,
}

impl UnreadCounts {
    pub fn unread_for(&self, chat_id: &ChatId) -> u32 {
        self.chats.get(chat_id).copied().unwrap_or(0)
    }

    /// Chats with at least one unread message, in id order.
    pub fn active_chats(&self) -> impl Iterator<Item = (&ChatId, u32)> {
        self.chats
            .iter()
            .filter(|(_, n)| **n > 0)
            .map(|(id, n)| (id, *n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_id_from_number_and_string_agree() {
        assert_eq!(ChatId::from(4242_i64), ChatId::from("4242"));
        assert_eq!(ChatId::new("abc").to_string(), "abc");
    }

    #[test]
    fn unread_for_missing_chat_is_zero() {
        let mut counts = UnreadCounts::default();
        counts.chats.insert(ChatId::from("1"), 3);
        counts.chats.insert(ChatId::from("2"), 0);
        assert_eq!(counts.unread_for(&ChatId::from("1")), 3);
        assert_eq!(counts.unread_for(&ChatId::from("9")), 0);

        let active: Vec<_> = counts.active_chats().collect();
        assert_eq!(active, vec![(&ChatId::from("1"), 3)]);
    }

    #[test]
    fn payload_serializes_with_kind_tag() {
        let msg = Message {
            chat_id: ChatId::from("7"),
            author: "alice".into(),
            date: 1_500_000_000.5,
            payload: MessagePayload::Text { body: "hi".into() },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["payload"]["kind"], "text");
        assert_eq!(json["payload"]["body"], "hi");
        assert_eq!(json["chat_id"], "7");
    }
}
