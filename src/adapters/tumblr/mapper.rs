//! Map Tumblr IM JSON bodies to domain entities.
//!
//! Extracts Message and UnreadCounts from the `/svc` endpoints' responses.

use crate::domain::timestamp;
use crate::domain::{ChatId, DomainError, Message, MessagePayload, UnreadCounts};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// `meta` block carried by most `/svc` responses.
#[derive(Debug, Deserialize)]
struct Meta {
    status: u16,
    #[serde(default)]
    msg: String,
}

/// One element of `response.messages.data`.
#[derive(Debug, Deserialize)]
struct RawMessage {
    participant: String,
    ts: Value,
    #[serde(flatten)]
    body: RawBody,
}

/// Closed set of message kinds. Anything else fails to deserialize.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawBody {
    #[serde(rename = "TEXT")]
    Text { message: String },
    #[serde(rename = "IMAGE")]
    Image { images: Vec<RawImage> },
    #[serde(rename = "POSTREF")]
    PostRef { post: Value },
}

#[derive(Debug, Deserialize)]
struct RawImage {
    original_size: RawImageSize,
}

#[derive(Debug, Deserialize)]
struct RawImageSize {
    url: String,
}

/// Fail with `RemoteFault` when a `meta` block is present and not 200.
pub fn check_meta(body: &Value) -> Result<(), DomainError> {
    let Some(meta) = body.get("meta") else {
        return Ok(());
    };
    let meta: Meta = serde_json::from_value(meta.clone())
        .map_err(|e| DomainError::Decode(format!("meta: {}", e)))?;
    if meta.status != 200 {
        return Err(DomainError::RemoteFault {
            status: meta.status,
            message: meta.msg,
        });
    }
    Ok(())
}

/// Blog name without the domain: `alice.tumblr.com` becomes `alice`.
pub fn short_user_id(participant: &str) -> &str {
    participant.split('.').next().unwrap_or(participant)
}

/// Blog name with the domain, as the messaging endpoints expect it.
pub fn long_user_id(user: &str) -> String {
    format!("{}.tumblr.com", user)
}

/// Map one wire message. The wire record carries no conversation id, so it is supplied.
pub fn message_to_domain(raw: &Value, chat_id: &ChatId) -> Result<Message, DomainError> {
    let raw: RawMessage = serde_json::from_value(raw.clone())
        .map_err(|e| DomainError::Decode(format!("message: {}", e)))?;
    let date = timestamp::decode_value(&raw.ts)?;
    let payload = match raw.body {
        RawBody::Text { message } => MessagePayload::Text { body: message },
        RawBody::Image { images } => {
            let first = images
                .into_iter()
                .next()
                .ok_or_else(|| DomainError::Decode("image message without images".into()))?;
            MessagePayload::Image {
                url: first.original_size.url,
            }
        }
        RawBody::PostRef { post } => MessagePayload::PostReference { post },
    };
    Ok(Message {
        chat_id: chat_id.clone(),
        author: short_user_id(&raw.participant).to_string(),
        date,
        payload,
    })
}

/// Map a `conversations/messages` response, oldest first as the server sends them.
/// With `skip_author` set, messages written by that user are left out.
pub fn messages_from_response(
    body: &Value,
    chat_id: &ChatId,
    skip_author: Option<&str>,
) -> Result<Vec<Message>, DomainError> {
    check_meta(body)?;
    let data = body
        .pointer("/response/messages/data")
        .and_then(Value::as_array)
        .ok_or_else(|| DomainError::Decode("missing response.messages.data".into()))?;

    let mut out = Vec::with_capacity(data.len());
    for raw in data {
        let msg = message_to_domain(raw, chat_id)?;
        if skip_author.is_some_and(|me| msg.author == me) {
            continue;
        }
        out.push(msg);
    }
    Ok(out)
}

/// Map a `user/counts` response. `unread_messages` is keyed by conversation id, possibly
/// nested one level under our mention key.
pub fn counts_from_response(body: &Value, mention_key: &str) -> Result<UnreadCounts, DomainError> {
    check_meta(body)?;
    let mut unread = body
        .get("unread_messages")
        .ok_or_else(|| DomainError::Decode("missing unread_messages".into()))?;
    if let Some(inner) = unread.get(mention_key) {
        unread = inner;
    }
    let unread = unread
        .as_object()
        .ok_or_else(|| DomainError::Decode("unread_messages is not an object".into()))?;

    let mut chats = BTreeMap::new();
    for (id, n) in unread {
        let n = n
            .as_u64()
            .ok_or_else(|| DomainError::Decode(format!("unread count for {}: {}", id, n)))?;
        chats.insert(ChatId::from(id.as_str()), u32::try_from(n).unwrap_or(u32::MAX));
    }

    Ok(UnreadCounts {
        chats,
        notifications: body.get("notifications").and_then(Value::as_u64),
        feed_unread: body.get("unread").and_then(Value::as_u64),
        inbox: body.get("inbox").and_then(Value::as_u64),
    })
}
