//! Implements RemoteGateway against Tumblr's web messaging endpoints.
//!
//! Session headers (cookie, CSRF token) are taken from configuration and sent with every
//! request. No retries here: the pollers' next tick is the retry.

use crate::adapters::tumblr::mapper;
use crate::domain::timestamp;
use crate::domain::{ChatId, DomainError, Message, UnreadCounts};
use crate::ports::{MessageQuery, RemoteGateway};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://www.tumblr.com";

const COUNTS_PATH: &str = "/svc/user/counts";
const MESSAGES_PATH: &str = "/svc/conversations/messages";

/// Tumblr IM gateway. Cheap to share: `reqwest::Client` pools connections internally and is
/// safe to use from several pollers at once.
pub struct TumblrGateway {
    client: Client,
    base_url: String,
    /// Our blog name, without domain.
    participant: String,
    /// Key that scopes the counts probe to our blog.
    mention_key: String,
}

impl TumblrGateway {
    /// Build a gateway.
    ///
    /// # Arguments
    /// * `base_url` - Service root, normally [`DEFAULT_BASE_URL`]
    /// * `participant` - Our blog name (`alice`, not `alice.tumblr.com`)
    /// * `mention_key` - Mention key of our blog
    /// * `headers` - Session headers as `Name: value` lines
    /// * `timeout` - Per-request timeout
    pub fn new(
        base_url: impl Into<String>,
        participant: impl Into<String>,
        mention_key: impl Into<String>,
        headers: &[String],
        timeout: Duration,
    ) -> Result<Self, DomainError> {
        let client = Client::builder()
            .default_headers(parse_headers(headers)?)
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Config(format!("http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            participant: participant.into(),
            mention_key: mention_key.into(),
        })
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, DomainError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("GET {}: {}", path, e)))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| DomainError::Transport(format!("read body of {}: {}", path, e)))?;
        debug!(path, status = status.as_u16(), bytes = text.len(), "response received");

        if !status.is_success() {
            return Err(DomainError::RemoteFault {
                status: status.as_u16(),
                message: text,
            });
        }
        serde_json::from_str(&text).map_err(|e| DomainError::Decode(format!("{}: {}", path, e)))
    }
}

/// Parse `Name: value` lines into a header map. Blank lines are ignored.
pub fn parse_headers(lines: &[String]) -> Result<HeaderMap, DomainError> {
    let mut map = HeaderMap::new();
    for line in lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()) {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| DomainError::Config(format!("header without ':': {}", line)))?;
        let name = HeaderName::from_bytes(name.trim().as_bytes())
            .map_err(|e| DomainError::Config(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value.trim())
            .map_err(|e| DomainError::Config(format!("header value for {}: {}", name, e)))?;
        map.append(name, value);
    }
    Ok(map)
}

/// Query parameters for the counts probe.
fn counts_params(mention_key: &str, include_others: bool) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("mention_keys", mention_key.to_string()),
        ("unread_messages", "true".to_string()),
    ];
    if include_others {
        params.push(("notifications", "true".to_string()));
        params.push(("unread", "true".to_string()));
        params.push(("inbox", "true".to_string()));
    }
    params
}

/// Query parameters for a message fetch. `before` goes out wire encoded; the service takes
/// `_` (after) as plain seconds.
fn messages_params(
    chat_id: &ChatId,
    participant: &str,
    query: &MessageQuery,
) -> Result<Vec<(&'static str, String)>, DomainError> {
    let mut params = vec![
        ("conversation_id", chat_id.to_string()),
        ("participant", mapper::long_user_id(participant)),
    ];
    if let Some(before) = query.before {
        params.push(("before", timestamp::encode(before)?));
    }
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
    if let Some(after) = query.after {
        params.push(("_", after.to_string()));
    }
    Ok(params)
}

#[async_trait]
impl RemoteGateway for TumblrGateway {
    async fn fetch_counts(
        &self,
        filter: Option<&[ChatId]>,
        include_others: bool,
    ) -> Result<UnreadCounts, DomainError> {
        let params = counts_params(&self.mention_key, include_others);
        let body = self.get_json(COUNTS_PATH, &params).await?;
        let mut counts = mapper::counts_from_response(&body, &self.mention_key)?;
        if let Some(filter) = filter {
            counts.chats.retain(|id, _| filter.contains(id));
        }
        Ok(counts)
    }

    async fn fetch_messages(
        &self,
        chat_id: &ChatId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, DomainError> {
        let params = messages_params(chat_id, &self.participant, query)?;
        let body = self.get_json(MESSAGES_PATH, &params).await?;
        let skip = query.only_incoming.then_some(self.participant.as_str());
        mapper::messages_from_response(&body, chat_id, skip)
    }
}
