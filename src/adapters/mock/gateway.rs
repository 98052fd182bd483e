//! Scripted gateway for testing pollers without network calls.
//!
//! Responses are queued up front and handed out in order; every call is recorded so tests
//! can assert on what the poller asked for.

use crate::domain::{ChatId, DomainError, Message, UnreadCounts};
use crate::ports::{MessageQuery, RemoteGateway};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCall {
    Counts {
        filter: Option<Vec<ChatId>>,
        include_others: bool,
    },
    Messages {
        chat_id: ChatId,
        query: MessageQuery,
    },
}

/// In-memory gateway. Empty queues answer with no unread and no messages.
#[derive(Default)]
pub struct ScriptedGateway {
    counts: Mutex<VecDeque<Result<UnreadCounts, DomainError>>>,
    messages: Mutex<HashMap<ChatId, VecDeque<Result<Vec<Message>, DomainError>>>>,
    calls: Mutex<Vec<GatewayCall>>,
    stalled: AtomicBool,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next counts probe.
    pub fn push_counts(&self, result: Result<UnreadCounts, DomainError>) {
        lock(&self.counts).push_back(result);
    }

    /// Queue the answer to the next message fetch for `chat_id`.
    pub fn push_messages(&self, chat_id: &ChatId, result: Result<Vec<Message>, DomainError>) {
        lock(&self.messages)
            .entry(chat_id.clone())
            .or_default()
            .push_back(result);
    }

    /// Make every following call hang forever, as a request that never gets an answer.
    pub fn stall(&self) {
        self.stalled.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        lock(&self.calls).clone()
    }

    pub fn count_probes(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, GatewayCall::Counts { .. }))
            .count()
    }

    pub fn message_fetches(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| matches!(c, GatewayCall::Messages { .. }))
            .count()
    }

    async fn wait_if_stalled(&self) {
        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait::async_trait]
impl RemoteGateway for ScriptedGateway {
    async fn fetch_counts(
        &self,
        filter: Option<&[ChatId]>,
        include_others: bool,
    ) -> Result<UnreadCounts, DomainError> {
        lock(&self.calls).push(GatewayCall::Counts {
            filter: filter.map(<[ChatId]>::to_vec),
            include_others,
        });
        self.wait_if_stalled().await;

        let next = lock(&self.counts).pop_front();
        let mut counts = next.unwrap_or_else(|| Ok(UnreadCounts::default()))?;
        if let Some(filter) = filter {
            counts.chats.retain(|id, _| filter.contains(id));
        }
        debug!(chats = counts.chats.len(), "[MOCK] counts probe");
        Ok(counts)
    }

    async fn fetch_messages(
        &self,
        chat_id: &ChatId,
        query: &MessageQuery,
    ) -> Result<Vec<Message>, DomainError> {
        lock(&self.calls).push(GatewayCall::Messages {
            chat_id: chat_id.clone(),
            query: query.clone(),
        });
        self.wait_if_stalled().await;

        let next = lock(&self.messages)
            .get_mut(chat_id)
            .and_then(VecDeque::pop_front);
        let messages = next.unwrap_or_else(|| Ok(Vec::new()))?;
        debug!(%chat_id, count = messages.len(), "[MOCK] message fetch");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_in_queue_order_then_empty() {
        let gw = ScriptedGateway::new();
        let chat = ChatId::from("5");
        let mut counts = UnreadCounts::default();
        counts.chats.insert(chat.clone(), 2);
        counts.chats.insert(ChatId::from("6"), 1);
        gw.push_counts(Ok(counts));

        let first = gw.fetch_counts(Some(&[chat.clone()]), false).await.unwrap();
        assert_eq!(first.unread_for(&chat), 2);
        assert_eq!(first.chats.len(), 1);

        let second = gw.fetch_counts(None, true).await.unwrap();
        assert!(second.chats.is_empty());

        assert!(
            gw.fetch_messages(&chat, &MessageQuery::default())
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(gw.count_probes(), 2);
        assert_eq!(gw.message_fetches(), 1);
    }
}
