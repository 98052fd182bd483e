//! Aggregate poller: watch many conversations with one counts probe per tick.
//!
//! Each tick probes unread counts for the watched set (plus notification, feed and inbox
//! counters when configured), fetches a short window of the newest messages for every chat
//! that reports unread, and delivers what is newer than a single global watermark. The
//! watermark then moves to the newest date of the delivered batch.
//!
//! One probe instead of one fetch per chat is cheaper, at the cost of per-chat precision: a
//! message in chat A dated before a message already delivered from chat B is not delivered.

use crate::domain::{ChatId, DomainError, Message, Watermark};
use crate::ports::{Clock, DeliverySink, MessageQuery, RemoteGateway};
use crate::usecases::poll_config::PollConfig;
use crate::usecases::poller::sleep_or_cancel;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Summary of one aggregate tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateTick {
    /// Chats whose messages were fetched this tick.
    pub chats_fetched: usize,
    pub delivered: usize,
    pub notifications: Option<u64>,
    pub feed_unread: Option<u64>,
    pub inbox: Option<u64>,
}

pub struct AggregatePoller {
    gateway: Arc<dyn RemoteGateway>,
    sink: Arc<dyn DeliverySink>,
    clock: Arc<dyn Clock>,
    config: PollConfig,
}

impl AggregatePoller {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        sink: Arc<dyn DeliverySink>,
        clock: Arc<dyn Clock>,
        config: PollConfig,
    ) -> Self {
        Self {
            gateway,
            sink,
            clock,
            config,
        }
    }

    pub fn start_state(&self) -> Watermark {
        Watermark::new(self.clock.now())
    }

    /// Run until `cancel` fires or a loop-ending error occurs. Same error policy as the
    /// single-chat poller.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), DomainError> {
        let mut watermark = self.start_state();
        info!(
            baseline = watermark.last_seen(),
            chats = ?self.config.chat_filter,
            "aggregate poller started"
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick(&mut watermark) => outcome,
            };

            match outcome {
                Ok(report) if report.delivered > 0 => info!(
                    delivered = report.delivered,
                    chats = report.chats_fetched,
                    "new messages delivered"
                ),
                Ok(report) => debug!(?report, "tick done"),
                Err(e) if e.is_tick_local() => {
                    warn!(error = %e, "tick failed; retrying next tick");
                }
                Err(e) => {
                    error!(error = %e, "aggregate poller stopped");
                    return Err(e);
                }
            }

            let pause = self.config.interval_for(watermark.phase());
            if !sleep_or_cancel(&cancel, pause).await {
                break;
            }
        }

        info!(last_seen = watermark.last_seen(), "aggregate poller cancelled");
        Ok(())
    }

    /// One probe, then a bounded fetch for every chat with unread messages.
    ///
    /// All fetches complete before anything is delivered: a failed fetch fails the whole
    /// tick with the watermark untouched, so no chat's messages are skipped.
    pub async fn tick(&self, watermark: &mut Watermark) -> Result<AggregateTick, DomainError> {
        let now = self.clock.now();
        if let Some(phase) = watermark.refresh_phase(now, self.config.sleep_threshold) {
            info!(%phase, idle_secs = now - watermark.last_seen(), "phase changed");
        }

        let counts = self
            .gateway
            .fetch_counts(self.config.chat_filter.as_deref(), self.config.include_others)
            .await?;

        let mut report = AggregateTick {
            notifications: counts.notifications,
            feed_unread: counts.feed_unread,
            inbox: counts.inbox,
            ..AggregateTick::default()
        };

        let mut batches: Vec<(ChatId, Vec<Message>)> = Vec::new();
        for (chat_id, unread) in counts.active_chats() {
            if !self.config.watches(chat_id) {
                continue;
            }
            let query = MessageQuery::latest(unread.saturating_add(self.config.fetch_margin))
                .incoming_only(self.config.incoming_only);
            let messages = self.gateway.fetch_messages(chat_id, &query).await?;
            report.chats_fetched += 1;

            let fresh = watermark.unseen(messages);
            debug!(%chat_id, unread, fresh = fresh.len(), "chat fetched");
            if !fresh.is_empty() {
                batches.push((chat_id.clone(), fresh));
            }
        }

        let mut newest: Option<f64> = None;
        for (chat_id, batch) in batches {
            for msg in batch {
                let date = msg.date;
                if let Err(e) = self.sink.enqueue(msg) {
                    error!(%chat_id, delivered = report.delivered, error = %e, "enqueue failed");
                    return Err(e);
                }
                report.delivered += 1;
                newest = Some(newest.map_or(date, |n| n.max(date)));
            }
        }

        if let Some(newest) = newest {
            watermark.advance(newest);
            if let Some(phase) = watermark.refresh_phase(now, self.config.sleep_threshold) {
                info!(%phase, "phase changed");
            }
        }

        Ok(report)
    }
}
