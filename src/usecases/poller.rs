//! Single-chat poller: watch one conversation and deliver each new message exactly once,
//! oldest first.
//!
//! - Baselines the watermark to "now": history is never replayed
//! - While sleeping, a cheap counts probe gates the expensive message fetch; a fetch that
//!   finds nothing new keeps the sleep cadence
//! - Advances the watermark one delivered message at a time, so a failed enqueue never
//!   leaves undelivered messages behind the watermark
//! - Cancellation is observed at the fetch and at the inter-tick sleep

use crate::domain::{ChatId, ChatPollState, DomainError, Message};
use crate::ports::{Clock, DeliverySink, MessageQuery, RemoteGateway};
use crate::usecases::poll_config::PollConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sleeping and the probe reported nothing unread, so no fetch was made.
    Skipped,
    /// Fetched, but nothing was newer than the watermark.
    NoUpdate,
    Delivered(usize),
}

/// Poller for one conversation. The [`ChatPollState`] it drives is owned by the caller of
/// [`ChatPoller::tick`], or by [`ChatPoller::run`] itself.
pub struct ChatPoller {
    gateway: Arc<dyn RemoteGateway>,
    sink: Arc<dyn DeliverySink>,
    clock: Arc<dyn Clock>,
    chat_id: ChatId,
    config: PollConfig,
}

impl ChatPoller {
    pub fn new(
        gateway: Arc<dyn RemoteGateway>,
        sink: Arc<dyn DeliverySink>,
        clock: Arc<dyn Clock>,
        chat_id: ChatId,
        config: PollConfig,
    ) -> Self {
        Self {
            gateway,
            sink,
            clock,
            chat_id,
            config,
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    /// Fresh state baselined to the current time.
    pub fn start_state(&self) -> ChatPollState {
        ChatPollState::create(self.chat_id.clone(), self.clock.now())
    }

    /// Run until `cancel` fires or a loop-ending error occurs. Cancellation returns `Ok`.
    ///
    /// Tick-local errors (transport, bad timestamps, undecodable payloads) are logged and the
    /// next scheduled tick acts as the retry. Remote faults and sink failures end the loop.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), DomainError> {
        let mut state = self.start_state();
        info!(
            chat_id = %self.chat_id,
            baseline = state.last_seen(),
            "poller started"
        );

        loop {
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                outcome = self.tick(&mut state) => outcome,
            };

            match outcome {
                Ok(TickOutcome::Delivered(n)) => {
                    info!(chat_id = %self.chat_id, delivered = n, "new messages delivered");
                }
                Ok(other) => debug!(chat_id = %self.chat_id, outcome = ?other, "tick done"),
                Err(e) if e.is_tick_local() => {
                    warn!(chat_id = %self.chat_id, error = %e, "tick failed; retrying next tick");
                }
                Err(e) => {
                    error!(chat_id = %self.chat_id, error = %e, "poller stopped");
                    return Err(e);
                }
            }

            let pause = self.config.interval_for(state.phase());
            if !sleep_or_cancel(&cancel, pause).await {
                break;
            }
        }

        info!(chat_id = %self.chat_id, last_seen = state.last_seen(), "poller cancelled");
        Ok(())
    }

    /// One polling step against `state`.
    pub async fn tick(&self, state: &mut ChatPollState) -> Result<TickOutcome, DomainError> {
        let now = self.clock.now();
        if let Some(phase) = state
            .watermark_mut()
            .refresh_phase(now, self.config.sleep_threshold)
        {
            info!(
                chat_id = %state.chat_id(),
                %phase,
                idle_secs = now - state.last_seen(),
                "phase changed"
            );
        }

        if state.is_sleeping() {
            let counts = self
                .gateway
                .fetch_counts(Some(std::slice::from_ref(state.chat_id())), false)
                .await?;
            let unread = counts.unread_for(state.chat_id());
            if unread == 0 {
                debug!(chat_id = %state.chat_id(), "sleeping; nothing unread");
                return Ok(TickOutcome::Skipped);
            }
            debug!(chat_id = %state.chat_id(), unread, "unread while sleeping; fetching");
        }

        let query = MessageQuery::default().incoming_only(self.config.incoming_only);
        let messages = self.gateway.fetch_messages(state.chat_id(), &query).await?;

        // No awaits past this point: a cancelled tick never stops halfway through delivery.
        let Some(newest) = messages.last().map(|m| m.date) else {
            return Ok(TickOutcome::NoUpdate);
        };
        let fresh = state.watermark().unseen(messages);
        let delivered = self.deliver(state, fresh)?;
        state.advance(newest);

        // Wakes only if a delivery moved the watermark back within the threshold.
        if let Some(phase) = state
            .watermark_mut()
            .refresh_phase(now, self.config.sleep_threshold)
        {
            info!(chat_id = %state.chat_id(), %phase, "phase changed");
        }

        Ok(match delivered {
            0 => TickOutcome::NoUpdate,
            n => TickOutcome::Delivered(n),
        })
    }

    fn deliver(
        &self,
        state: &mut ChatPollState,
        fresh: Vec<Message>,
    ) -> Result<usize, DomainError> {
        let total = fresh.len();
        for (i, msg) in fresh.into_iter().enumerate() {
            let date = msg.date;
            if let Err(e) = self.sink.enqueue(msg) {
                error!(
                    chat_id = %state.chat_id(),
                    delivered = i,
                    undelivered = total - i,
                    error = %e,
                    "enqueue failed"
                );
                return Err(e);
            }
            state.advance(date);
        }
        Ok(total)
    }
}

/// Sleep for `pause` unless cancelled first. Returns false on cancellation.
pub(crate) async fn sleep_or_cancel(cancel: &CancellationToken, pause: Duration) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(pause) => true,
    }
}
