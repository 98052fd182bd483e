//! Polling state: the watermark of delivered messages and the backoff phase.
//!
//! [`Watermark`] is the primitive shared by both poller modes. [`ChatPollState`] binds one
//! to a conversation for single-chat polling.

use crate::domain::{ChatId, Message};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Normal,
    Sleeping,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Normal => f.write_str("normal"),
            Phase::Sleeping => f.write_str("sleeping"),
        }
    }
}

/// Boundary timestamp of delivered messages plus the current phase.
///
/// `last_seen` never moves backwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Watermark {
    last_seen: f64,
    phase: Phase,
}

impl Watermark {
    /// Baseline at `now`: anything dated at or before it counts as already seen.
    pub fn new(now: f64) -> Self {
        Self {
            last_seen: now,
            phase: Phase::Normal,
        }
    }

    pub fn last_seen(&self) -> f64 {
        self.last_seen
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_sleeping(&self) -> bool {
        self.phase == Phase::Sleeping
    }

    /// Move the watermark forward. Returns false (and changes nothing) when `ts` is not newer.
    pub fn advance(&mut self, ts: f64) -> bool {
        if ts > self.last_seen {
            self.last_seen = ts;
            true
        } else {
            false
        }
    }

    pub fn mark_sleeping(&mut self, sleeping: bool) {
        self.phase = if sleeping {
            Phase::Sleeping
        } else {
            Phase::Normal
        };
    }

    /// Re-derive the phase from inactivity: sleeping once more than `threshold` has passed
    /// since the last delivered message. Returns the new phase when it changed.
    pub fn refresh_phase(&mut self, now: f64, threshold: Duration) -> Option<Phase> {
        let idle = now - self.last_seen;
        let next = if idle > threshold.as_secs_f64() {
            Phase::Sleeping
        } else {
            Phase::Normal
        };
        if next == self.phase {
            None
        } else {
            self.phase = next;
            Some(next)
        }
    }

    /// Split off the messages newer than the watermark. Relies on `messages` being sorted
    /// oldest first: the leading run at or below the watermark is dropped and everything from
    /// the first newer message on is kept.
    pub fn unseen(&self, messages: Vec<Message>) -> Vec<Message> {
        take_newer(messages, self.last_seen)
    }
}

/// Drop the leading messages dated at or before `watermark`.
pub fn take_newer(messages: Vec<Message>, watermark: f64) -> Vec<Message> {
    messages
        .into_iter()
        .skip_while(|m| m.date <= watermark)
        .collect()
}

/// State of one watched conversation. Owned by exactly one poller.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatPollState {
    chat_id: ChatId,
    watermark: Watermark,
}

impl ChatPollState {
    /// Start watching `chat_id`, ignoring everything dated at or before `now`.
    pub fn create(chat_id: ChatId, now: f64) -> Self {
        Self {
            chat_id,
            watermark: Watermark::new(now),
        }
    }

    pub fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    pub fn last_seen(&self) -> f64 {
        self.watermark.last_seen()
    }

    pub fn phase(&self) -> Phase {
        self.watermark.phase()
    }

    pub fn is_sleeping(&self) -> bool {
        self.watermark.is_sleeping()
    }

    pub fn advance(&mut self, ts: f64) -> bool {
        self.watermark.advance(ts)
    }

    pub fn mark_sleeping(&mut self, sleeping: bool) {
        self.watermark.mark_sleeping(sleeping)
    }

    pub fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    pub fn watermark_mut(&mut self) -> &mut Watermark {
        &mut self.watermark
    }
}
