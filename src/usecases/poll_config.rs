//! Per-poller configuration: cadence for each phase, the inactivity threshold and the
//! optional chat allow-list.

use crate::domain::{ChatId, DomainError, Phase};
use std::time::Duration;

pub const DEFAULT_NORMAL_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_SLEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_SLEEP_THRESHOLD: Duration = Duration::from_secs(300);

/// Extra messages fetched on top of the reported unread count in aggregate mode. Unread
/// counts can lag behind messages arriving between the probe and the fetch.
pub const DEFAULT_FETCH_MARGIN: u32 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub normal_interval: Duration,
    pub sleep_interval: Duration,
    /// Inactivity after which the poller enters the sleeping phase.
    pub sleep_threshold: Duration,
    /// Restrict aggregate polling to these chats. `None` watches every chat.
    pub chat_filter: Option<Vec<ChatId>>,
    pub fetch_margin: u32,
    /// Ask the counts probe for notification, feed and inbox counters too (aggregate mode).
    pub include_others: bool,
    /// Skip messages written by our own participant.
    pub incoming_only: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_NORMAL_INTERVAL,
            DEFAULT_SLEEP_INTERVAL,
            DEFAULT_SLEEP_THRESHOLD,
        )
    }
}

impl PollConfig {
    pub fn new(
        normal_interval: Duration,
        sleep_interval: Duration,
        sleep_threshold: Duration,
    ) -> Self {
        Self {
            normal_interval,
            sleep_interval,
            sleep_threshold,
            chat_filter: None,
            fetch_margin: DEFAULT_FETCH_MARGIN,
            include_others: false,
            incoming_only: false,
        }
    }

    /// Same cadence in both phases. The phase then only decides whether a counts probe gates
    /// the message fetch.
    pub fn uniform(interval: Duration, sleep_threshold: Duration) -> Self {
        Self::new(interval, interval, sleep_threshold)
    }

    pub fn with_chat_filter(mut self, chats: Vec<ChatId>) -> Self {
        self.chat_filter = Some(chats);
        self
    }

    pub fn with_fetch_margin(mut self, margin: u32) -> Self {
        self.fetch_margin = margin;
        self
    }

    pub fn with_include_others(mut self, include_others: bool) -> Self {
        self.include_others = include_others;
        self
    }

    pub fn with_incoming_only(mut self, incoming_only: bool) -> Self {
        self.incoming_only = incoming_only;
        self
    }

    /// Delay before the next tick.
    pub fn interval_for(&self, phase: Phase) -> Duration {
        match phase {
            Phase::Normal => self.normal_interval,
            Phase::Sleeping => self.sleep_interval,
        }
    }

    /// True when `chat_id` passes the allow-list (always, without one).
    pub fn watches(&self, chat_id: &ChatId) -> bool {
        self.chat_filter
            .as_ref()
            .is_none_or(|chats| chats.contains(chat_id))
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.normal_interval.is_zero() {
            return Err(DomainError::Config("normal interval must be positive".into()));
        }
        if self.sleep_interval.is_zero() {
            return Err(DomainError::Config("sleep interval must be positive".into()));
        }
        if matches!(&self.chat_filter, Some(chats) if chats.is_empty()) {
            return Err(DomainError::Config(
                "chat filter is set but lists no chats".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_follows_phase() {
        let cfg = PollConfig::new(
            Duration::from_secs(2),
            Duration::from_secs(20),
            Duration::from_secs(60),
        );
        assert_eq!(cfg.interval_for(Phase::Normal), Duration::from_secs(2));
        assert_eq!(cfg.interval_for(Phase::Sleeping), Duration::from_secs(20));

        let uniform = PollConfig::uniform(Duration::from_secs(5), Duration::from_secs(60));
        assert_eq!(uniform.interval_for(Phase::Sleeping), Duration::from_secs(5));
    }

    #[test]
    fn watches_everything_without_filter() {
        let cfg = PollConfig::default();
        assert!(cfg.watches(&ChatId::from("1")));

        let cfg = cfg.with_chat_filter(vec![ChatId::from("2")]);
        assert!(!cfg.watches(&ChatId::from("1")));
        assert!(cfg.watches(&ChatId::from("2")));
    }

    #[test]
    fn validate_rejects_zero_interval_and_empty_filter() {
        assert!(PollConfig::default().validate().is_ok());

        let zero = PollConfig::uniform(Duration::ZERO, Duration::from_secs(1));
        assert!(matches!(zero.validate(), Err(DomainError::Config(_))));

        let empty = PollConfig::default().with_chat_filter(Vec::new());
        assert!(matches!(empty.validate(), Err(DomainError::Config(_))));
    }
}
