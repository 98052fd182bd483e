//! Application configuration. Session identity, headers, polling cadence.
//!
//! Read from `CHATPOLL_*` environment variables (a `.env` file is honoured) and, when
//! `CHATPOLL_CONFIG` names one, a config file (TOML, YAML or JSON by extension).

use crate::adapters::tumblr::DEFAULT_BASE_URL;
use crate::domain::{ChatId, DomainError};
use crate::usecases::poll_config::{
    DEFAULT_FETCH_MARGIN, DEFAULT_NORMAL_INTERVAL, DEFAULT_SLEEP_INTERVAL,
    DEFAULT_SLEEP_THRESHOLD, PollConfig,
};
use serde::Deserialize;
use std::time::Duration;

/// Default capacity of the delivery channel between pollers and the consumer. When full,
/// the poller stops with `SinkFull` rather than dropping messages.
pub const DEFAULT_SINK_CAPACITY: usize = 1000;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 20;

/// How the configured chats are watched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollMode {
    /// One poller per chat, each fetching its own messages.
    #[default]
    Single,
    /// One poller for all chats, driven by a shared counts probe.
    Aggregate,
}

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Our blog name (without `.tumblr.com`). Read from CHATPOLL_PARTICIPANT.
    pub participant: Option<String>,
    /// Mention key of our blog, scopes the counts probe. Read from CHATPOLL_MENTION_KEY.
    pub mention_key: Option<String>,
    /// Session headers as `Name: value` lines (cookie, form key). Config file only.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Service root. Defaults to https://www.tumblr.com.
    pub base_url: Option<String>,

    /// Chats to watch. Comma separated in CHATPOLL_CHATS. Empty in aggregate mode means all.
    #[serde(default)]
    pub chats: Vec<String>,
    #[serde(default)]
    pub mode: Option<PollMode>,

    // ─────────────────────────────────────────────────────────────────────────
    // Cadence
    // ─────────────────────────────────────────────────────────────────────────
    /// One interval for both phases. Overridden per phase by the two settings below.
    pub poll_interval_secs: Option<f64>,
    pub normal_interval_secs: Option<f64>,
    pub sleep_interval_secs: Option<f64>,
    /// Inactivity before switching to the sleeping phase.
    pub sleep_threshold_secs: Option<f64>,
    /// Extra messages fetched beyond the unread count in aggregate mode.
    pub fetch_margin: Option<u32>,
    #[serde(default)]
    pub include_others: bool,
    #[serde(default)]
    pub incoming_only: bool,

    pub sink_capacity: Option<usize>,
    pub request_timeout_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("CHATPOLL_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        c = c.add_source(
            config::Environment::with_prefix("CHATPOLL")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("chats"),
        );
        c.build()?.try_deserialize()
    }

    pub fn mode_or_default(&self) -> PollMode {
        self.mode.unwrap_or_default()
    }

    pub fn base_url_or_default(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn sink_capacity_or_default(&self) -> usize {
        self.sink_capacity.unwrap_or(DEFAULT_SINK_CAPACITY)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn chat_ids(&self) -> Vec<ChatId> {
        self.chats
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(ChatId::from)
            .collect()
    }

    /// Build the validated poller configuration. Per-phase intervals win over
    /// `poll_interval_secs`, which wins over the defaults.
    pub fn poll_config(&self) -> Result<PollConfig, DomainError> {
        let shared = self.poll_interval_secs;
        let normal = secs_or(
            "normal_interval_secs",
            self.normal_interval_secs.or(shared),
            DEFAULT_NORMAL_INTERVAL,
        )?;
        let sleep = secs_or(
            "sleep_interval_secs",
            self.sleep_interval_secs.or(shared),
            DEFAULT_SLEEP_INTERVAL,
        )?;
        let threshold = secs_or(
            "sleep_threshold_secs",
            self.sleep_threshold_secs,
            DEFAULT_SLEEP_THRESHOLD,
        )?;

        let mut cfg = PollConfig::new(normal, sleep, threshold)
            .with_fetch_margin(self.fetch_margin.unwrap_or(DEFAULT_FETCH_MARGIN))
            .with_include_others(self.include_others)
            .with_incoming_only(self.incoming_only);
        let chats = self.chat_ids();
        if !chats.is_empty() {
            cfg = cfg.with_chat_filter(chats);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn secs_or(key: &str, value: Option<f64>, default: Duration) -> Result<Duration, DomainError> {
    match value {
        None => Ok(default),
        Some(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|e| DomainError::Config(format!("{} = {}: {}", key, secs, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let cfg = AppConfig::default().poll_config().unwrap();
        assert_eq!(cfg.normal_interval, DEFAULT_NORMAL_INTERVAL);
        assert_eq!(cfg.sleep_interval, DEFAULT_SLEEP_INTERVAL);
        assert_eq!(cfg.sleep_threshold, DEFAULT_SLEEP_THRESHOLD);
        assert_eq!(cfg.chat_filter, None);
        assert_eq!(AppConfig::default().mode_or_default(), PollMode::Single);
    }

    #[test]
    fn single_interval_applies_to_both_phases_unless_overridden() {
        let app = AppConfig {
            poll_interval_secs: Some(7.5),
            ..AppConfig::default()
        };
        let cfg = app.poll_config().unwrap();
        assert_eq!(cfg.normal_interval, Duration::from_secs_f64(7.5));
        assert_eq!(cfg.sleep_interval, Duration::from_secs_f64(7.5));

        let app = AppConfig {
            poll_interval_secs: Some(7.5),
            sleep_interval_secs: Some(60.0),
            ..AppConfig::default()
        };
        let cfg = app.poll_config().unwrap();
        assert_eq!(cfg.normal_interval, Duration::from_secs_f64(7.5));
        assert_eq!(cfg.sleep_interval, Duration::from_secs(60));
    }

    #[test]
    fn negative_or_zero_interval_is_rejected() {
        let negative = AppConfig {
            normal_interval_secs: Some(-1.0),
            ..AppConfig::default()
        };
        assert!(matches!(negative.poll_config(), Err(DomainError::Config(_))));

        let zero = AppConfig {
            sleep_interval_secs: Some(0.0),
            ..AppConfig::default()
        };
        assert!(matches!(zero.poll_config(), Err(DomainError::Config(_))));
    }

    #[test]
    fn chats_become_filter() {
        let app = AppConfig {
            chats: vec![" 123 ".into(), "".into(), "456".into()],
            ..AppConfig::default()
        };
        let cfg = app.poll_config().unwrap();
        assert_eq!(
            cfg.chat_filter,
            Some(vec![ChatId::from("123"), ChatId::from("456")])
        );
    }

    #[test]
    fn mode_deserializes_lowercase() {
        let mode: PollMode = serde_json::from_str("\"aggregate\"").unwrap();
        assert_eq!(mode, PollMode::Aggregate);
    }
}
