//! Wiring & DI. Entry point: load config, build the gateway, spawn pollers, print deliveries.
//! No business logic here; polling lives in the use cases.
//!
//! Delivered messages go to stdout as JSON lines; logs go to stderr.

use chatpoll::adapters::clock::SystemClock;
use chatpoll::adapters::tumblr::TumblrGateway;
use chatpoll::domain::Message;
use chatpoll::ports::{Clock, DeliverySink, RemoteGateway};
use chatpoll::shared::config::{AppConfig, PollMode};
use chatpoll::usecases::{AggregatePoller, ChatPoller};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match &env_loaded {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(_) => debug!("no .env found"),
    }

    let cfg = AppConfig::load()?;
    let participant = cfg.participant.clone().unwrap_or_default();
    if participant.is_empty() {
        anyhow::bail!("Set CHATPOLL_PARTICIPANT to your blog name (env or .env)");
    }
    let mention_key = cfg.mention_key.clone().unwrap_or_default();
    if mention_key.is_empty() {
        anyhow::bail!("Set CHATPOLL_MENTION_KEY (env or .env)");
    }
    if cfg.headers.is_empty() {
        warn!("no session headers configured; the service will likely answer 401");
    }

    let poll_config = cfg.poll_config()?;
    let mode = cfg.mode_or_default();
    let chats = cfg.chat_ids();
    if mode == PollMode::Single && chats.is_empty() {
        anyhow::bail!("Set CHATPOLL_CHATS (comma separated) or CHATPOLL_MODE=aggregate");
    }
    info!(
        ?mode,
        chats = chats.len(),
        normal_secs = poll_config.normal_interval.as_secs_f64(),
        sleep_secs = poll_config.sleep_interval.as_secs_f64(),
        threshold_secs = poll_config.sleep_threshold.as_secs_f64(),
        "polling configured"
    );

    // --- Gateway (one HTTP client shared by every poller) ---
    let gateway: Arc<dyn RemoteGateway> = Arc::new(TumblrGateway::new(
        cfg.base_url_or_default(),
        participant,
        mention_key,
        &cfg.headers,
        cfg.request_timeout(),
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // --- Delivery: bounded channel, a full channel stops the poller instead of dropping ---
    let sink_capacity = cfg.sink_capacity_or_default();
    let (tx, rx) = mpsc::channel::<Message>(sink_capacity);
    let sink: Arc<dyn DeliverySink> = Arc::new(tx);
    let consumer = tokio::spawn(print_messages(rx));

    // --- Pollers ---
    let cancel = CancellationToken::new();
    let mut pollers = JoinSet::new();
    match mode {
        PollMode::Single => {
            for chat_id in chats {
                let poller = ChatPoller::new(
                    Arc::clone(&gateway),
                    Arc::clone(&sink),
                    Arc::clone(&clock),
                    chat_id,
                    poll_config.clone(),
                );
                let cancel = cancel.clone();
                pollers.spawn(async move {
                    let name = poller.chat_id().to_string();
                    (name, poller.run(cancel).await)
                });
            }
        }
        PollMode::Aggregate => {
            let poller = AggregatePoller::new(
                Arc::clone(&gateway),
                Arc::clone(&sink),
                Arc::clone(&clock),
                poll_config,
            );
            let cancel = cancel.clone();
            pollers.spawn(async move { ("aggregate".to_string(), poller.run(cancel).await) });
        }
    }
    // Pollers hold the only remaining senders; the consumer ends when the last one stops.
    drop(sink);

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received; stopping pollers");
            shutdown.cancel();
        }
    });

    let mut failures = 0usize;
    while let Some(joined) = pollers.join_next().await {
        match joined {
            Ok((name, Ok(()))) => info!(poller = %name, "poller finished"),
            Ok((name, Err(e))) => {
                failures += 1;
                error!(poller = %name, error = %e, "poller failed");
            }
            Err(e) => {
                failures += 1;
                error!(error = %e, "poller task aborted");
            }
        }
    }
    consumer.await?;

    if failures > 0 {
        anyhow::bail!("{} poller(s) stopped with an error", failures);
    }
    Ok(())
}

/// Print each delivered message as one JSON line.
async fn print_messages(mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        let sent_at = chrono::DateTime::from_timestamp(msg.date.trunc() as i64, 0)
            .map(|d| d.to_rfc3339())
            .unwrap_or_default();
        debug!(chat_id = %msg.chat_id, author = %msg.author, %sent_at, "message received");
        match serde_json::to_string(&msg) {
            Ok(line) => println!("{}", line),
            Err(e) => warn!(chat_id = %msg.chat_id, error = %e, "could not serialize message"),
        }
    }
    info!("delivery channel closed");
}
