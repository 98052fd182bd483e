//! Application use cases. Orchestrate domain logic via ports.

pub mod aggregate_poller;
pub mod poll_config;
pub mod poller;

pub use aggregate_poller::{AggregatePoller, AggregateTick};
pub use poll_config::PollConfig;
pub use poller::{ChatPoller, TickOutcome};
