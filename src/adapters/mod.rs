//! Infrastructure adapters. Implement outbound ports.
//!
//! Tumblr HTTP gateway, channel sinks and clocks. Map errors to DomainError. Mocks are
//! test-only.

pub mod clock;
#[cfg(test)]
pub mod mock;
pub mod sink;
pub mod tumblr;
