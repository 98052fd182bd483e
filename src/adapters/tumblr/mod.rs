//! Tumblr IM adapter: HTTP client and wire mapping.

pub mod client;
pub mod mapper;

pub use client::{DEFAULT_BASE_URL, TumblrGateway};
