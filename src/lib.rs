//! chatpoll: watch Tumblr IM conversations and deliver new messages exactly once, in order.
//!
//! Hexagonal layout: the domain and use cases know nothing about HTTP or JSON; adapters do.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
