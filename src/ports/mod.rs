//! Port traits. API boundaries for the hexagon.
//!
//! Outbound only: the pollers call into the remote service, the delivery sink and the clock.

pub mod outbound;

pub use outbound::{Clock, DeliverySink, MessageQuery, RemoteGateway};
