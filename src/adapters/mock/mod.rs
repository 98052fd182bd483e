//! Mock adapters. Stand in for the remote service in use-case tests.

pub mod gateway;

pub use gateway::{GatewayCall, ScriptedGateway};
