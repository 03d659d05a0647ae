//! # ibwire-client
//!
//! Async client for the trading gateway's token protocol.
//!
//! This crate provides:
//! - Connection management and version negotiation
//! - A background dispatcher that decodes and routes responses
//! - Per-kind FIFO correlation of responses with their callers
//! - A high-level [`Client`] with one method per request
//! - YAML and environment configuration

pub mod client;
pub mod config;
pub mod connection;
pub mod correlation;
pub mod dispatcher;
pub mod error;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{Client, MarketSnapshot};
pub use config::{Config, ConfigError};
pub use connection::{Connection, ConnectionConfig, ConnectionState};
pub use correlation::{Correlator, Pending, PendingQueue, Subscription};
pub use dispatcher::{DispatchEvent, Dispatcher};
pub use error::ClientError;
pub use stream::{ClientStream, Transport};
