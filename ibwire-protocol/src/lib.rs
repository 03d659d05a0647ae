//! # ibwire-protocol
//!
//! Wire protocol implementation for the trading gateway's token protocol.
//!
//! This crate provides:
//! - Null-terminated token codec with "unset" sentinels
//! - Request encoding gated on the negotiated server version
//! - Response decoding gated on each message's version stamp
//! - Domain types for contracts, orders and executions
//! - Error codes and protocol constants
//!
//! It performs no IO; see `ibwire-client` for the connection and dispatcher.

pub mod codec;
pub mod contract;
pub mod error;
pub mod execution;
pub mod kind;
pub mod message;
pub mod order;
mod placement;
pub mod request;
pub mod response;
pub mod token;

pub use codec::{Decoder, Encoder};
pub use contract::{
    ComboLeg, Contract, ContractDetails, ScannerSubscription, TagValue, UnderComp, BAG_SEC_TYPE,
};
pub use error::{ErrorCode, ProtocolError};
pub use execution::{CommissionReport, Execution, ExecutionFilter};
pub use kind::{server_version, tick_type, IncomingKind, OutgoingKind};
pub use message::{ErrorMessage, Incoming};
pub use order::{Order, OrderComboLeg, OrderState};
pub use request::{OutgoingMessage, RequestEncoder};

/// Capability version announced by this client during the handshake.
pub const CLIENT_VERSION: i32 = 63;

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 7496;
