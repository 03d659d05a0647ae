//! Client error types.

use ibwire_protocol::{ErrorCode, ProtocolError};
use thiserror::Error;

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not connected")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("server version {server_version} is older than the minimum {min_version}")]
    ProtocolTooOld { server_version: i32, min_version: i32 },

    #[error("server does not support {field} (requires version {required})")]
    UnsupportedByServer {
        field: &'static str,
        id: Option<i32>,
        required: i32,
    },

    #[error("verify requests need a session opened with extra authentication")]
    ExtraAuthRequired,

    #[error("{code} ({}): {source}", .code.code())]
    TransportFailure {
        code: ErrorCode,
        id: Option<i32>,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown message kind: {0}")]
    UnknownMessageKind(i32),

    #[error("malformed message: {0}")]
    MalformedMessage(ProtocolError),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("connect timeout")]
    ConnectTimeout,

    #[error("dispatcher is already running")]
    DispatcherAlreadyRunning,

    #[error("dispatcher is not running")]
    DispatcherNotRunning,
}

impl ClientError {
    pub(crate) fn transport(code: ErrorCode, id: Option<i32>, source: std::io::Error) -> Self {
        ClientError::TransportFailure { code, id, source }
    }

    /// Client error code matching this failure, if there is one.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::NotConnected => Some(ErrorCode::NotConnected),
            ClientError::AlreadyConnected => Some(ErrorCode::AlreadyConnected),
            ClientError::ProtocolTooOld { .. } => Some(ErrorCode::UpdateTws),
            ClientError::UnsupportedByServer { .. } => Some(ErrorCode::UpdateTws),
            ClientError::TransportFailure { code, .. } => Some(*code),
            ClientError::UnknownMessageKind(_) => Some(ErrorCode::UnknownId),
            ClientError::MalformedMessage(_) => Some(ErrorCode::BadMessage),
            ClientError::ConnectTimeout => Some(ErrorCode::ConnectFail),
            _ => None,
        }
    }

    /// Returns whether this error is retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::ConnectionClosed | ClientError::ConnectTimeout => true,
            ClientError::TransportFailure { code, .. } => code.is_retryable(),
            ClientError::NotConnected => true,
            _ => false,
        }
    }
}

impl From<ProtocolError> for ClientError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnsupportedByServer {
                field,
                id,
                required,
                ..
            } => ClientError::UnsupportedByServer {
                field,
                id,
                required,
            },
            ProtocolError::ExtraAuthRequired => ClientError::ExtraAuthRequired,
            ProtocolError::UnknownMessageKind(kind) => ClientError::UnknownMessageKind(kind),
            other => ClientError::MalformedMessage(other),
        }
    }
}
