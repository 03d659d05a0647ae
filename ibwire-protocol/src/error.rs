//! Protocol error types and client error codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while encoding requests or decoding server messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("incomplete message: more bytes required")]
    Incomplete,

    #[error("invalid integer token: {0:?}")]
    InvalidInt(String),

    #[error("invalid long token: {0:?}")]
    InvalidLong(String),

    #[error("invalid double token: {0:?}")]
    InvalidDouble(String),

    #[error("invalid boolean token: {0:?}")]
    InvalidBool(String),

    #[error("unknown message kind: {0}")]
    UnknownMessageKind(i32),

    #[error("server version {server_version} does not support {field} (requires {required})")]
    UnsupportedByServer {
        field: &'static str,
        id: Option<i32>,
        required: i32,
        server_version: i32,
    },

    #[error("verify requests need a session opened with extra authentication")]
    ExtraAuthRequired,
}

impl ProtocolError {
    /// Returns whether the read loop must stop after this error.
    ///
    /// An unknown kind only loses the tag itself; everything else leaves the
    /// stream at an unknown position.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, ProtocolError::UnknownMessageKind(_))
    }
}

/// Client-side error codes, reported alongside failures and mirrored on the
/// error channel next to the server's own error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Session errors
    AlreadyConnected,
    ConnectFail,
    UpdateTws,
    NotConnected,
    UnknownId,
    UnsupportedVersion,
    BadLength,
    BadMessage,
    SocketException,

    // Send failures
    FailSendReqMkt,
    FailSendCanMkt,
    FailSendOrder,
    FailSendAcct,
    FailSendExec,
    FailSendCOrder,
    FailSendOOrder,
    UnknownContract,
    FailSendReqContract,
    FailSendReqMktDepth,
    FailSendCanMktDepth,
    FailSendServerLogLevel,
    FailSendFaRequest,
    FailSendFaReplace,
    FailSendReqScanner,
    FailSendCanScanner,
    FailSendReqScannerParameters,
    FailSendReqHistData,
    FailSendCanHistData,
    FailSendReqRtBars,
    FailSendCanRtBars,
    FailSendReqCurrTime,
    FailSendReqFundData,
    FailSendCanFundData,
    FailSendReqCalcImpliedVolat,
    FailSendReqCalcOptionPrice,
    FailSendCanCalcImpliedVolat,
    FailSendCanCalcOptionPrice,
    FailSendReqGlobalCancel,
    FailSendReqMarketDataType,
    FailSendReqPositions,
    FailSendCanPositions,
    FailSendReqAccountData,
    FailSendCanAccountData,
    FailSendVerifyRequest,
    FailSendVerifyMessage,
    FailSendQueryDisplayGroups,
    FailSendSubscribeToGroupEvents,
    FailSendUpdateDisplayGroup,
    FailSendUnsubscribeFromGroupEvents,
    FailSendStartApi,
    FailGeneric,
}

impl ErrorCode {
    fn entry(&self) -> (i32, &'static str, &'static str) {
        use ErrorCode::*;
        match self {
            AlreadyConnected => (501, "ALREADY_CONNECTED", "Already connected."),
            ConnectFail => (502, "CONNECT_FAIL", "Couldn't connect to TWS."),
            UpdateTws => (
                503,
                "UPDATE_TWS",
                "The TWS is out of date and must be upgraded.",
            ),
            NotConnected => (504, "NOT_CONNECTED", "Not connected"),
            UnknownId => (505, "UNKNOWN_ID", "Fatal Error: Unknown message id."),
            UnsupportedVersion => (506, "UNSUPPORTED_VERSION", "Unsupported version"),
            BadLength => (507, "BAD_LENGTH", "Bad message length"),
            BadMessage => (508, "BAD_MESSAGE", "Bad message"),
            SocketException => (
                509,
                "SOCKET_EXCEPTION",
                "Exception caught while reading socket",
            ),
            FailSendReqMkt => (
                510,
                "FAIL_SEND_REQMKT",
                "Request Market Data Sending Error",
            ),
            FailSendCanMkt => (511, "FAIL_SEND_CANMKT", "Cancel Market Data Sending Error"),
            FailSendOrder => (512, "FAIL_SEND_ORDER", "Order Sending Error"),
            FailSendAcct => (
                513,
                "FAIL_SEND_ACCT",
                "Account Update Request Sending Error",
            ),
            FailSendExec => (514, "FAIL_SEND_EXEC", "Request For Executions Sending Error"),
            FailSendCOrder => (515, "FAIL_SEND_CORDER", "Cancel Order Sending Error"),
            FailSendOOrder => (516, "FAIL_SEND_OORDER", "Request Open Order Sending Error"),
            UnknownContract => (
                517,
                "UNKNOWN_CONTRACT",
                "Unknown contract. Verify the contract details supplied.",
            ),
            FailSendReqContract => (
                518,
                "FAIL_SEND_REQCONTRACT",
                "Request Contract Data Sending Error",
            ),
            FailSendReqMktDepth => (
                519,
                "FAIL_SEND_REQMKTDEPTH",
                "Request Market Depth Sending Error",
            ),
            FailSendCanMktDepth => (
                520,
                "FAIL_SEND_CANMKTDEPTH",
                "Cancel Market Depth Sending Error",
            ),
            FailSendServerLogLevel => (
                521,
                "FAIL_SEND_SERVER_LOG_LEVEL",
                "Set Server Log Level Sending Error",
            ),
            FailSendFaRequest => (
                522,
                "FAIL_SEND_FA_REQUEST",
                "FA Information Request Sending Error",
            ),
            FailSendFaReplace => (
                523,
                "FAIL_SEND_FA_REPLACE",
                "FA Information Replace Sending Error",
            ),
            FailSendReqScanner => (
                524,
                "FAIL_SEND_REQSCANNER",
                "Request Scanner Subscription Sending Error",
            ),
            FailSendCanScanner => (
                525,
                "FAIL_SEND_CANSCANNER",
                "Cancel Scanner Subscription Sending Error",
            ),
            FailSendReqScannerParameters => (
                526,
                "FAIL_SEND_REQSCANNERPARAMETERS",
                "Request Scanner Parameter Sending Error",
            ),
            FailSendReqHistData => (
                527,
                "FAIL_SEND_REQHISTDATA",
                "Request Historical Data Sending Error",
            ),
            FailSendCanHistData => (
                528,
                "FAIL_SEND_CANHISTDATA",
                "Cancel Historical Data Sending Error",
            ),
            FailSendReqRtBars => (
                529,
                "FAIL_SEND_REQRTBARS",
                "Request Real-time Bar Data Sending Error",
            ),
            FailSendCanRtBars => (
                530,
                "FAIL_SEND_CANRTBARS",
                "Cancel Real-time Bar Data Sending Error",
            ),
            FailSendReqCurrTime => (
                531,
                "FAIL_SEND_REQCURRTIME",
                "Request Current Time Sending Error",
            ),
            FailSendReqFundData => (
                532,
                "FAIL_SEND_REQFUNDDATA",
                "Request Fundamental Data Sending Error",
            ),
            FailSendCanFundData => (
                533,
                "FAIL_SEND_CANFUNDDATA",
                "Cancel Fundamental Data Sending Error",
            ),
            FailSendReqCalcImpliedVolat => (
                534,
                "FAIL_SEND_REQCALCIMPLIEDVOLAT",
                "Request Calculate Implied Volatility Sending Error",
            ),
            FailSendReqCalcOptionPrice => (
                535,
                "FAIL_SEND_REQCALCOPTIONPRICE",
                "Request Calculate Option Price Sending Error",
            ),
            FailSendCanCalcImpliedVolat => (
                536,
                "FAIL_SEND_CANCALCIMPLIEDVOLAT",
                "Cancel Calculate Implied Volatility Sending Error",
            ),
            FailSendCanCalcOptionPrice => (
                537,
                "FAIL_SEND_CANCALCOPTIONPRICE",
                "Cancel Calculate Option Price Sending Error",
            ),
            FailSendReqGlobalCancel => (
                538,
                "FAIL_SEND_REQGLOBALCANCEL",
                "Request Global Cancel Sending Error",
            ),
            FailSendReqMarketDataType => (
                539,
                "FAIL_SEND_REQMARKETDATATYPE",
                "Request Market Data Type Sending Error",
            ),
            FailSendReqPositions => (
                540,
                "FAIL_SEND_REQPOSITIONS",
                "Request Positions Sending Error",
            ),
            FailSendCanPositions => (
                541,
                "FAIL_SEND_CANPOSITIONS",
                "Cancel Positions Sending Error",
            ),
            FailSendReqAccountData => (
                542,
                "FAIL_SEND_REQACCOUNTDATA",
                "Request Account Data Sending Error",
            ),
            FailSendCanAccountData => (
                543,
                "FAIL_SEND_CANACCOUNTDATA",
                "Cancel Account Data Sending Error",
            ),
            FailSendVerifyRequest => (
                544,
                "FAIL_SEND_VERIFYREQUEST",
                "Verify Request Sending Error",
            ),
            FailSendVerifyMessage => (
                545,
                "FAIL_SEND_VERIFYMESSAGE",
                "Verify Message Sending Error",
            ),
            FailSendQueryDisplayGroups => (
                546,
                "FAIL_SEND_QUERYDISPLAYGROUPS",
                "Query Display Groups Sending Error",
            ),
            FailSendSubscribeToGroupEvents => (
                547,
                "FAIL_SEND_SUBSCRIBETOGROUPEVENTS",
                "Subscribe To Group Events Sending Error",
            ),
            FailSendUpdateDisplayGroup => (
                548,
                "FAIL_SEND_UPDATEDISPLAYGROUP",
                "Update Display Group Sending Error",
            ),
            FailSendUnsubscribeFromGroupEvents => (
                549,
                "FAIL_SEND_UNSUBSCRIBEFROMGROUPEVENTS",
                "Unsubscribe From Group Events Sending Error",
            ),
            FailSendStartApi => (550, "FAIL_SEND_STARTAPI", "Start API Sending Error"),
            FailGeneric => (
                -1,
                "FAIL_GENERIC",
                "Specific error message needs to be given for these requests!",
            ),
        }
    }

    /// Numeric code as reported to callers.
    pub fn code(&self) -> i32 {
        self.entry().0
    }

    /// Human readable description.
    pub fn message(&self) -> &'static str {
        self.entry().2
    }

    /// Returns whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConnectFail | ErrorCode::SocketException | ErrorCode::NotConnected
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entry().1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_numbers() {
        assert_eq!(ErrorCode::NotConnected.code(), 504);
        assert_eq!(ErrorCode::UpdateTws.code(), 503);
        assert_eq!(ErrorCode::UnknownId.code(), 505);
        assert_eq!(ErrorCode::FailSendReqMkt.code(), 510);
        assert_eq!(ErrorCode::FailSendOrder.code(), 512);
        assert_eq!(ErrorCode::FailSendStartApi.code(), 550);
        assert_eq!(ErrorCode::FailGeneric.code(), -1);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(format!("{}", ErrorCode::NotConnected), "NOT_CONNECTED");
        assert_eq!(format!("{}", ErrorCode::FailSendCOrder), "FAIL_SEND_CORDER");
        assert_eq!(
            format!("{}", ErrorCode::FailSendReqHistData),
            "FAIL_SEND_REQHISTDATA"
        );
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::UpdateTws).unwrap();
        assert_eq!(json, "\"UPDATE_TWS\"");

        let parsed: ErrorCode = serde_json::from_str("\"NOT_CONNECTED\"").unwrap();
        assert_eq!(parsed, ErrorCode::NotConnected);
    }

    #[test]
    fn test_error_code_retryable() {
        assert!(ErrorCode::ConnectFail.is_retryable());
        assert!(ErrorCode::SocketException.is_retryable());
        assert!(!ErrorCode::UpdateTws.is_retryable());
        assert!(!ErrorCode::FailSendOrder.is_retryable());
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidInt("abc".to_string());
        assert!(err.to_string().contains("abc"));

        let err = ProtocolError::UnknownMessageKind(99);
        assert!(err.to_string().contains("99"));

        let err = ProtocolError::UnsupportedByServer {
            field: "TrailingPercent",
            id: Some(7),
            required: 62,
            server_version: 38,
        };
        let msg = err.to_string();
        assert!(msg.contains("TrailingPercent"));
        assert!(msg.contains("62"));
        assert!(msg.contains("38"));
    }

    #[test]
    fn test_only_unknown_kind_is_recoverable() {
        assert!(!ProtocolError::UnknownMessageKind(3000).is_fatal());
        assert!(ProtocolError::InvalidDouble("x".to_string()).is_fatal());
        assert!(ProtocolError::Incomplete.is_fatal());
    }
}
