//! Decoded server messages.
//!
//! Every incoming frame decodes into one or more [`Incoming`] values. Price
//! ticks may carry a derived size tick, and list-shaped responses expand into
//! one value per item plus an end marker.

use crate::contract::{Contract, ContractDetails, UnderComp};
use crate::error::ErrorCode;
use crate::execution::{CommissionReport, Execution};
use crate::kind::IncomingKind;
use crate::order::{Order, OrderState};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Market data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickPrice {
    pub ticker_id: i32,
    pub field: i32,
    pub price: f64,
    pub size: i32,
    pub can_auto_execute: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSize {
    pub ticker_id: i32,
    pub field: i32,
    pub size: i32,
}

/// Option greeks for a market data subscription or a calculation request.
///
/// Values the server reports as "not computed" are normalized to `f64::MAX`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOptionComputation {
    pub ticker_id: i32,
    pub field: i32,
    pub implied_volatility: f64,
    pub delta: f64,
    pub opt_price: f64,
    pub pv_dividend: f64,
    pub gamma: f64,
    pub vega: f64,
    pub theta: f64,
    pub und_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickGeneric {
    pub ticker_id: i32,
    pub field: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickString {
    pub ticker_id: i32,
    pub field: i32,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickEfp {
    pub ticker_id: i32,
    pub field: i32,
    pub basis_points: f64,
    pub formatted_basis_points: String,
    pub implied_future: f64,
    pub hold_days: i32,
    pub future_expiry: String,
    pub dividend_impact: f64,
    pub dividends_to_expiry: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSnapshotEnd {
    pub req_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataType {
    pub req_id: i32,
    pub market_data_type: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDepth {
    pub ticker_id: i32,
    pub position: i32,
    pub operation: i32,
    pub side: i32,
    pub price: f64,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDepthL2 {
    pub ticker_id: i32,
    pub position: i32,
    pub market_maker: String,
    pub operation: i32,
    pub side: i32,
    pub price: f64,
    pub size: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeltaNeutralValidation {
    pub req_id: i32,
    pub under_comp: UnderComp,
}

// =============================================================================
// Orders and executions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub order_id: i32,
    pub status: String,
    pub filled: i32,
    pub remaining: i32,
    pub avg_fill_price: f64,
    pub perm_id: i32,
    pub parent_id: i32,
    pub last_fill_price: f64,
    pub client_id: i32,
    pub why_held: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenOrder {
    pub order_id: i32,
    pub contract: Contract,
    pub order: Order,
    pub order_state: OrderState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextValidId {
    pub order_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionData {
    /// `-1` when the server predates request ids on executions.
    pub req_id: i32,
    pub contract: Contract,
    pub execution: Execution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionDataEnd {
    pub req_id: i32,
}

// =============================================================================
// Account and positions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountValue {
    pub key: String,
    pub value: String,
    pub currency: String,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioValue {
    pub contract: Contract,
    pub position: i32,
    pub market_price: f64,
    pub market_value: f64,
    pub average_cost: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdateTime {
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountDownloadEnd {
    pub account: String,
}

/// Comma separated list of the accounts visible to this session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedAccounts {
    pub accounts: String,
}

impl ManagedAccounts {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.accounts
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiveFa {
    pub fa_data_type: i32,
    pub xml: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub account: String,
    pub contract: Contract,
    pub position: i32,
    pub avg_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub req_id: i32,
    pub account: String,
    pub tag: String,
    pub value: String,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummaryEnd {
    pub req_id: i32,
}

// =============================================================================
// Contracts and reference data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractData {
    pub req_id: i32,
    pub details: ContractDetails,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractDataEnd {
    pub req_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundamentalData {
    pub req_id: i32,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsBulletin {
    pub msg_id: i32,
    pub msg_type: i32,
    pub message: String,
    pub orig_exchange: String,
}

// =============================================================================
// Historical, real-time and scanner data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub req_id: i32,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub wap: f64,
    pub has_gaps: bool,
    /// `-1` when the server does not report a trade count.
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalDataEnd {
    pub req_id: i32,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealTimeBar {
    pub req_id: i32,
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    pub wap: f64,
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerParameters {
    pub xml: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerData {
    pub req_id: i32,
    pub rank: i32,
    pub details: ContractDetails,
    pub distance: String,
    pub benchmark: String,
    pub projection: String,
    pub legs_str: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerDataEnd {
    pub req_id: i32,
}

// =============================================================================
// Session and system
// =============================================================================

/// An error or notice, either sent by the server or raised by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Request or ticker id; `-1` when not tied to a request.
    pub id: i32,
    pub code: i32,
    pub message: String,
}

impl ErrorMessage {
    /// Builds a client-side report for the given code.
    pub fn client(code: ErrorCode, detail: impl AsRef<str>) -> Self {
        let detail = detail.as_ref();
        let message = if detail.is_empty() {
            code.message().to_string()
        } else {
            format!("{} {}", code.message(), detail)
        };
        Self {
            id: -1,
            code: code.code(),
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTime {
    /// Seconds since the Unix epoch.
    pub time: i64,
}

impl CurrentTime {
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyMessageApi {
    pub api_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyCompleted {
    pub is_successful: bool,
    pub error_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGroupList {
    pub req_id: i32,
    /// `|` separated group ids.
    pub groups: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGroupUpdated {
    pub req_id: i32,
    pub contract_info: String,
}

// =============================================================================
// Envelope
// =============================================================================

/// A single decoded server message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Incoming {
    TickPrice(TickPrice),
    TickSize(TickSize),
    TickOptionComputation(TickOptionComputation),
    TickGeneric(TickGeneric),
    TickString(TickString),
    TickEfp(TickEfp),
    TickSnapshotEnd(TickSnapshotEnd),
    MarketDataType(MarketDataType),
    MarketDepth(MarketDepth),
    MarketDepthL2(MarketDepthL2),
    DeltaNeutralValidation(DeltaNeutralValidation),

    OrderStatus(OrderStatus),
    OpenOrder(Box<OpenOrder>),
    OpenOrderEnd,
    NextValidId(NextValidId),
    ExecutionData(Box<ExecutionData>),
    ExecutionDataEnd(ExecutionDataEnd),
    CommissionReport(CommissionReport),

    AccountValue(AccountValue),
    PortfolioValue(Box<PortfolioValue>),
    AccountUpdateTime(AccountUpdateTime),
    AccountDownloadEnd(AccountDownloadEnd),
    ManagedAccounts(ManagedAccounts),
    ReceiveFa(ReceiveFa),
    Position(Box<Position>),
    PositionEnd,
    AccountSummary(AccountSummary),
    AccountSummaryEnd(AccountSummaryEnd),

    ContractData(Box<ContractData>),
    BondContractData(Box<ContractData>),
    ContractDataEnd(ContractDataEnd),
    FundamentalData(FundamentalData),
    NewsBulletin(NewsBulletin),

    HistoricalData(HistoricalBar),
    HistoricalDataEnd(HistoricalDataEnd),
    RealTimeBar(RealTimeBar),
    ScannerParameters(ScannerParameters),
    ScannerData(Box<ScannerData>),
    ScannerDataEnd(ScannerDataEnd),

    Error(ErrorMessage),
    CurrentTime(CurrentTime),
    VerifyMessageApi(VerifyMessageApi),
    VerifyCompleted(VerifyCompleted),
    DisplayGroupList(DisplayGroupList),
    DisplayGroupUpdated(DisplayGroupUpdated),
}

impl Incoming {
    /// The wire kind this message was decoded from.
    ///
    /// Synthesized values report the kind of the frame that produced them,
    /// so a derived size tick reports `TickSize` and an end marker reports
    /// the kind of its list.
    pub fn kind(&self) -> IncomingKind {
        use Incoming::*;
        match self {
            TickPrice(_) => IncomingKind::TickPrice,
            TickSize(_) => IncomingKind::TickSize,
            TickOptionComputation(_) => IncomingKind::TickOptionComputation,
            TickGeneric(_) => IncomingKind::TickGeneric,
            TickString(_) => IncomingKind::TickString,
            TickEfp(_) => IncomingKind::TickEfp,
            TickSnapshotEnd(_) => IncomingKind::TickSnapshotEnd,
            MarketDataType(_) => IncomingKind::MarketDataType,
            MarketDepth(_) => IncomingKind::MarketDepth,
            MarketDepthL2(_) => IncomingKind::MarketDepthL2,
            DeltaNeutralValidation(_) => IncomingKind::DeltaNeutralValidation,
            OrderStatus(_) => IncomingKind::OrderStatus,
            OpenOrder(_) => IncomingKind::OpenOrder,
            OpenOrderEnd => IncomingKind::OpenOrderEnd,
            NextValidId(_) => IncomingKind::NextValidId,
            ExecutionData(_) => IncomingKind::ExecutionData,
            ExecutionDataEnd(_) => IncomingKind::ExecutionDataEnd,
            CommissionReport(_) => IncomingKind::CommissionReport,
            AccountValue(_) => IncomingKind::AcctValue,
            PortfolioValue(_) => IncomingKind::PortfolioValue,
            AccountUpdateTime(_) => IncomingKind::AcctUpdateTime,
            AccountDownloadEnd(_) => IncomingKind::AcctDownloadEnd,
            ManagedAccounts(_) => IncomingKind::ManagedAccts,
            ReceiveFa(_) => IncomingKind::ReceiveFa,
            Position(_) => IncomingKind::Position,
            PositionEnd => IncomingKind::PositionEnd,
            AccountSummary(_) => IncomingKind::AccountSummary,
            AccountSummaryEnd(_) => IncomingKind::AccountSummaryEnd,
            ContractData(_) => IncomingKind::ContractData,
            BondContractData(_) => IncomingKind::BondContractData,
            ContractDataEnd(_) => IncomingKind::ContractDataEnd,
            FundamentalData(_) => IncomingKind::FundamentalData,
            NewsBulletin(_) => IncomingKind::NewsBulletins,
            HistoricalData(_) | HistoricalDataEnd(_) => IncomingKind::HistoricalData,
            RealTimeBar(_) => IncomingKind::RealTimeBars,
            ScannerParameters(_) => IncomingKind::ScannerParameters,
            ScannerData(_) | ScannerDataEnd(_) => IncomingKind::ScannerData,
            Error(_) => IncomingKind::Error,
            CurrentTime(_) => IncomingKind::CurrentTime,
            VerifyMessageApi(_) => IncomingKind::VerifyMessageApi,
            VerifyCompleted(_) => IncomingKind::VerifyCompleted,
            DisplayGroupList(_) => IncomingKind::DisplayGroupList,
            DisplayGroupUpdated(_) => IncomingKind::DisplayGroupUpdated,
        }
    }
}
