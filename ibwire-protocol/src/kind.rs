//! Message kinds and server-version thresholds.

use serde::{Deserialize, Serialize};

/// Kinds of messages sent to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum OutgoingKind {
    ReqMktData = 1,
    CancelMktData = 2,
    PlaceOrder = 3,
    CancelOrder = 4,
    ReqOpenOrders = 5,
    ReqAccountData = 6,
    ReqExecutions = 7,
    ReqIds = 8,
    ReqContractData = 9,
    ReqMktDepth = 10,
    CancelMktDepth = 11,
    ReqNewsBulletins = 12,
    CancelNewsBulletins = 13,
    SetServerLogLevel = 14,
    ReqAutoOpenOrders = 15,
    ReqAllOpenOrders = 16,
    ReqManagedAccts = 17,
    ReqFa = 18,
    ReplaceFa = 19,
    ReqHistoricalData = 20,
    ExerciseOptions = 21,
    ReqScannerSubscription = 22,
    CancelScannerSubscription = 23,
    ReqScannerParameters = 24,
    CancelHistoricalData = 25,
    ReqCurrentTime = 49,
    ReqRealTimeBars = 50,
    CancelRealTimeBars = 51,
    ReqFundamentalData = 52,
    CancelFundamentalData = 53,
    ReqCalcImpliedVolat = 54,
    ReqCalcOptionPrice = 55,
    CancelCalcImpliedVolat = 56,
    CancelCalcOptionPrice = 57,
    ReqGlobalCancel = 58,
    ReqMarketDataType = 59,
    ReqPositions = 61,
    ReqAccountSummary = 62,
    CancelAccountSummary = 63,
    CancelPositions = 64,
    VerifyRequest = 65,
    VerifyMessage = 66,
    QueryDisplayGroups = 67,
    SubscribeToGroupEvents = 68,
    UpdateDisplayGroup = 69,
    UnsubscribeFromGroupEvents = 70,
    StartApi = 71,
}

impl OutgoingKind {
    pub fn id(self) -> i32 {
        self as i32
    }
}

/// Kinds of messages received from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum IncomingKind {
    TickPrice = 1,
    TickSize = 2,
    OrderStatus = 3,
    Error = 4,
    OpenOrder = 5,
    AcctValue = 6,
    PortfolioValue = 7,
    AcctUpdateTime = 8,
    NextValidId = 9,
    ContractData = 10,
    ExecutionData = 11,
    MarketDepth = 12,
    MarketDepthL2 = 13,
    NewsBulletins = 14,
    ManagedAccts = 15,
    ReceiveFa = 16,
    HistoricalData = 17,
    BondContractData = 18,
    ScannerParameters = 19,
    ScannerData = 20,
    TickOptionComputation = 21,
    TickGeneric = 45,
    TickString = 46,
    TickEfp = 47,
    CurrentTime = 49,
    RealTimeBars = 50,
    FundamentalData = 51,
    ContractDataEnd = 52,
    OpenOrderEnd = 53,
    AcctDownloadEnd = 54,
    ExecutionDataEnd = 55,
    DeltaNeutralValidation = 56,
    TickSnapshotEnd = 57,
    MarketDataType = 58,
    CommissionReport = 59,
    Position = 61,
    PositionEnd = 62,
    AccountSummary = 63,
    AccountSummaryEnd = 64,
    VerifyMessageApi = 65,
    VerifyCompleted = 66,
    DisplayGroupList = 67,
    DisplayGroupUpdated = 68,
}

impl IncomingKind {
    /// Tag the server uses for "no message".
    pub const NOT_VALID: i32 = -1;

    pub fn from_i32(value: i32) -> Option<Self> {
        use IncomingKind::*;
        let kind = match value {
            1 => TickPrice,
            2 => TickSize,
            3 => OrderStatus,
            4 => Error,
            5 => OpenOrder,
            6 => AcctValue,
            7 => PortfolioValue,
            8 => AcctUpdateTime,
            9 => NextValidId,
            10 => ContractData,
            11 => ExecutionData,
            12 => MarketDepth,
            13 => MarketDepthL2,
            14 => NewsBulletins,
            15 => ManagedAccts,
            16 => ReceiveFa,
            17 => HistoricalData,
            18 => BondContractData,
            19 => ScannerParameters,
            20 => ScannerData,
            21 => TickOptionComputation,
            45 => TickGeneric,
            46 => TickString,
            47 => TickEfp,
            49 => CurrentTime,
            50 => RealTimeBars,
            51 => FundamentalData,
            52 => ContractDataEnd,
            53 => OpenOrderEnd,
            54 => AcctDownloadEnd,
            55 => ExecutionDataEnd,
            56 => DeltaNeutralValidation,
            57 => TickSnapshotEnd,
            58 => MarketDataType,
            59 => CommissionReport,
            61 => Position,
            62 => PositionEnd,
            63 => AccountSummary,
            64 => AccountSummaryEnd,
            65 => VerifyMessageApi,
            66 => VerifyCompleted,
            67 => DisplayGroupList,
            68 => DisplayGroupUpdated,
            _ => return None,
        };
        Some(kind)
    }

    pub fn id(self) -> i32 {
        self as i32
    }
}

/// Server versions at which optional fields and requests became available.
pub mod server_version {
    /// Lowest server version this client will talk to.
    pub const MIN_VERSION: i32 = 38;
    /// Server sends its connection time after the version.
    pub const SERVER_TIME: i32 = 20;

    pub const REAL_TIME_BARS: i32 = 34;
    pub const SCALE_ORDERS: i32 = 35;
    pub const SNAPSHOT_MKT_DATA: i32 = 35;
    pub const SSHORT_COMBO_LEGS: i32 = 35;
    pub const WHAT_IF_ORDERS: i32 = 36;
    pub const CONTRACT_CONID: i32 = 37;
    pub const PTA_ORDERS: i32 = 39;
    pub const FUNDAMENTAL_DATA: i32 = 40;
    pub const UNDER_COMP: i32 = 40;
    pub const CONTRACT_DATA_CHAIN: i32 = 40;
    pub const SCALE_ORDERS2: i32 = 40;
    pub const ALGO_ORDERS: i32 = 41;
    pub const EXECUTION_DATA_CHAIN: i32 = 42;
    pub const NOT_HELD: i32 = 44;
    pub const SEC_ID_TYPE: i32 = 45;
    pub const PLACE_ORDER_CONID: i32 = 46;
    pub const REQ_CALC_IMPLIED_VOLAT: i32 = 49;
    pub const REQ_CALC_OPTION_PRICE: i32 = 50;
    pub const CANCEL_CALC_IMPLIED_VOLAT: i32 = 50;
    pub const CANCEL_CALC_OPTION_PRICE: i32 = 50;
    pub const SSHORTX_OLD: i32 = 51;
    pub const SSHORTX: i32 = 52;
    pub const REQ_GLOBAL_CANCEL: i32 = 53;
    pub const HEDGE_ORDERS: i32 = 54;
    pub const REQ_MARKET_DATA_TYPE: i32 = 55;
    pub const OPT_OUT_SMART_ROUTING: i32 = 56;
    pub const SMART_COMBO_ROUTING_PARAMS: i32 = 57;
    pub const DELTA_NEUTRAL_CONID: i32 = 58;
    pub const SCALE_ORDERS3: i32 = 60;
    pub const ORDER_COMBO_LEGS_PRICE: i32 = 61;
    pub const TRAILING_PERCENT: i32 = 62;
    pub const DELTA_NEUTRAL_OPEN_CLOSE: i32 = 66;
    pub const ACCT_SUMMARY: i32 = 67;
    pub const TRADING_CLASS: i32 = 68;
    pub const SCALE_TABLE: i32 = 69;
    pub const LINKING: i32 = 70;
    pub const ALGO_ID: i32 = 71;

    // Requests that predate the minimum but are still checked.
    pub const HISTORICAL_DATA: i32 = 16;
    pub const EXERCISE_OPTIONS: i32 = 21;
    pub const CANCEL_HISTORICAL_DATA: i32 = 24;
    pub const CURRENT_TIME: i32 = 33;
}

/// Tick field codes used when synthesizing size ticks from price ticks.
pub mod tick_type {
    pub const BID_SIZE: i32 = 0;
    pub const BID: i32 = 1;
    pub const ASK: i32 = 2;
    pub const ASK_SIZE: i32 = 3;
    pub const LAST: i32 = 4;
    pub const LAST_SIZE: i32 = 5;
    pub const MODEL_OPTION: i32 = 13;

    /// Size field paired with a price field, if any.
    pub fn size_for_price(field: i32) -> Option<i32> {
        match field {
            BID => Some(BID_SIZE),
            ASK => Some(ASK_SIZE),
            LAST => Some(LAST_SIZE),
            _ => None,
        }
    }
}
