//! Request encoding.
//!
//! [`RequestEncoder`] turns one API call into one [`OutgoingMessage`]. The
//! negotiated server version decides which optional fields are written, and
//! every feature the server cannot accept is rejected before a single token
//! is produced.

use crate::contract::{Contract, ScannerSubscription, TagValue};
use crate::error::{ErrorCode, ProtocolError};
use crate::execution::ExecutionFilter;
use crate::kind::{server_version as sv, OutgoingKind};
use crate::token::TokenWriter;
use bytes::Bytes;

/// A fully encoded request, ready to be written in one go.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub kind: OutgoingKind,
    pub payload: Bytes,
    /// Code reported if writing this message fails.
    pub error_code: ErrorCode,
    pub request_id: Option<i32>,
}

/// Builds requests for one negotiated server version.
#[derive(Debug, Clone, Copy)]
pub struct RequestEncoder {
    server_version: i32,
    extra_auth: bool,
}

impl RequestEncoder {
    pub fn new(server_version: i32) -> Self {
        Self {
            server_version,
            extra_auth: false,
        }
    }

    /// Marks the session as opened with extra authentication.
    pub fn with_extra_auth(mut self, extra_auth: bool) -> Self {
        self.extra_auth = extra_auth;
        self
    }

    pub fn server_version(&self) -> i32 {
        self.server_version
    }

    pub(crate) fn at_least(&self, version: i32) -> bool {
        self.server_version >= version
    }

    /// Fails unless the server is at least `required`.
    pub(crate) fn require(
        &self,
        required: i32,
        field: &'static str,
        id: Option<i32>,
    ) -> Result<(), ProtocolError> {
        if self.server_version < required {
            return Err(ProtocolError::UnsupportedByServer {
                field,
                id,
                required,
                server_version: self.server_version,
            });
        }
        Ok(())
    }

    /// Like [`require`](Self::require), applied only when `used` holds.
    pub(crate) fn require_if(
        &self,
        used: bool,
        required: i32,
        field: &'static str,
        id: Option<i32>,
    ) -> Result<(), ProtocolError> {
        if used {
            self.require(required, field, id)
        } else {
            Ok(())
        }
    }

    pub(crate) fn begin(kind: OutgoingKind, version: i32) -> TokenWriter {
        let mut w = TokenWriter::new();
        w.put_int(kind.id());
        w.put_int(version);
        w
    }

    pub(crate) fn finish(
        w: TokenWriter,
        kind: OutgoingKind,
        error_code: ErrorCode,
        request_id: Option<i32>,
    ) -> OutgoingMessage {
        OutgoingMessage {
            kind,
            payload: w.into_bytes(),
            error_code,
            request_id,
        }
    }

    fn simple(
        kind: OutgoingKind,
        version: i32,
        id: Option<i32>,
        error_code: ErrorCode,
    ) -> OutgoingMessage {
        let mut w = Self::begin(kind, version);
        if let Some(id) = id {
            w.put_int(id);
        }
        Self::finish(w, kind, error_code, id)
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Activation message sent after the handshake.
    pub fn start_api(&self, client_id: i32) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::StartApi, 1);
        w.put_int(client_id);
        Self::finish(w, OutgoingKind::StartApi, ErrorCode::FailSendStartApi, None)
    }

    pub fn set_server_log_level(&self, level: i32) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::SetServerLogLevel, 1);
        w.put_int(level);
        Self::finish(
            w,
            OutgoingKind::SetServerLogLevel,
            ErrorCode::FailSendServerLogLevel,
            None,
        )
    }

    pub fn req_current_time(&self) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::CURRENT_TIME, "CurrentTime", None)?;
        Ok(Self::simple(
            OutgoingKind::ReqCurrentTime,
            1,
            None,
            ErrorCode::FailSendReqCurrTime,
        ))
    }

    pub fn verify_request(
        &self,
        api_name: &str,
        api_version: &str,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::LINKING, "VerifyRequest", None)?;
        if !self.extra_auth {
            return Err(ProtocolError::ExtraAuthRequired);
        }
        let mut w = Self::begin(OutgoingKind::VerifyRequest, 1);
        w.put_str(api_name);
        w.put_str(api_version);
        Ok(Self::finish(
            w,
            OutgoingKind::VerifyRequest,
            ErrorCode::FailSendVerifyRequest,
            None,
        ))
    }

    pub fn verify_message(&self, api_data: &str) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::LINKING, "VerifyMessage", None)?;
        let mut w = Self::begin(OutgoingKind::VerifyMessage, 1);
        w.put_str(api_data);
        Ok(Self::finish(
            w,
            OutgoingKind::VerifyMessage,
            ErrorCode::FailSendVerifyMessage,
            None,
        ))
    }

    // =========================================================================
    // Market data
    // =========================================================================

    pub fn req_mkt_data(
        &self,
        ticker_id: i32,
        contract: &Contract,
        generic_tick_list: &str,
        snapshot: bool,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(ticker_id);
        self.require_if(snapshot, sv::SNAPSHOT_MKT_DATA, "Snapshot", id)?;
        self.require_if(
            contract.under_comp.is_some(),
            sv::UNDER_COMP,
            "UnderComp",
            id,
        )?;
        self.require_if(contract.con_id > 0, sv::CONTRACT_CONID, "ConId", id)?;
        self.require_if(
            !contract.trading_class.is_empty(),
            sv::TRADING_CLASS,
            "TradingClass",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ReqMktData, 11);
        w.put_int(ticker_id);
        if self.at_least(sv::CONTRACT_CONID) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        if self.at_least(15) {
            w.put_str(&contract.multiplier);
        }
        w.put_str(&contract.exchange);
        if self.at_least(14) {
            w.put_str(&contract.primary_exch);
        }
        w.put_str(&contract.currency);
        if self.at_least(2) {
            w.put_str(&contract.local_symbol);
        }
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        if self.at_least(8) && contract.is_bag() {
            put_basic_combo_legs(&mut w, contract);
        }
        if self.at_least(sv::UNDER_COMP) {
            put_under_comp(&mut w, contract);
        }
        if self.at_least(31) {
            w.put_str(generic_tick_list);
        }
        if self.at_least(sv::SNAPSHOT_MKT_DATA) {
            w.put_bool(snapshot);
        }
        if self.at_least(sv::LINKING) {
            w.put_tag_values(options);
        }
        Ok(Self::finish(
            w,
            OutgoingKind::ReqMktData,
            ErrorCode::FailSendReqMkt,
            id,
        ))
    }

    pub fn cancel_mkt_data(&self, ticker_id: i32) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::CancelMktData,
            1,
            Some(ticker_id),
            ErrorCode::FailSendCanMkt,
        )
    }

    pub fn calculate_implied_volatility(
        &self,
        req_id: i32,
        contract: &Contract,
        option_price: f64,
        under_price: f64,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::REQ_CALC_IMPLIED_VOLAT, "CalcImpliedVolat", Some(req_id))?;
        self.encode_option_calculation(
            OutgoingKind::ReqCalcImpliedVolat,
            ErrorCode::FailSendReqCalcImpliedVolat,
            req_id,
            contract,
            option_price,
            under_price,
            options,
        )
    }

    pub fn cancel_calculate_implied_volatility(
        &self,
        req_id: i32,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(
            sv::CANCEL_CALC_IMPLIED_VOLAT,
            "CancelCalcImpliedVolat",
            Some(req_id),
        )?;
        Ok(Self::simple(
            OutgoingKind::CancelCalcImpliedVolat,
            1,
            Some(req_id),
            ErrorCode::FailSendCanCalcImpliedVolat,
        ))
    }

    pub fn calculate_option_price(
        &self,
        req_id: i32,
        contract: &Contract,
        volatility: f64,
        under_price: f64,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::REQ_CALC_OPTION_PRICE, "CalcOptionPrice", Some(req_id))?;
        self.encode_option_calculation(
            OutgoingKind::ReqCalcOptionPrice,
            ErrorCode::FailSendReqCalcOptionPrice,
            req_id,
            contract,
            volatility,
            under_price,
            options,
        )
    }

    pub fn cancel_calculate_option_price(
        &self,
        req_id: i32,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(
            sv::CANCEL_CALC_OPTION_PRICE,
            "CancelCalcOptionPrice",
            Some(req_id),
        )?;
        Ok(Self::simple(
            OutgoingKind::CancelCalcOptionPrice,
            1,
            Some(req_id),
            ErrorCode::FailSendCanCalcOptionPrice,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn encode_option_calculation(
        &self,
        kind: OutgoingKind,
        error_code: ErrorCode,
        req_id: i32,
        contract: &Contract,
        input: f64,
        under_price: f64,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require_if(
            !contract.trading_class.is_empty(),
            sv::TRADING_CLASS,
            "TradingClass",
            Some(req_id),
        )?;

        let mut w = Self::begin(kind, 3);
        w.put_int(req_id);
        w.put_int(contract.con_id);
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        w.put_str(&contract.multiplier);
        w.put_str(&contract.exchange);
        w.put_str(&contract.primary_exch);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        w.put_double(input);
        w.put_double(under_price);
        if self.at_least(sv::LINKING) {
            w.put_int(options.len() as i32);
            w.put_tag_values(options);
        }
        Ok(Self::finish(w, kind, error_code, Some(req_id)))
    }

    pub fn req_market_data_type(
        &self,
        market_data_type: i32,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::REQ_MARKET_DATA_TYPE, "MarketDataType", None)?;
        let mut w = Self::begin(OutgoingKind::ReqMarketDataType, 1);
        w.put_int(market_data_type);
        Ok(Self::finish(
            w,
            OutgoingKind::ReqMarketDataType,
            ErrorCode::FailSendReqMarketDataType,
            None,
        ))
    }

    pub fn req_mkt_depth(
        &self,
        ticker_id: i32,
        contract: &Contract,
        num_rows: i32,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(ticker_id);
        self.require_if(
            !contract.trading_class.is_empty() || contract.con_id > 0,
            sv::TRADING_CLASS,
            "ConId/TradingClass",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ReqMktDepth, 5);
        w.put_int(ticker_id);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        if self.at_least(15) {
            w.put_str(&contract.multiplier);
        }
        w.put_str(&contract.exchange);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        if self.at_least(19) {
            w.put_int(num_rows);
        }
        if self.at_least(sv::LINKING) {
            w.put_tag_values(options);
        }
        Ok(Self::finish(
            w,
            OutgoingKind::ReqMktDepth,
            ErrorCode::FailSendReqMktDepth,
            id,
        ))
    }

    pub fn cancel_mkt_depth(&self, ticker_id: i32) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::CancelMktDepth,
            1,
            Some(ticker_id),
            ErrorCode::FailSendCanMktDepth,
        )
    }

    // =========================================================================
    // Orders
    // =========================================================================

    pub fn cancel_order(&self, order_id: i32) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::CancelOrder,
            1,
            Some(order_id),
            ErrorCode::FailSendCOrder,
        )
    }

    pub fn req_open_orders(&self) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::ReqOpenOrders,
            1,
            None,
            ErrorCode::FailSendOOrder,
        )
    }

    pub fn req_all_open_orders(&self) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::ReqAllOpenOrders,
            1,
            None,
            ErrorCode::FailSendOOrder,
        )
    }

    pub fn req_auto_open_orders(&self, auto_bind: bool) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqAutoOpenOrders, 1);
        w.put_bool(auto_bind);
        Self::finish(
            w,
            OutgoingKind::ReqAutoOpenOrders,
            ErrorCode::FailSendOOrder,
            None,
        )
    }

    pub fn req_ids(&self, num_ids: i32) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqIds, 1);
        w.put_int(num_ids);
        Self::finish(w, OutgoingKind::ReqIds, ErrorCode::FailGeneric, None)
    }

    pub fn exercise_options(
        &self,
        ticker_id: i32,
        contract: &Contract,
        exercise_action: i32,
        exercise_quantity: i32,
        account: &str,
        override_: i32,
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(ticker_id);
        self.require(sv::EXERCISE_OPTIONS, "ExerciseOptions", id)?;
        self.require_if(
            !contract.trading_class.is_empty() || contract.con_id > 0,
            sv::TRADING_CLASS,
            "ConId/TradingClass",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ExerciseOptions, 2);
        w.put_int(ticker_id);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        w.put_str(&contract.multiplier);
        w.put_str(&contract.exchange);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        w.put_int(exercise_action);
        w.put_int(exercise_quantity);
        w.put_str(account);
        w.put_int(override_);
        Ok(Self::finish(
            w,
            OutgoingKind::ExerciseOptions,
            ErrorCode::FailGeneric,
            id,
        ))
    }

    pub fn req_global_cancel(&self) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::REQ_GLOBAL_CANCEL, "GlobalCancel", None)?;
        Ok(Self::simple(
            OutgoingKind::ReqGlobalCancel,
            1,
            None,
            ErrorCode::FailSendReqGlobalCancel,
        ))
    }

    // =========================================================================
    // Account, positions and executions
    // =========================================================================

    pub fn req_account_updates(&self, subscribe: bool, acct_code: &str) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqAccountData, 2);
        w.put_bool(subscribe);
        if self.at_least(9) {
            w.put_str(acct_code);
        }
        Self::finish(
            w,
            OutgoingKind::ReqAccountData,
            ErrorCode::FailSendReqAccountData,
            None,
        )
    }

    pub fn req_account_summary(
        &self,
        req_id: i32,
        group: &str,
        tags: &str,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::ACCT_SUMMARY, "AccountSummary", Some(req_id))?;
        let mut w = Self::begin(OutgoingKind::ReqAccountSummary, 1);
        w.put_int(req_id);
        w.put_str(group);
        w.put_str(tags);
        Ok(Self::finish(
            w,
            OutgoingKind::ReqAccountSummary,
            ErrorCode::FailSendReqAccountData,
            Some(req_id),
        ))
    }

    pub fn cancel_account_summary(&self, req_id: i32) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::ACCT_SUMMARY, "CancelAccountSummary", Some(req_id))?;
        Ok(Self::simple(
            OutgoingKind::CancelAccountSummary,
            1,
            Some(req_id),
            ErrorCode::FailSendCanAccountData,
        ))
    }

    pub fn req_positions(&self) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::ACCT_SUMMARY, "Positions", None)?;
        Ok(Self::simple(
            OutgoingKind::ReqPositions,
            1,
            None,
            ErrorCode::FailSendReqPositions,
        ))
    }

    pub fn cancel_positions(&self) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::ACCT_SUMMARY, "CancelPositions", None)?;
        Ok(Self::simple(
            OutgoingKind::CancelPositions,
            1,
            None,
            ErrorCode::FailSendCanPositions,
        ))
    }

    pub fn req_executions(&self, req_id: i32, filter: &ExecutionFilter) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqExecutions, 3);
        if self.at_least(sv::EXECUTION_DATA_CHAIN) {
            w.put_int(req_id);
        }
        if self.at_least(9) {
            w.put_int(filter.client_id);
            w.put_str(&filter.acct_code);
            w.put_str(&filter.time);
            w.put_str(&filter.symbol);
            w.put_str(&filter.sec_type);
            w.put_str(&filter.exchange);
            w.put_str(&filter.side);
        }
        Self::finish(
            w,
            OutgoingKind::ReqExecutions,
            ErrorCode::FailSendExec,
            Some(req_id),
        )
    }

    // =========================================================================
    // Contract data
    // =========================================================================

    pub fn req_contract_details(
        &self,
        req_id: i32,
        contract: &Contract,
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(req_id);
        self.require_if(
            !contract.sec_id_type.is_empty() || !contract.sec_id.is_empty(),
            sv::SEC_ID_TYPE,
            "SecIdType",
            id,
        )?;
        self.require_if(
            !contract.trading_class.is_empty(),
            sv::TRADING_CLASS,
            "TradingClass",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ReqContractData, 7);
        if self.at_least(sv::CONTRACT_DATA_CHAIN) {
            w.put_int(req_id);
        }
        if self.at_least(sv::CONTRACT_CONID) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        if self.at_least(15) {
            w.put_str(&contract.multiplier);
        }
        w.put_str(&contract.exchange);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        if self.at_least(31) {
            w.put_bool(contract.include_expired);
        }
        if self.at_least(sv::SEC_ID_TYPE) {
            w.put_str(&contract.sec_id_type);
            w.put_str(&contract.sec_id);
        }
        Ok(Self::finish(
            w,
            OutgoingKind::ReqContractData,
            ErrorCode::FailSendReqContract,
            id,
        ))
    }

    pub fn req_fundamental_data(
        &self,
        req_id: i32,
        contract: &Contract,
        report_type: &str,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(req_id);
        self.require(sv::FUNDAMENTAL_DATA, "FundamentalData", id)?;
        self.require_if(
            !contract.trading_class.is_empty()
                || contract.con_id > 0
                || !contract.multiplier.is_empty(),
            sv::TRADING_CLASS,
            "ConId/TradingClass/Multiplier",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ReqFundamentalData, 3);
        w.put_int(req_id);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.exchange);
        w.put_str(&contract.primary_exch);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        w.put_str(report_type);
        if self.at_least(sv::LINKING) {
            w.put_int(options.len() as i32);
            w.put_tag_values(options);
        }
        Ok(Self::finish(
            w,
            OutgoingKind::ReqFundamentalData,
            ErrorCode::FailSendReqFundData,
            id,
        ))
    }

    pub fn cancel_fundamental_data(&self, req_id: i32) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::FUNDAMENTAL_DATA, "CancelFundamentalData", Some(req_id))?;
        Ok(Self::simple(
            OutgoingKind::CancelFundamentalData,
            1,
            Some(req_id),
            ErrorCode::FailSendCanFundData,
        ))
    }

    // =========================================================================
    // News and financial advisors
    // =========================================================================

    pub fn req_news_bulletins(&self, all_messages: bool) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqNewsBulletins, 1);
        w.put_bool(all_messages);
        Self::finish(
            w,
            OutgoingKind::ReqNewsBulletins,
            ErrorCode::FailGeneric,
            None,
        )
    }

    pub fn cancel_news_bulletins(&self) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::CancelNewsBulletins,
            1,
            None,
            ErrorCode::FailGeneric,
        )
    }

    pub fn req_managed_accts(&self) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::ReqManagedAccts,
            1,
            None,
            ErrorCode::FailGeneric,
        )
    }

    pub fn request_fa(&self, fa_data_type: i32) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqFa, 1);
        w.put_int(fa_data_type);
        Self::finish(w, OutgoingKind::ReqFa, ErrorCode::FailSendFaRequest, None)
    }

    pub fn replace_fa(&self, fa_data_type: i32, xml: &str) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReplaceFa, 1);
        w.put_int(fa_data_type);
        w.put_str(xml);
        Self::finish(
            w,
            OutgoingKind::ReplaceFa,
            ErrorCode::FailSendFaReplace,
            None,
        )
    }

    // =========================================================================
    // Scanner
    // =========================================================================

    pub fn req_scanner_parameters(&self) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::ReqScannerParameters,
            1,
            None,
            ErrorCode::FailSendReqScannerParameters,
        )
    }

    pub fn req_scanner_subscription(
        &self,
        req_id: i32,
        subscription: &ScannerSubscription,
        options: &[TagValue],
    ) -> OutgoingMessage {
        let mut w = Self::begin(OutgoingKind::ReqScannerSubscription, 4);
        w.put_int(req_id);
        w.put_int_max(subscription.number_of_rows);
        w.put_str(&subscription.instrument);
        w.put_str(&subscription.location_code);
        w.put_str(&subscription.scan_code);
        w.put_double_max(subscription.above_price);
        w.put_double_max(subscription.below_price);
        w.put_int_max(subscription.above_volume);
        w.put_double_max(subscription.market_cap_above);
        w.put_double_max(subscription.market_cap_below);
        w.put_str(&subscription.moody_rating_above);
        w.put_str(&subscription.moody_rating_below);
        w.put_str(&subscription.sp_rating_above);
        w.put_str(&subscription.sp_rating_below);
        w.put_str(&subscription.maturity_date_above);
        w.put_str(&subscription.maturity_date_below);
        w.put_double_max(subscription.coupon_rate_above);
        w.put_double_max(subscription.coupon_rate_below);
        w.put_str(&subscription.exclude_convertible);
        if self.at_least(25) {
            w.put_int_max(subscription.average_option_volume_above);
            w.put_str(&subscription.scanner_setting_pairs);
        }
        if self.at_least(27) {
            w.put_str(&subscription.stock_type_filter);
        }
        if self.at_least(sv::LINKING) {
            w.put_tag_values(options);
        }
        Self::finish(
            w,
            OutgoingKind::ReqScannerSubscription,
            ErrorCode::FailSendReqScanner,
            Some(req_id),
        )
    }

    pub fn cancel_scanner_subscription(&self, req_id: i32) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::CancelScannerSubscription,
            1,
            Some(req_id),
            ErrorCode::FailSendCanScanner,
        )
    }

    // =========================================================================
    // Historical data and bars
    // =========================================================================

    #[allow(clippy::too_many_arguments)]
    pub fn req_historical_data(
        &self,
        ticker_id: i32,
        contract: &Contract,
        end_date_time: &str,
        duration: &str,
        bar_size: &str,
        what_to_show: &str,
        use_rth: i32,
        format_date: i32,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(ticker_id);
        self.require(sv::HISTORICAL_DATA, "HistoricalData", id)?;
        self.require_if(
            !contract.trading_class.is_empty() || contract.con_id > 0,
            sv::TRADING_CLASS,
            "ConId/TradingClass",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ReqHistoricalData, 6);
        w.put_int(ticker_id);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        w.put_str(&contract.multiplier);
        w.put_str(&contract.exchange);
        w.put_str(&contract.primary_exch);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        w.put_bool(contract.include_expired);
        w.put_str(end_date_time);
        w.put_str(bar_size);
        w.put_str(duration);
        w.put_int(use_rth);
        w.put_str(what_to_show);
        w.put_int(format_date);
        if contract.is_bag() {
            put_basic_combo_legs(&mut w, contract);
        }
        if self.at_least(sv::LINKING) {
            w.put_tag_values(options);
        }
        Ok(Self::finish(
            w,
            OutgoingKind::ReqHistoricalData,
            ErrorCode::FailSendReqHistData,
            id,
        ))
    }

    pub fn cancel_historical_data(&self, ticker_id: i32) -> Result<OutgoingMessage, ProtocolError> {
        self.require(
            sv::CANCEL_HISTORICAL_DATA,
            "CancelHistoricalData",
            Some(ticker_id),
        )?;
        Ok(Self::simple(
            OutgoingKind::CancelHistoricalData,
            1,
            Some(ticker_id),
            ErrorCode::FailSendCanHistData,
        ))
    }

    pub fn req_real_time_bars(
        &self,
        ticker_id: i32,
        contract: &Contract,
        bar_size: i32,
        what_to_show: &str,
        use_rth: bool,
        options: &[TagValue],
    ) -> Result<OutgoingMessage, ProtocolError> {
        let id = Some(ticker_id);
        self.require(sv::REAL_TIME_BARS, "RealTimeBars", id)?;
        self.require_if(
            !contract.trading_class.is_empty() || contract.con_id > 0,
            sv::TRADING_CLASS,
            "ConId/TradingClass",
            id,
        )?;

        let mut w = Self::begin(OutgoingKind::ReqRealTimeBars, 3);
        w.put_int(ticker_id);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_int(contract.con_id);
        }
        w.put_str(&contract.symbol);
        w.put_str(&contract.sec_type);
        w.put_str(&contract.expiry);
        w.put_double(contract.strike);
        w.put_str(&contract.right);
        w.put_str(&contract.multiplier);
        w.put_str(&contract.exchange);
        w.put_str(&contract.primary_exch);
        w.put_str(&contract.currency);
        w.put_str(&contract.local_symbol);
        if self.at_least(sv::TRADING_CLASS) {
            w.put_str(&contract.trading_class);
        }
        w.put_int(bar_size);
        w.put_str(what_to_show);
        w.put_bool(use_rth);
        if self.at_least(sv::LINKING) {
            w.put_tag_values(options);
        }
        Ok(Self::finish(
            w,
            OutgoingKind::ReqRealTimeBars,
            ErrorCode::FailSendReqRtBars,
            id,
        ))
    }

    pub fn cancel_real_time_bars(&self, ticker_id: i32) -> OutgoingMessage {
        Self::simple(
            OutgoingKind::CancelRealTimeBars,
            1,
            Some(ticker_id),
            ErrorCode::FailSendCanRtBars,
        )
    }

    // =========================================================================
    // Display groups
    // =========================================================================

    pub fn query_display_groups(&self, req_id: i32) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::LINKING, "QueryDisplayGroups", Some(req_id))?;
        Ok(Self::simple(
            OutgoingKind::QueryDisplayGroups,
            1,
            Some(req_id),
            ErrorCode::FailSendQueryDisplayGroups,
        ))
    }

    pub fn subscribe_to_group_events(
        &self,
        req_id: i32,
        group_id: i32,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::LINKING, "SubscribeToGroupEvents", Some(req_id))?;
        let mut w = Self::begin(OutgoingKind::SubscribeToGroupEvents, 1);
        w.put_int(req_id);
        w.put_int(group_id);
        Ok(Self::finish(
            w,
            OutgoingKind::SubscribeToGroupEvents,
            ErrorCode::FailSendSubscribeToGroupEvents,
            Some(req_id),
        ))
    }

    pub fn update_display_group(
        &self,
        req_id: i32,
        contract_info: &str,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::LINKING, "UpdateDisplayGroup", Some(req_id))?;
        let mut w = Self::begin(OutgoingKind::UpdateDisplayGroup, 1);
        w.put_int(req_id);
        w.put_str(contract_info);
        Ok(Self::finish(
            w,
            OutgoingKind::UpdateDisplayGroup,
            ErrorCode::FailSendUpdateDisplayGroup,
            Some(req_id),
        ))
    }

    pub fn unsubscribe_from_group_events(
        &self,
        req_id: i32,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.require(sv::LINKING, "UnsubscribeFromGroupEvents", Some(req_id))?;
        Ok(Self::simple(
            OutgoingKind::UnsubscribeFromGroupEvents,
            1,
            Some(req_id),
            ErrorCode::FailSendUnsubscribeFromGroupEvents,
        ))
    }
}

/// Combo legs as market data and historical requests send them.
fn put_basic_combo_legs(w: &mut TokenWriter, contract: &Contract) {
    w.put_int(contract.combo_legs.len() as i32);
    for leg in &contract.combo_legs {
        w.put_int(leg.con_id);
        w.put_int(leg.ratio);
        w.put_str(&leg.action);
        w.put_str(&leg.exchange);
    }
}

pub(crate) fn put_under_comp(w: &mut TokenWriter, contract: &Contract) {
    match &contract.under_comp {
        Some(comp) => {
            w.put_bool(true);
            w.put_int(comp.con_id);
            w.put_double(comp.delta);
            w.put_double(comp.price);
        }
        None => w.put_bool(false),
    }
}
