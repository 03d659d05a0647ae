//! Per-kind decoders for server messages.
//!
//! Each decoder reads the message-local version stamp first and gates every
//! optional field on it. PortfolioValue and OpenOrder additionally consult the
//! connection's server version for a pair of legacy quirks; the two numbers
//! are always passed separately.

use crate::contract::{ComboLeg, Contract, ContractDetails, TagValue, UnderComp};
use crate::error::ProtocolError;
use crate::execution::{CommissionReport, Execution};
use crate::kind::{tick_type, IncomingKind};
use crate::message::*;
use crate::order::{Order, OrderComboLeg, OrderState};
use crate::token::TokenCursor;

type DecodeResult = Result<Vec<Incoming>, ProtocolError>;

/// Decodes the body of one message whose kind tag has already been read.
pub fn decode_message(
    kind: IncomingKind,
    cur: &mut TokenCursor<'_>,
    server_version: i32,
) -> DecodeResult {
    use IncomingKind as K;
    match kind {
        K::TickPrice => tick_price(cur),
        K::TickSize => one(tick_size(cur)),
        K::TickOptionComputation => one(tick_option_computation(cur)),
        K::TickGeneric => one(tick_generic(cur)),
        K::TickString => one(tick_string(cur)),
        K::TickEfp => one(tick_efp(cur)),
        K::TickSnapshotEnd => one(tick_snapshot_end(cur)),
        K::MarketDataType => one(market_data_type(cur)),
        K::MarketDepth => one(market_depth(cur)),
        K::MarketDepthL2 => one(market_depth_l2(cur)),
        K::DeltaNeutralValidation => one(delta_neutral_validation(cur)),
        K::OrderStatus => one(order_status(cur)),
        K::OpenOrder => one(open_order(cur, server_version)),
        K::OpenOrderEnd => {
            cur.read_int()?;
            Ok(vec![Incoming::OpenOrderEnd])
        }
        K::NextValidId => one(next_valid_id(cur)),
        K::ExecutionData => one(execution_data(cur)),
        K::ExecutionDataEnd => one(execution_data_end(cur)),
        K::CommissionReport => one(commission_report(cur)),
        K::AcctValue => one(account_value(cur)),
        K::PortfolioValue => one(portfolio_value(cur, server_version)),
        K::AcctUpdateTime => one(account_update_time(cur)),
        K::AcctDownloadEnd => one(account_download_end(cur)),
        K::ManagedAccts => one(managed_accounts(cur)),
        K::ReceiveFa => one(receive_fa(cur)),
        K::Position => one(position(cur)),
        K::PositionEnd => {
            cur.read_int()?;
            Ok(vec![Incoming::PositionEnd])
        }
        K::AccountSummary => one(account_summary(cur)),
        K::AccountSummaryEnd => one(account_summary_end(cur)),
        K::ContractData => one(contract_data(cur)),
        K::BondContractData => one(bond_contract_data(cur)),
        K::ContractDataEnd => one(contract_data_end(cur)),
        K::FundamentalData => one(fundamental_data(cur)),
        K::NewsBulletins => one(news_bulletin(cur)),
        K::HistoricalData => historical_data(cur),
        K::RealTimeBars => one(real_time_bar(cur)),
        K::ScannerParameters => one(scanner_parameters(cur)),
        K::ScannerData => scanner_data(cur),
        K::Error => one(error(cur)),
        K::CurrentTime => one(current_time(cur)),
        K::VerifyMessageApi => one(verify_message_api(cur)),
        K::VerifyCompleted => one(verify_completed(cur)),
        K::DisplayGroupList => one(display_group_list(cur)),
        K::DisplayGroupUpdated => one(display_group_updated(cur)),
    }
}

fn one(msg: Result<Incoming, ProtocolError>) -> DecodeResult {
    msg.map(|m| vec![m])
}

fn read_tag_values(cur: &mut TokenCursor<'_>) -> Result<Vec<TagValue>, ProtocolError> {
    let count = cur.read_int()?;
    let mut out = Vec::with_capacity(count.clamp(0, 64) as usize);
    for _ in 0..count {
        let tag = cur.read_string()?;
        let value = cur.read_string()?;
        out.push(TagValue { tag, value });
    }
    Ok(out)
}

/// "Not yet computed" markers on greeks become `f64::MAX`.
fn unless_negative(v: f64) -> f64 {
    if v < 0.0 {
        f64::MAX
    } else {
        v
    }
}

fn unless_above_one(v: f64) -> f64 {
    if v.abs() > 1.0 {
        f64::MAX
    } else {
        v
    }
}

// =============================================================================
// Market data
// =============================================================================

fn tick_price(cur: &mut TokenCursor<'_>) -> DecodeResult {
    let version = cur.read_int()?;
    let ticker_id = cur.read_int()?;
    let field = cur.read_int()?;
    let price = cur.read_double()?;
    let size = if version >= 2 { cur.read_int()? } else { 0 };
    let can_auto_execute = if version >= 3 { cur.read_int()? } else { 0 };

    let mut out = vec![Incoming::TickPrice(TickPrice {
        ticker_id,
        field,
        price,
        size,
        can_auto_execute,
    })];
    if version >= 2 {
        if let Some(size_field) = tick_type::size_for_price(field) {
            out.push(Incoming::TickSize(TickSize {
                ticker_id,
                field: size_field,
                size,
            }));
        }
    }
    Ok(out)
}

fn tick_size(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::TickSize(TickSize {
        ticker_id: cur.read_int()?,
        field: cur.read_int()?,
        size: cur.read_int()?,
    }))
}

fn tick_option_computation(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let ticker_id = cur.read_int()?;
    let field = cur.read_int()?;
    let implied_volatility = unless_negative(cur.read_double()?);
    let delta = unless_above_one(cur.read_double()?);

    let mut tick = TickOptionComputation {
        ticker_id,
        field,
        implied_volatility,
        delta,
        opt_price: f64::MAX,
        pv_dividend: f64::MAX,
        gamma: f64::MAX,
        vega: f64::MAX,
        theta: f64::MAX,
        und_price: f64::MAX,
    };
    if version >= 6 || field == tick_type::MODEL_OPTION {
        tick.opt_price = unless_negative(cur.read_double()?);
        tick.pv_dividend = unless_negative(cur.read_double()?);
    }
    if version >= 6 {
        tick.gamma = unless_above_one(cur.read_double()?);
        tick.vega = unless_above_one(cur.read_double()?);
        tick.theta = unless_above_one(cur.read_double()?);
        tick.und_price = unless_negative(cur.read_double()?);
    }
    Ok(Incoming::TickOptionComputation(tick))
}

fn tick_generic(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::TickGeneric(TickGeneric {
        ticker_id: cur.read_int()?,
        field: cur.read_int()?,
        value: cur.read_double()?,
    }))
}

fn tick_string(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::TickString(TickString {
        ticker_id: cur.read_int()?,
        field: cur.read_int()?,
        value: cur.read_string()?,
    }))
}

fn tick_efp(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::TickEfp(TickEfp {
        ticker_id: cur.read_int()?,
        field: cur.read_int()?,
        basis_points: cur.read_double()?,
        formatted_basis_points: cur.read_string()?,
        implied_future: cur.read_double()?,
        hold_days: cur.read_int()?,
        future_expiry: cur.read_string()?,
        dividend_impact: cur.read_double()?,
        dividends_to_expiry: cur.read_double()?,
    }))
}

fn tick_snapshot_end(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::TickSnapshotEnd(TickSnapshotEnd {
        req_id: cur.read_int()?,
    }))
}

fn market_data_type(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::MarketDataType(MarketDataType {
        req_id: cur.read_int()?,
        market_data_type: cur.read_int()?,
    }))
}

fn market_depth(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::MarketDepth(MarketDepth {
        ticker_id: cur.read_int()?,
        position: cur.read_int()?,
        operation: cur.read_int()?,
        side: cur.read_int()?,
        price: cur.read_double()?,
        size: cur.read_int()?,
    }))
}

fn market_depth_l2(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::MarketDepthL2(MarketDepthL2 {
        ticker_id: cur.read_int()?,
        position: cur.read_int()?,
        market_maker: cur.read_string()?,
        operation: cur.read_int()?,
        side: cur.read_int()?,
        price: cur.read_double()?,
        size: cur.read_int()?,
    }))
}

fn delta_neutral_validation(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    let req_id = cur.read_int()?;
    let under_comp = UnderComp {
        con_id: cur.read_int()?,
        delta: cur.read_double()?,
        price: cur.read_double()?,
    };
    Ok(Incoming::DeltaNeutralValidation(DeltaNeutralValidation {
        req_id,
        under_comp,
    }))
}

// =============================================================================
// Orders and executions
// =============================================================================

fn order_status(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let mut status = OrderStatus {
        order_id: cur.read_int()?,
        status: cur.read_string()?,
        filled: cur.read_int()?,
        remaining: cur.read_int()?,
        avg_fill_price: cur.read_double()?,
        perm_id: 0,
        parent_id: 0,
        last_fill_price: 0.0,
        client_id: 0,
        why_held: String::new(),
    };
    if version >= 2 {
        status.perm_id = cur.read_int()?;
    }
    if version >= 3 {
        status.parent_id = cur.read_int()?;
    }
    if version >= 4 {
        status.last_fill_price = cur.read_double()?;
    }
    if version >= 5 {
        status.client_id = cur.read_int()?;
    }
    if version >= 6 {
        status.why_held = cur.read_string()?;
    }
    Ok(Incoming::OrderStatus(status))
}

fn open_order(cur: &mut TokenCursor<'_>, server_version: i32) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let mut order = Order {
        order_id: cur.read_int()?,
        ..Default::default()
    };

    let mut contract = Contract::default();
    if version >= 17 {
        contract.con_id = cur.read_int()?;
    }
    contract.symbol = cur.read_string()?;
    contract.sec_type = cur.read_string()?;
    contract.expiry = cur.read_string()?;
    contract.strike = cur.read_double()?;
    contract.right = cur.read_string()?;
    if version >= 32 {
        contract.multiplier = cur.read_string()?;
    }
    contract.exchange = cur.read_string()?;
    contract.currency = cur.read_string()?;
    if version >= 2 {
        contract.local_symbol = cur.read_string()?;
    }
    if version >= 32 {
        contract.trading_class = cur.read_string()?;
    }

    order.action = cur.read_string()?;
    order.total_quantity = cur.read_int()?;
    order.order_type = cur.read_string()?;
    order.lmt_price = if version < 29 {
        cur.read_double()?
    } else {
        cur.read_double_max()?
    };
    order.aux_price = if version < 30 {
        cur.read_double()?
    } else {
        cur.read_double_max()?
    };
    order.tif = cur.read_string()?;
    order.oca_group = cur.read_string()?;
    order.account = cur.read_string()?;
    order.open_close = cur.read_string()?;
    order.origin = cur.read_int()?;
    order.order_ref = cur.read_string()?;
    if version >= 3 {
        order.client_id = cur.read_int()?;
    }
    if version >= 4 {
        order.perm_id = cur.read_int()?;
        // Before stamp 18 this slot held the retired ignore-RTH flag.
        let outside_rth = cur.read_bool_from_int()?;
        if version >= 18 {
            order.outside_rth = outside_rth;
        }
        order.hidden = cur.read_int()? == 1;
        order.discretionary_amt = cur.read_double()?;
    }
    if version >= 5 {
        order.good_after_time = cur.read_string()?;
    }
    if version >= 6 {
        // retired shares allocation
        cur.read_string()?;
    }
    if version >= 7 {
        order.fa_group = cur.read_string()?;
        order.fa_method = cur.read_string()?;
        order.fa_percentage = cur.read_string()?;
        order.fa_profile = cur.read_string()?;
    }
    if version >= 8 {
        order.good_till_date = cur.read_string()?;
    }
    if version >= 9 {
        order.rule80a = cur.read_string()?;
        order.percent_offset = cur.read_double_max()?;
        order.settling_firm = cur.read_string()?;
        order.short_sale_slot = cur.read_int()?;
        order.designated_location = cur.read_string()?;
        if server_version == 51 {
            cur.read_int()?;
        } else if version >= 23 {
            order.exempt_code = cur.read_int()?;
        }
        order.auction_strategy = cur.read_int()?;
        order.starting_price = cur.read_double_max()?;
        order.stock_ref_price = cur.read_double_max()?;
        order.delta = cur.read_double_max()?;
        order.stock_range_lower = cur.read_double_max()?;
        order.stock_range_upper = cur.read_double_max()?;
        order.display_size = cur.read_int()?;
        if version < 18 {
            // retired RTH-only flag
            cur.read_bool_from_int()?;
        }
        order.block_order = cur.read_bool_from_int()?;
        order.sweep_to_fill = cur.read_bool_from_int()?;
        order.all_or_none = cur.read_bool_from_int()?;
        order.min_qty = cur.read_int_max()?;
        order.oca_type = cur.read_int()?;
        order.e_trade_only = cur.read_bool_from_int()?;
        order.firm_quote_only = cur.read_bool_from_int()?;
        order.nbbo_price_cap = cur.read_double_max()?;
    }
    if version >= 10 {
        order.parent_id = cur.read_int()?;
        order.trigger_method = cur.read_int()?;
    }
    if version >= 11 {
        read_open_order_volatility(cur, version, server_version, &mut order)?;
    }
    if version >= 13 {
        order.trail_stop_price = cur.read_double_max()?;
    }
    if version >= 30 {
        order.trailing_percent = cur.read_double_max()?;
    }
    if version >= 14 {
        order.basis_points = cur.read_double_max()?;
        order.basis_points_type = cur.read_int_max()?;
        contract.combo_legs_descrip = cur.read_string()?;
    }
    if version >= 29 {
        let legs = cur.read_int()?;
        for _ in 0..legs {
            contract.combo_legs.push(ComboLeg {
                con_id: cur.read_int()?,
                ratio: cur.read_int()?,
                action: cur.read_string()?,
                exchange: cur.read_string()?,
                open_close: cur.read_int()?,
                short_sale_slot: cur.read_int()?,
                designated_location: cur.read_string()?,
                exempt_code: cur.read_int()?,
            });
        }
        let order_legs = cur.read_int()?;
        for _ in 0..order_legs {
            order.order_combo_legs.push(OrderComboLeg {
                price: cur.read_double_max()?,
            });
        }
    }
    if version >= 26 {
        order.smart_combo_routing_params = read_tag_values(cur)?;
    }
    if version >= 15 {
        if version >= 20 {
            order.scale_init_level_size = cur.read_int_max()?;
            order.scale_subs_level_size = cur.read_int_max()?;
        } else {
            // retired component count
            cur.read_int_max()?;
            order.scale_init_level_size = cur.read_int_max()?;
        }
        order.scale_price_increment = cur.read_double_max()?;
    }
    if version >= 28 && order.has_scale_price_increment() {
        order.scale_price_adjust_value = cur.read_double_max()?;
        order.scale_price_adjust_interval = cur.read_int_max()?;
        order.scale_profit_offset = cur.read_double_max()?;
        order.scale_auto_reset = cur.read_bool_from_int()?;
        order.scale_init_position = cur.read_int_max()?;
        order.scale_init_fill_qty = cur.read_int_max()?;
        order.scale_random_percent = cur.read_bool_from_int()?;
    }
    if version >= 24 {
        order.hedge_type = cur.read_string()?;
        if !order.hedge_type.is_empty() {
            order.hedge_param = cur.read_string()?;
        }
    }
    if version >= 25 {
        order.opt_out_smart_routing = cur.read_bool_from_int()?;
    }
    if version >= 19 {
        order.clearing_account = cur.read_string()?;
        order.clearing_intent = cur.read_string()?;
    }
    if version >= 22 {
        order.not_held = cur.read_bool_from_int()?;
    }
    if version >= 20 && cur.read_bool_from_int()? {
        contract.under_comp = Some(UnderComp {
            con_id: cur.read_int()?,
            delta: cur.read_double()?,
            price: cur.read_double()?,
        });
    }
    if version >= 21 {
        order.algo_strategy = cur.read_string()?;
        if !order.algo_strategy.is_empty() {
            order.algo_params = read_tag_values(cur)?;
        }
    }

    let mut order_state = OrderState::default();
    if version >= 16 {
        order.what_if = cur.read_bool_from_int()?;
        order_state.status = cur.read_string()?;
        order_state.init_margin = cur.read_string()?;
        order_state.maint_margin = cur.read_string()?;
        order_state.equity_with_loan = cur.read_string()?;
        order_state.commission = cur.read_double_max()?;
        order_state.min_commission = cur.read_double_max()?;
        order_state.max_commission = cur.read_double_max()?;
        order_state.commission_currency = cur.read_string()?;
        order_state.warning_text = cur.read_string()?;
    }

    Ok(Incoming::OpenOrder(Box::new(OpenOrder {
        order_id: order.order_id,
        contract,
        order,
        order_state,
    })))
}

fn read_open_order_volatility(
    cur: &mut TokenCursor<'_>,
    version: i32,
    server_version: i32,
    order: &mut Order,
) -> Result<(), ProtocolError> {
    order.volatility = cur.read_double_max()?;
    order.volatility_type = cur.read_int()?;
    if version == 11 {
        let flag = cur.read_int()?;
        order.delta_neutral_order_type = if flag == 0 { "NONE" } else { "MKT" }.to_string();
    } else {
        order.delta_neutral_order_type = cur.read_string()?;
        order.delta_neutral_aux_price = cur.read_double_max()?;
        let has_delta_neutral = !order.delta_neutral_order_type.is_empty();
        if version >= 27 && has_delta_neutral {
            order.delta_neutral_con_id = cur.read_int()?;
            order.delta_neutral_settling_firm = cur.read_string()?;
            order.delta_neutral_clearing_account = cur.read_string()?;
            order.delta_neutral_clearing_intent = cur.read_string()?;
        }
        if version >= 31 && has_delta_neutral {
            order.delta_neutral_open_close = cur.read_string()?;
            order.delta_neutral_short_sale = cur.read_bool_from_int()?;
            order.delta_neutral_short_sale_slot = cur.read_int()?;
            order.delta_neutral_designated_location = cur.read_string()?;
        }
    }
    order.continuous_update = cur.read_int()?;
    if server_version == 26 {
        order.stock_range_lower = cur.read_double()?;
        order.stock_range_upper = cur.read_double()?;
    }
    order.reference_price_type = cur.read_int()?;
    Ok(())
}

fn next_valid_id(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::NextValidId(NextValidId {
        order_id: cur.read_int()?,
    }))
}

fn execution_data(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let req_id = if version >= 7 { cur.read_int()? } else { -1 };
    let order_id = cur.read_int()?;

    let mut contract = Contract::default();
    if version >= 5 {
        contract.con_id = cur.read_int()?;
    }
    contract.symbol = cur.read_string()?;
    contract.sec_type = cur.read_string()?;
    contract.expiry = cur.read_string()?;
    contract.strike = cur.read_double()?;
    contract.right = cur.read_string()?;
    if version >= 9 {
        contract.multiplier = cur.read_string()?;
    }
    contract.exchange = cur.read_string()?;
    contract.currency = cur.read_string()?;
    contract.local_symbol = cur.read_string()?;
    if version >= 10 {
        contract.trading_class = cur.read_string()?;
    }

    let mut execution = Execution {
        order_id,
        exec_id: cur.read_string()?,
        time: cur.read_string()?,
        acct_number: cur.read_string()?,
        exchange: cur.read_string()?,
        side: cur.read_string()?,
        shares: cur.read_int()?,
        price: cur.read_double()?,
        ..Default::default()
    };
    if version >= 2 {
        execution.perm_id = cur.read_int()?;
    }
    if version >= 3 {
        execution.client_id = cur.read_int()?;
    }
    if version >= 4 {
        execution.liquidation = cur.read_int()?;
    }
    if version >= 6 {
        execution.cum_qty = cur.read_int()?;
        execution.avg_price = cur.read_double()?;
    }
    if version >= 8 {
        execution.order_ref = cur.read_string()?;
    }
    if version >= 9 {
        execution.ev_rule = cur.read_string()?;
        execution.ev_multiplier = cur.read_double()?;
    }

    Ok(Incoming::ExecutionData(Box::new(ExecutionData {
        req_id,
        contract,
        execution,
    })))
}

fn execution_data_end(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::ExecutionDataEnd(ExecutionDataEnd {
        req_id: cur.read_int()?,
    }))
}

fn commission_report(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::CommissionReport(CommissionReport {
        exec_id: cur.read_string()?,
        commission: cur.read_double()?,
        currency: cur.read_string()?,
        realized_pnl: cur.read_double()?,
        yield_: cur.read_double()?,
        yield_redemption_date: cur.read_int()?,
    }))
}

// =============================================================================
// Account and positions
// =============================================================================

fn account_value(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let key = cur.read_string()?;
    let value = cur.read_string()?;
    let currency = cur.read_string()?;
    let account_name = if version >= 2 {
        cur.read_string()?
    } else {
        String::new()
    };
    Ok(Incoming::AccountValue(AccountValue {
        key,
        value,
        currency,
        account_name,
    }))
}

fn portfolio_value(
    cur: &mut TokenCursor<'_>,
    server_version: i32,
) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let mut contract = Contract::default();
    if version >= 6 {
        contract.con_id = cur.read_int()?;
    }
    contract.symbol = cur.read_string()?;
    contract.sec_type = cur.read_string()?;
    contract.expiry = cur.read_string()?;
    contract.strike = cur.read_double()?;
    contract.right = cur.read_string()?;
    if version >= 7 {
        contract.multiplier = cur.read_string()?;
        contract.primary_exch = cur.read_string()?;
    }
    contract.currency = cur.read_string()?;
    if version >= 2 {
        contract.local_symbol = cur.read_string()?;
    }
    if version >= 8 {
        contract.trading_class = cur.read_string()?;
    }

    let position = cur.read_int()?;
    let market_price = cur.read_double()?;
    let market_value = cur.read_double()?;
    let (mut average_cost, mut unrealized_pnl, mut realized_pnl) = (0.0, 0.0, 0.0);
    if version >= 3 {
        average_cost = cur.read_double()?;
        unrealized_pnl = cur.read_double()?;
        realized_pnl = cur.read_double()?;
    }
    let account_name = if version >= 4 {
        cur.read_string()?
    } else {
        String::new()
    };
    if version == 6 && server_version == 39 {
        contract.primary_exch = cur.read_string()?;
    }

    Ok(Incoming::PortfolioValue(Box::new(PortfolioValue {
        contract,
        position,
        market_price,
        market_value,
        average_cost,
        unrealized_pnl,
        realized_pnl,
        account_name,
    })))
}

fn account_update_time(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::AccountUpdateTime(AccountUpdateTime {
        timestamp: cur.read_string()?,
    }))
}

fn account_download_end(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::AccountDownloadEnd(AccountDownloadEnd {
        account: cur.read_string()?,
    }))
}

fn managed_accounts(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::ManagedAccounts(ManagedAccounts {
        accounts: cur.read_string()?,
    }))
}

fn receive_fa(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::ReceiveFa(ReceiveFa {
        fa_data_type: cur.read_int()?,
        xml: cur.read_string()?,
    }))
}

fn position(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let account = cur.read_string()?;
    let mut contract = Contract {
        con_id: cur.read_int()?,
        symbol: cur.read_string()?,
        sec_type: cur.read_string()?,
        expiry: cur.read_string()?,
        strike: cur.read_double()?,
        right: cur.read_string()?,
        multiplier: cur.read_string()?,
        exchange: cur.read_string()?,
        currency: cur.read_string()?,
        local_symbol: cur.read_string()?,
        ..Default::default()
    };
    if version >= 2 {
        contract.trading_class = cur.read_string()?;
    }
    let position = cur.read_int()?;
    let avg_cost = if version >= 3 { cur.read_double()? } else { 0.0 };
    Ok(Incoming::Position(Box::new(Position {
        account,
        contract,
        position,
        avg_cost,
    })))
}

fn account_summary(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::AccountSummary(AccountSummary {
        req_id: cur.read_int()?,
        account: cur.read_string()?,
        tag: cur.read_string()?,
        value: cur.read_string()?,
        currency: cur.read_string()?,
    }))
}

fn account_summary_end(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::AccountSummaryEnd(AccountSummaryEnd {
        req_id: cur.read_int()?,
    }))
}

// =============================================================================
// Contracts and reference data
// =============================================================================

fn contract_data(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let req_id = if version >= 3 { cur.read_int()? } else { -1 };

    let mut d = ContractDetails::default();
    d.summary.symbol = cur.read_string()?;
    d.summary.sec_type = cur.read_string()?;
    d.summary.expiry = cur.read_string()?;
    d.summary.strike = cur.read_double()?;
    d.summary.right = cur.read_string()?;
    d.summary.exchange = cur.read_string()?;
    d.summary.currency = cur.read_string()?;
    d.summary.local_symbol = cur.read_string()?;
    d.market_name = cur.read_string()?;
    d.summary.trading_class = cur.read_string()?;
    d.summary.con_id = cur.read_int()?;
    d.min_tick = cur.read_double()?;
    d.summary.multiplier = cur.read_string()?;
    d.order_types = cur.read_string()?;
    d.valid_exchanges = cur.read_string()?;
    if version >= 2 {
        d.price_magnifier = cur.read_int()?;
    }
    if version >= 4 {
        d.under_con_id = cur.read_int()?;
    }
    if version >= 5 {
        d.long_name = cur.read_string()?;
        d.summary.primary_exch = cur.read_string()?;
    }
    if version >= 6 {
        d.contract_month = cur.read_string()?;
        d.industry = cur.read_string()?;
        d.category = cur.read_string()?;
        d.subcategory = cur.read_string()?;
        d.time_zone_id = cur.read_string()?;
        d.trading_hours = cur.read_string()?;
        d.liquid_hours = cur.read_string()?;
    }
    if version >= 8 {
        d.ev_rule = cur.read_string()?;
        d.ev_multiplier = cur.read_double()?;
    }
    if version >= 7 {
        d.sec_id_list = read_tag_values(cur)?;
    }

    Ok(Incoming::ContractData(Box::new(ContractData {
        req_id,
        details: d,
    })))
}

fn bond_contract_data(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let req_id = if version >= 3 { cur.read_int()? } else { -1 };

    let mut d = ContractDetails::default();
    d.summary.symbol = cur.read_string()?;
    d.summary.sec_type = cur.read_string()?;
    d.cusip = cur.read_string()?;
    d.coupon = cur.read_double()?;
    d.maturity = cur.read_string()?;
    d.issue_date = cur.read_string()?;
    d.ratings = cur.read_string()?;
    d.bond_type = cur.read_string()?;
    d.coupon_type = cur.read_string()?;
    d.convertible = cur.read_bool_from_int()?;
    d.callable = cur.read_bool_from_int()?;
    d.putable = cur.read_bool_from_int()?;
    d.desc_append = cur.read_string()?;
    d.summary.exchange = cur.read_string()?;
    d.summary.currency = cur.read_string()?;
    d.market_name = cur.read_string()?;
    d.summary.trading_class = cur.read_string()?;
    d.summary.con_id = cur.read_int()?;
    d.min_tick = cur.read_double()?;
    d.order_types = cur.read_string()?;
    d.valid_exchanges = cur.read_string()?;
    if version >= 2 {
        d.next_option_date = cur.read_string()?;
        d.next_option_type = cur.read_string()?;
        d.next_option_partial = cur.read_bool_from_int()?;
        d.notes = cur.read_string()?;
    }
    if version >= 4 {
        d.long_name = cur.read_string()?;
    }
    if version >= 6 {
        d.ev_rule = cur.read_string()?;
        d.ev_multiplier = cur.read_double()?;
    }
    if version >= 5 {
        d.sec_id_list = read_tag_values(cur)?;
    }

    Ok(Incoming::BondContractData(Box::new(ContractData {
        req_id,
        details: d,
    })))
}

fn contract_data_end(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::ContractDataEnd(ContractDataEnd {
        req_id: cur.read_int()?,
    }))
}

fn fundamental_data(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::FundamentalData(FundamentalData {
        req_id: cur.read_int()?,
        data: cur.read_string()?,
    }))
}

fn news_bulletin(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::NewsBulletin(NewsBulletin {
        msg_id: cur.read_int()?,
        msg_type: cur.read_int()?,
        message: cur.read_string()?,
        orig_exchange: cur.read_string()?,
    }))
}

// =============================================================================
// Historical, real-time and scanner data
// =============================================================================

fn historical_data(cur: &mut TokenCursor<'_>) -> DecodeResult {
    let version = cur.read_int()?;
    let req_id = cur.read_int()?;
    let (start, end) = if version >= 2 {
        (cur.read_string()?, cur.read_string()?)
    } else {
        (String::new(), String::new())
    };

    let count = cur.read_int()?;
    let mut out = Vec::with_capacity(count.clamp(0, 4096) as usize + 1);
    for _ in 0..count {
        let mut bar = HistoricalBar {
            req_id,
            date: cur.read_string()?,
            open: cur.read_double()?,
            high: cur.read_double()?,
            low: cur.read_double()?,
            close: cur.read_double()?,
            volume: cur.read_long()?,
            wap: cur.read_double()?,
            has_gaps: cur.read_bool_text()?,
            count: -1,
        };
        if version >= 3 {
            bar.count = cur.read_int()?;
        }
        out.push(Incoming::HistoricalData(bar));
    }
    out.push(Incoming::HistoricalDataEnd(HistoricalDataEnd {
        req_id,
        start,
        end,
    }));
    Ok(out)
}

fn real_time_bar(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::RealTimeBar(RealTimeBar {
        req_id: cur.read_int()?,
        time: cur.read_long()?,
        open: cur.read_double()?,
        high: cur.read_double()?,
        low: cur.read_double()?,
        close: cur.read_double()?,
        volume: cur.read_long()?,
        wap: cur.read_double()?,
        count: cur.read_int()?,
    }))
}

fn scanner_parameters(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::ScannerParameters(ScannerParameters {
        xml: cur.read_string()?,
    }))
}

fn scanner_data(cur: &mut TokenCursor<'_>) -> DecodeResult {
    let version = cur.read_int()?;
    let req_id = cur.read_int()?;
    let count = cur.read_int()?;

    let mut out = Vec::with_capacity(count.clamp(0, 256) as usize + 1);
    for _ in 0..count {
        let rank = cur.read_int()?;
        let mut d = ContractDetails::default();
        if version >= 3 {
            d.summary.con_id = cur.read_int()?;
        }
        d.summary.symbol = cur.read_string()?;
        d.summary.sec_type = cur.read_string()?;
        d.summary.expiry = cur.read_string()?;
        d.summary.strike = cur.read_double()?;
        d.summary.right = cur.read_string()?;
        d.summary.exchange = cur.read_string()?;
        d.summary.currency = cur.read_string()?;
        d.summary.local_symbol = cur.read_string()?;
        d.market_name = cur.read_string()?;
        d.summary.trading_class = cur.read_string()?;
        let distance = cur.read_string()?;
        let benchmark = cur.read_string()?;
        let projection = cur.read_string()?;
        let legs_str = if version >= 2 {
            cur.read_string()?
        } else {
            String::new()
        };
        out.push(Incoming::ScannerData(Box::new(ScannerData {
            req_id,
            rank,
            details: d,
            distance,
            benchmark,
            projection,
            legs_str,
        })));
    }
    out.push(Incoming::ScannerDataEnd(ScannerDataEnd { req_id }));
    Ok(out)
}

// =============================================================================
// Session and system
// =============================================================================

fn error(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    let version = cur.read_int()?;
    let msg = if version < 2 {
        ErrorMessage {
            id: -1,
            code: 0,
            message: cur.read_string()?,
        }
    } else {
        ErrorMessage {
            id: cur.read_int()?,
            code: cur.read_int()?,
            message: cur.read_string()?,
        }
    };
    Ok(Incoming::Error(msg))
}

fn current_time(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::CurrentTime(CurrentTime {
        time: cur.read_long()?,
    }))
}

fn verify_message_api(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::VerifyMessageApi(VerifyMessageApi {
        api_data: cur.read_string()?,
    }))
}

fn verify_completed(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    let is_successful = cur.read_string()?.eq_ignore_ascii_case("true");
    Ok(Incoming::VerifyCompleted(VerifyCompleted {
        is_successful,
        error_text: cur.read_string()?,
    }))
}

fn display_group_list(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::DisplayGroupList(DisplayGroupList {
        req_id: cur.read_int()?,
        groups: cur.read_string()?,
    }))
}

fn display_group_updated(cur: &mut TokenCursor<'_>) -> Result<Incoming, ProtocolError> {
    cur.read_int()?;
    Ok(Incoming::DisplayGroupUpdated(DisplayGroupUpdated {
        req_id: cur.read_int()?,
        contract_info: cur.read_string()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenWriter;

    fn frame(tokens: &[&str]) -> Vec<u8> {
        let mut w = TokenWriter::new();
        for t in tokens {
            w.put_str(t);
        }
        w.as_slice().to_vec()
    }

    fn decode(kind: IncomingKind, tokens: &[&str], server_version: i32) -> Vec<Incoming> {
        let buf = frame(tokens);
        let mut cur = TokenCursor::new(&buf);
        let out = decode_message(kind, &mut cur, server_version).unwrap();
        assert_eq!(cur.remaining(), 0, "decoder left unread tokens");
        out
    }

    #[test]
    fn test_tick_price_synthesizes_size() {
        let out = decode(IncomingKind::TickPrice, &["2", "5", "1", "1", "100"], 63);
        assert_eq!(out.len(), 2);
        match &out[0] {
            Incoming::TickPrice(t) => {
                assert_eq!(t.ticker_id, 5);
                assert_eq!(t.field, 1);
                assert_eq!(t.price, 1.0);
                assert_eq!(t.can_auto_execute, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            out[1],
            Incoming::TickSize(TickSize {
                ticker_id: 5,
                field: tick_type::BID_SIZE,
                size: 100
            })
        );
    }

    #[test]
    fn test_tick_price_without_size() {
        let out = decode(IncomingKind::TickPrice, &["1", "5", "1", "1.25"], 63);
        assert_eq!(out.len(), 1);

        // field 9 (close) has no paired size
        let out = decode(IncomingKind::TickPrice, &["3", "5", "9", "1.25", "0", "1"], 63);
        assert_eq!(out.len(), 1);
        match &out[0] {
            Incoming::TickPrice(t) => assert_eq!(t.can_auto_execute, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_tick_option_computation_sentinels() {
        let out = decode(
            IncomingKind::TickOptionComputation,
            &["5", "1", "10", "-1", "-2"],
            63,
        );
        match &out[0] {
            Incoming::TickOptionComputation(t) => {
                assert_eq!(t.implied_volatility, f64::MAX);
                assert_eq!(t.delta, f64::MAX);
                assert_eq!(t.opt_price, f64::MAX);
                assert_eq!(t.und_price, f64::MAX);
            }
            other => panic!("unexpected {other:?}"),
        }

        // model option ticks carry price and dividend before stamp 6
        let out = decode(
            IncomingKind::TickOptionComputation,
            &["5", "1", "13", "0.2", "0.5", "3.1", "-1"],
            63,
        );
        match &out[0] {
            Incoming::TickOptionComputation(t) => {
                assert_eq!(t.opt_price, 3.1);
                assert_eq!(t.pv_dividend, f64::MAX);
                assert_eq!(t.gamma, f64::MAX);
            }
            other => panic!("unexpected {other:?}"),
        }

        let out = decode(
            IncomingKind::TickOptionComputation,
            &["6", "1", "10", "0.2", "0.5", "3.1", "0.1", "0.05", "0.2", "-2", "101.5"],
            63,
        );
        match &out[0] {
            Incoming::TickOptionComputation(t) => {
                assert_eq!(t.gamma, 0.05);
                assert_eq!(t.vega, 0.2);
                assert_eq!(t.theta, f64::MAX);
                assert_eq!(t.und_price, 101.5);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_error_versions() {
        let out = decode(IncomingKind::Error, &["1", "legacy text"], 63);
        assert_eq!(
            out[0],
            Incoming::Error(ErrorMessage {
                id: -1,
                code: 0,
                message: "legacy text".to_string()
            })
        );

        let out = decode(IncomingKind::Error, &["2", "7", "200", "No security"], 63);
        assert_eq!(
            out[0],
            Incoming::Error(ErrorMessage {
                id: 7,
                code: 200,
                message: "No security".to_string()
            })
        );
    }

    #[test]
    fn test_order_status_versions() {
        let out = decode(
            IncomingKind::OrderStatus,
            &["1", "3", "Filled", "100", "0", "10.5"],
            63,
        );
        match &out[0] {
            Incoming::OrderStatus(s) => {
                assert_eq!(s.status, "Filled");
                assert_eq!(s.perm_id, 0);
                assert!(s.why_held.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }

        let out = decode(
            IncomingKind::OrderStatus,
            &["6", "3", "PreSubmitted", "0", "100", "0", "99", "1", "10.1", "4", "locate"],
            63,
        );
        match &out[0] {
            Incoming::OrderStatus(s) => {
                assert_eq!(s.perm_id, 99);
                assert_eq!(s.parent_id, 1);
                assert_eq!(s.client_id, 4);
                assert_eq!(s.why_held, "locate");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_historical_data_items_and_end() {
        let out = decode(
            IncomingKind::HistoricalData,
            &[
                "3", "9", "20240101", "20240102", "2", //
                "20240101", "1", "2", "0.5", "1.5", "1000", "1.2", "false", "12", //
                "20240102", "1.5", "2.5", "1", "2", "2000", "1.8", "True", "20",
            ],
            63,
        );
        assert_eq!(out.len(), 3);
        match &out[1] {
            Incoming::HistoricalData(bar) => {
                assert_eq!(bar.req_id, 9);
                assert_eq!(bar.volume, 2000);
                assert!(bar.has_gaps);
                assert_eq!(bar.count, 20);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            out[2],
            Incoming::HistoricalDataEnd(HistoricalDataEnd {
                req_id: 9,
                start: "20240101".to_string(),
                end: "20240102".to_string()
            })
        );
    }

    #[test]
    fn test_historical_data_stamp_one() {
        let out = decode(
            IncomingKind::HistoricalData,
            &["1", "4", "1", "20240101", "1", "2", "0.5", "1.5", "10", "1.2", "false"],
            63,
        );
        assert_eq!(out.len(), 2);
        match &out[0] {
            Incoming::HistoricalData(bar) => assert_eq!(bar.count, -1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_historical_data_bad_gap_flag() {
        let buf = frame(&["1", "4", "1", "d", "1", "2", "0.5", "1.5", "10", "1.2", "maybe"]);
        let mut cur = TokenCursor::new(&buf);
        let err = decode_message(IncomingKind::HistoricalData, &mut cur, 63).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidBool(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_scanner_data_items_and_end() {
        let out = decode(
            IncomingKind::ScannerData,
            &[
                "3", "11", "1", //
                "0", "265598", "AAPL", "STK", "", "0", "", "SMART", "USD", "AAPL", "NMS",
                "AAPL", "", "", "", "",
            ],
            63,
        );
        assert_eq!(out.len(), 2);
        match &out[0] {
            Incoming::ScannerData(item) => {
                assert_eq!(item.rank, 0);
                assert_eq!(item.details.summary.con_id, 265598);
                assert_eq!(item.details.market_name, "NMS");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(
            out[1],
            Incoming::ScannerDataEnd(ScannerDataEnd { req_id: 11 })
        );
    }

    #[test]
    fn test_portfolio_value_primary_exchange_quirk() {
        let tokens = [
            "6", "8314", "IBM", "STK", "", "0", "", "USD", "IBM", "100", "180.5", "18050",
            "150", "3050", "0", "DU1", "NYSE",
        ];
        let out = decode(IncomingKind::PortfolioValue, &tokens, 39);
        match &out[0] {
            Incoming::PortfolioValue(p) => {
                assert_eq!(p.contract.con_id, 8314);
                assert_eq!(p.contract.primary_exch, "NYSE");
                assert_eq!(p.position, 100);
                assert_eq!(p.account_name, "DU1");
            }
            other => panic!("unexpected {other:?}"),
        }

        // other server versions leave the trailing token unread
        let buf = frame(&tokens);
        let mut cur = TokenCursor::new(&buf);
        decode_message(IncomingKind::PortfolioValue, &mut cur, 40).unwrap();
        assert_eq!(cur.remaining(), "NYSE\0".len());
    }

    #[test]
    fn test_account_value_versions() {
        let out = decode(IncomingKind::AcctValue, &["1", "NetLiquidation", "100", "USD"], 63);
        match &out[0] {
            Incoming::AccountValue(v) => assert!(v.account_name.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
        let out = decode(
            IncomingKind::AcctValue,
            &["2", "NetLiquidation", "100", "USD", "DU1"],
            63,
        );
        match &out[0] {
            Incoming::AccountValue(v) => assert_eq!(v.account_name, "DU1"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_contract_data_full() {
        let out = decode(
            IncomingKind::ContractData,
            &[
                "8", "3", "AAPL", "STK", "", "0", "", "SMART", "USD", "AAPL", "NMS", "AAPL",
                "265598", "0.01", "", "LMT,MKT", "SMART,ISLAND", "1", "0", "APPLE INC",
                "NASDAQ", "", "Technology", "Computers", "Hardware", "EST", "0930-1600",
                "0930-1600", "", "0", "1", "ISIN", "US0378331005",
            ],
            63,
        );
        match &out[0] {
            Incoming::ContractData(c) => {
                assert_eq!(c.req_id, 3);
                assert_eq!(c.details.summary.con_id, 265598);
                assert_eq!(c.details.summary.primary_exch, "NASDAQ");
                assert_eq!(c.details.long_name, "APPLE INC");
                assert_eq!(c.details.sec_id_list.len(), 1);
                assert_eq!(c.details.sec_id_list[0].value, "US0378331005");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_contract_data_early_stamp() {
        let out = decode(
            IncomingKind::ContractData,
            &[
                "1", "AAPL", "STK", "", "0", "", "SMART", "USD", "AAPL", "NMS", "AAPL", "1",
                "0.01", "", "LMT", "SMART",
            ],
            63,
        );
        match &out[0] {
            Incoming::ContractData(c) => {
                assert_eq!(c.req_id, -1);
                assert_eq!(c.details.price_magnifier, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_bond_contract_data() {
        let out = decode(
            IncomingKind::BondContractData,
            &[
                "6", "2", "IBM", "BOND", "459200HU8", "4.0", "20420601", "20120601", "A1",
                "FIXED", "FIXED", "0", "1", "0", "", "SMART", "USD", "IBM", "IBM", "777",
                "0.001", "LMT", "SMART", "20300601", "CALL", "1", "note", "IBM 4 06/42",
                "", "0", "0",
            ],
            63,
        );
        match &out[0] {
            Incoming::BondContractData(c) => {
                assert_eq!(c.req_id, 2);
                assert_eq!(c.details.cusip, "459200HU8");
                assert!(c.details.callable);
                assert!(!c.details.convertible);
                assert!(c.details.next_option_partial);
                assert_eq!(c.details.long_name, "IBM 4 06/42");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_execution_data() {
        let out = decode(
            IncomingKind::ExecutionData,
            &[
                "10", "4", "12", "265598", "AAPL", "STK", "", "0", "", "", "ISLAND", "USD",
                "AAPL", "NMS", "0001.01", "20240101 10:00:00", "DU1", "ISLAND", "BOT", "100",
                "180.25", "555", "1", "0", "100", "180.25", "ref", "", "0",
            ],
            63,
        );
        match &out[0] {
            Incoming::ExecutionData(e) => {
                assert_eq!(e.req_id, 4);
                assert_eq!(e.execution.order_id, 12);
                assert_eq!(e.execution.perm_id, 555);
                assert_eq!(e.execution.cum_qty, 100);
                assert_eq!(e.execution.order_ref, "ref");
                assert_eq!(e.contract.trading_class, "NMS");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_position_versions() {
        let out = decode(
            IncomingKind::Position,
            &[
                "3", "DU1", "8314", "IBM", "STK", "", "0", "", "", "NYSE", "USD", "IBM", "IBM",
                "10", "150.5",
            ],
            63,
        );
        match &out[0] {
            Incoming::Position(p) => {
                assert_eq!(p.position, 10);
                assert_eq!(p.avg_cost, 150.5);
                assert_eq!(p.contract.trading_class, "IBM");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_open_order_minimal_stamp() {
        let out = decode(
            IncomingKind::OpenOrder,
            &[
                "1", "42", "AAPL", "STK", "", "0", "", "SMART", "USD", "BUY", "100", "LMT",
                "180", "0", "DAY", "", "DU1", "O", "0", "",
            ],
            63,
        );
        match &out[0] {
            Incoming::OpenOrder(o) => {
                assert_eq!(o.order_id, 42);
                assert_eq!(o.order.lmt_price, 180.0);
                assert_eq!(o.order.account, "DU1");
                assert_eq!(o.order_state.commission, f64::MAX);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_open_order_partial_is_incomplete() {
        let buf = frame(&["32", "42", "AAPL"]);
        let mut cur = TokenCursor::new(&buf);
        let err = decode_message(IncomingKind::OpenOrder, &mut cur, 63).unwrap_err();
        assert!(matches!(err, ProtocolError::Incomplete));
    }

    #[test]
    fn test_verify_completed_flag() {
        let out = decode(IncomingKind::VerifyCompleted, &["1", "TRUE", ""], 70);
        assert_eq!(
            out[0],
            Incoming::VerifyCompleted(VerifyCompleted {
                is_successful: true,
                error_text: String::new()
            })
        );
        let out = decode(IncomingKind::VerifyCompleted, &["1", "false", "denied"], 70);
        match &out[0] {
            Incoming::VerifyCompleted(v) => assert!(!v.is_successful),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_end_markers() {
        assert_eq!(
            decode(IncomingKind::OpenOrderEnd, &["1"], 63),
            vec![Incoming::OpenOrderEnd]
        );
        assert_eq!(
            decode(IncomingKind::PositionEnd, &["1"], 63),
            vec![Incoming::PositionEnd]
        );
        assert_eq!(
            decode(IncomingKind::ContractDataEnd, &["1", "3"], 63),
            vec![Incoming::ContractDataEnd(ContractDataEnd { req_id: 3 })]
        );
    }

    #[test]
    fn test_real_time_bar_and_current_time() {
        let out = decode(
            IncomingKind::RealTimeBars,
            &["1", "5", "1700000000", "1", "2", "0.5", "1.5", "12345678901", "1.2", "7"],
            63,
        );
        match &out[0] {
            Incoming::RealTimeBar(b) => {
                assert_eq!(b.time, 1_700_000_000);
                assert_eq!(b.volume, 12_345_678_901);
            }
            other => panic!("unexpected {other:?}"),
        }
        let out = decode(IncomingKind::CurrentTime, &["1", "1700000000"], 63);
        assert_eq!(
            out[0],
            Incoming::CurrentTime(CurrentTime { time: 1_700_000_000 })
        );
    }
}
