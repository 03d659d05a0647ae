//! Order placement.
//!
//! Orders carry the largest gated field set in the protocol. Both validators
//! run before anything is encoded so an unsupported order never reaches the
//! wire, even partially.

use crate::contract::Contract;
use crate::error::{ErrorCode, ProtocolError};
use crate::kind::{server_version as sv, OutgoingKind};
use crate::order::Order;
use crate::request::{put_under_comp, OutgoingMessage, RequestEncoder};
use crate::token::TokenWriter;

impl RequestEncoder {
    pub fn place_order(
        &self,
        id: i32,
        contract: &Contract,
        order: &Order,
    ) -> Result<OutgoingMessage, ProtocolError> {
        self.verify_order(id, order, contract.is_bag())?;
        self.verify_order_contract(id, contract)?;

        let version = if self.at_least(sv::NOT_HELD) { 43 } else { 27 };
        let mut w = Self::begin(OutgoingKind::PlaceOrder, version);
        w.put_int(id);
        self.put_order_contract(&mut w, contract);
        self.put_order_main(&mut w, order);
        if contract.is_bag() {
            self.put_order_combo(&mut w, contract, order);
        }
        self.put_order_extended(&mut w, order);
        self.put_order_volatility(&mut w, order);
        self.put_order_scale(&mut w, order);
        self.put_order_routing(&mut w, contract, order);

        Ok(Self::finish(
            w,
            OutgoingKind::PlaceOrder,
            ErrorCode::FailSendOrder,
            Some(id),
        ))
    }

    /// Rejects order fields the negotiated server cannot transmit.
    pub fn verify_order(
        &self,
        id: i32,
        order: &Order,
        is_bag: bool,
    ) -> Result<(), ProtocolError> {
        let id = Some(id);
        self.require_if(
            order.scale_init_level_size != i32::MAX || order.scale_price_increment != f64::MAX,
            sv::SCALE_ORDERS,
            "ScaleOrders",
            id,
        )?;
        self.require_if(order.what_if, sv::WHAT_IF_ORDERS, "WhatIf", id)?;
        self.require_if(
            order.scale_subs_level_size != i32::MAX,
            sv::SCALE_ORDERS2,
            "ScaleSubsLevelSize",
            id,
        )?;
        self.require_if(
            !order.algo_strategy.is_empty(),
            sv::ALGO_ORDERS,
            "AlgoStrategy",
            id,
        )?;
        self.require_if(order.not_held, sv::NOT_HELD, "NotHeld", id)?;
        self.require_if(order.exempt_code != -1, sv::SSHORTX, "ExemptCode", id)?;
        self.require_if(
            !order.hedge_type.is_empty(),
            sv::HEDGE_ORDERS,
            "HedgeType",
            id,
        )?;
        self.require_if(
            order.opt_out_smart_routing,
            sv::OPT_OUT_SMART_ROUTING,
            "OptOutSmartRouting",
            id,
        )?;
        self.require_if(
            order.delta_neutral_con_id > 0
                || !order.delta_neutral_settling_firm.is_empty()
                || !order.delta_neutral_clearing_account.is_empty()
                || !order.delta_neutral_clearing_intent.is_empty(),
            sv::DELTA_NEUTRAL_CONID,
            "DeltaNeutralConId",
            id,
        )?;
        self.require_if(
            !order.delta_neutral_open_close.is_empty()
                || order.delta_neutral_short_sale
                || order.delta_neutral_short_sale_slot > 0
                || !order.delta_neutral_designated_location.is_empty(),
            sv::DELTA_NEUTRAL_OPEN_CLOSE,
            "DeltaNeutralOpenClose",
            id,
        )?;
        self.require_if(
            order.has_scale_price_increment()
                && (order.scale_price_adjust_value != f64::MAX
                    || order.scale_price_adjust_interval != i32::MAX
                    || order.scale_profit_offset != f64::MAX
                    || order.scale_auto_reset
                    || order.scale_init_position != i32::MAX
                    || order.scale_init_fill_qty != i32::MAX
                    || order.scale_random_percent),
            sv::SCALE_ORDERS3,
            "ScalePriceAdjustValue",
            id,
        )?;
        self.require_if(
            is_bag
                && order
                    .order_combo_legs
                    .iter()
                    .any(|leg| leg.price != f64::MAX),
            sv::ORDER_COMBO_LEGS_PRICE,
            "OrderComboLegsPrice",
            id,
        )?;
        self.require_if(
            order.trailing_percent != f64::MAX,
            sv::TRAILING_PERCENT,
            "TrailingPercent",
            id,
        )?;
        self.require_if(!order.algo_id.is_empty(), sv::ALGO_ID, "AlgoId", id)?;
        self.require_if(
            !order.scale_table.is_empty()
                || !order.active_start_time.is_empty()
                || !order.active_stop_time.is_empty(),
            sv::SCALE_TABLE,
            "ScaleTable",
            id,
        )?;
        Ok(())
    }

    /// Rejects contract fields the negotiated server cannot accept on an order.
    pub fn verify_order_contract(&self, id: i32, contract: &Contract) -> Result<(), ProtocolError> {
        let id = Some(id);
        self.require_if(
            contract
                .combo_legs
                .iter()
                .any(|leg| leg.short_sale_slot != 0 || !leg.designated_location.is_empty()),
            sv::SSHORT_COMBO_LEGS,
            "ComboLegShortSaleSlot",
            id,
        )?;
        self.require_if(
            contract.under_comp.is_some(),
            sv::UNDER_COMP,
            "UnderComp",
            id,
        )?;
        self.require_if(contract.con_id > 0, sv::PLACE_ORDER_CONID, "ConId", id)?;
        self.require_if(
            !contract.sec_id_type.is_empty() || !contract.sec_id.is_empty(),
            sv::SEC_ID_TYPE,
            "SecIdType",
            id,
        )?;
        self.require_if(
            contract.combo_legs.iter().any(|leg| leg.exempt_code != -1),
            sv::SSHORTX,
            "ComboLegExemptCode",
            id,
        )?;
        self.require_if(
            !contract.trading_class.is_empty(),
            sv::TRADING_CLASS,
            "TradingClass",
            id,
        )?;
        Ok(())
    }

    fn put_order_contract(&self, w: &mut TokenWriter, contract: &Contract) {
        if self.at_least(sv::PLACE_ORDER_CONID) {
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
        if self.at_least(sv::SEC_ID_TYPE) {
            w.put_str(&contract.sec_id_type);
            w.put_str(&contract.sec_id);
        }
    }

    fn put_order_main(&self, w: &mut TokenWriter, order: &Order) {
        w.put_str(&order.action);
        w.put_int(order.total_quantity);
        w.put_str(&order.order_type);
        // Older servers cannot read an empty price.
        if self.at_least(sv::ORDER_COMBO_LEGS_PRICE) {
            w.put_double_max(order.lmt_price);
        } else {
            w.put_double(unset_as_zero(order.lmt_price));
        }
        if self.at_least(sv::TRAILING_PERCENT) {
            w.put_double_max(order.aux_price);
        } else {
            w.put_double(unset_as_zero(order.aux_price));
        }
        w.put_str(&order.tif);
        w.put_str(&order.oca_group);
        w.put_str(&order.account);
        w.put_str(&order.open_close);
        w.put_int(order.origin);
        w.put_str(&order.order_ref);
        w.put_bool(order.transmit);
        if self.at_least(4) {
            w.put_int(order.parent_id);
        }
        if self.at_least(5) {
            w.put_bool(order.block_order);
            w.put_bool(order.sweep_to_fill);
            w.put_int(order.display_size);
            w.put_int(order.trigger_method);
            w.put_bool(order.outside_rth);
        }
        if self.at_least(7) {
            w.put_bool(order.hidden);
        }
    }

    fn put_order_combo(&self, w: &mut TokenWriter, contract: &Contract, order: &Order) {
        if self.at_least(8) {
            w.put_int(contract.combo_legs.len() as i32);
            for leg in &contract.combo_legs {
                w.put_int(leg.con_id);
                w.put_int(leg.ratio);
                w.put_str(&leg.action);
                w.put_str(&leg.exchange);
                w.put_int(leg.open_close);
                if self.at_least(sv::SSHORT_COMBO_LEGS) {
                    w.put_int(leg.short_sale_slot);
                    w.put_str(&leg.designated_location);
                }
                if self.at_least(sv::SSHORTX_OLD) {
                    w.put_int(leg.exempt_code);
                }
            }
        }
        if self.at_least(sv::ORDER_COMBO_LEGS_PRICE) {
            w.put_int(order.order_combo_legs.len() as i32);
            for leg in &order.order_combo_legs {
                w.put_double_max(leg.price);
            }
        }
        if self.at_least(sv::SMART_COMBO_ROUTING_PARAMS) {
            w.put_int(order.smart_combo_routing_params.len() as i32);
            for param in &order.smart_combo_routing_params {
                w.put_str(&param.tag);
                w.put_str(&param.value);
            }
        }
    }

    fn put_order_extended(&self, w: &mut TokenWriter, order: &Order) {
        if self.at_least(9) {
            // deprecated shares allocation
            w.put_empty();
        }
        if self.at_least(10) {
            w.put_double(order.discretionary_amt);
        }
        if self.at_least(11) {
            w.put_str(&order.good_after_time);
        }
        if self.at_least(12) {
            w.put_str(&order.good_till_date);
        }
        if self.at_least(13) {
            w.put_str(&order.fa_group);
            w.put_str(&order.fa_method);
            w.put_str(&order.fa_percentage);
            w.put_str(&order.fa_profile);
        }
        if self.at_least(18) {
            w.put_int(order.short_sale_slot);
            w.put_str(&order.designated_location);
        }
        if self.at_least(sv::SSHORTX_OLD) {
            w.put_int(order.exempt_code);
        }
        if self.at_least(19) {
            w.put_int(order.oca_type);
            w.put_str(&order.rule80a);
            w.put_str(&order.settling_firm);
            w.put_bool(order.all_or_none);
            w.put_int_max(order.min_qty);
            w.put_double_max(order.percent_offset);
            w.put_bool(order.e_trade_only);
            w.put_bool(order.firm_quote_only);
            w.put_double_max(order.nbbo_price_cap);
            w.put_int_max(order.auction_strategy);
            w.put_double_max(order.starting_price);
            w.put_double_max(order.stock_ref_price);
            w.put_double_max(order.delta);
            w.put_double_max(order.stock_range_lower);
            w.put_double_max(order.stock_range_upper);
        }
        if self.at_least(22) {
            w.put_bool(order.override_percentage_constraints);
        }
    }

    fn put_order_volatility(&self, w: &mut TokenWriter, order: &Order) {
        if self.at_least(26) {
            w.put_double_max(order.volatility);
            w.put_int_max(order.volatility_type);
            w.put_str(&order.delta_neutral_order_type);
            w.put_double_max(order.delta_neutral_aux_price);
            let has_dn_type = !order.delta_neutral_order_type.is_empty();
            if self.at_least(sv::DELTA_NEUTRAL_CONID) && has_dn_type {
                w.put_int(order.delta_neutral_con_id);
                w.put_str(&order.delta_neutral_settling_firm);
                w.put_str(&order.delta_neutral_clearing_account);
                w.put_str(&order.delta_neutral_clearing_intent);
            }
            if self.at_least(sv::DELTA_NEUTRAL_OPEN_CLOSE) && has_dn_type {
                w.put_str(&order.delta_neutral_open_close);
                w.put_bool(order.delta_neutral_short_sale);
                w.put_int(order.delta_neutral_short_sale_slot);
                w.put_str(&order.delta_neutral_designated_location);
            }
            w.put_int(order.continuous_update);
            w.put_int_max(order.reference_price_type);
        }
        if self.at_least(30) {
            w.put_double_max(order.trail_stop_price);
        }
        if self.at_least(sv::TRAILING_PERCENT) {
            w.put_double_max(order.trailing_percent);
        }
    }

    fn put_order_scale(&self, w: &mut TokenWriter, order: &Order) {
        if self.at_least(sv::SCALE_ORDERS) {
            if self.at_least(sv::SCALE_ORDERS2) {
                w.put_int_max(order.scale_init_level_size);
                w.put_int_max(order.scale_subs_level_size);
            } else {
                w.put_empty();
                w.put_int_max(order.scale_init_level_size);
            }
            w.put_double_max(order.scale_price_increment);
        }
        if self.at_least(sv::SCALE_ORDERS3) && order.has_scale_price_increment() {
            w.put_double_max(order.scale_price_adjust_value);
            w.put_int_max(order.scale_price_adjust_interval);
            w.put_double_max(order.scale_profit_offset);
            w.put_bool(order.scale_auto_reset);
            w.put_int_max(order.scale_init_position);
            w.put_int_max(order.scale_init_fill_qty);
            w.put_bool(order.scale_random_percent);
        }
        if self.at_least(sv::SCALE_TABLE) {
            w.put_str(&order.scale_table);
            w.put_str(&order.active_start_time);
            w.put_str(&order.active_stop_time);
        }
    }

    /// Hedge, clearing, algo and trailing option fields. The server reads
    /// these in this fixed order regardless of threshold.
    fn put_order_routing(&self, w: &mut TokenWriter, contract: &Contract, order: &Order) {
        if self.at_least(sv::HEDGE_ORDERS) {
            w.put_str(&order.hedge_type);
            if !order.hedge_type.is_empty() {
                w.put_str(&order.hedge_param);
            }
        }
        if self.at_least(sv::OPT_OUT_SMART_ROUTING) {
            w.put_bool(order.opt_out_smart_routing);
        }
        if self.at_least(sv::PTA_ORDERS) {
            w.put_str(&order.clearing_account);
            w.put_str(&order.clearing_intent);
        }
        if self.at_least(sv::NOT_HELD) {
            w.put_bool(order.not_held);
        }
        if self.at_least(sv::UNDER_COMP) {
            put_under_comp(w, contract);
        }
        if self.at_least(sv::ALGO_ORDERS) {
            w.put_str(&order.algo_strategy);
            if !order.algo_strategy.is_empty() {
                w.put_int(order.algo_params.len() as i32);
                for param in &order.algo_params {
                    w.put_str(&param.tag);
                    w.put_str(&param.value);
                }
            }
        }
        if self.at_least(sv::ALGO_ID) {
            w.put_str(&order.algo_id);
        }
        if self.at_least(sv::WHAT_IF_ORDERS) {
            w.put_bool(order.what_if);
        }
        if self.at_least(sv::LINKING) {
            w.put_tag_values(&order.order_misc_options);
        }
    }
}

fn unset_as_zero(value: f64) -> f64 {
    if value == f64::MAX {
        0.0
    } else {
        value
    }
}
