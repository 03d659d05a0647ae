//! Order description and order state.
//!
//! Optional numeric fields use `i32::MAX` / `f64::MAX` as "unset"; those are
//! sent as empty tokens.

use crate::contract::TagValue;
use serde::{Deserialize, Serialize};

/// Per-leg price of a combination order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderComboLeg {
    pub price: f64,
}

impl Default for OrderComboLeg {
    fn default() -> Self {
        Self { price: f64::MAX }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    // Identification
    pub order_id: i32,
    pub client_id: i32,
    pub perm_id: i32,

    // Main fields
    pub action: String,
    pub total_quantity: i32,
    pub order_type: String,
    pub lmt_price: f64,
    pub aux_price: f64,

    // Extended fields
    pub tif: String,
    pub active_start_time: String,
    pub active_stop_time: String,
    pub oca_group: String,
    pub oca_type: i32,
    pub order_ref: String,
    pub transmit: bool,
    pub parent_id: i32,
    pub block_order: bool,
    pub sweep_to_fill: bool,
    pub display_size: i32,
    pub trigger_method: i32,
    pub outside_rth: bool,
    pub hidden: bool,
    pub good_after_time: String,
    pub good_till_date: String,
    pub rule80a: String,
    pub all_or_none: bool,
    pub min_qty: i32,
    pub percent_offset: f64,
    pub override_percentage_constraints: bool,
    pub trail_stop_price: f64,
    pub trailing_percent: f64,

    // Financial advisors
    pub fa_group: String,
    pub fa_profile: String,
    pub fa_method: String,
    pub fa_percentage: String,

    // Institutional
    pub open_close: String,
    pub origin: i32,
    pub short_sale_slot: i32,
    pub designated_location: String,
    pub exempt_code: i32,

    // SMART routing
    pub discretionary_amt: f64,
    pub e_trade_only: bool,
    pub firm_quote_only: bool,
    pub nbbo_price_cap: f64,
    pub opt_out_smart_routing: bool,

    // Box and pegged-to-stock orders
    pub auction_strategy: i32,
    pub starting_price: f64,
    pub stock_ref_price: f64,
    pub delta: f64,
    pub stock_range_lower: f64,
    pub stock_range_upper: f64,

    // Volatility orders
    pub volatility: f64,
    pub volatility_type: i32,
    pub continuous_update: i32,
    pub reference_price_type: i32,
    pub delta_neutral_order_type: String,
    pub delta_neutral_aux_price: f64,
    pub delta_neutral_con_id: i32,
    pub delta_neutral_settling_firm: String,
    pub delta_neutral_clearing_account: String,
    pub delta_neutral_clearing_intent: String,
    pub delta_neutral_open_close: String,
    pub delta_neutral_short_sale: bool,
    pub delta_neutral_short_sale_slot: i32,
    pub delta_neutral_designated_location: String,

    // Combination orders
    pub basis_points: f64,
    pub basis_points_type: i32,

    // Scale orders
    pub scale_init_level_size: i32,
    pub scale_subs_level_size: i32,
    pub scale_price_increment: f64,
    pub scale_price_adjust_value: f64,
    pub scale_price_adjust_interval: i32,
    pub scale_profit_offset: f64,
    pub scale_auto_reset: bool,
    pub scale_init_position: i32,
    pub scale_init_fill_qty: i32,
    pub scale_random_percent: bool,
    pub scale_table: String,

    // Hedge orders
    pub hedge_type: String,
    pub hedge_param: String,

    // Clearing
    pub account: String,
    pub settling_firm: String,
    pub clearing_account: String,
    pub clearing_intent: String,

    // Algo orders
    pub algo_strategy: String,
    pub algo_params: Vec<TagValue>,
    pub smart_combo_routing_params: Vec<TagValue>,
    pub algo_id: String,

    pub what_if: bool,
    pub not_held: bool,
    pub order_combo_legs: Vec<OrderComboLeg>,
    pub order_misc_options: Vec<TagValue>,
}

impl Default for Order {
    fn default() -> Self {
        Self {
            order_id: 0,
            client_id: 0,
            perm_id: 0,
            action: String::new(),
            total_quantity: 0,
            order_type: String::new(),
            lmt_price: f64::MAX,
            aux_price: f64::MAX,
            tif: String::new(),
            active_start_time: String::new(),
            active_stop_time: String::new(),
            oca_group: String::new(),
            oca_type: 0,
            order_ref: String::new(),
            transmit: true,
            parent_id: 0,
            block_order: false,
            sweep_to_fill: false,
            display_size: 0,
            trigger_method: 0,
            outside_rth: false,
            hidden: false,
            good_after_time: String::new(),
            good_till_date: String::new(),
            rule80a: String::new(),
            all_or_none: false,
            min_qty: i32::MAX,
            percent_offset: f64::MAX,
            override_percentage_constraints: false,
            trail_stop_price: f64::MAX,
            trailing_percent: f64::MAX,
            fa_group: String::new(),
            fa_profile: String::new(),
            fa_method: String::new(),
            fa_percentage: String::new(),
            open_close: "O".to_string(),
            origin: 0,
            short_sale_slot: 0,
            designated_location: String::new(),
            exempt_code: -1,
            discretionary_amt: 0.0,
            e_trade_only: false,
            firm_quote_only: false,
            nbbo_price_cap: f64::MAX,
            opt_out_smart_routing: false,
            auction_strategy: 0,
            starting_price: f64::MAX,
            stock_ref_price: f64::MAX,
            delta: f64::MAX,
            stock_range_lower: f64::MAX,
            stock_range_upper: f64::MAX,
            volatility: f64::MAX,
            volatility_type: i32::MAX,
            continuous_update: 0,
            reference_price_type: i32::MAX,
            delta_neutral_order_type: String::new(),
            delta_neutral_aux_price: f64::MAX,
            delta_neutral_con_id: 0,
            delta_neutral_settling_firm: String::new(),
            delta_neutral_clearing_account: String::new(),
            delta_neutral_clearing_intent: String::new(),
            delta_neutral_open_close: String::new(),
            delta_neutral_short_sale: false,
            delta_neutral_short_sale_slot: 0,
            delta_neutral_designated_location: String::new(),
            basis_points: f64::MAX,
            basis_points_type: i32::MAX,
            scale_init_level_size: i32::MAX,
            scale_subs_level_size: i32::MAX,
            scale_price_increment: f64::MAX,
            scale_price_adjust_value: f64::MAX,
            scale_price_adjust_interval: i32::MAX,
            scale_profit_offset: f64::MAX,
            scale_auto_reset: false,
            scale_init_position: i32::MAX,
            scale_init_fill_qty: i32::MAX,
            scale_random_percent: false,
            scale_table: String::new(),
            hedge_type: String::new(),
            hedge_param: String::new(),
            account: String::new(),
            settling_firm: String::new(),
            clearing_account: String::new(),
            clearing_intent: String::new(),
            algo_strategy: String::new(),
            algo_params: Vec::new(),
            smart_combo_routing_params: Vec::new(),
            algo_id: String::new(),
            what_if: false,
            not_held: false,
            order_combo_legs: Vec::new(),
            order_misc_options: Vec::new(),
        }
    }
}

impl Order {
    /// A limit order for the given side, quantity and price.
    pub fn limit(action: impl Into<String>, quantity: i32, price: f64) -> Self {
        Self {
            action: action.into(),
            total_quantity: quantity,
            order_type: "LMT".to_string(),
            lmt_price: price,
            ..Default::default()
        }
    }

    /// A market order for the given side and quantity.
    pub fn market(action: impl Into<String>, quantity: i32) -> Self {
        Self {
            action: action.into(),
            total_quantity: quantity,
            order_type: "MKT".to_string(),
            ..Default::default()
        }
    }

    /// Whether the scale price increment is a real positive value.
    pub(crate) fn has_scale_price_increment(&self) -> bool {
        self.scale_price_increment > 0.0 && self.scale_price_increment != f64::MAX
    }
}

/// Margin and commission preview attached to open orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderState {
    pub status: String,
    pub init_margin: String,
    pub maint_margin: String,
    pub equity_with_loan: String,
    pub commission: f64,
    pub min_commission: f64,
    pub max_commission: f64,
    pub commission_currency: String,
    pub warning_text: String,
}

impl Default for OrderState {
    fn default() -> Self {
        Self {
            status: String::new(),
            init_margin: String::new(),
            maint_margin: String::new(),
            equity_with_loan: String::new(),
            commission: f64::MAX,
            min_commission: f64::MAX,
            max_commission: f64::MAX,
            commission_currency: String::new(),
            warning_text: String::new(),
        }
    }
}
