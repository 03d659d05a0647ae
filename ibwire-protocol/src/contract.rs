//! Contract descriptions and contract reference data.

use serde::{Deserialize, Serialize};

/// Security type of combination contracts.
pub const BAG_SEC_TYPE: &str = "BAG";

/// A free-form option passed alongside many requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagValue {
    pub tag: String,
    pub value: String,
}

impl TagValue {
    pub fn new(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            value: value.into(),
        }
    }
}

/// One leg of a combination contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComboLeg {
    pub con_id: i32,
    pub ratio: i32,
    pub action: String,
    pub exchange: String,
    /// 0 same as parent, 1 open, 2 close.
    pub open_close: i32,
    pub short_sale_slot: i32,
    pub designated_location: String,
    pub exempt_code: i32,
}

impl Default for ComboLeg {
    fn default() -> Self {
        Self {
            con_id: 0,
            ratio: 0,
            action: String::new(),
            exchange: String::new(),
            open_close: 0,
            short_sale_slot: 0,
            designated_location: String::new(),
            exempt_code: -1,
        }
    }
}

/// Delta-neutral underlying component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnderComp {
    pub con_id: i32,
    pub delta: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contract {
    pub con_id: i32,
    pub symbol: String,
    pub sec_type: String,
    pub expiry: String,
    pub strike: f64,
    pub right: String,
    pub multiplier: String,
    pub exchange: String,
    pub primary_exch: String,
    pub currency: String,
    pub local_symbol: String,
    pub trading_class: String,
    pub include_expired: bool,
    pub sec_id_type: String,
    pub sec_id: String,
    pub combo_legs_descrip: String,
    pub combo_legs: Vec<ComboLeg>,
    pub under_comp: Option<UnderComp>,
}

impl Contract {
    /// Shorthand for a stock contract routed through SMART.
    pub fn stock(symbol: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            sec_type: "STK".to_string(),
            exchange: "SMART".to_string(),
            currency: currency.into(),
            ..Default::default()
        }
    }

    /// Whether this is a combination contract. The comparison ignores case.
    pub fn is_bag(&self) -> bool {
        self.sec_type.eq_ignore_ascii_case(BAG_SEC_TYPE)
    }
}

/// Reference data returned for a contract or bond lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractDetails {
    pub summary: Contract,
    pub market_name: String,
    pub min_tick: f64,
    pub price_magnifier: i32,
    pub order_types: String,
    pub valid_exchanges: String,
    pub under_con_id: i32,
    pub long_name: String,
    pub contract_month: String,
    pub industry: String,
    pub category: String,
    pub subcategory: String,
    pub time_zone_id: String,
    pub trading_hours: String,
    pub liquid_hours: String,
    pub ev_rule: String,
    pub ev_multiplier: f64,
    pub sec_id_list: Vec<TagValue>,

    // Bond fields
    pub cusip: String,
    pub ratings: String,
    pub desc_append: String,
    pub bond_type: String,
    pub coupon_type: String,
    pub callable: bool,
    pub putable: bool,
    pub coupon: f64,
    pub convertible: bool,
    pub maturity: String,
    pub issue_date: String,
    pub next_option_date: String,
    pub next_option_type: String,
    pub next_option_partial: bool,
    pub notes: String,
}

/// Market scanner request parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSubscription {
    pub number_of_rows: i32,
    pub instrument: String,
    pub location_code: String,
    pub scan_code: String,
    pub above_price: f64,
    pub below_price: f64,
    pub above_volume: i32,
    pub average_option_volume_above: i32,
    pub market_cap_above: f64,
    pub market_cap_below: f64,
    pub moody_rating_above: String,
    pub moody_rating_below: String,
    pub sp_rating_above: String,
    pub sp_rating_below: String,
    pub maturity_date_above: String,
    pub maturity_date_below: String,
    pub coupon_rate_above: f64,
    pub coupon_rate_below: f64,
    pub exclude_convertible: String,
    pub scanner_setting_pairs: String,
    pub stock_type_filter: String,
}

impl Default for ScannerSubscription {
    fn default() -> Self {
        Self {
            number_of_rows: -1,
            instrument: String::new(),
            location_code: String::new(),
            scan_code: String::new(),
            above_price: f64::MAX,
            below_price: f64::MAX,
            above_volume: i32::MAX,
            average_option_volume_above: i32::MAX,
            market_cap_above: f64::MAX,
            market_cap_below: f64::MAX,
            moody_rating_above: String::new(),
            moody_rating_below: String::new(),
            sp_rating_above: String::new(),
            sp_rating_below: String::new(),
            maturity_date_above: String::new(),
            maturity_date_below: String::new(),
            coupon_rate_above: f64::MAX,
            coupon_rate_below: f64::MAX,
            exclude_convertible: String::new(),
            scanner_setting_pairs: String::new(),
            stock_type_filter: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_bag_ignores_case() {
        let mut contract = Contract::stock("AAPL", "USD");
        assert!(!contract.is_bag());
        contract.sec_type = "bag".to_string();
        assert!(contract.is_bag());
    }

    #[test]
    fn test_combo_leg_default_exempt_code() {
        assert_eq!(ComboLeg::default().exempt_code, -1);
    }

    #[test]
    fn test_contract_deserialize_partial() {
        let contract: Contract =
            serde_json::from_str(r#"{"symbol":"MSFT","sec_type":"STK"}"#).unwrap();
        assert_eq!(contract.symbol, "MSFT");
        assert_eq!(contract.con_id, 0);
        assert!(contract.under_comp.is_none());
    }
}
