//! Position extraction rules for Paradex "fetch positions" responses.
//!
//! The trading client returns loosely shaped records, so reading a position
//! is an ordered list of named rules evaluated in priority order:
//!
//! 1. The position list is the first non-empty array among
//!    [`POSITION_LIST_FIELDS`].
//! 2. A record's market is the first string among [`MARKET_FIELDS`]. An
//!    exact match on the configured market wins; otherwise the first record
//!    whose market starts with the ticker is used.
//! 3. The size is the first rule in [`PARADEX_SIZE_RULES`] that yields a
//!    decimal.
//! 4. If no record matches or no rule yields a value, the position is zero.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::types::messages::decimal_from_value;
use crate::types::Quantity;

/// Keys that may hold the list of position records
pub const POSITION_LIST_FIELDS: &[&str] = &["results", "positions"];

/// Keys that may hold a record's market symbol
pub const MARKET_FIELDS: &[&str] = &["market", "symbol", "instrument"];

/// Keys that may hold a side/direction label
pub const SIDE_FIELDS: &[&str] = &["side", "direction"];

/// Keys that may hold an unsigned size for [`SizeRule::SignedBySide`]
pub const UNSIGNED_SIZE_FIELDS: &[&str] = &["size", "qty"];

/// One way of reading a signed position size from a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRule {
    /// Read a signed decimal straight from the named field
    Field(&'static str),
    /// Read an unsigned size and negate it when the side is `SELL`/`SHORT`
    SignedBySide {
        /// Candidate side fields, first non-empty wins
        side_fields: &'static [&'static str],
        /// Candidate size fields, first decimal wins
        size_fields: &'static [&'static str],
    },
}

/// Paradex size rules in priority order
pub const PARADEX_SIZE_RULES: &[SizeRule] = &[
    SizeRule::Field("position"),
    SizeRule::Field("size"),
    SizeRule::Field("qty"),
    SizeRule::Field("net_size"),
    SizeRule::Field("position_size"),
    SizeRule::SignedBySide {
        side_fields: SIDE_FIELDS,
        size_fields: UNSIGNED_SIZE_FIELDS,
    },
];

impl SizeRule {
    /// Apply this rule to `record`, `None` if it does not fit
    pub fn extract(&self, record: &Value) -> Option<Quantity> {
        match *self {
            SizeRule::Field(field) => record.get(field).and_then(decimal_from_value),
            SizeRule::SignedBySide {
                side_fields,
                size_fields,
            } => {
                let side = side_fields
                    .iter()
                    .filter_map(|f| record.get(*f).and_then(Value::as_str))
                    .find(|s| !s.is_empty())?;
                let size = size_fields
                    .iter()
                    .find_map(|f| record.get(*f).and_then(decimal_from_value))?;
                Some(if is_short_side(side) { -size } else { size })
            }
        }
    }
}

fn is_short_side(side: &str) -> bool {
    side.eq_ignore_ascii_case("SELL") || side.eq_ignore_ascii_case("SHORT")
}

/// Signed size of `record`, zero when no rule applies
pub fn extract_size(record: &Value, rules: &[SizeRule]) -> Quantity {
    rules
        .iter()
        .find_map(|rule| rule.extract(record))
        .unwrap_or(Decimal::ZERO)
}

/// Position records carried by a response
pub fn position_records(response: &Value) -> &[Value] {
    POSITION_LIST_FIELDS
        .iter()
        .filter_map(|f| response.get(*f).and_then(Value::as_array))
        .find(|list| !list.is_empty())
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn record_market(record: &Value) -> Option<&str> {
    MARKET_FIELDS
        .iter()
        .filter_map(|f| record.get(*f).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

/// Record for `market`, falling back to the first one prefixed by `ticker`
pub fn find_market<'a>(records: &'a [Value], market: &str, ticker: &str) -> Option<&'a Value> {
    records
        .iter()
        .find(|r| record_market(r) == Some(market))
        .or_else(|| {
            records
                .iter()
                .find(|r| record_market(r).is_some_and(|m| m.starts_with(ticker)))
        })
}

/// Signed Paradex position for `market` in a "fetch positions" response
pub fn paradex_position(response: &Value, market: &str, ticker: &str) -> Quantity {
    find_market(position_records(response), market, ticker)
        .map(|record| extract_size(record, PARADEX_SIZE_RULES))
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_field_rules_in_priority_order() {
        let record = json!({"position": "-1.5", "size": "1.5"});
        assert_eq!(extract_size(&record, PARADEX_SIZE_RULES), dec!(-1.5));

        let record = json!({"qty": 2, "net_size": "3"});
        assert_eq!(extract_size(&record, PARADEX_SIZE_RULES), dec!(2));

        let record = json!({"position_size": "0.75"});
        assert_eq!(extract_size(&record, PARADEX_SIZE_RULES), dec!(0.75));
    }

    #[test]
    fn test_unparseable_field_falls_through() {
        let record = json!({"position": "n/a", "net_size": "-4"});
        assert_eq!(extract_size(&record, PARADEX_SIZE_RULES), dec!(-4));
    }

    #[test]
    fn test_signed_by_side_rule() {
        let rule = SizeRule::SignedBySide {
            side_fields: SIDE_FIELDS,
            size_fields: &["amount"],
        };
        assert_eq!(
            rule.extract(&json!({"side": "short", "amount": "2"})),
            Some(dec!(-2))
        );
        assert_eq!(
            rule.extract(&json!({"side": "", "direction": "LONG", "amount": "2"})),
            Some(dec!(2))
        );
        assert_eq!(rule.extract(&json!({"amount": "2"})), None);
    }

    #[test]
    fn test_no_rule_defaults_to_zero() {
        let record = json!({"market": "BTC-USD-PERP", "unrealized_pnl": "12"});
        assert_eq!(extract_size(&record, PARADEX_SIZE_RULES), Decimal::ZERO);
    }

    #[test]
    fn test_exact_market_preferred_over_prefix() {
        let response = json!({"results": [
            {"market": "BTC-USD-PERP-OLD", "size": "9"},
            {"market": "BTC-USD-PERP", "size": "-0.1"}
        ]});
        assert_eq!(paradex_position(&response, "BTC-USD-PERP", "BTC"), dec!(-0.1));
    }

    #[test]
    fn test_prefix_fallback_and_list_aliases() {
        let response = json!({"results": [], "positions": [
            {"symbol": "ETH-USD-PERP", "size": "5"},
            {"instrument": "BTC-PERP", "size": "0.3"}
        ]});
        assert_eq!(paradex_position(&response, "BTC-USD-PERP", "BTC"), dec!(0.3));
    }

    #[test]
    fn test_no_matching_market_is_flat() {
        let response = json!({"results": [{"market": "ETH-USD-PERP", "size": "5"}]});
        assert_eq!(paradex_position(&response, "BTC-USD-PERP", "BTC"), Decimal::ZERO);
        assert_eq!(paradex_position(&json!(null), "BTC-USD-PERP", "BTC"), Decimal::ZERO);
    }
}
