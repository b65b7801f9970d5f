//! Feed message types.
//!
//! The streaming collaborator hands the synchronizer one snapshot per
//! connection followed by deltas. Each level is either a `[price, size]`
//! pair or a `{"price": .., "size": ..}` record; numbers and decimal strings
//! are both accepted, and a record without a size counts as size zero. Unrecognized levels are logged and skipped without
//! aborting the rest of the batch.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::{BookSide, Price, Quantity};

/// Full book replacement received at feed (re)start
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedSnapshot {
    /// Raw bid levels
    #[serde(default)]
    pub bids: Vec<Value>,
    /// Raw ask levels
    #[serde(default)]
    pub asks: Vec<Value>,
    /// Offset the deltas that follow build on
    #[serde(default)]
    pub offset: u64,
}

/// Incremental update to one side of the book
#[derive(Debug, Clone, Deserialize)]
pub struct FeedDelta {
    /// Side the levels belong to
    pub side: BookSide,
    /// Raw levels; size zero removes the price
    #[serde(default)]
    pub levels: Vec<Value>,
    /// Sequence number, must exceed the book's current offset
    pub offset: u64,
}

impl FeedSnapshot {
    /// Parse the bid side, skipping unrecognized levels
    pub fn bid_levels(&self) -> Vec<(Price, Quantity)> {
        parse_levels(&self.bids)
    }

    /// Parse the ask side, skipping unrecognized levels
    pub fn ask_levels(&self) -> Vec<(Price, Quantity)> {
        parse_levels(&self.asks)
    }
}

impl FeedDelta {
    /// Parse the levels, skipping unrecognized ones
    pub fn parsed_levels(&self) -> Vec<(Price, Quantity)> {
        parse_levels(&self.levels)
    }
}

/// Parse a single level in either accepted shape
pub fn parse_level(level: &Value) -> Option<(Price, Quantity)> {
    match level {
        Value::Array(pair) if pair.len() >= 2 => {
            Some((decimal_from_value(&pair[0])?, decimal_from_value(&pair[1])?))
        }
        Value::Object(record) => {
            let price = decimal_from_value(record.get("price")?)?;
            // A record without a size clears the level
            let size = match record.get("size") {
                Some(size) => decimal_from_value(size)?,
                None => Quantity::ZERO,
            };
            Some((price, size))
        }
        _ => None,
    }
}

/// Parse a batch of levels, logging and dropping the ones that don't fit
pub fn parse_levels(levels: &[Value]) -> Vec<(Price, Quantity)> {
    levels
        .iter()
        .filter_map(|level| {
            let parsed = parse_level(level);
            if parsed.is_none() {
                warn!(%level, "skipping unrecognized book level");
            }
            parsed
        })
        .collect()
}

/// Read a decimal from a JSON number or decimal string
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_pair_and_record() {
        assert_eq!(
            parse_level(&json!(["100.5", "2"])),
            Some((dec("100.5"), dec("2")))
        );
        assert_eq!(
            parse_level(&json!({"price": 101, "size": 0.25})),
            Some((dec("101"), dec("0.25")))
        );
    }

    #[test]
    fn test_unrecognized_levels_are_skipped() {
        let levels = vec![
            json!(["100", "1"]),
            json!("garbage"),
            json!([100]),
            json!({"price": "abc", "size": "1"}),
            json!({"size": "1"}),
            json!({"price": "99", "size": null}),
            json!(["98", "3"]),
        ];
        let parsed = parse_levels(&levels);
        assert_eq!(parsed, vec![(dec("100"), dec("1")), (dec("98"), dec("3"))]);
    }

    #[test]
    fn test_record_without_size_clears_level() {
        assert_eq!(
            parse_level(&json!({"price": "99"})),
            Some((dec("99"), Decimal::ZERO))
        );
    }

    #[test]
    fn test_delta_deserialize() {
        let delta: FeedDelta = serde_json::from_value(json!({
            "side": "bids",
            "levels": [["100", "0"], {"price": "99.5", "size": "4"}],
            "offset": 12
        }))
        .unwrap();

        assert_eq!(delta.side, BookSide::Bids);
        assert_eq!(delta.offset, 12);
        assert_eq!(
            delta.parsed_levels(),
            vec![(dec("100"), dec("0")), (dec("99.5"), dec("4"))]
        );
    }

    #[test]
    fn test_snapshot_defaults() {
        let snapshot: FeedSnapshot = serde_json::from_value(json!({"bids": [["1", "1"]]})).unwrap();
        assert_eq!(snapshot.offset, 0);
        assert_eq!(snapshot.bid_levels().len(), 1);
        assert!(snapshot.ask_levels().is_empty());
    }

    #[test]
    fn test_scientific_numbers() {
        assert_eq!(decimal_from_value(&json!(1e-3)), Some(dec("0.001")));
        assert_eq!(decimal_from_value(&json!(null)), None);
    }
}
