//! Lighter account endpoint types.
//!
//! `GET /api/v1/account?by=index&value={account_index}` answers with
//! `{"accounts": [{"positions": [{"symbol", "position", "sign"}, ..]}]}`.
//! Only the fields the reconciler needs are modelled; the rest is ignored.
//! Position records are decoded lazily, so a malformed record for another
//! market never fails the lookup.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

use super::Quantity;

/// Response body of the account lookup
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsResponse {
    /// Matching accounts (one for a lookup by index)
    pub accounts: Vec<Account>,
}

/// One Lighter account
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    /// Raw open positions, one per market
    #[serde(default)]
    pub positions: Vec<Value>,
}

/// Position in one market
///
/// `position` is unsigned; direction comes from `sign` (1 long, -1 short).
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPosition {
    /// Market symbol (e.g. `BTC`)
    pub symbol: String,
    /// Absolute position size
    pub position: Decimal,
    /// Direction multiplier
    pub sign: i8,
}

impl AccountPosition {
    /// Signed position size
    pub fn signed_position(&self) -> Quantity {
        self.position * Decimal::from(self.sign)
    }
}

impl AccountsResponse {
    /// Parse a raw response body.
    ///
    /// An empty body, invalid JSON, a missing `accounts` key or an empty
    /// account list are all errors the caller may retry.
    pub fn parse(body: &str) -> Result<Self, Error> {
        if body.trim().is_empty() {
            return Err(Error::MalformedResponse("empty response body".into()));
        }
        let response: Self = serde_json::from_str(body)?;
        if response.accounts.is_empty() {
            return Err(Error::MalformedResponse("no accounts in response".into()));
        }
        Ok(response)
    }

    /// Signed position for `symbol` in the first account.
    ///
    /// An account with no position in `symbol` is flat: returns zero. Only
    /// the matching record is decoded; if it is malformed the error is
    /// returned and the poll may be retried.
    pub fn position_for(&self, symbol: &str) -> Result<Quantity, Error> {
        let record = self.accounts.first().and_then(|account| {
            account
                .positions
                .iter()
                .find(|p| p.get("symbol").and_then(Value::as_str) == Some(symbol))
        });
        match record {
            Some(record) => {
                let position = AccountPosition::deserialize(record)?;
                Ok(position.signed_position())
            }
            None => Ok(Quantity::ZERO),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_signed_position() {
        let body = r#"{"code":200,"accounts":[{"index":7,"positions":[
            {"market_id":1,"symbol":"ETH","position":"1.5","sign":1},
            {"market_id":2,"symbol":"BTC","position":"0.25","sign":-1}
        ]}]}"#;
        let response = AccountsResponse::parse(body).unwrap();
        assert_eq!(response.position_for("BTC").unwrap(), dec!(-0.25));
        assert_eq!(response.position_for("ETH").unwrap(), dec!(1.5));
    }

    #[test]
    fn test_missing_symbol_is_flat() {
        let response = AccountsResponse::parse(r#"{"accounts":[{"positions":[]}]}"#).unwrap();
        assert_eq!(response.position_for("BTC").unwrap(), Decimal::ZERO);

        let response = AccountsResponse::parse(r#"{"accounts":[{}]}"#).unwrap();
        assert_eq!(response.position_for("BTC").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_malformed_record_for_other_market_is_ignored() {
        let body = r#"{"accounts":[{"positions":[
            {"market_id":1,"symbol":"ETH","position":null},
            {"market_id":9},
            {"market_id":2,"symbol":"BTC","position":"2","sign":1}
        ]}]}"#;
        let response = AccountsResponse::parse(body).unwrap();
        assert_eq!(response.position_for("BTC").unwrap(), dec!(2));
    }

    #[test]
    fn test_malformed_matching_record_is_transient() {
        let body = r#"{"accounts":[{"positions":[{"symbol":"BTC","position":"1"}]}]}"#;
        let response = AccountsResponse::parse(body).unwrap();
        let err = response.position_for("BTC").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_malformed_bodies() {
        for body in ["", "   ", "{not json", r#"{"code":200}"#, r#"{"accounts":[]}"#] {
            let err = AccountsResponse::parse(body).unwrap_err();
            assert!(err.is_transient(), "{body:?} -> {err}");
        }
    }
}
