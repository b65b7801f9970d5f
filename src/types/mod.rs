//! Shared value types.
//!
//! - [`messages`] - Feed snapshot/delta payloads and level parsing
//! - [`account`] - Lighter account endpoint payloads
//!
//! Prices and sizes are [`rust_decimal::Decimal`] throughout: both venues
//! quote decimal strings and the book must compare them exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod account;
pub mod messages;

pub use account::{AccountPosition, AccountsResponse};
pub use messages::{FeedDelta, FeedSnapshot};

/// Price of a resting level
pub type Price = rust_decimal::Decimal;

/// Resting size at a price level, or a signed position
pub type Quantity = rust_decimal::Decimal;

/// Side of the order book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookSide {
    /// Resting buy interest (best = highest price)
    Bids,
    /// Resting sell interest (best = lowest price)
    Asks,
}

impl fmt::Display for BookSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookSide::Bids => f.write_str("bids"),
            BookSide::Asks => f.write_str("asks"),
        }
    }
}

/// Venue whose position is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    /// Paradex, polled through the trading-client collaborator
    Paradex,
    /// Lighter, polled over its REST account endpoint
    Lighter,
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Paradex => f.write_str("paradex"),
            Venue::Lighter => f.write_str("lighter"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_side_serde() {
        let side: BookSide = serde_json::from_str("\"asks\"").unwrap();
        assert_eq!(side, BookSide::Asks);
        assert_eq!(serde_json::to_string(&BookSide::Bids).unwrap(), "\"bids\"");
    }

    #[test]
    fn test_venue_display() {
        assert_eq!(Venue::Paradex.to_string(), "paradex");
        assert_eq!(Venue::Lighter.to_string(), "lighter");
    }
}
