//! Core orderbook data structure.
//!
//! This implementation uses `BTreeMap` for sorted price levels, providing:
//!
//! - O(log n) insertion, deletion, and lookup
//! - O(log n) access to best bid/ask (via `first_key_value` / `last_key_value`)
//! - Ordered iteration for depth-of-book queries
//!
//! [`Orderbook`] is plain data with no interior locking; the
//! [`BookSynchronizer`](super::BookSynchronizer) wraps it in a lock and adds
//! the wait signals.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::error;

use crate::error::Error;
use crate::types::{BookSide, Price, Quantity};

/// Resting size per price for one side of the book.
///
/// Never stores a level with size zero or below: such updates remove the
/// price instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceLevelMap {
    levels: BTreeMap<Price, Quantity>,
}

impl PriceLevelMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a price level. Size zero or below removes the level.
    pub fn set_level(&mut self, price: Price, size: Quantity) {
        if size > Quantity::ZERO {
            self.levels.insert(price, size);
        } else {
            self.levels.remove(&price);
        }
    }

    /// Size resting at `price`
    #[must_use]
    pub fn get(&self, price: &Price) -> Option<Quantity> {
        self.levels.get(price).copied()
    }

    /// Highest price level
    #[must_use]
    pub fn highest(&self) -> Option<(Price, Quantity)> {
        self.levels.last_key_value().map(|(&p, &q)| (p, q))
    }

    /// Lowest price level
    #[must_use]
    pub fn lowest(&self) -> Option<(Price, Quantity)> {
        self.levels.first_key_value().map(|(&p, &q)| (p, q))
    }

    /// Iterate levels by ascending price
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (Price, Quantity)> + '_ {
        self.levels.iter().map(|(&p, &q)| (p, q))
    }

    /// Number of price levels
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if the side has no levels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Total resting size
    #[must_use]
    pub fn total_size(&self) -> Quantity {
        self.levels.values().sum()
    }

    /// Remove every level
    pub fn clear(&mut self) {
        self.levels.clear();
    }

    /// First level with a non-positive price or size, if any
    fn first_invalid(&self) -> Option<(Price, Quantity)> {
        self.iter()
            .find(|&(p, q)| p <= Price::ZERO || q <= Quantity::ZERO)
    }

    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, price: Price, size: Quantity) {
        self.levels.insert(price, size);
    }
}

/// Local replica of one venue's order book for a single instrument.
///
/// # Invariants
///
/// 1. **Offset ordering**: `offset` only grows. A delta whose offset is not
///    strictly greater is rejected before it touches either map.
///
/// 2. **Cached top of book**: `best_bid` is the highest bid price and
///    `best_ask` the lowest ask price, recomputed after every mutation and
///    `None` when the side is empty.
///
/// 3. **Gap flag is sticky**: once a rejected delta sets it, only a new
///    snapshot or [`Orderbook::clear`] lowers it.
#[derive(Debug, Clone, Default)]
pub struct Orderbook {
    /// Bid levels (best bid = highest = last)
    bids: PriceLevelMap,

    /// Ask levels (best ask = lowest = first)
    asks: PriceLevelMap,

    /// Offset of the last accepted snapshot or delta
    offset: u64,

    best_bid: Option<Price>,
    best_ask: Option<Price>,

    /// Snapshot received since the last reset
    ready: bool,

    /// A delta was rejected for its offset
    sequence_gap: bool,

    last_update: Option<Instant>,
    last_snapshot: Option<Instant>,
}

impl Orderbook {
    /// Create a new, uninitialized orderbook
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current offset
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether a snapshot has been applied since the last reset
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether an out-of-order or duplicate delta has been seen
    #[must_use]
    pub const fn has_sequence_gap(&self) -> bool {
        self.sequence_gap
    }

    /// Time of the last accepted snapshot or delta
    #[must_use]
    pub fn last_update(&self) -> Option<Instant> {
        self.last_update
    }

    /// Time of the last snapshot
    #[must_use]
    pub fn last_snapshot(&self) -> Option<Instant> {
        self.last_snapshot
    }

    /// Replace the whole book with a snapshot.
    ///
    /// Clears the gap flag, marks the book ready and stamps both timestamps.
    pub fn apply_snapshot(
        &mut self,
        bids: impl IntoIterator<Item = (Price, Quantity)>,
        asks: impl IntoIterator<Item = (Price, Quantity)>,
        offset: u64,
    ) {
        self.bids.clear();
        self.asks.clear();
        for (price, size) in bids {
            self.bids.set_level(price, size);
        }
        for (price, size) in asks {
            self.asks.set_level(price, size);
        }
        self.refresh_top();

        let now = Instant::now();
        self.offset = offset;
        self.sequence_gap = false;
        self.ready = true;
        self.last_snapshot = Some(now);
        self.last_update = Some(now);
    }

    /// Apply a delta to one side.
    ///
    /// Fails with [`Error::BookNotReady`] before the first snapshot and with
    /// [`Error::SequenceGap`] when `offset` does not exceed the current one;
    /// neither failure touches the levels. The gap case also sets the
    /// sticky gap flag.
    pub fn apply_delta(
        &mut self,
        side: BookSide,
        levels: impl IntoIterator<Item = (Price, Quantity)>,
        offset: u64,
    ) -> Result<(), Error> {
        if !self.ready {
            return Err(Error::BookNotReady);
        }
        if offset <= self.offset {
            self.sequence_gap = true;
            return Err(Error::SequenceGap {
                current: self.offset,
                got: offset,
            });
        }

        let book = self.side_mut(side);
        for (price, size) in levels {
            book.set_level(price, size);
        }
        self.refresh_top();

        self.offset = offset;
        self.last_update = Some(Instant::now());
        Ok(())
    }

    /// Check that every stored level has a positive price and size.
    ///
    /// Logs the first violation found and returns `false`. Never repairs.
    pub fn validate_integrity(&self) -> bool {
        for side in [BookSide::Bids, BookSide::Asks] {
            if let Some((price, size)) = self.side(side).first_invalid() {
                error!(%side, %price, %size, "invalid order book level");
                return false;
            }
        }
        true
    }

    /// True when nothing has landed yet or the last update is older than `max_age`
    #[must_use]
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.last_update {
            None => true,
            Some(at) => at.elapsed() > max_age,
        }
    }

    /// Get the best bid price and best ask price
    #[must_use]
    pub fn bbo(&self) -> (Option<Price>, Option<Price>) {
        (self.best_bid, self.best_ask)
    }

    /// Get the best bid (highest bid)
    ///
    /// Returns `(price, size)` or `None` if no bids.
    #[must_use]
    pub fn best_bid(&self) -> Option<(Price, Quantity)> {
        self.bids.highest()
    }

    /// Get the best ask (lowest ask)
    ///
    /// Returns `(price, size)` or `None` if no asks.
    #[must_use]
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.asks.lowest()
    }

    /// Get the mid price
    ///
    /// Fails with [`Error::MissingData`] if either side is empty.
    pub fn mid_price(&self) -> Result<Price, Error> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Ok((bid + ask) / Price::TWO),
            (None, _) => Err(Error::MissingData("bid side is empty")),
            (_, None) => Err(Error::MissingData("ask side is empty")),
        }
    }

    /// Get the spread (best ask minus best bid)
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Check if the book is crossed (best bid >= best ask)
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid, self.best_ask) {
            (Some(bid), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// Get all bid levels, sorted by price descending (best first)
    pub fn bids(&self) -> impl Iterator<Item = (Price, Quantity)> + '_ {
        self.bids.iter().rev()
    }

    /// Get all ask levels, sorted by price ascending (best first)
    pub fn asks(&self) -> impl Iterator<Item = (Price, Quantity)> + '_ {
        self.asks.iter()
    }

    /// Get the top N bid levels
    #[must_use]
    pub fn top_bids(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.bids().take(n).collect()
    }

    /// Get the top N ask levels
    #[must_use]
    pub fn top_asks(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.asks().take(n).collect()
    }

    /// Get total bid size
    #[must_use]
    pub fn total_bid_size(&self) -> Quantity {
        self.bids.total_size()
    }

    /// Get total ask size
    #[must_use]
    pub fn total_ask_size(&self) -> Quantity {
        self.asks.total_size()
    }

    /// Get the number of price levels as `(bids, asks)`
    #[must_use]
    pub fn num_levels(&self) -> (usize, usize) {
        (self.bids.len(), self.asks.len())
    }

    /// Check if the orderbook is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Return to the uninitialized state
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn side(&self, side: BookSide) -> &PriceLevelMap {
        match side {
            BookSide::Bids => &self.bids,
            BookSide::Asks => &self.asks,
        }
    }

    fn side_mut(&mut self, side: BookSide) -> &mut PriceLevelMap {
        match side {
            BookSide::Bids => &mut self.bids,
            BookSide::Asks => &mut self.asks,
        }
    }

    fn refresh_top(&mut self) {
        self.best_bid = self.bids.highest().map(|(p, _)| p);
        self.best_ask = self.asks.lowest().map(|(p, _)| p);
    }

    #[cfg(test)]
    pub(crate) fn side_mut_for_test(&mut self, side: BookSide) -> &mut PriceLevelMap {
        self.side_mut(side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const NO_LEVELS: [(Price, Quantity); 0] = [];

    fn seeded() -> Orderbook {
        let mut book = Orderbook::new();
        book.apply_snapshot(
            [(dec!(100), dec!(2)), (dec!(99), dec!(5))],
            [(dec!(101), dec!(3)), (dec!(102), dec!(1))],
            10,
        );
        book
    }

    #[test]
    fn test_new_orderbook() {
        let book = Orderbook::new();
        assert!(book.is_empty());
        assert!(!book.is_ready());
        assert_eq!(book.offset(), 0);
        assert_eq!(book.bbo(), (None, None));
        assert!(book.is_stale(Duration::from_secs(3600)));
    }

    #[test]
    fn test_price_level_map_removes_non_positive() {
        let mut map = PriceLevelMap::new();
        map.set_level(dec!(10), dec!(1));
        map.set_level(dec!(11), dec!(2));
        assert_eq!(map.get(&dec!(11)), Some(dec!(2)));
        assert_eq!(map.total_size(), dec!(3));
        map.set_level(dec!(10), dec!(0));
        map.set_level(dec!(11), dec!(-1));
        map.set_level(dec!(12), dec!(0));
        assert!(map.is_empty());
    }

    #[test]
    fn test_snapshot_sets_top_and_offset() {
        let book = seeded();
        assert!(book.is_ready());
        assert_eq!(book.offset(), 10);
        assert_eq!(book.bbo(), (Some(dec!(100)), Some(dec!(101))));
        assert_eq!(book.best_bid(), Some((dec!(100), dec!(2))));
        assert_eq!(book.best_ask(), Some((dec!(101), dec!(3))));
        assert_eq!(book.last_update(), book.last_snapshot());
    }

    #[test]
    fn test_delta_insert_replace_remove() {
        let mut book = seeded();

        book.apply_delta(BookSide::Bids, [(dec!(100.5), dec!(1))], 11)
            .unwrap();
        assert_eq!(book.bbo().0, Some(dec!(100.5)));

        book.apply_delta(BookSide::Bids, [(dec!(100.5), dec!(4))], 12)
            .unwrap();
        assert_eq!(book.best_bid(), Some((dec!(100.5), dec!(4))));

        book.apply_delta(BookSide::Bids, [(dec!(100.5), dec!(0))], 13)
            .unwrap();
        assert_eq!(book.best_bid(), Some((dec!(100), dec!(2))));
        assert_eq!(book.offset(), 13);
    }

    #[test]
    fn test_best_levels_track_extremes_after_every_delta() {
        let mut book = seeded();
        let updates = [
            (BookSide::Asks, dec!(100.75), dec!(1)),
            (BookSide::Asks, dec!(100.75), dec!(0)),
            (BookSide::Bids, dec!(99), dec!(0)),
            (BookSide::Bids, dec!(100), dec!(0)),
            (BookSide::Asks, dec!(101), dec!(0)),
            (BookSide::Asks, dec!(102), dec!(0)),
        ];
        for (i, (side, price, size)) in updates.into_iter().enumerate() {
            book.apply_delta(side, [(price, size)], 11 + i as u64).unwrap();
            let (bid, ask) = book.bbo();
            assert_eq!(bid, book.bids().next().map(|(p, _)| p));
            assert_eq!(ask, book.asks().next().map(|(p, _)| p));
        }
        assert_eq!(book.bbo(), (None, None));
    }

    #[test]
    fn test_stale_offset_is_rejected() {
        let mut book = seeded();
        let before = book.clone();

        let err = book
            .apply_delta(BookSide::Bids, [(dec!(100), dec!(0))], 10)
            .unwrap_err();
        assert!(matches!(err, Error::SequenceGap { current: 10, got: 10 }));

        let err = book
            .apply_delta(BookSide::Asks, [(dec!(50), dec!(1))], 3)
            .unwrap_err();
        assert!(matches!(err, Error::SequenceGap { current: 10, got: 3 }));

        assert!(book.has_sequence_gap());
        assert_eq!(book.bbo(), before.bbo());
        assert_eq!(book.top_bids(10), before.top_bids(10));
        assert_eq!(book.top_asks(10), before.top_asks(10));
        assert_eq!(book.offset(), 10);
    }

    #[test]
    fn test_gap_flag_is_sticky_until_snapshot() {
        let mut book = seeded();
        let _ = book.apply_delta(BookSide::Bids, NO_LEVELS, 1);
        book.apply_delta(BookSide::Bids, [(dec!(98), dec!(1))], 11)
            .unwrap();
        assert!(book.has_sequence_gap());

        book.apply_snapshot(NO_LEVELS, NO_LEVELS, 20);
        assert!(!book.has_sequence_gap());
    }

    #[test]
    fn test_delta_before_snapshot() {
        let mut book = Orderbook::new();
        let err = book
            .apply_delta(BookSide::Bids, [(dec!(1), dec!(1))], 1)
            .unwrap_err();
        assert!(matches!(err, Error::BookNotReady));
        assert!(book.is_empty());
    }

    #[test]
    fn test_mid_price_and_spread() {
        let book = seeded();
        assert_eq!(book.mid_price().unwrap(), dec!(100.5));
        assert_eq!(book.spread(), Some(dec!(1)));
        assert!(!book.is_crossed());
    }

    #[test]
    fn test_mid_price_missing_side() {
        let mut book = seeded();
        book.apply_delta(
            BookSide::Asks,
            [(dec!(101), dec!(0)), (dec!(102), dec!(0))],
            11,
        )
        .unwrap();
        assert!(matches!(book.mid_price(), Err(Error::MissingData(_))));
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn test_top_levels() {
        let book = seeded();
        assert_eq!(book.top_bids(1), vec![(dec!(100), dec!(2))]);
        assert_eq!(
            book.top_asks(5),
            vec![(dec!(101), dec!(3)), (dec!(102), dec!(1))]
        );
        assert_eq!(book.num_levels(), (2, 2));
        assert_eq!(book.total_bid_size(), dec!(7));
        assert_eq!(book.total_ask_size(), dec!(4));
    }

    #[test]
    fn test_validate_integrity() {
        let mut book = seeded();
        assert!(book.validate_integrity());

        book.side_mut_for_test(BookSide::Asks)
            .insert_unchecked(dec!(-1), dec!(1));
        assert!(!book.validate_integrity());
        // Reporting only, the bad level stays
        assert_eq!(book.num_levels(), (2, 3));
    }

    #[test]
    fn test_clear() {
        let mut book = seeded();
        book.clear();
        assert!(book.is_empty());
        assert!(!book.is_ready());
        assert_eq!(book.offset(), 0);
        assert_eq!(book.last_update(), None);
        assert_eq!(book.last_snapshot(), None);
    }
}
