//! Book state synchronizer for one venue's order book.
//!
//! This module provides [`BookSynchronizer`], a thread-safe wrapper around
//! [`Orderbook`] that ingests feed snapshots and deltas and lets consumers
//! read the top of book or wait for changes.
//!
//! # Design
//!
//! The book lives behind a `parking_lot::RwLock`. Every mutation and every
//! multi-field read happens under that lock, and the lock is never held
//! across an `.await`, so readers never see a half-applied delta.
//!
//! Two signals are published after the lock is released:
//!
//! - **ready** (`watch<bool>`): level-triggered. Set by a snapshot and stays
//!   set until [`BookSynchronizer::reset`].
//! - **updated** (`watch<u64>` version counter): edge-triggered. Bumped after
//!   every accepted snapshot or delta.
//!
//! # Sequence Tracking
//!
//! A delta whose offset does not exceed the current one is rejected, logged,
//! and sets a sticky gap flag. The synchronizer never resyncs on its own;
//! the feed owner decides when to [`reset`](BookSynchronizer::reset) and
//! resnapshot.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::types::messages::{FeedDelta, FeedSnapshot};
use crate::types::{BookSide, Price, Quantity};

use super::Orderbook;

/// Best bid and best ask as `(price, size)` pairs
pub type BestLevels = (Option<(Price, Quantity)>, Option<(Price, Quantity)>);

/// Thread-safe, freshness-tracked replica of one venue's order book.
///
/// # Update waiters
///
/// [`await_update`](Self::await_update) shares one consumed-once cursor
/// between all callers: whichever caller wakes first consumes the pending
/// update. Consumers that each need to see every change should hold their
/// own [`UpdateSubscriber`] from [`subscribe_updates`](Self::subscribe_updates).
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use rust_decimal::Decimal;
/// use xvenue_state::orderbook::BookSynchronizer;
/// use xvenue_state::types::BookSide;
///
/// # async fn example() -> xvenue_state::Result<()> {
/// let book = BookSynchronizer::new("BTC");
///
/// book.apply_snapshot(
///     [(Decimal::from(100), Decimal::from(2))],
///     [(Decimal::from(101), Decimal::from(3))],
///     1,
/// );
/// assert!(book.await_ready(Duration::from_millis(10)).await);
///
/// book.apply_delta(BookSide::Bids, [(Decimal::from(100), Decimal::ZERO)], 2)?;
/// assert_eq!(book.bbo(), (None, Some(Decimal::from(101))));
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BookSynchronizer {
    symbol: String,
    book: RwLock<Orderbook>,
    ready_tx: watch::Sender<bool>,
    update_tx: watch::Sender<u64>,
    /// Last update version consumed through `await_update`
    consumed: AtomicU64,
}

impl BookSynchronizer {
    /// Create an uninitialized synchronizer for `symbol`
    pub fn new(symbol: impl Into<String>) -> Self {
        let (ready_tx, _) = watch::channel(false);
        let (update_tx, _) = watch::channel(0);
        Self {
            symbol: symbol.into(),
            book: RwLock::new(Orderbook::new()),
            ready_tx,
            update_tx,
            consumed: AtomicU64::new(0),
        }
    }

    /// Get the instrument symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Return to the uninitialized state.
    ///
    /// Clears both sides and all metadata, lowers the ready signal and
    /// discards any pending update for [`await_update`](Self::await_update).
    /// Waiters already parked stay parked until the next snapshot.
    pub fn reset(&self) {
        self.book.write().clear();
        self.ready_tx.send_replace(false);
        self.consumed
            .fetch_max(*self.update_tx.borrow(), Ordering::AcqRel);
        info!(symbol = %self.symbol, "order book reset");
    }

    /// Install a full snapshot and mark the book ready.
    ///
    /// Signals both ready and updated once the book is committed.
    pub fn apply_snapshot(
        &self,
        bids: impl IntoIterator<Item = (Price, Quantity)>,
        asks: impl IntoIterator<Item = (Price, Quantity)>,
        offset: u64,
    ) {
        let levels = {
            let mut book = self.book.write();
            if book.is_ready() {
                debug!(symbol = %self.symbol, "snapshot replaces a ready book");
            }
            book.apply_snapshot(bids, asks, offset);
            book.num_levels()
        };
        debug!(
            symbol = %self.symbol,
            offset,
            bids = levels.0,
            asks = levels.1,
            "order book snapshot applied"
        );
        self.ready_tx.send_replace(true);
        self.notify_update();
    }

    /// Install a snapshot received from the feed
    pub fn apply_feed_snapshot(&self, snapshot: &FeedSnapshot) {
        self.apply_snapshot(snapshot.bid_levels(), snapshot.ask_levels(), snapshot.offset);
    }

    /// Apply a delta to one side of the book.
    ///
    /// `new_offset` must exceed the current offset. On rejection the levels
    /// are left untouched, a warning is logged, the sticky gap flag is set
    /// and [`Error::SequenceGap`] is returned; resyncing is up to the caller.
    pub fn apply_delta(
        &self,
        side: BookSide,
        levels: impl IntoIterator<Item = (Price, Quantity)>,
        new_offset: u64,
    ) -> Result<(), Error> {
        let result = self.book.write().apply_delta(side, levels, new_offset);
        match &result {
            Ok(()) => self.notify_update(),
            Err(Error::SequenceGap { current, got }) => {
                warn!(
                    symbol = %self.symbol,
                    current_offset = current,
                    new_offset = got,
                    "out-of-order order book update"
                );
            }
            Err(err) => {
                warn!(symbol = %self.symbol, new_offset, error = %err, "order book update dropped");
            }
        }
        result
    }

    /// Apply a delta received from the feed
    pub fn apply_feed_delta(&self, delta: &FeedDelta) -> Result<(), Error> {
        self.apply_delta(delta.side, delta.parsed_levels(), delta.offset)
    }

    /// Check every level for a positive price and size. Read-only.
    pub fn validate_integrity(&self) -> bool {
        self.book.read().validate_integrity()
    }

    /// True if no update has landed or the last one is older than `max_age`
    pub fn is_stale(&self, max_age: Duration) -> bool {
        self.book.read().is_stale(max_age)
    }

    /// Time since the last accepted snapshot or delta
    pub fn last_update_age(&self) -> Option<Duration> {
        self.book.read().last_update().map(|at| at.elapsed())
    }

    /// Best bid and best ask `(price, size)`, read atomically
    pub fn best_levels(&self) -> BestLevels {
        let book = self.book.read();
        (book.best_bid(), book.best_ask())
    }

    /// Best bid and best ask prices
    pub fn bbo(&self) -> (Option<Price>, Option<Price>) {
        self.book.read().bbo()
    }

    /// Midpoint of the best bid and ask.
    ///
    /// Fails with [`Error::MissingData`] while either side is empty.
    pub fn mid_price(&self) -> Result<Price, Error> {
        self.book.read().mid_price()
    }

    /// Best ask minus best bid
    pub fn spread(&self) -> Option<Price> {
        self.book.read().spread()
    }

    /// Top `n` bid levels, best first
    pub fn top_bids(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.book.read().top_bids(n)
    }

    /// Top `n` ask levels, best first
    pub fn top_asks(&self, n: usize) -> Vec<(Price, Quantity)> {
        self.book.read().top_asks(n)
    }

    /// Current offset
    pub fn offset(&self) -> u64 {
        self.book.read().offset()
    }

    /// Whether a snapshot has been applied since the last reset
    pub fn is_ready(&self) -> bool {
        self.book.read().is_ready()
    }

    /// Whether a delta has been rejected since the last snapshot
    pub fn has_sequence_gap(&self) -> bool {
        self.book.read().has_sequence_gap()
    }

    /// Cloned copy of the book for reading without holding the lock
    pub fn orderbook(&self) -> Orderbook {
        self.book.read().clone()
    }

    /// Wait until the book is ready.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn await_ready(&self, timeout: Duration) -> bool {
        let mut rx = self.ready_tx.subscribe();
        let ready = time::timeout(timeout, rx.wait_for(|ready| *ready)).await;
        matches!(ready, Ok(Ok(_)))
    }

    /// Wait for the next update and consume it.
    ///
    /// Returns immediately if an update landed since the last consumed one.
    /// The pending update is cleared on return either way, so an immediate
    /// second call waits for a fresh change.
    pub async fn await_update(&self, timeout: Duration) -> bool {
        let mut rx = self.update_tx.subscribe();
        let seen = self.consumed.load(Ordering::Acquire);
        let fired = if *rx.borrow_and_update() > seen {
            true
        } else {
            matches!(time::timeout(timeout, rx.changed()).await, Ok(Ok(())))
        };
        let latest = *rx.borrow_and_update();
        self.consumed.fetch_max(latest, Ordering::AcqRel);
        fired
    }

    /// Independent update stream for one consumer
    pub fn subscribe_updates(&self) -> UpdateSubscriber {
        UpdateSubscriber {
            rx: self.update_tx.subscribe(),
        }
    }

    fn notify_update(&self) {
        self.update_tx.send_modify(|version| *version += 1);
    }
}

/// Per-consumer update notifications.
///
/// Each subscriber tracks its own cursor, so concurrent consumers never
/// steal each other's wake-ups. Updates that land while the subscriber is
/// not waiting coalesce into one pending notification.
#[derive(Debug)]
pub struct UpdateSubscriber {
    rx: watch::Receiver<u64>,
}

impl UpdateSubscriber {
    /// Wait for an update newer than the last one this subscriber saw.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn await_update(&mut self, timeout: Duration) -> bool {
        let fired = matches!(time::timeout(timeout, self.rx.changed()).await, Ok(Ok(())));
        let _ = self.rx.borrow_and_update();
        fired
    }

    /// Whether an unseen update is pending
    pub fn has_pending(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
