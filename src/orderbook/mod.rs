//! Order book replica and its synchronizer.
//!
//! - [`book`] - [`PriceLevelMap`] and the lock-free [`Orderbook`] data
//! - [`sync`] - [`BookSynchronizer`], the locked replica fed by the venue stream
//!
//! # Example
//!
//! ```rust
//! use rust_decimal::Decimal;
//! use xvenue_state::orderbook::Orderbook;
//! use xvenue_state::types::BookSide;
//!
//! let mut book = Orderbook::new();
//! book.apply_snapshot(
//!     [(Decimal::from(55), Decimal::from(100))],
//!     [(Decimal::from(57), Decimal::from(40))],
//!     1,
//! );
//!
//! // Apply a delta
//! book.apply_delta(BookSide::Bids, [(Decimal::from(56), Decimal::from(10))], 2).unwrap();
//!
//! // Get best bid
//! if let Some((price, size)) = book.best_bid() {
//!     println!("Best bid: {} @ {}", size, price);
//! }
//! ```

pub mod book;
pub mod sync;

pub use book::{Orderbook, PriceLevelMap};
pub use sync::{BestLevels, BookSynchronizer, UpdateSubscriber};
