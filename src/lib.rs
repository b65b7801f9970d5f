//! # xvenue-state
//!
//! Consistent, low-latency state for a Paradex/Lighter cross-venue strategy.
//!
//! ## Features
//!
//! - **Book synchronizer** - Local mirror of the Lighter order book built
//!   from one snapshot plus sequenced deltas, with gap detection, staleness
//!   checks and await-with-timeout signals
//! - **Position reconciler** - Throttled, retrying position polls on both
//!   venues, fused with optimistic updates from the strategy's own fills
//! - **Exact decimals** - Prices, sizes and positions are `rust_decimal::Decimal`
//! - **Async/Await** - Built on Tokio; nothing here blocks the decision loop
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use xvenue_state::orderbook::BookSynchronizer;
//! use xvenue_state::position::PositionReconciler;
//! use xvenue_state::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xvenue_state::Error> {
//!     let config = Config::new("BTC", 42)
//!         .with_refresh_interval(Duration::from_secs(5))
//!         .with_min_request_interval(Duration::from_millis(250));
//!
//!     // Fed by the streaming collaborator
//!     let book = BookSynchronizer::new(config.ticker());
//!     let positions = PositionReconciler::connect(&config, None)?;
//!
//!     if book.await_ready(Duration::from_secs(10)).await {
//!         let (bid, ask) = book.bbo();
//!         println!("lighter bbo: {:?} / {:?}", bid, ask);
//!     }
//!     println!("net: {}", positions.net_position());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! This crate is organized into several modules:
//!
//! - [`orderbook`] - Price level maps, the order book and its synchronizer
//! - [`position`] - Position reconciler, throttle and Paradex parsing rules
//! - [`client`] - Lighter REST client and the Paradex client seam
//! - [`types`] - Feed messages, account payloads and shared value types
//! - [`config`] - Configuration
//! - [`error`] - Error types for the crate
//!
//! ## Failure model
//!
//! Sequence gaps and integrity violations are logged and reported, never
//! repaired here; the feed owner decides when to reset and resnapshot.
//! Transient poll failures are retried inside the reconciler. Exhausted
//! retries come back as [`Error::PollExhausted`] for the caller to act on.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod error;
pub mod orderbook;
pub mod position;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use error::Error;
pub use orderbook::BookSynchronizer;
pub use position::{PositionReconciler, Positions};

/// Result type alias using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;
