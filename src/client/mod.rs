//! Venue clients used by the position reconciler.
//!
//! This module contains:
//!
//! - [`rest`] - HTTP client for the Lighter account endpoint
//! - [`paradex`] - Seam for the blocking Paradex trading client

pub mod paradex;
pub mod rest;

pub use paradex::ParadexClient;
pub use rest::{AccountSource, LighterRestClient};
