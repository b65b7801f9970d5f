//! Paradex trading-client seam.
//!
//! The Paradex SDK is synchronous, so the reconciler runs
//! [`ParadexClient::fetch_positions`] on tokio's blocking pool. Session and
//! credential setup stay with whoever builds the implementation.

use serde_json::Value;

use crate::error::Error;

/// Blocking "fetch positions" call of a Paradex trading client.
///
/// The returned record carries a `results` or `positions` list; see
/// [`rules`](crate::position::rules) for how each entry is read.
pub trait ParadexClient: Send + Sync + 'static {
    /// Fetch all open positions. May block.
    fn fetch_positions(&self) -> Result<Value, Error>;
}

impl<F> ParadexClient for F
where
    F: Fn() -> Result<Value, Error> + Send + Sync + 'static,
{
    fn fetch_positions(&self) -> Result<Value, Error> {
        self()
    }
}
