//! Position tracking across the two venues.
//!
//! - [`reconciler`] - [`PositionReconciler`], polled counters plus local fills
//! - [`rules`] - Ordered extraction rules for Paradex position records
//! - [`throttle`] - Minimum spacing between requests to one venue

pub mod reconciler;
pub mod rules;
pub mod throttle;

pub use reconciler::{PositionReconciler, Positions};
pub use rules::SizeRule;
pub use throttle::Throttle;
