//! Position reconciler for the Paradex and Lighter legs.
//!
//! [`PositionReconciler`] keeps one signed counter per venue. Counters are
//! either replaced by an authoritative poll ([`refresh`]) or nudged by a
//! local fill ([`update_position`]). Each venue's counter is replaced as
//! soon as that venue's poll returns, so a poll overwrites the local deltas
//! that came before it and keeps the ones that land after it.
//!
//! # Polling
//!
//! - **Paradex**: one blocking trading-client call on tokio's blocking pool,
//!   no retry. Parsed with the [`rules`](super::rules) adapter.
//! - **Lighter**: REST poll retried up to the configured attempt budget with
//!   a fixed delay of `max(500ms, min_request_interval)`. Empty bodies,
//!   invalid JSON, HTTP failures and missing `accounts` are retried.
//!   Exhausting the budget returns [`Error::PollExhausted`].
//!
//! Both venues sit behind their own [`Throttle`].
//!
//! [`refresh`]: PositionReconciler::refresh
//! [`update_position`]: PositionReconciler::update_position

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task;
use tokio::time::{self, Instant};
use tracing::{debug, error, warn};

use crate::client::{AccountSource, LighterRestClient, ParadexClient};
use crate::config::{Config, MIN_RETRY_DELAY};
use crate::error::Error;
use crate::types::{AccountsResponse, Quantity, Venue};

use super::rules;
use super::throttle::Throttle;

/// Signed positions on both venues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Positions {
    /// Paradex position
    pub paradex: Quantity,
    /// Lighter position
    pub lighter: Quantity,
}

impl Positions {
    /// Position on `venue`
    pub fn get(&self, venue: Venue) -> Quantity {
        match venue {
            Venue::Paradex => self.paradex,
            Venue::Lighter => self.lighter,
        }
    }

    /// Aggregate directional exposure across both venues
    pub fn net(&self) -> Quantity {
        self.paradex + self.lighter
    }

    fn get_mut(&mut self, venue: Venue) -> &mut Quantity {
        match venue {
            Venue::Paradex => &mut self.paradex,
            Venue::Lighter => &mut self.lighter,
        }
    }
}

#[derive(Debug, Default)]
struct PositionState {
    positions: Positions,
    last_refresh: Option<Instant>,
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    refresh_interval: Duration,
    min_request_interval: Duration,
}

/// Rate-limited, retrying view of the strategy's position on both venues.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use rust_decimal::Decimal;
/// use xvenue_state::position::PositionReconciler;
/// use xvenue_state::types::Venue;
/// use xvenue_state::Config;
///
/// # async fn example() -> xvenue_state::Result<()> {
/// let config = Config::new("BTC", 42).with_refresh_interval(Duration::from_secs(5));
/// let reconciler = PositionReconciler::connect(&config, None)?;
///
/// // Our own fill, reflected before the next poll
/// reconciler.update_position(Venue::Lighter, Decimal::ONE);
/// println!("net exposure: {}", reconciler.net_position());
/// # Ok(())
/// # }
/// ```
pub struct PositionReconciler {
    ticker: String,
    paradex_market: String,
    account_index: u64,
    max_attempts: u32,
    paradex: Option<Arc<dyn ParadexClient>>,
    lighter: Arc<dyn AccountSource>,
    state: Mutex<PositionState>,
    timing: Mutex<Timing>,
    paradex_throttle: Throttle,
    lighter_throttle: Throttle,
}

impl PositionReconciler {
    /// Create a reconciler over explicit venue clients.
    ///
    /// `paradex` may be `None`; Paradex polls then fail with
    /// [`Error::NotInitialized`].
    pub fn new(
        config: &Config,
        paradex: Option<Arc<dyn ParadexClient>>,
        lighter: Arc<dyn AccountSource>,
    ) -> Self {
        Self {
            ticker: config.ticker().to_string(),
            paradex_market: config.paradex_market(),
            account_index: config.account_index(),
            max_attempts: config.max_poll_attempts(),
            paradex,
            lighter,
            state: Mutex::new(PositionState::default()),
            timing: Mutex::new(Timing {
                refresh_interval: config.refresh_interval(),
                min_request_interval: config.min_request_interval(),
            }),
            paradex_throttle: Throttle::new(),
            lighter_throttle: Throttle::new(),
        }
    }

    /// Create a reconciler polling Lighter over HTTP
    ///
    /// # Errors
    ///
    /// Returns an error if the Lighter REST client cannot be built.
    pub fn connect(config: &Config, paradex: Option<Arc<dyn ParadexClient>>) -> Result<Self, Error> {
        let lighter = LighterRestClient::new(config)?;
        Ok(Self::new(config, paradex, Arc::new(lighter)))
    }

    /// Set the refresh cache window and the per-venue request spacing
    pub fn configure(&self, refresh_interval: Duration, min_request_interval: Duration) {
        *self.timing.lock() = Timing {
            refresh_interval,
            min_request_interval,
        };
    }

    /// Refresh both positions from the venues.
    ///
    /// Unless `force` is set, a refresh within the cache window returns the
    /// current counters without any request. Otherwise Paradex then Lighter
    /// are polled, each counter being replaced when its own poll returns.
    /// If the Lighter poll fails the Paradex counter keeps its fresh value,
    /// the Lighter counter and the refresh time stay unchanged, and the
    /// error is returned.
    pub async fn refresh(&self, force: bool) -> Result<Positions, Error> {
        let refresh_interval = self.timing.lock().refresh_interval;
        if !force && !refresh_interval.is_zero() {
            let state = self.state.lock();
            if let Some(at) = state.last_refresh {
                if at.elapsed() < refresh_interval {
                    debug!(age = ?at.elapsed(), "position cache hit");
                    return Ok(state.positions);
                }
            }
        }

        let paradex = self.fetch_paradex_position().await?;
        self.state.lock().positions.paradex = paradex;

        let lighter = self.fetch_lighter_position().await?;
        let mut state = self.state.lock();
        state.positions.lighter = lighter;
        state.last_refresh = Some(Instant::now());
        debug!(%paradex, %lighter, "positions refreshed");
        Ok(state.positions)
    }

    /// [`refresh`](Self::refresh) bounded by `timeout`.
    ///
    /// Returns `None` if the timeout elapses. A venue whose poll already
    /// returned keeps its new counter; the refresh time is not stamped.
    pub async fn refresh_within(
        &self,
        force: bool,
        timeout: Duration,
    ) -> Option<Result<Positions, Error>> {
        time::timeout(timeout, self.refresh(force)).await.ok()
    }

    /// Poll the Paradex position once
    pub async fn fetch_paradex_position(&self) -> Result<Quantity, Error> {
        let client = self
            .paradex
            .clone()
            .ok_or(Error::NotInitialized(Venue::Paradex))?;

        let min_interval = self.timing.lock().min_request_interval;
        self.paradex_throttle.wait(min_interval).await;

        let response = task::spawn_blocking(move || client.fetch_positions()).await??;
        Ok(rules::paradex_position(
            &response,
            &self.paradex_market,
            &self.ticker,
        ))
    }

    /// Poll the Lighter position, retrying transient failures
    pub async fn fetch_lighter_position(&self) -> Result<Quantity, Error> {
        let min_interval = self.timing.lock().min_request_interval;
        let retry_delay = min_interval.max(MIN_RETRY_DELAY);

        for attempt in 1..=self.max_attempts {
            self.lighter_throttle.wait(min_interval).await;

            match self.poll_lighter_once().await {
                Ok(position) => return Ok(position),
                Err(err) if !err.is_transient() => return Err(err),
                Err(err) => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "lighter position poll failed"
                    );
                    if attempt < self.max_attempts {
                        time::sleep(retry_delay).await;
                    }
                }
            }
        }

        error!(
            attempts = self.max_attempts,
            account_index = self.account_index,
            "giving up on lighter position"
        );
        Err(Error::PollExhausted {
            venue: Venue::Lighter,
            attempts: self.max_attempts,
        })
    }

    async fn poll_lighter_once(&self) -> Result<Quantity, Error> {
        let body = self.lighter.fetch_account(self.account_index).await?;
        AccountsResponse::parse(&body)?.position_for(&self.ticker)
    }

    /// Add a local fill to `venue`'s counter without any request
    pub fn update_position(&self, venue: Venue, delta: Quantity) {
        *self.state.lock().positions.get_mut(venue) += delta;
    }

    /// Current counter for `venue`
    pub fn position(&self, venue: Venue) -> Quantity {
        self.state.lock().positions.get(venue)
    }

    /// Current counters for both venues
    pub fn positions(&self) -> Positions {
        self.state.lock().positions
    }

    /// Sum of both venues' counters
    pub fn net_position(&self) -> Quantity {
        self.state.lock().positions.net()
    }

    /// Time since the last successful refresh
    pub fn last_refresh_age(&self) -> Option<Duration> {
        self.state.lock().last_refresh.map(|at| at.elapsed())
    }
}

impl fmt::Debug for PositionReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionReconciler")
            .field("ticker", &self.ticker)
            .field("paradex_market", &self.paradex_market)
            .field("account_index", &self.account_index)
            .field("paradex_client", &self.paradex.is_some())
            .field("positions", &self.positions())
            .finish_non_exhaustive()
    }
}
