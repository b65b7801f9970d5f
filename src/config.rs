//! Configuration for the book synchronizer and the position reconciler.
//!
//! This module provides the [`Config`] struct: instrument identity on both
//! venues, the Lighter endpoint, and the polling cadence used by
//! [`PositionReconciler`](crate::position::PositionReconciler).

use std::time::Duration;

/// Lighter API environment (mainnet or testnet)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Production environment (real money)
    #[default]
    Mainnet,
    /// Testnet environment (paper trading)
    Testnet,
}

impl Environment {
    /// Get the base URL for the Lighter REST API
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Environment::Mainnet => "https://mainnet.zklighter.elliot.ai",
            Environment::Testnet => "https://testnet.zklighter.elliot.ai",
        }
    }
}

/// Default number of attempts for one Lighter position poll
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 10;

/// Floor for the delay between Lighter poll attempts
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Configuration for one strategy instance (one instrument, two venues)
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use xvenue_state::Config;
///
/// let config = Config::new("btc", 42)
///     .with_refresh_interval(Duration::from_secs(5))
///     .with_min_request_interval(Duration::from_millis(250));
///
/// assert_eq!(config.ticker(), "BTC");
/// assert_eq!(config.paradex_market(), "BTC-USD-PERP");
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Instrument ticker, upper-cased (e.g. `BTC`)
    ticker: String,

    /// Explicit Paradex market; derived from the ticker when unset
    paradex_market: Option<String>,

    /// Lighter account index used for position polls
    account_index: u64,

    /// Lighter API environment
    environment: Environment,

    /// Overrides the environment's base URL (proxies, local mocks)
    base_url: Option<String>,

    /// HTTP request timeout
    timeout: Duration,

    /// Caching window for `refresh(force = false)`
    refresh_interval: Duration,

    /// Minimum spacing between outbound requests per venue
    min_request_interval: Duration,

    /// Attempt budget for one Lighter position poll
    max_poll_attempts: u32,
}

impl Config {
    /// Create a new configuration for `ticker` and a Lighter account
    pub fn new(ticker: impl Into<String>, account_index: u64) -> Self {
        Self {
            ticker: ticker.into().to_uppercase(),
            paradex_market: None,
            account_index,
            environment: Environment::default(),
            base_url: None,
            timeout: Duration::from_secs(10),
            refresh_interval: Duration::ZERO,
            min_request_interval: Duration::ZERO,
            max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }

    /// Set the Paradex market symbol explicitly
    #[must_use]
    pub fn with_paradex_market(mut self, market: impl Into<String>) -> Self {
        self.paradex_market = Some(market.into());
        self
    }

    /// Set the Lighter environment (mainnet or testnet)
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Point the Lighter client at a custom base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    /// Set the HTTP request timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the position cache window
    #[must_use]
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set the per-venue request throttle
    #[must_use]
    pub fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }

    /// Set the Lighter poll attempt budget (at least one attempt is made)
    #[must_use]
    pub fn with_max_poll_attempts(mut self, attempts: u32) -> Self {
        self.max_poll_attempts = attempts.max(1);
        self
    }

    /// Get the instrument ticker
    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    /// Get the Paradex market (`{TICKER}-USD-PERP` unless overridden)
    pub fn paradex_market(&self) -> String {
        self.paradex_market
            .clone()
            .unwrap_or_else(|| format!("{}-USD-PERP", self.ticker))
    }

    /// Get the Lighter account index
    pub fn account_index(&self) -> u64 {
        self.account_index
    }

    /// Get the environment
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Get the Lighter REST base URL
    pub fn rest_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.environment.rest_base_url())
    }

    /// Get the timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the position cache window
    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Get the per-venue request throttle
    pub fn min_request_interval(&self) -> Duration {
        self.min_request_interval
    }

    /// Get the Lighter poll attempt budget
    pub fn max_poll_attempts(&self) -> u32 {
        self.max_poll_attempts
    }
}
