//! HTTP REST client for the Lighter account endpoint.
//!
//! This module provides [`LighterRestClient`], the production
//! [`AccountSource`] used by the position reconciler.
//!
//! # Example
//!
//! ```rust,no_run
//! use xvenue_state::client::{AccountSource, LighterRestClient};
//! use xvenue_state::types::AccountsResponse;
//! use xvenue_state::Config;
//!
//! # async fn example() -> xvenue_state::Result<()> {
//! let config = Config::new("BTC", 42);
//! let client = LighterRestClient::new(&config)?;
//!
//! let body = client.fetch_account(config.account_index()).await?;
//! let position = AccountsResponse::parse(&body)?.position_for(config.ticker())?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER};
use reqwest::Client;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{ApiError, Error};

/// Source of raw Lighter account bodies.
///
/// Returns the body untouched so that empty or malformed payloads reach the
/// reconciler's retry loop instead of failing inside the transport.
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// Fetch the account body for `account_index`
    async fn fetch_account(&self, account_index: u64) -> Result<String, Error>;
}

/// HTTP client for the Lighter REST API
#[derive(Debug, Clone)]
pub struct LighterRestClient {
    client: Client,
    base_url: String,
}

impl LighterRestClient {
    /// Create a new REST client
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &Config) -> Result<Self, Error> {
        Url::parse(config.rest_base_url())
            .map_err(|e| Error::Config(format!("invalid base URL: {}", e)))?;

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.rest_base_url().trim_end_matches('/').to_string(),
        })
    }

    /// URL of the account lookup by index
    pub fn account_url(&self, account_index: u64) -> Result<Url, Error> {
        let index = account_index.to_string();
        Url::parse_with_params(
            &format!("{}/api/v1/account", self.base_url),
            &[("by", "index"), ("value", index.as_str())],
        )
        .map_err(|e| Error::Config(format!("invalid account URL: {}", e)))
    }

    /// Make a GET request and return the raw body
    pub async fn get_raw(&self, url: Url) -> Result<String, Error> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Handle the HTTP response, checking for errors
    async fn handle_response(&self, response: reqwest::Response) -> Result<String, Error> {
        let status = response.status();

        // Check for rate limiting
        if status.as_u16() == 429 {
            return Err(Error::RateLimited {
                retry_after_ms: retry_after_ms(response.headers()),
            });
        }

        // Check for errors
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            // Try to parse as API error
            if let Ok(error_response) = serde_json::from_str::<Value>(&body) {
                let message = error_response
                    .get("message")
                    .or_else(|| error_response.get("error"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(&body)
                    .to_string();

                let api_error = match error_response.get("code") {
                    Some(Value::String(code)) => ApiError::with_code(status.as_u16(), code, message),
                    Some(code) => ApiError::with_code(status.as_u16(), code.to_string(), message),
                    None => ApiError::new(status.as_u16(), message),
                };
                return Err(Error::Api(api_error));
            }

            return Err(Error::Api(ApiError::new(status.as_u16(), body)));
        }

        Ok(response.text().await?)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Retry-After delay in milliseconds, when given in whole seconds
fn retry_after_ms(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|secs| secs.saturating_mul(1000))
}

#[async_trait]
impl AccountSource for LighterRestClient {
    async fn fetch_account(&self, account_index: u64) -> Result<String, Error> {
        let url = self.account_url(account_index)?;
        self.get_raw(url).await
    }
}
