//! Seed page retrieval
//!
//! The store depends on the `PageFetcher` trait rather than on an HTTP client
//! directly, so tests can substitute `MockFetcher` and callers can plug in
//! their own transport.

use async_trait::async_trait;

use crate::token::config::TokenConfig;
use crate::token::error::{TokenError, TokenResult};

/// Fetches the text body of a page
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `url` and return its body
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The response body
    /// * `Err(TokenError::NetworkError)` - Transport failure or non-success status
    async fn fetch_page(&self, url: &str) -> TokenResult<String>;

    /// Name used in log events
    fn fetcher_name(&self) -> &str;
}

/// `reqwest`-backed fetcher for the real front-end
#[derive(Clone, Debug)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    /// Create a fetcher with the timeout and user agent from `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Seed source configuration
    ///
    /// # Returns
    ///
    /// * `Ok(HttpPageFetcher)` - Ready to fetch
    /// * `Err(TokenError::ConfigError)` - The HTTP client could not be built
    pub fn new(config: &TokenConfig) -> TokenResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TokenError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, url: &str) -> TokenResult<String> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TokenError::NetworkError(format!(
                "seed page {} returned {}",
                url, status
            )));
        }

        Ok(response.text().await?)
    }

    fn fetcher_name(&self) -> &str {
        "HTTP"
    }
}
