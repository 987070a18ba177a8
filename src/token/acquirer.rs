//! Token acquisition facade
//!
//! Ties the seed store to the transform: make sure the seed is fresh for the
//! current time, then compute the token for the text. Without a seed no token
//! is produced, so a dependent request is never sent with a bogus `tk`.
//!
//! # Example
//!
//! ```ignore
//! use gtoken::token::TokenAcquirer;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let acquirer = TokenAcquirer::from_env()?;
//!     let tk = acquirer.acquire("Hello, world!").await?;
//!     println!("{}", tk);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::token::clock::{Clock, SystemClock};
use crate::token::config::TokenConfig;
use crate::token::error::TokenResult;
use crate::token::fetcher::{HttpPageFetcher, PageFetcher};
use crate::token::store::SeedStore;
use crate::token::transform::compute;

/// Token for `text` using a seed that is fresh at `clock`'s current time
pub async fn acquire_token<F, C>(store: &SeedStore<F>, clock: &C, text: &str) -> TokenResult<String>
where
    F: PageFetcher,
    C: Clock + ?Sized,
{
    let seed = store.ensure_fresh(clock.now_millis()).await?;
    Ok(compute(&seed, text))
}

/// Handle bundling a shared seed store with a clock
pub struct TokenAcquirer<F = HttpPageFetcher, C = SystemClock> {
    store: Arc<SeedStore<F>>,
    clock: C,
}

impl TokenAcquirer<HttpPageFetcher, SystemClock> {
    /// Create an acquirer for the real front-end using the system clock
    ///
    /// # Arguments
    ///
    /// * `config` - Host, timeout and user agent for seed refreshes
    ///
    /// # Returns
    ///
    /// * `Err(TokenError::ConfigError)` - The HTTP client could not be built
    pub fn new(config: TokenConfig) -> TokenResult<Self> {
        Ok(Self::with_parts(Arc::new(SeedStore::new(config)?), SystemClock))
    }

    /// Acquirer configured from `GTOKEN_HOST` / `GTOKEN_TIMEOUT_SECS`
    pub fn from_env() -> TokenResult<Self> {
        Self::new(TokenConfig::from_env()?)
    }
}

impl<F: PageFetcher, C: Clock> TokenAcquirer<F, C> {
    /// Create an acquirer from an existing store and clock
    ///
    /// # Arguments
    ///
    /// * `store` - Seed store, possibly shared with other acquirers
    /// * `clock` - Time source deciding the rotation window
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = Arc::new(SeedStore::with_fetcher(fetcher, "https://translate.google.com"));
    /// let acquirer = TokenAcquirer::with_parts(Arc::clone(&store), ManualClock::new(0));
    /// ```
    pub fn with_parts(store: Arc<SeedStore<F>>, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &Arc<SeedStore<F>> {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub async fn acquire(&self, text: &str) -> TokenResult<String> {
        acquire_token(&*self.store, &self.clock, text).await
    }

    /// Like `acquire`, failing with `TokenError::Timeout` if a seed refresh
    /// takes longer than `timeout`
    pub async fn acquire_with_timeout(&self, text: &str, timeout: Duration) -> TokenResult<String> {
        let seed = self
            .store
            .ensure_fresh_with_timeout(self.clock.now_millis(), timeout)
            .await?;
        Ok(compute(&seed, text))
    }
}

impl<F, C: Clone> Clone for TokenAcquirer<F, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            clock: self.clock.clone(),
        }
    }
}

impl<F, C> std::fmt::Debug for TokenAcquirer<F, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAcquirer")
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::clock::ManualClock;
    use crate::token::error::TokenError;
    use crate::token::mock::{MockFetcher, MockMode, seed_page};
    use crate::token::seed::{ROTATION_PERIOD_MS, Seed};

    const HOUR: i64 = 413_627;

    fn acquirer(mode: MockMode) -> TokenAcquirer<MockFetcher, ManualClock> {
        let store = SeedStore::with_fetcher(MockFetcher::new(mode), "https://translate.google.com");
        TokenAcquirer::with_parts(
            Arc::new(store),
            ManualClock::new(HOUR as u64 * ROTATION_PERIOD_MS),
        )
    }

    #[tokio::test]
    async fn test_acquire_matches_historical_vector() {
        let acquirer = acquirer(MockMode::Page(seed_page(&Seed::new(HOUR, 1987336334))));
        assert_eq!(acquirer.acquire("test").await.unwrap(), "950629.577246");
        assert_eq!(acquirer.store().fetcher().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_reuses_seed_across_texts() {
        let acquirer = acquirer(MockMode::Page(seed_page(&Seed::new(HOUR, 1987336334))));
        for text in ["one", "two", "three"] {
            acquirer.acquire(text).await.unwrap();
        }
        assert_eq!(acquirer.store().fetcher().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_acquire_fails_without_seed() {
        let acquirer = acquirer(MockMode::Page("<html></html>".to_string()));
        let result = acquirer.acquire("test").await;
        assert_eq!(result, Err(TokenError::MarkerNotFound));
        assert!(result.unwrap_err().is_seed_unavailable());
    }

    #[tokio::test]
    async fn test_acquire_token_free_function() {
        let store = SeedStore::with_fetcher(
            MockFetcher::new(MockMode::Page(seed_page(&Seed::new(HOUR, 1987336334)))),
            "https://translate.google.com",
        );
        let clock = ManualClock::new(HOUR as u64 * ROTATION_PERIOD_MS + 10);
        let token = acquire_token(&store, &clock, "test").await.unwrap();
        assert_eq!(token, "950629.577246");
    }

    #[tokio::test]
    async fn test_acquire_with_timeout() {
        let store = SeedStore::with_fetcher(
            MockFetcher::with_delay(MockMode::Page(seed_page(&Seed::new(HOUR, 1))), 500),
            "https://translate.google.com",
        );
        let acquirer = TokenAcquirer::with_parts(
            Arc::new(store),
            ManualClock::new(HOUR as u64 * ROTATION_PERIOD_MS),
        );
        let result = acquirer
            .acquire_with_timeout("test", Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(TokenError::Timeout(_))));
    }

    #[test]
    fn test_new_with_default_config() {
        let acquirer = TokenAcquirer::new(TokenConfig::default()).unwrap();
        assert_eq!(
            acquirer.store().fetch_url(),
            "https://translate.google.com"
        );
    }
}
