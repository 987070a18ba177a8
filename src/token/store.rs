//! Rotating seed cache
//!
//! `SeedStore` holds the current seed and refreshes it from the front-end's
//! root page when the rotation window has moved on. Refreshes are
//! single-flight: callers that observe a stale seed queue on a refresh lock.
//! Only the first performs the fetch; callers that were queued behind it take
//! its outcome, a fresh seed or the error it failed with, without fetching
//! again.
//!
//! # Example
//!
//! ```ignore
//! use gtoken::token::{SeedStore, TokenConfig, Clock, SystemClock};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SeedStore::new(TokenConfig::default())?;
//!     let seed = store.ensure_fresh(SystemClock.now_millis()).await?;
//!     println!("{}", seed);
//!     Ok(())
//! }
//! ```

use regex::Regex;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::token::config::TokenConfig;
use crate::token::error::{TokenError, TokenResult};
use crate::token::expression::{RawExpression, prepare_fragment};
use crate::token::fetcher::{HttpPageFetcher, PageFetcher};
use crate::token::seed::{Seed, rotation_epoch};

static TKK_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)tkk:'(.+?)'").expect("tkk marker pattern is valid"));

/// Extract the seed from a root page body.
///
/// A plain `"<epoch>.<delta>"` marker is taken as-is; anything else inside the
/// marker is unescaped and evaluated as a seed expression.
pub fn extract_seed(body: &str) -> TokenResult<Seed> {
    let content = TKK_MARKER
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or(TokenError::MarkerNotFound)?;

    if let Some(seed) = Seed::parse_literal(content) {
        return Ok(seed);
    }

    debug!("tkk marker is not a literal, evaluating it as an expression");
    RawExpression::parse(&prepare_fragment(content))?.to_seed()
}

/// Owner of the current seed for one seed source
pub struct SeedStore<F = HttpPageFetcher> {
    fetcher: F,
    url: String,
    seed: RwLock<Seed>,
    /// Failure of the last completed refresh, if it failed
    refresh: Mutex<Option<TokenError>>,
    /// Completed refresh attempts, bumped while `refresh` is held
    generation: AtomicU64,
}

impl SeedStore<HttpPageFetcher> {
    /// Create a store backed by the real front-end described by `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Host, timeout and user agent for the seed page request
    ///
    /// # Returns
    ///
    /// * `Ok(SeedStore)` - An unset store fetching from `config.base_url()`
    /// * `Err(TokenError::ConfigError)` - The HTTP client could not be built
    pub fn new(config: TokenConfig) -> TokenResult<Self> {
        let fetcher = HttpPageFetcher::new(&config)?;
        Ok(Self::with_fetcher(fetcher, &config.base_url()))
    }
}

impl<F: PageFetcher> SeedStore<F> {
    /// Create an unset store that fetches `url` through `fetcher`
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Transport used for every refresh
    /// * `url` - Root page carrying the seed marker
    ///
    /// # Example
    ///
    /// ```ignore
    /// let store = SeedStore::with_fetcher(
    ///     MockFetcher::new(MockMode::Page(seed_page(&Seed::new(406000, 3)))),
    ///     "https://translate.google.com",
    /// );
    /// ```
    pub fn with_fetcher(fetcher: F, url: &str) -> Self {
        Self {
            fetcher,
            url: url.to_string(),
            seed: RwLock::new(Seed::UNSET),
            refresh: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// Start from a previously persisted seed instead of the unset one
    pub fn with_seed(self, seed: Seed) -> Self {
        Self {
            seed: RwLock::new(seed),
            ..self
        }
    }

    pub fn fetch_url(&self) -> &str {
        &self.url
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Current seed without refreshing; may be stale or unset
    pub async fn current(&self) -> Seed {
        *self.seed.read().await
    }

    /// Current seed for persistence
    pub async fn snapshot(&self) -> Seed {
        self.current().await
    }

    /// Replace the current seed, e.g. with one restored from disk
    pub async fn restore(&self, seed: Seed) {
        *self.seed.write().await = seed;
    }

    /// Return a seed valid for the rotation window containing `now_millis`,
    /// fetching a new one if needed.
    ///
    /// On failure the previously cached seed is left untouched. Callers that
    /// queued while a refresh was in flight share its outcome, so one stale
    /// window costs at most one fetch even when that fetch fails.
    pub async fn ensure_fresh(&self, now_millis: u64) -> TokenResult<Seed> {
        let seed = self.current().await;
        if seed.is_fresh_at(now_millis) {
            debug!(epoch = seed.epoch(), "seed still fresh");
            return Ok(seed);
        }

        let observed = self.generation.load(Ordering::Acquire);
        let mut last_failure = self.refresh.lock().await;

        // Another caller may have refreshed while we waited for the lock
        let seed = self.current().await;
        if seed.is_fresh_at(now_millis) {
            debug!(epoch = seed.epoch(), "seed refreshed by a concurrent caller");
            return Ok(seed);
        }
        if self.generation.load(Ordering::Acquire) != observed {
            if let Some(error) = last_failure.as_ref() {
                debug!(error = %error, "concurrent seed refresh failed");
                return Err(error.clone());
            }
        }

        let outcome = self.fetch_seed(now_millis).await;
        match &outcome {
            Ok(fresh) => {
                *self.seed.write().await = *fresh;
                *last_failure = None;
            }
            Err(error) => *last_failure = Some(error.clone()),
        }
        self.generation.fetch_add(1, Ordering::Release);
        outcome
    }

    /// `ensure_fresh` bounded by a caller-supplied deadline.
    ///
    /// When the deadline passes the in-flight fetch is dropped, no seed is
    /// published and `TokenError::Timeout` is returned.
    pub async fn ensure_fresh_with_timeout(
        &self,
        now_millis: u64,
        timeout: Duration,
    ) -> TokenResult<Seed> {
        match tokio::time::timeout(timeout, self.ensure_fresh(now_millis)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(?timeout, "seed refresh timed out");
                Err(TokenError::Timeout(timeout))
            }
        }
    }

    async fn fetch_seed(&self, now_millis: u64) -> TokenResult<Seed> {
        debug!(
            url = %self.url,
            fetcher = self.fetcher.fetcher_name(),
            window = rotation_epoch(now_millis),
            "fetching seed page"
        );

        let body = self
            .fetcher
            .fetch_page(&self.url)
            .await
            .inspect_err(|e| warn!(error = %e, "seed page fetch failed"))?;

        let seed = extract_seed(&body)
            .inspect_err(|e| warn!(error = %e, "could not extract seed from page"))?;

        info!(epoch = seed.epoch(), "refreshed seed");
        Ok(seed)
    }
}

impl<F> std::fmt::Debug for SeedStore<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedStore").field("url", &self.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::mock::{MockFetcher, MockMode, expression_page, seed_page};
    use crate::token::seed::ROTATION_PERIOD_MS;

    const HOUR: i64 = 406_000;

    fn at_hour(hour: i64) -> u64 {
        hour as u64 * ROTATION_PERIOD_MS + 1_000
    }

    fn store_serving(pages: Vec<String>) -> SeedStore<MockFetcher> {
        SeedStore::with_fetcher(
            MockFetcher::new(MockMode::Sequence(pages)),
            "https://translate.google.com",
        )
    }

    // ========== Extraction Tests ==========

    #[test]
    fn test_extract_literal_seed() {
        let page = seed_page(&Seed::new(406398, 2087938574));
        assert_eq!(extract_seed(&page).unwrap(), Seed::new(406398, 2087938574));
    }

    #[test]
    fn test_extract_expression_seed() {
        let page = expression_page(
            r"((function(){var a\x3d4264492758;var b\x3d-1857761911;return 406375+\x27.\x27+(a+b)})())",
        );
        assert_eq!(extract_seed(&page).unwrap(), Seed::new(406375, 2406730847));
    }

    #[test]
    fn test_extract_spans_newlines() {
        let page = "<script>tkk:'a\\x3d5;\nb\\x3d-2;\nreturn 406000'</script>";
        assert_eq!(extract_seed(page).unwrap(), Seed::new(406000, 3));
    }

    #[test]
    fn test_extract_missing_marker() {
        assert_eq!(
            extract_seed("<html>no seed here</html>"),
            Err(TokenError::MarkerNotFound)
        );
    }

    #[test]
    fn test_extract_unparseable_expression() {
        assert!(matches!(
            extract_seed("tkk:'something else entirely'"),
            Err(TokenError::MalformedExpression(_))
        ));
    }

    // ========== Freshness Tests ==========

    #[tokio::test]
    async fn test_starts_unset() {
        let store = store_serving(vec![]);
        assert_eq!(store.current().await, Seed::UNSET);
        assert_eq!(store.fetch_url(), "https://translate.google.com");
    }

    #[tokio::test]
    async fn test_single_fetch_within_window() {
        let store = store_serving(vec![seed_page(&Seed::new(HOUR, 11))]);

        let first = store.ensure_fresh(at_hour(HOUR)).await.unwrap();
        let second = store
            .ensure_fresh(at_hour(HOUR) + ROTATION_PERIOD_MS / 2)
            .await
            .unwrap();

        assert_eq!(first, Seed::new(HOUR, 11));
        assert_eq!(second, first);
        assert_eq!(store.fetcher().fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_refetch_after_window_boundary() {
        let store = store_serving(vec![
            seed_page(&Seed::new(HOUR, 11)),
            seed_page(&Seed::new(HOUR + 1, 22)),
        ]);

        store.ensure_fresh(at_hour(HOUR)).await.unwrap();
        let next = store.ensure_fresh(at_hour(HOUR + 1)).await.unwrap();
        store.ensure_fresh(at_hour(HOUR + 1) + 5_000).await.unwrap();

        assert_eq!(next, Seed::new(HOUR + 1, 22));
        assert_eq!(store.fetcher().fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_restored_seed_avoids_fetch() {
        let store = store_serving(vec![]).with_seed(Seed::new(HOUR, 5));
        let seed = store.ensure_fresh(at_hour(HOUR)).await.unwrap();
        assert_eq!(seed, Seed::new(HOUR, 5));
        assert_eq!(store.fetcher().fetch_count(), 0);

        store.restore(Seed::new(HOUR + 1, 6)).await;
        assert_eq!(store.snapshot().await, Seed::new(HOUR + 1, 6));
    }

    // ========== Failure Tests ==========

    #[tokio::test]
    async fn test_network_failure_keeps_previous_seed() {
        let stale = Seed::new(HOUR - 1, 9);
        let store = SeedStore::with_fetcher(
            MockFetcher::new(MockMode::Error("connection reset".to_string())),
            "https://translate.google.com",
        )
        .with_seed(stale);

        let result = store.ensure_fresh(at_hour(HOUR)).await;
        assert!(matches!(result, Err(TokenError::NetworkError(_))));
        assert!(result.unwrap_err().is_seed_unavailable());
        assert_eq!(store.current().await, stale);
    }

    #[tokio::test]
    async fn test_missing_marker_leaves_store_unset_and_retries() {
        let store = store_serving(vec![
            "<html></html>".to_string(),
            seed_page(&Seed::new(HOUR, 1)),
        ]);

        assert_eq!(
            store.ensure_fresh(at_hour(HOUR)).await,
            Err(TokenError::MarkerNotFound)
        );
        assert_eq!(store.current().await, Seed::UNSET);

        assert_eq!(
            store.ensure_fresh(at_hour(HOUR)).await.unwrap(),
            Seed::new(HOUR, 1)
        );
        assert_eq!(store.fetcher().fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_timeout_publishes_nothing() {
        let store = SeedStore::with_fetcher(
            MockFetcher::with_delay(MockMode::Page(seed_page(&Seed::new(HOUR, 1))), 500),
            "https://translate.google.com",
        );

        let result = store
            .ensure_fresh_with_timeout(at_hour(HOUR), Duration::from_millis(20))
            .await;

        assert_eq!(result, Err(TokenError::Timeout(Duration::from_millis(20))));
        assert_eq!(store.current().await, Seed::UNSET);
    }

    #[tokio::test]
    async fn test_timed_out_refresh_does_not_block_next_caller() {
        let store = SeedStore::with_fetcher(
            MockFetcher::with_delay(MockMode::Page(seed_page(&Seed::new(HOUR, 1))), 100),
            "https://translate.google.com",
        );

        let first = store
            .ensure_fresh_with_timeout(at_hour(HOUR), Duration::from_millis(10))
            .await;
        assert!(matches!(first, Err(TokenError::Timeout(_))));

        let second = store.ensure_fresh(at_hour(HOUR)).await.unwrap();
        assert_eq!(second, Seed::new(HOUR, 1));
        assert_eq!(store.fetcher().fetch_count(), 2);
    }
}
