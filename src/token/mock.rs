//! Mock seed page fetcher for testing
//!
//! Serves canned pages without network access and counts how many fetches
//! were issued, which is what the freshness and single-flight tests assert on.
//!
//! # Example
//!
//! ```
//! use gtoken::token::{MockFetcher, MockMode, PageFetcher, Seed, seed_page};
//!
//! # tokio_test_block_on(async {
//! let mock = MockFetcher::new(MockMode::Page(seed_page(&Seed::new(406000, 3))));
//! let body = mock.fetch_page("https://translate.google.com").await.unwrap();
//! assert!(body.contains("tkk:'406000.3'"));
//! assert_eq!(mock.fetch_count(), 1);
//! # });
//! # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::token::error::{TokenError, TokenResult};
use crate::token::fetcher::PageFetcher;
use crate::token::seed::Seed;

/// A page shaped like the front-end's root page, carrying `seed` as a literal marker
pub fn seed_page(seed: &Seed) -> String {
    format!(
        "<html><head><script>window.WIZ_global_data={{}};c._ctkk=1;tkk:'{}',experiment_ids:[]</script></head><body></body></html>",
        seed
    )
}

/// A page carrying `fragment` as an escaped expression marker
pub fn expression_page(fragment: &str) -> String {
    format!("<script>var x={{tkk:'{}',lang:'en'}};</script>", fragment)
}

/// Mock page modes for testing different scenarios
#[derive(Debug, Clone)]
pub enum MockMode {
    /// Serve the same page on every fetch
    Page(String),

    /// Serve pages in order, repeating the last one once exhausted
    Sequence(Vec<String>),

    /// Simulate a transport failure
    Error(String),
}

/// Mock fetcher that serves canned seed pages
#[derive(Debug)]
pub struct MockFetcher {
    mode: MockMode,
    /// Optional simulated network delay (in milliseconds)
    delay_ms: u64,
    fetches: AtomicUsize,
}

impl MockFetcher {
    /// Create a new MockFetcher with the given mode
    ///
    /// # Arguments
    ///
    /// * `mode` - Which pages (or failure) to serve
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mock = MockFetcher::new(MockMode::Page(seed_page(&Seed::new(406000, 3))));
    /// ```
    pub fn new(mode: MockMode) -> Self {
        Self::with_delay(mode, 0)
    }

    /// Create a MockFetcher with simulated network delay
    ///
    /// # Arguments
    ///
    /// * `mode` - Which pages (or failure) to serve
    /// * `delay_ms` - Simulated delay in milliseconds
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mock = MockFetcher::with_delay(MockMode::Error("offline".to_string()), 200);
    /// // Each fetch fails after ~200ms
    /// ```
    pub fn with_delay(mode: MockMode, delay_ms: u64) -> Self {
        Self {
            mode,
            delay_ms,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of fetches issued so far, including failed ones
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn apply_delay(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch_page(&self, _url: &str) -> TokenResult<String> {
        let index = self.fetches.fetch_add(1, Ordering::SeqCst);
        self.apply_delay().await;

        match &self.mode {
            MockMode::Page(page) => Ok(page.clone()),
            MockMode::Sequence(pages) => pages
                .get(index)
                .or_else(|| pages.last())
                .cloned()
                .ok_or_else(|| TokenError::NetworkError("no pages configured".to_string())),
            MockMode::Error(msg) => Err(TokenError::NetworkError(msg.clone())),
        }
    }

    fn fetcher_name(&self) -> &str {
        "Mock"
    }
}
