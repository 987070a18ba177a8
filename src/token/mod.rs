/// Token Module
///
/// This module produces the `tk` authorization value required by the public
/// translate front-end. The value depends on the request text and on a
/// rotating seed that the front-end serves in its root page and replaces
/// every hour.
///
/// # Overview
///
/// 1. **Seed Store** - Caches the seed and refreshes it at most once per rotation window
/// 2. **Expression Scanner** - Resolves seeds served as a small script fragment
/// 3. **Transform** - Bitwise/modular computation of the token from seed and text
/// 4. **Acquirer** - Facade combining the store, a clock and the transform
///
/// # Example
///
/// ```ignore
/// use gtoken::token::{TokenAcquirer, TokenConfig, build_params};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let acquirer = TokenAcquirer::new(TokenConfig::default())?;
///     let tk = acquirer.acquire("Hello").await?;
///     let params = build_params("Hello", "auto", "fr", &tk, &[]);
///     println!("{:?}", params);
///     Ok(())
/// }
/// ```
pub mod acquirer;
pub mod clock;
pub mod config;
pub mod error;
pub mod expression;
pub mod fetcher;
pub mod mock;
pub mod params;
pub mod rotation;
pub mod seed;
pub mod store;
pub mod transform;


pub use acquirer::{TokenAcquirer, acquire_token};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_HOST, TokenConfig};
pub use error::{TokenError, TokenResult};
pub use expression::{Operator, RawExpression};
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use mock::{MockFetcher, MockMode, seed_page};
pub use params::{build_params, translate_url};
pub use rotation::rotate_mix;
pub use seed::{ROTATION_PERIOD_MS, Seed, rotation_epoch};
pub use store::{SeedStore, extract_seed};
pub use transform::{compute, compute_units};
