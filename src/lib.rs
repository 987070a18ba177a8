//! Token engine for the public Google Translate web endpoint
//!
//! Every request to the front-end's translation endpoint carries a `tk`
//! parameter derived from the request text and an hourly rotating seed. This
//! crate fetches and caches that seed and reproduces the token computation.
//!
//! # Example
//!
//! ```ignore
//! use gtoken::{TokenAcquirer, TokenConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let acquirer = TokenAcquirer::new(TokenConfig::default())?;
//!     println!("{}", acquirer.acquire("Hello, world!").await?);
//!     Ok(())
//! }
//! ```

pub mod token;

// Re-export the main types for convenient access
pub use token::{
    Seed, SeedStore, TokenAcquirer, TokenConfig, TokenError, TokenResult, acquire_token, compute,
};
