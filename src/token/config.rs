//! Seed source configuration

use std::time::Duration;

use crate::token::error::{TokenError, TokenResult};

/// Host serving the seed page when none is configured
pub const DEFAULT_HOST: &str = "translate.google.com";

/// Timeout applied to every seed page request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenConfig {
    /// Host or base URL of the translate front-end
    pub host: String,
    /// Request timeout for the seed page
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl TokenConfig {
    pub fn new(host: &str) -> TokenResult<Self> {
        if host.trim().is_empty() {
            return Err(TokenError::ConfigError("Host cannot be empty".to_string()));
        }
        Ok(Self {
            host: host.trim().to_string(),
            ..Self::default()
        })
    }

    /// Load configuration from `GTOKEN_HOST` and `GTOKEN_TIMEOUT_SECS`, falling
    /// back to defaults for unset variables
    pub fn from_env() -> TokenResult<Self> {
        Self::from_values(
            std::env::var("GTOKEN_HOST").ok().as_deref(),
            std::env::var("GTOKEN_TIMEOUT_SECS").ok().as_deref(),
        )
    }

    /// Build a configuration from raw `GTOKEN_HOST` / `GTOKEN_TIMEOUT_SECS` values
    ///
    /// # Arguments
    ///
    /// * `host` - Host or base URL, `None` for the default host
    /// * `timeout_secs` - Whole seconds as text, `None` for the default timeout
    ///
    /// # Returns
    ///
    /// * `Err(TokenError::ConfigError)` - Empty host or unparseable timeout
    pub fn from_values(host: Option<&str>, timeout_secs: Option<&str>) -> TokenResult<Self> {
        let mut config = match host {
            Some(host) => Self::new(host)?,
            None => Self::default(),
        };

        if let Some(raw) = timeout_secs {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                TokenError::ConfigError(format!(
                    "GTOKEN_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    raw
                ))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    /// Root page URL; a bare host gets an `https://` scheme
    pub fn base_url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", self.host.trim_end_matches('/'))
        }
    }
}
