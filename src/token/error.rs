use std::time::Duration;

/// Error types for token acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The seed page could not be fetched (transport failure or non-success status)
    NetworkError(String),
    /// The seed refresh did not finish before its deadline
    Timeout(Duration),
    /// The seed page contained no `tkk:'...'` marker
    MarkerNotFound,
    /// The embedded fragment had no recognizable operand/operator structure
    MalformedExpression(String),
    /// Invalid configuration
    ConfigError(String),
}

impl TokenError {
    /// Whether this error means "no usable seed right now".
    ///
    /// Callers should treat these as a temporarily unavailable translation
    /// and must not send a request without a token.
    pub fn is_seed_unavailable(&self) -> bool {
        !matches!(self, TokenError::ConfigError(_))
    }
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::NetworkError(msg) => write!(f, "Seed unavailable: network error: {}", msg),
            TokenError::Timeout(after) => {
                write!(f, "Seed unavailable: refresh timed out after {:?}", after)
            }
            TokenError::MarkerNotFound => {
                write!(f, "Seed unavailable: no tkk marker found in seed page")
            }
            TokenError::MalformedExpression(msg) => {
                write!(f, "Seed unavailable: malformed seed expression: {}", msg)
            }
            TokenError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<reqwest::Error> for TokenError {
    fn from(err: reqwest::Error) -> Self {
        TokenError::NetworkError(err.to_string())
    }
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
