//! Query parameters for the translation request that carries the token
//!
//! Sending the request and decoding its response are left to the caller; this
//! module only lays out the parameters the front-end sends alongside `tk`.

use crate::token::error::{TokenError, TokenResult};

/// Data sections requested from the endpoint
pub const DATA_TYPES: [&str; 10] = ["at", "bd", "ex", "ld", "md", "qca", "rw", "rm", "ss", "t"];

/// Path of the translation endpoint relative to the host root
pub const TRANSLATE_PATH: &str = "/translate_a/single";

/// Ordered query pairs for translating `query` from `src` to `dest` with token `token`.
///
/// Each override replaces every pair with the same key, or is appended when the
/// key is not present.
pub fn build_params(
    query: &str,
    src: &str,
    dest: &str,
    token: &str,
    overrides: &[(&str, &str)],
) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = vec![
        ("client".to_string(), "webapp".to_string()),
        ("sl".to_string(), src.to_string()),
        ("tl".to_string(), dest.to_string()),
        ("hl".to_string(), dest.to_string()),
    ];
    params.extend(
        DATA_TYPES
            .iter()
            .map(|dt| ("dt".to_string(), dt.to_string())),
    );
    params.extend([
        ("ie".to_string(), "UTF-8".to_string()),
        ("oe".to_string(), "UTF-8".to_string()),
        ("otf".to_string(), "1".to_string()),
        ("ssel".to_string(), "0".to_string()),
        ("tsel".to_string(), "0".to_string()),
        ("tk".to_string(), token.to_string()),
        ("q".to_string(), query.to_string()),
    ]);

    for (key, value) in overrides {
        if params.iter().any(|(k, _)| k == key) {
            params.retain(|(k, _)| k != key);
        }
        params.push((key.to_string(), value.to_string()));
    }

    params
}

/// Full translation URL for `base_url` (scheme and host) and `params`
pub fn translate_url(base_url: &str, params: &[(String, String)]) -> TokenResult<reqwest::Url> {
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), TRANSLATE_PATH);
    reqwest::Url::parse_with_params(&endpoint, params)
        .map_err(|e| TokenError::ConfigError(format!("Invalid translate URL '{}': {}", endpoint, e)))
}
