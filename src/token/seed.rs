//! The rotating seed pair
//!
//! The upstream front-end embeds a value of the form `"<epoch>.<delta>"` in
//! its root page. `epoch` is the number of whole hours since the Unix epoch
//! at which the value was issued and doubles as the freshness key; `delta`
//! is mixed into the token late in the transform.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::token::error::TokenError;

/// Length of one seed rotation window in milliseconds
pub const ROTATION_PERIOD_MS: u64 = 3_600_000;

/// Rotation window containing the given wall-clock time
pub fn rotation_epoch(now_millis: u64) -> i64 {
    (now_millis / ROTATION_PERIOD_MS) as i64
}

/// A seed is either unset (`epoch = 0`, no delta) or a fully resolved pair.
///
/// Fields are private so no partially resolved value can be built; a refresh
/// always replaces the whole value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Seed {
    epoch: i64,
    delta: Option<i64>,
}

impl Seed {
    /// The sentinel value a store starts with
    pub const UNSET: Seed = Seed {
        epoch: 0,
        delta: None,
    };

    pub fn new(epoch: i64, delta: i64) -> Self {
        Seed {
            epoch,
            delta: Some(delta),
        }
    }

    pub fn epoch(&self) -> i64 {
        self.epoch
    }

    pub fn delta(&self) -> Option<i64> {
        self.delta
    }

    pub fn is_set(&self) -> bool {
        self.delta.is_some()
    }

    /// `(epoch, delta)` as consumed by the transform; unset contributes `(0, 0)`
    pub fn components(&self) -> (i64, i64) {
        match self.delta {
            Some(delta) => (self.epoch, delta),
            None => (0, 0),
        }
    }

    /// Whether this seed belongs to the rotation window containing `now_millis`
    pub fn is_fresh_at(&self, now_millis: u64) -> bool {
        self.is_set() && self.epoch == rotation_epoch(now_millis)
    }

    /// Parse a plain `"<int>.<int>"` literal.
    ///
    /// Returns `None` for anything else, including expression text, so the
    /// caller can fall back to evaluating it.
    pub fn parse_literal(raw: &str) -> Option<Seed> {
        let (epoch, delta) = raw.trim().split_once('.')?;
        let epoch = epoch.parse::<i64>().ok()?;
        let delta = delta.parse::<i64>().ok()?;
        Some(Seed::new(epoch, delta))
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delta {
            Some(delta) => write!(f, "{}.{}", self.epoch, delta),
            None => write!(f, "0"),
        }
    }
}

impl FromStr for Seed {
    type Err = TokenError;

    /// Accepts `"0"` for the unset seed and `"<epoch>.<delta>"` otherwise.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim() == "0" {
            return Ok(Seed::UNSET);
        }
        Seed::parse_literal(s).ok_or_else(|| {
            TokenError::ConfigError(format!(
                "Invalid seed '{}': expected <epoch>.<delta>",
                s
            ))
        })
    }
}
