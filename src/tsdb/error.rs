//! Counter store errors

use thiserror::Error;

/// Error returned by a counter store call
///
/// Everything except `Unavailable` is a caller contract violation: callers are
/// expected to validate model names and keys before reaching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unknown tsdb model: {0}")]
    UnknownModel(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid range: since {since} is after until {until}")]
    InvalidRange { since: i64, until: i64 },

    #[error("range would return {points} points per key, above the limit of {max}")]
    RangeTooLarge { points: u64, max: u64 },

    #[error("key set must not be empty")]
    EmptyKeySet,

    #[error("tenant ids must include an organization id")]
    MissingTenant,

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Transient failures that a caller may retry (mind double increments)
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}
