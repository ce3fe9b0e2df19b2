//! Issuer signing keys (JWKS): retrieval and the shared key set cache.
pub mod cache;
pub mod fetcher;

use std::time::Duration;

use thiserror::Error;

pub use cache::{JwksCache, KeySet};
pub use fetcher::{HttpJwksFetcher, JwksDocument, JwksFetcher};

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("jwks unreachable: {0}")]
    Unreachable(String),
    #[error("no signing key with kid {0:?}")]
    KeyNotFound(String),
}

/// When the cached key set is fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    // Refetch once when a token names an unknown `kid` (key rotation).
    pub refresh_on_miss: bool,
    // Miss-driven refetches are skipped while the set is younger than this.
    pub min_refresh_interval: Duration,
    // Refetch before lookup once the set is older than this. `None`: never expires.
    pub max_age: Option<Duration>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            refresh_on_miss: true,
            min_refresh_interval: Duration::from_secs(30),
            max_age: None,
        }
    }
}
