//! Process-wide key set cache.
//!
//! The current set lives behind an `ArcSwapOption`: lookups load a
//! snapshot without locking and a refresh replaces the whole set in one
//! store, so a reader sees either the old set or the new one.
//!
//! Fetches are serialized by `refresh_lock`:
//! - with a usable (stale) set in hand, a lookup only refreshes if it gets
//!   the lock immediately; otherwise it serves the set it has.
//! - without one, a lookup waits, and if another task attempted a fetch
//!   meanwhile it takes that outcome instead of fetching again.
//! - `min_refresh_interval` is measured from the last attempt, failed or not.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use jsonwebtoken::jwk::Jwk;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{JwksDocument, JwksError, JwksFetcher, RefreshPolicy};

/// One immutable generation of the issuer's keys, in document order.
#[derive(Debug)]
pub struct KeySet {
    keys: Vec<Arc<Jwk>>,
    index: HashMap<String, usize>,
    fetched_at: Instant,
}

impl KeySet {
    pub fn from_document(doc: JwksDocument) -> Self {
        let mut keys = Vec::with_capacity(doc.keys.len());
        let mut index = HashMap::with_capacity(doc.keys.len());

        for raw in doc.keys {
            let jwk: Jwk = match serde_json::from_value(raw) {
                Ok(jwk) => jwk,
                Err(e) => {
                    warn!(error = %e, "skipping unparsable jwk");
                    continue;
                }
            };

            let Some(kid) = jwk.common.key_id.clone().filter(|k| !k.is_empty()) else {
                warn!("skipping jwk without kid");
                continue;
            };

            if index.contains_key(&kid) {
                warn!(kid = %kid, "duplicate kid in jwks, keeping the first");
                continue;
            }

            index.insert(kid, keys.len());
            keys.push(Arc::new(jwk));
        }

        Self {
            keys,
            index,
            fetched_at: Instant::now(),
        }
    }

    /// Exact `kid` match. There is no fallback to another key.
    pub fn get(&self, kid: &str) -> Option<Arc<Jwk>> {
        self.index.get(kid).map(|&i| Arc::clone(&self.keys[i]))
    }

    pub fn kids(&self) -> impl Iterator<Item = &str> {
        self.keys
            .iter()
            .filter_map(|jwk| jwk.common.key_id.as_deref())
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn fetched_at(&self) -> Instant {
        self.fetched_at
    }
}

pub struct JwksCache {
    fetcher: Arc<dyn JwksFetcher>,
    policy: RefreshPolicy,
    current: ArcSwapOption<KeySet>,
    refresh_lock: tokio::sync::Mutex<()>,
    // completed fetch attempts and when the last one finished
    attempts: AtomicU64,
    last_attempt: ArcSwapOption<Instant>,
}

impl std::fmt::Debug for JwksCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwksCache")
            .field("policy", &self.policy)
            .field("keys", &self.current.load_full().map(|s| s.len()))
            .finish()
    }
}

impl JwksCache {
    pub fn new(fetcher: Arc<dyn JwksFetcher>, policy: RefreshPolicy) -> Self {
        Self {
            fetcher,
            policy,
            current: ArcSwapOption::empty(),
            refresh_lock: tokio::sync::Mutex::new(()),
            attempts: AtomicU64::new(0),
            last_attempt: ArcSwapOption::empty(),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// The key set currently served, if one was fetched.
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current.load_full()
    }

    /// Drop the cached set; the next lookup fetches.
    pub fn invalidate(&self) {
        self.current.store(None);
    }

    /// Resolve the key for `kid`.
    ///
    /// Fetches on first use (and when `max_age` elapsed). On a miss the set
    /// is refetched at most once, subject to `min_refresh_interval`.
    pub async fn key_for(&self, kid: &str) -> Result<Arc<Jwk>, JwksError> {
        let set = self.current_set().await?;

        if let Some(jwk) = set.get(kid) {
            return Ok(jwk);
        }

        if !self.policy.refresh_on_miss {
            return Err(JwksError::KeyNotFound(kid.to_string()));
        }

        if self.attempted_recently() {
            debug!(kid = %kid, "unknown kid, last fetch too recent to refetch");
            return Err(JwksError::KeyNotFound(kid.to_string()));
        }

        debug!(kid = %kid, "unknown kid, refetching key set");
        let set = match self.refresh_after(Some(&set)).await {
            Ok(set) => set,
            Err(e) => {
                // The previous set stays in place; the token's key is still unknown.
                warn!(error = %e, kid = %kid, "jwks refetch on unknown kid failed");
                return Err(JwksError::KeyNotFound(kid.to_string()));
            }
        };

        set.get(kid)
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    /// Fetch unconditionally and swap the result in.
    pub async fn refresh(&self) -> Result<Arc<KeySet>, JwksError> {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    async fn current_set(&self) -> Result<Arc<KeySet>, JwksError> {
        let Some(set) = self.current.load_full() else {
            return self.refresh_after(None).await;
        };

        match self.policy.max_age {
            Some(max_age) if set.fetched_at.elapsed() >= max_age => {
                Ok(self.refresh_stale(set).await)
            }
            _ => Ok(set),
        }
    }

    // Never waits on another task; answers with `set` when it cannot refresh.
    async fn refresh_stale(&self, set: Arc<KeySet>) -> Arc<KeySet> {
        if self.attempted_recently() {
            return set;
        }

        let Ok(_guard) = self.refresh_lock.try_lock() else {
            debug!("jwks refresh already in progress, serving previous key set");
            return set;
        };

        if let Some(latest) = self.current.load_full() {
            if !Arc::ptr_eq(&latest, &set) {
                return latest;
            }
        }

        match self.fetch_and_store().await {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "jwks refresh failed, serving previous key set");
                set
            }
        }
    }

    // `seen` is the set the caller found lacking. If another task replaced it
    // while we waited for the lock, that newer set is used as is; if another
    // task's attempt failed meanwhile, its failure is ours too.
    async fn refresh_after(&self, seen: Option<&Arc<KeySet>>) -> Result<Arc<KeySet>, JwksError> {
        let attempts_before = self.attempts.load(Ordering::Acquire);
        let _guard = self.refresh_lock.lock().await;

        if let Some(latest) = self.current.load_full() {
            let replaced = match seen {
                Some(seen) => !Arc::ptr_eq(&latest, seen),
                None => true,
            };
            if replaced {
                return Ok(latest);
            }
        }

        if self.attempts.load(Ordering::Acquire) != attempts_before {
            return Err(JwksError::Unreachable(
                "concurrent key set fetch failed".to_string(),
            ));
        }

        self.fetch_and_store().await
    }

    fn attempted_recently(&self) -> bool {
        self.last_attempt
            .load_full()
            .is_some_and(|at| at.elapsed() < self.policy.min_refresh_interval)
    }

    async fn fetch_and_store(&self) -> Result<Arc<KeySet>, JwksError> {
        let fetched = self.fetcher.fetch_jwks().await;
        let result = fetched.and_then(|doc| {
            let set = KeySet::from_document(doc);
            if set.is_empty() {
                // a document without one usable key must not replace a good set
                return Err(JwksError::Unreachable("no usable signing keys".to_string()));
            }
            Ok(Arc::new(set))
        });

        if let Ok(set) = &result {
            info!(keys = set.len(), "jwks key set refreshed");
            self.current.store(Some(Arc::clone(set)));
        }

        self.last_attempt.store(Some(Arc::new(Instant::now())));
        self.attempts.fetch_add(1, Ordering::AcqRel);

        result
    }
}
