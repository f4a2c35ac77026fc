//! In-memory response cache in front of any `RegistryClient`.
//!
//! Entries younger than the max age are served without a request. Once an
//! entry expires it is refreshed; if that refresh fails (other than with a
//! 404) the expired copy is served with `is_stale = true`.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use serde_json::Value;
use tracing::{debug, warn};

use super::client::{Api, Fetched, RegistryClient};
use super::error::FetchError;

/// A cached body and when it was fetched.
#[derive(Clone, Debug)]
struct CachedBody {
    /// Decoded JSON body.
    data: Value,
    /// Fetch time, for expiry.
    fetched_at: Instant,
}

/// LRU-bounded, max-age response cache wrapping another client.
#[derive(Debug)]
pub struct CachedClient<C> {
    /// Client that performs the actual requests.
    inner: C,
    /// Bodies keyed by `api:path`.
    entries: Mutex<LruCache<String, CachedBody>>,
    /// Age after which an entry is refreshed.
    max_age: Duration,
}

impl<C: RegistryClient> CachedClient<C> {
    /// What: Wrap `inner` with a response cache.
    ///
    /// Inputs:
    /// - `inner`: Client performing real requests
    /// - `capacity`: Maximum number of cached bodies (0 is treated as 1)
    /// - `max_age`: Freshness window per entry
    pub fn new(inner: C, capacity: usize, max_age: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            entries: Mutex::new(LruCache::new(capacity)),
            max_age,
        }
    }

    /// The wrapped client.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Lock the cache, recovering from a poisoned mutex.
    fn lock_entries(&self) -> MutexGuard<'_, LruCache<String, CachedBody>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Number of bodies currently cached.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }
}

/// Cache key for a request.
fn cache_key(api: Api, path: &str) -> String {
    format!("{}:{path}", api.label())
}

impl<C: RegistryClient> RegistryClient for CachedClient<C> {
    async fn get_json(&self, api: Api, path: &str) -> Result<Fetched<Value>, FetchError> {
        let key = cache_key(api, path);
        let cached = self
            .lock_entries()
            .get(&key)
            .map(|entry| (entry.data.clone(), entry.fetched_at.elapsed() < self.max_age));

        if let Some((data, true)) = &cached {
            debug!(key = %key, "serving cached response");
            return Ok(Fetched::fresh(data.clone()));
        }

        match self.inner.get_json(api, path).await {
            Ok(fetched) => {
                self.lock_entries().put(
                    key,
                    CachedBody {
                        data: fetched.data.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(fetched)
            }
            Err(err) if err.is_not_found() => {
                self.lock_entries().pop(&key);
                Err(err)
            }
            Err(err) => match cached {
                Some((data, _)) => {
                    warn!(key = %key, error = %err, "refresh failed; serving expired copy");
                    Ok(Fetched {
                        data,
                        is_stale: true,
                    })
                }
                None => Err(err),
            },
        }
    }
}
