//! Time-bounded cache for fetched collections.
//!
//! Each resource moves through `Empty -> Fetching -> Valid -> Stale -> Fetching ...`.
//! Staleness is evaluated lazily when read; there are no timers. At most one
//! fetch per resource is in flight: concurrent readers await the same shared
//! result, and the memo is cleared once that result is in, success or not.
//! A fetch started after an invalidate waits for the invalidated one to
//! settle before it calls the data source.
//!
//! Fetches run on their own task, so a caller that stops awaiting does not
//! cancel the refresh; the cache is still updated when it completes.

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::utils::error::AppError;

/// Source of "now" for staleness checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheState {
    Empty,
    Fetching,
    Valid,
    Stale,
}

/// A fetched collection with the time it was fetched.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: Arc<Vec<T>>,
    pub fetched_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            fetched_at: self.fetched_at,
            ttl: self.ttl,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < self.ttl
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }
}

pub type Loader<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, AppError>> + Send + Sync>;

type FetchOutcome<T> = Result<Arc<Vec<T>>, Arc<AppError>>;

struct InFlight<T> {
    id: u64,
    generation: u64,
    result: Shared<BoxFuture<'static, FetchOutcome<T>>>,
}

struct Inner<T> {
    name: &'static str,
    ttl: Duration,
    loader: Loader<T>,
    clock: Arc<dyn Clock>,
    entry: RwLock<Option<CacheEntry<T>>>,
    last_error: RwLock<Option<Arc<AppError>>>,
    in_flight: Mutex<Option<InFlight<T>>>,
    // Bumped by invalidate; results of fetches started before are not stored.
    generation: AtomicU64,
    next_fetch_id: AtomicU64,
}

/// Cache for one resource type. Cloning shares the same state.
pub struct ResourceCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> ResourceCache<T>
where
    T: Send + Sync + 'static,
{
    pub fn new(name: &'static str, ttl: Duration, loader: Loader<T>) -> Self {
        Self::with_clock(name, ttl, loader, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: &'static str,
        ttl: Duration,
        loader: Loader<T>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                ttl,
                loader,
                clock,
                entry: RwLock::new(None),
                last_error: RwLock::new(None),
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
                next_fetch_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    pub async fn state(&self) -> CacheState {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        if self
            .inner
            .in_flight
            .lock()
            .await
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            return CacheState::Fetching;
        }
        let now = self.inner.clock.now();
        match self.inner.entry.read().await.as_ref() {
            None => CacheState::Empty,
            Some(entry) if entry.is_valid(now) => CacheState::Valid,
            Some(_) => CacheState::Stale,
        }
    }

    /// Stored entry regardless of freshness; never touches the data source.
    pub async fn peek(&self) -> Option<CacheEntry<T>> {
        self.inner.entry.read().await.clone()
    }

    /// Error of the most recent failed fetch, cleared by the next stored
    /// result or by `invalidate`.
    pub async fn last_error(&self) -> Option<Arc<AppError>> {
        self.inner.last_error.read().await.clone()
    }

    async fn fresh_value(&self) -> Option<Arc<Vec<T>>> {
        let now = self.inner.clock.now();
        self.inner
            .entry
            .read()
            .await
            .as_ref()
            .filter(|entry| entry.is_valid(now))
            .map(|entry| entry.value.clone())
    }

    /// Valid data straight from memory; otherwise fetch (or join the fetch in flight).
    pub async fn get(&self) -> Result<Arc<Vec<T>>, AppError> {
        if let Some(value) = self.fresh_value().await {
            debug!(resource = self.inner.name, "cache hit");
            metrics::counter!("pricewise_cache_hits_total", "resource" => self.inner.name)
                .increment(1);
            return Ok(value);
        }
        self.join_or_start(true).await
    }

    /// Like `get`, but when the fetch fails and a value is stored, that value
    /// is returned instead of the error. The failure stays readable through
    /// `last_error`. An empty cache still surfaces the error.
    pub async fn get_or_stale(&self) -> Result<Arc<Vec<T>>, AppError> {
        match self.get().await {
            Ok(value) => Ok(value),
            Err(err) => match self.peek().await {
                Some(entry) => {
                    warn!(resource = self.inner.name, error = %err, "serving stale value");
                    Ok(entry.value)
                }
                None => Err(err),
            },
        }
    }

    /// Stale-while-revalidate: any stored value is returned at once, and a
    /// refresh is started in the background when it is stale. Only an empty
    /// cache makes the caller wait.
    pub async fn get_or_revalidate(&self) -> Result<Arc<Vec<T>>, AppError> {
        let now = self.inner.clock.now();
        let stored = self.inner.entry.read().await.clone();
        match stored {
            Some(entry) if entry.is_valid(now) => Ok(entry.value),
            Some(entry) => {
                let pending = self.pending().await;
                let name = self.inner.name;
                tokio::spawn(async move {
                    if let Err(err) = pending.await {
                        warn!(resource = name, error = %err, "background refresh failed");
                    }
                });
                Ok(entry.value)
            }
            None => self.join_or_start(false).await,
        }
    }

    /// Always goes to the data source, sharing a fetch already in flight.
    pub async fn fetch(&self) -> Result<Arc<Vec<T>>, AppError> {
        self.join_or_start(false).await
    }

    /// Drops the stored value so the next read fetches anew.
    ///
    /// A fetch that started before this call still resolves for its waiters,
    /// but its result is not stored and new readers do not join it.
    pub async fn invalidate(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        *self.inner.entry.write().await = None;
        *self.inner.last_error.write().await = None;
        info!(resource = self.inner.name, "cache invalidated");
    }

    async fn join_or_start(&self, reuse_fresh: bool) -> Result<Arc<Vec<T>>, AppError> {
        if reuse_fresh {
            // A fetch may have landed while this caller was waiting for the lock.
            let slot = self.inner.in_flight.lock().await;
            if slot.is_none() {
                if let Some(value) = self.fresh_value().await {
                    return Ok(value);
                }
            }
        }

        let pending = self.pending().await;
        pending.await.map_err(|source| AppError::Refresh {
            resource: self.inner.name,
            source,
        })
    }

    async fn pending(&self) -> Shared<BoxFuture<'static, FetchOutcome<T>>> {
        let mut slot = self.inner.in_flight.lock().await;
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let superseded = match slot.as_ref() {
            Some(in_flight) if in_flight.generation == generation => {
                debug!(resource = self.inner.name, "joining fetch in flight");
                return in_flight.result.clone();
            }
            Some(in_flight) => Some(in_flight.result.clone()),
            None => None,
        };

        let id = self.inner.next_fetch_id.fetch_add(1, Ordering::SeqCst);
        let inner = self.inner.clone();
        metrics::counter!("pricewise_cache_fetches_total", "resource" => inner.name).increment(1);
        debug!(resource = inner.name, fetch = id, "starting fetch");

        let handle = tokio::spawn(async move {
            if let Some(previous) = superseded {
                debug!(resource = inner.name, fetch = id, "waiting for invalidated fetch to settle");
                let _ = previous.await;
            }

            let outcome = (inner.loader)().await;
            let result = match outcome {
                Ok(items) => {
                    let value = Arc::new(items);
                    // invalidate bumps the generation before taking this lock.
                    let mut entry = inner.entry.write().await;
                    if inner.generation.load(Ordering::SeqCst) == generation {
                        *entry = Some(CacheEntry {
                            value: value.clone(),
                            fetched_at: inner.clock.now(),
                            ttl: inner.ttl,
                        });
                        drop(entry);
                        *inner.last_error.write().await = None;
                        info!(resource = inner.name, items = value.len(), "cache refreshed");
                    } else {
                        debug!(resource = inner.name, fetch = id, "discarding result of invalidated fetch");
                    }
                    Ok(value)
                }
                Err(err) => {
                    warn!(resource = inner.name, error = %err, "fetch failed; keeping cached value");
                    let err = Arc::new(err);
                    if inner.generation.load(Ordering::SeqCst) == generation {
                        *inner.last_error.write().await = Some(err.clone());
                    }
                    Err(err)
                }
            };

            let mut slot = inner.in_flight.lock().await;
            if slot.as_ref().is_some_and(|f| f.id == id) {
                *slot = None;
            }
            result
        });

        let name = self.inner.name;
        let result = async move {
            handle.await.unwrap_or_else(|join_err| {
                Err(Arc::new(AppError::Internal(format!(
                    "{} fetch task failed: {}",
                    name, join_err
                ))))
            })
        }
        .boxed()
        .shared();

        *slot = Some(InFlight {
            id,
            generation,
            result: result.clone(),
        });
        result
    }
}
