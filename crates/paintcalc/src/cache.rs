//! Result cache keyed by input fingerprint
//!
//! At most one computation runs per fingerprint. The first caller claims the
//! entry and spawns the computation on its own task; later callers wait on
//! the entry's watch channel. Successes are kept for the configured TTL,
//! failures are dropped so the next request retries. Expired results are
//! swept from the map as new fingerprints arrive.
//!
//! Map guards are never held across an await.

use crate::error::{CacheError, EngineError};
use crate::fingerprint::Fingerprint;
use crate::result::CalculationResult;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// External storage behind the in-memory cache
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self, fingerprint: &Fingerprint)
        -> Result<Option<Arc<CalculationResult>>, CacheError>;

    async fn save(
        &self,
        fingerprint: &Fingerprint,
        result: &Arc<CalculationResult>,
    ) -> Result<(), CacheError>;
}

type Shared = Result<Arc<CalculationResult>, EngineError>;

enum Slot {
    Ready {
        result: Arc<CalculationResult>,
        expires_at: Instant,
    },
    Pending {
        claim: u64,
        outcome: watch::Receiver<Option<Shared>>,
    },
}

impl Slot {
    fn is_claim(&self, id: u64) -> bool {
        matches!(self, Slot::Pending { claim, .. } if *claim == id)
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self, Slot::Ready { expires_at, .. } if *expires_at <= now)
    }
}

enum Lookup {
    Hit(Arc<CalculationResult>),
    Wait {
        claim: u64,
        outcome: watch::Receiver<Option<Shared>>,
    },
    Lead {
        claim: u64,
        sender: watch::Sender<Option<Shared>>,
        /// This miss is due to sweep expired results
        sweep: bool,
    },
}

/// Counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Callers that waited on another caller's computation
    pub coalesced: u64,
    pub store_errors: u64,
    /// Entries currently held, pending ones included
    pub entries: usize,
}

pub struct ResultCache {
    entries: DashMap<Fingerprint, Slot>,
    ttl: Duration,
    store: Option<Arc<dyn CacheStore>>,
    next_claim: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    store_errors: AtomicU64,
}

impl ResultCache {
    /// Expired results are swept on every this-many-th miss
    pub const SWEEP_EVERY: u64 = 64;

    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            store: None,
            next_claim: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
        }
    }

    pub fn with_store(ttl: Duration, store: Arc<dyn CacheStore>) -> Self {
        Self {
            store: Some(store),
            ..Self::new(ttl)
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached result for `fingerprint`, or compute it
    ///
    /// `compute` runs on the blocking pool. It keeps running when the
    /// caller goes away, and its result still lands in the cache.
    pub async fn get_or_compute<F>(
        self: &Arc<Self>,
        fingerprint: Fingerprint,
        compute: F,
    ) -> Result<Arc<CalculationResult>, EngineError>
    where
        F: FnOnce() -> Result<CalculationResult, EngineError> + Send + 'static,
    {
        let mut compute = Some(compute);
        loop {
            let (claim, mut outcome) = match self.lookup(fingerprint) {
                Lookup::Hit(result) => return Ok(result),
                Lookup::Wait { claim, outcome } => (claim, outcome),
                Lookup::Lead {
                    claim,
                    sender,
                    sweep,
                } => {
                    if sweep {
                        self.sweep();
                    }
                    let outcome = sender.subscribe();
                    match compute.take() {
                        Some(compute) => self.spawn_leader(fingerprint, claim, sender, compute),
                        None => {
                            // An earlier leader task took the closure and was dropped
                            self.abandon(&fingerprint, claim);
                            return Err(EngineError::Join("computation already consumed".into()));
                        }
                    }
                    (claim, outcome)
                }
            };

            let settled = outcome
                .wait_for(Option::is_some)
                .await
                .map(|shared| Option::clone(&shared));
            match settled {
                Ok(Some(shared)) => return shared,
                Ok(None) => {}
                Err(_) => {
                    // The leader went away without publishing
                    self.abandon(&fingerprint, claim);
                }
            }
        }
    }

    fn lookup(&self, fingerprint: Fingerprint) -> Lookup {
        let now = Instant::now();
        let entry = self.entries.entry(fingerprint);

        if let Entry::Occupied(occupied) = &entry {
            match occupied.get() {
                Slot::Ready { result, expires_at } if *expires_at > now => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Lookup::Hit(Arc::clone(result));
                }
                Slot::Pending { claim, outcome } => {
                    self.coalesced.fetch_add(1, Ordering::Relaxed);
                    return Lookup::Wait {
                        claim: *claim,
                        outcome: outcome.clone(),
                    };
                }
                Slot::Ready { .. } => {}
            }
        }

        let misses = self.misses.fetch_add(1, Ordering::Relaxed) + 1;
        let claim = self.next_claim.fetch_add(1, Ordering::Relaxed);
        let (sender, outcome) = watch::channel(None);
        let slot = Slot::Pending { claim, outcome };
        match entry {
            Entry::Occupied(mut occupied) => {
                occupied.insert(slot);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
            }
        }
        Lookup::Lead {
            claim,
            sender,
            sweep: misses % Self::SWEEP_EVERY == 0,
        }
    }

    fn spawn_leader<F>(
        self: &Arc<Self>,
        fingerprint: Fingerprint,
        claim: u64,
        sender: watch::Sender<Option<Shared>>,
        compute: F,
    ) where
        F: FnOnce() -> Result<CalculationResult, EngineError> + Send + 'static,
    {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut guard = ClaimGuard {
                cache: Arc::clone(&cache),
                fingerprint,
                claim,
                armed: true,
            };

            let (shared, cacheable) = cache.produce(&fingerprint, compute).await;
            sender.send_replace(Some(shared.clone()));

            match &shared {
                Ok(result) if cacheable => {
                    if let Some(mut slot) = cache.entries.get_mut(&fingerprint) {
                        if slot.is_claim(claim) {
                            *slot = Slot::Ready {
                                result: Arc::clone(result),
                                expires_at: Instant::now() + cache.ttl,
                            };
                        }
                    }
                }
                _ => cache.abandon(&fingerprint, claim),
            }
            guard.armed = false;
        });
    }

    /// Load from the store, or compute and save
    ///
    /// The flag is false when the store failed; such results are returned
    /// but not kept.
    async fn produce<F>(&self, fingerprint: &Fingerprint, compute: F) -> (Shared, bool)
    where
        F: FnOnce() -> Result<CalculationResult, EngineError> + Send + 'static,
    {
        let mut cacheable = true;

        if let Some(store) = &self.store {
            match store.load(fingerprint).await {
                Ok(Some(result)) => {
                    tracing::debug!(fingerprint = %fingerprint, "loaded result from store");
                    return (Ok(result), true);
                }
                Ok(None) => {}
                Err(e) => {
                    self.store_failed(fingerprint, &e);
                    cacheable = false;
                }
            }
        }

        let result = match tokio::task::spawn_blocking(compute).await {
            Ok(Ok(result)) => Arc::new(result),
            Ok(Err(e)) => return (Err(e), false),
            Err(e) => return (Err(EngineError::Join(e.to_string())), false),
        };

        if let Some(store) = &self.store {
            if let Err(e) = store.save(fingerprint, &result).await {
                self.store_failed(fingerprint, &e);
                cacheable = false;
            }
        }
        (Ok(result), cacheable)
    }

    fn store_failed(&self, fingerprint: &Fingerprint, error: &CacheError) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(fingerprint = %fingerprint, error = %error, "cache store failed; result will not be cached");
    }

    /// Drop a pending entry if it still belongs to `claim`
    fn abandon(&self, fingerprint: &Fingerprint, claim: u64) {
        self.entries.remove_if(fingerprint, |_, slot| slot.is_claim(claim));
    }

    /// Forget a result; an in-flight computation for it will not be kept
    pub fn invalidate(&self, fingerprint: &Fingerprint) -> bool {
        self.entries.remove(fingerprint).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Remove expired results; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.is_expired(now));
        before.saturating_sub(self.entries.len())
    }

    fn sweep(&self) {
        let removed = self.purge_expired();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.entries.len(), "swept expired results");
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("has_store", &self.store.is_some())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Clears a pending entry when the leader task is dropped before it settles
struct ClaimGuard {
    cache: Arc<ResultCache>,
    fingerprint: Fingerprint,
    claim: u64,
    armed: bool,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if self.armed {
            self.cache.abandon(&self.fingerprint, self.claim);
        }
    }
}
