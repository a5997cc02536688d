use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{TenantBackend, TenantRegistry};

/// Default number of concurrently open tenant backends.
pub const DEFAULT_CAPACITY: usize = 10;

struct CacheEntry {
    backend: TenantBackend,
    last_used: u64,
}

/// Outcome of committing an opened backend into the cache.
enum Committed {
    /// The handle is cached (or was already); carries entries evicted to make
    /// room, which the caller must close.
    Cached(Vec<(String, CacheEntry)>),
    /// The in-flight slot was gone and the entry with it: the opened handle
    /// was evicted and closed before this waiter committed.
    Stale,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    /// Single-flight guard: one cell per tenant currently being opened.
    /// Concurrent first-accessors share the cell; exactly one runs the open.
    inflight: HashMap<String, Arc<OnceCell<TenantBackend>>>,
    /// Monotonic recency counter for LRU ordering.
    tick: u64,
}

/// Bounded cache of opened per-tenant storage handles.
///
/// Opens lazily through the [`TenantRegistry`], evicts least-recently-used
/// entries beyond capacity (closing the evicted handle first), and serializes
/// creation per tenant without serializing unrelated tenants behind a lock
/// held across the open.
pub struct TenantCache {
    registry: Arc<dyn TenantRegistry>,
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl TenantCache {
    pub fn new(registry: Arc<dyn TenantRegistry>) -> Self {
        Self::with_capacity(registry, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(registry: Arc<dyn TenantRegistry>, capacity: usize) -> Self {
        Self {
            registry,
            capacity: capacity.max(1),
            inner: Mutex::new(CacheInner::default()),
        }
    }

    /// The backend for a tenant, opening it on first access.
    pub async fn get(&self, tenant_id: &str) -> Result<TenantBackend> {
        loop {
            let cell = {
                let mut inner = self.inner.lock().await;
                inner.tick += 1;
                let tick = inner.tick;
                if let Some(entry) = inner.entries.get_mut(tenant_id) {
                    entry.last_used = tick;
                    return Ok(entry.backend.clone());
                }
                inner
                    .inflight
                    .entry(tenant_id.to_string())
                    .or_default()
                    .clone()
            };

            // The lock is released here; the open itself runs outside it.
            // Losers of the race wait on the cell and receive the winner's
            // handle.
            let opened = cell
                .get_or_try_init(|| self.registry.open(tenant_id))
                .await
                .cloned();

            let backend = match opened {
                Ok(backend) => backend,
                Err(e) => {
                    // Drop the failed cell so the next accessor retries the
                    // open.
                    let mut inner = self.inner.lock().await;
                    inner.inflight.remove(tenant_id);
                    return Err(e);
                }
            };

            match self.commit(tenant_id, backend.clone()).await {
                Committed::Cached(evicted) => {
                    for (id, entry) in evicted {
                        debug!(tenant = %id, "evicting least-recently-used tenant backend");
                        if let Err(e) = entry.backend.backend.close().await {
                            warn!(tenant = %id, error = %e, "failed to close evicted backend");
                        }
                    }
                    return Ok(backend);
                }
                // The winner's entry was evicted (and its handle closed)
                // before this waiter could commit. The handle in hand is
                // dead; start over with a fresh open.
                Committed::Stale => continue,
            }
        }
    }

    /// Insert an opened backend.
    ///
    /// Only the call that still owns the in-flight slot may insert: a waiter
    /// arriving after the winner committed and the entry was already evicted
    /// must not resurrect the closed handle.
    async fn commit(&self, tenant_id: &str, backend: TenantBackend) -> Committed {
        let mut inner = self.inner.lock().await;
        let owns_slot = inner.inflight.remove(tenant_id).is_some();
        inner.tick += 1;
        let tick = inner.tick;

        if let Some(entry) = inner.entries.get_mut(tenant_id) {
            // Another waiter committed first; keep the cached handle.
            entry.last_used = tick;
            return Committed::Cached(Vec::new());
        }
        if !owns_slot {
            return Committed::Stale;
        }

        inner.entries.insert(
            tenant_id.to_string(),
            CacheEntry {
                backend,
                last_used: tick,
            },
        );

        let mut evicted = Vec::new();
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            if let Some(entry) = inner.entries.remove(&oldest) {
                evicted.push((oldest, entry));
            }
        }
        Committed::Cached(evicted)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Close every cached handle. Called once at process shutdown.
    pub async fn shutdown(&self) {
        let entries = {
            let mut inner = self.inner.lock().await;
            inner.inflight.clear();
            std::mem::take(&mut inner.entries)
        };
        for (id, entry) in entries {
            if let Err(e) = entry.backend.backend.close().await {
                warn!(tenant = %id, error = %e, "failed to close backend on shutdown");
            }
        }
    }
}
