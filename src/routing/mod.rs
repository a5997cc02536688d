//! Tenant-to-backend routing: bounded handle cache plus the no-fallback
//! routing policy every service call goes through.

mod cache;
mod router;

pub use cache::{DEFAULT_CAPACITY, TenantCache};
pub use router::BackendRouter;

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::error::{GateError, Result};
    use crate::storage::{Backend, MemoryBackend, TenantBackend, TenantRegistry};

    use super::*;

    /// Registry that opens a fresh MemoryBackend per call, counting opens and
    /// keeping every created handle so tests can observe closes.
    struct CountingRegistry {
        opens: AtomicUsize,
        created: parking_lot::Mutex<Vec<(String, Arc<MemoryBackend>)>>,
        delay_ms: u64,
    }

    impl CountingRegistry {
        fn new() -> Self {
            Self::slow(0)
        }

        fn slow(delay_ms: u64) -> Self {
            Self {
                opens: AtomicUsize::new(0),
                created: parking_lot::Mutex::new(Vec::new()),
                delay_ms,
            }
        }

        fn handle_for(&self, tenant_id: &str) -> Arc<MemoryBackend> {
            self.created
                .lock()
                .iter()
                .find(|(id, _)| id == tenant_id)
                .map(|(_, backend)| Arc::clone(backend))
                .unwrap()
        }
    }

    #[async_trait]
    impl TenantRegistry for CountingRegistry {
        async fn open(&self, tenant_id: &str) -> Result<TenantBackend> {
            if tenant_id.starts_with("missing") {
                return Err(GateError::TenantUnknown(tenant_id.to_string()));
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
            }
            let backend = Arc::new(MemoryBackend::new());
            self.created
                .lock()
                .push((tenant_id.to_string(), Arc::clone(&backend)));
            Ok(TenantBackend {
                backend,
                path: PathBuf::from(format!("/tenants/{tenant_id}")),
            })
        }
    }

    #[tokio::test]
    async fn opens_lazily_and_caches() {
        let registry = Arc::new(CountingRegistry::new());
        let cache = TenantCache::new(Arc::clone(&registry) as Arc<dyn TenantRegistry>);

        assert_eq!(cache.len().await, 0);
        let first = cache.get("acme").await.unwrap();
        let second = cache.get("acme").await.unwrap();
        assert_eq!(registry.opens.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first.backend, &second.backend));
        assert_eq!(first.path, PathBuf::from("/tenants/acme"));
    }

    #[tokio::test]
    async fn concurrent_first_access_opens_once() {
        let registry = Arc::new(CountingRegistry::slow(20));
        let cache = Arc::new(TenantCache::new(
            Arc::clone(&registry) as Arc<dyn TenantRegistry>
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                cache.get("acme").await.unwrap()
            }));
        }
        let mut backends = Vec::new();
        for h in handles {
            backends.push(h.await.unwrap());
        }

        assert_eq!(registry.opens.load(Ordering::SeqCst), 1);
        for b in &backends[1..] {
            assert!(Arc::ptr_eq(&backends[0].backend, &b.backend));
        }
    }

    #[tokio::test]
    async fn evicts_least_recently_used_and_closes_it() {
        let registry = Arc::new(CountingRegistry::new());
        let cache =
            TenantCache::with_capacity(Arc::clone(&registry) as Arc<dyn TenantRegistry>, 2);

        let a = cache.get("a").await.unwrap();
        let _b = cache.get("b").await.unwrap();
        // Touch "a" so "b" becomes least recently used.
        let _ = cache.get("a").await.unwrap();

        let _c = cache.get("c").await.unwrap();
        assert_eq!(cache.len().await, 2);

        // Exactly the least-recently-used entry was evicted and closed.
        assert!(registry.handle_for("b").is_closed());
        assert!(!registry.handle_for("a").is_closed());
        assert!(!registry.handle_for("c").is_closed());

        // "a" survived, so no re-open happens for it.
        let a_again = cache.get("a").await.unwrap();
        assert!(Arc::ptr_eq(&a.backend, &a_again.backend));
        // "b" was evicted; fetching it opens a new handle.
        let opens_before = registry.opens.load(Ordering::SeqCst);
        let _ = cache.get("b").await.unwrap();
        assert_eq!(registry.opens.load(Ordering::SeqCst), opens_before + 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn contended_gets_never_serve_a_closed_handle() {
        // A waiter that loses the single-flight race can find the winner's
        // entry already evicted and closed by the time it commits; it must
        // re-open rather than re-insert the dead handle. Churn a capacity-1
        // cache across three tenants to drive that interleaving, then verify
        // no closed handle is ever served again.
        let registry = Arc::new(CountingRegistry::slow(1));
        let cache = Arc::new(TenantCache::with_capacity(
            Arc::clone(&registry) as Arc<dyn TenantRegistry>,
            1,
        ));

        let mut handles = Vec::new();
        for _ in 0..20 {
            for tenant in ["a", "b", "c"] {
                let cache = Arc::clone(&cache);
                handles.push(tokio::spawn(
                    async move { cache.get(tenant).await.unwrap() },
                ));
            }
        }
        for h in handles {
            h.await.unwrap();
        }

        for tenant in ["a", "b", "c"] {
            let got = cache.get(tenant).await.unwrap();
            let open = registry.created.lock().iter().any(|(id, backend)| {
                id == tenant
                    && Arc::ptr_eq(&got.backend, &(Arc::clone(backend) as Arc<dyn Backend>))
                    && !backend.is_closed()
            });
            assert!(open, "cache served a closed handle for tenant {tenant}");
        }
    }

    #[tokio::test]
    async fn shutdown_closes_every_cached_handle() {
        let registry = Arc::new(CountingRegistry::new());
        let cache = TenantCache::new(Arc::clone(&registry) as Arc<dyn TenantRegistry>);
        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();

        cache.shutdown().await;
        assert_eq!(cache.len().await, 0);
        assert!(registry.handle_for("a").is_closed());
        assert!(registry.handle_for("b").is_closed());
    }

    #[tokio::test]
    async fn failed_open_is_retried_by_next_accessor() {
        struct FlakyRegistry {
            calls: AtomicUsize,
        }

        #[async_trait]
        impl TenantRegistry for FlakyRegistry {
            async fn open(&self, tenant_id: &str) -> Result<TenantBackend> {
                if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Err(GateError::Unavailable("registry warming up".into()));
                }
                Ok(TenantBackend {
                    backend: Arc::new(MemoryBackend::new()),
                    path: PathBuf::from(format!("/tenants/{tenant_id}")),
                })
            }
        }

        let cache = TenantCache::new(Arc::new(FlakyRegistry {
            calls: AtomicUsize::new(0),
        }));
        assert!(cache.get("acme").await.is_err());
        assert!(cache.get("acme").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_tenant_propagates_not_found() {
        let cache = TenantCache::new(Arc::new(CountingRegistry::new()));
        let err = cache.get("missing-tenant").await.unwrap_err();
        assert!(matches!(err, GateError::TenantUnknown(_)));
    }

    #[tokio::test]
    async fn router_routes_empty_tenant_to_default() {
        let default = Arc::new(MemoryBackend::new());
        let router = BackendRouter::new(Some(default.clone() as Arc<dyn Backend>));
        let backend = router.backend_for("").await.unwrap();
        assert!(backend.task_exists("T001").await.is_ok());
    }

    #[tokio::test]
    async fn router_never_falls_back_silently() {
        // Default backend present, tenant id present, no cache: must error.
        let router = BackendRouter::new(Some(
            Arc::new(MemoryBackend::new()) as Arc<dyn Backend>
        ));
        let err = router.backend_for("acme").await.unwrap_err();
        assert!(matches!(err, GateError::TenantRoutingUnavailable(_)));

        // No backend at all for the empty tenant is also an error.
        let bare = BackendRouter::new(None);
        assert!(matches!(
            bare.backend_for("").await.unwrap_err(),
            GateError::NoBackend
        ));
    }

    #[tokio::test]
    async fn router_resolves_tenants_through_cache() {
        let cache = TenantCache::new(Arc::new(CountingRegistry::new()));
        let router = BackendRouter::new(None).with_cache(cache);

        assert!(router.backend_for("acme").await.is_ok());
        assert_eq!(
            router.path_for("acme").await.unwrap(),
            PathBuf::from("/tenants/acme")
        );
        assert!(matches!(
            router.backend_for("missing-one").await.unwrap_err(),
            GateError::TenantUnknown(_)
        ));
    }
}
