use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use crate::error::{GateError, Result};
use crate::storage::Backend;

use super::TenantCache;

/// Routes every service call to the storage backend for its tenant.
///
/// Routing policy, exactly:
///
/// | tenant id | cache configured | result                                   |
/// |-----------|------------------|------------------------------------------|
/// | empty     | -                | default backend                          |
/// | non-empty | yes              | cache-resolved; error if tenant unknown  |
/// | non-empty | no               | error                                    |
///
/// A present tenant id with no cache is always an error. Falling back to the
/// default backend there would let one tenant's request read another tenant's
/// data.
pub struct BackendRouter {
    default_backend: Option<Arc<dyn Backend>>,
    cache: Option<TenantCache>,
}

impl BackendRouter {
    pub fn new(default_backend: Option<Arc<dyn Backend>>) -> Self {
        Self {
            default_backend,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: TenantCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// The backend for a tenant id; empty means the default backend.
    pub async fn backend_for(&self, tenant_id: &str) -> Result<Arc<dyn Backend>> {
        if tenant_id.is_empty() {
            return self.default_backend.clone().ok_or(GateError::NoBackend);
        }
        match &self.cache {
            Some(cache) => Ok(cache.get(tenant_id).await?.backend),
            None => Err(GateError::TenantRoutingUnavailable(tenant_id.to_string())),
        }
    }

    /// The storage path for a tenant's backend.
    ///
    /// Tenant-only: the default backend has no path in this model, so an
    /// empty tenant id is an error here even though [`Self::backend_for`]
    /// accepts it.
    pub async fn path_for(&self, tenant_id: &str) -> Result<PathBuf> {
        if tenant_id.is_empty() {
            return Err(GateError::InvalidArgument("tenant id is required".into()));
        }
        match &self.cache {
            Some(cache) => Ok(cache.get(tenant_id).await?.path),
            None => Err(GateError::TenantRoutingUnavailable(tenant_id.to_string())),
        }
    }

    /// Close all handles: every cached tenant backend, then the default.
    pub async fn shutdown(&self) {
        if let Some(cache) = &self.cache {
            cache.shutdown().await;
        }
        if let Some(backend) = &self.default_backend {
            if let Err(e) = backend.close().await {
                warn!(error = %e, "failed to close default backend on shutdown");
            }
        }
    }
}
