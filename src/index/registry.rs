use crate::error::{CloseFailure, Result, TenantdexError};
use crate::index::engine::IndexEngine;
use crate::index::TantivyEngine;
use crate::types::TenantId;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

/// File-name suffix of a tenant's index directory.
const INDEX_DIR_SUFFIX: &str = "tantivy";

/// One tenant's entry in the registry.
///
/// Users of the handle hold `retired` for reading; closing holds it for
/// writing, so a close waits for in-flight opens and operations and nobody
/// sees a handle that is being closed. A retired slot is already gone from
/// the map by the time its write lock is released.
struct TenantSlot<H> {
    handle: OnceCell<Arc<H>>,
    retired: RwLock<bool>,
}

impl<H> TenantSlot<H> {
    fn new() -> Self {
        TenantSlot {
            handle: OnceCell::new(),
            retired: RwLock::new(false),
        }
    }
}

type Slot<H> = Arc<TenantSlot<H>>;

/// Registry of open per-tenant indexes.
///
/// Each tenant maps to a slot that is filled at most once: the first
/// [`acquire`](IndexRegistry::acquire) opens (or creates) the tenant's index
/// inside the slot's initializer while concurrent callers for the same
/// tenant wait on that slot. The map itself is only locked for the slot
/// lookup, so a slow open for one tenant never blocks another tenant.
///
/// Releasing a tenant closes its index while the slot is still registered
/// and only then removes it. Callers that arrive during the close wait for
/// it and then reopen the index from disk.
///
/// The registry is created once at startup, shared behind `Arc`, and torn
/// down with [`release_all`](IndexRegistry::release_all).
///
/// # Examples
///
/// ```rust,no_run
/// use tenantdex::IndexRegistry;
///
/// # fn main() -> tenantdex::Result<()> {
/// let registry = IndexRegistry::with_tantivy("./indexes");
/// let index = registry.acquire("acme")?;
/// assert!(registry.is_open("acme"));
/// drop(index);
/// registry.release("acme")?.into_result()?;
/// # Ok(())
/// # }
/// ```
pub struct IndexRegistry<E: IndexEngine = TantivyEngine> {
    base_path: PathBuf,
    engine: E,
    slots: DashMap<TenantId, Slot<E::Handle>>,
}

/// Outcome of [`IndexRegistry::release`].
///
/// By the time this exists the tenant is no longer tracked; `closed` says
/// whether the underlying index also shut down cleanly.
#[derive(Debug)]
#[must_use = "the close outcome may carry a storage error"]
pub struct Released {
    pub tenant_id: TenantId,
    pub closed: Result<()>,
}

impl Released {
    pub fn into_result(self) -> Result<()> {
        self.closed
    }
}

impl IndexRegistry<TantivyEngine> {
    /// Registry over the default Tantivy engine.
    pub fn with_tantivy<P: AsRef<Path>>(base_path: P) -> Arc<Self> {
        Self::new(base_path, TantivyEngine::default())
    }
}

impl<E: IndexEngine> IndexRegistry<E> {
    /// Each tenant's index lives in `{base_path}/{encoded tenant}.tantivy`.
    pub fn new<P: AsRef<Path>>(base_path: P, engine: E) -> Arc<Self> {
        Arc::new(IndexRegistry {
            base_path: base_path.as_ref().to_path_buf(),
            engine,
            slots: DashMap::new(),
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Deterministic storage location for a tenant.
    ///
    /// The tenant id is percent-encoded so that separators and other
    /// path-significant characters cannot escape `base_path`.
    pub fn storage_path(&self, tenant_id: &str) -> PathBuf {
        self.base_path.join(format!(
            "{}.{}",
            urlencoding::encode(tenant_id),
            INDEX_DIR_SUFFIX
        ))
    }

    /// Return the tenant's open index, opening or creating it on first use.
    ///
    /// The returned handle is closed if the tenant is released later; use
    /// [`with_index`](IndexRegistry::with_index) to keep a release from
    /// closing it mid-operation.
    pub fn acquire(&self, tenant_id: &str) -> Result<Arc<E::Handle>> {
        self.with_index(tenant_id, |handle| Ok(Arc::clone(handle)))
    }

    /// Run `f` against the tenant's open index, opening or creating it on
    /// first use. A release of the same tenant waits until `f` returns.
    pub fn with_index<R, F>(&self, tenant_id: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Arc<E::Handle>) -> Result<R>,
    {
        if tenant_id.is_empty() {
            return Err(TenantdexError::InvalidArgument(
                "tenant code is required".to_string(),
            ));
        }

        loop {
            let slot = self.slot(tenant_id);
            let retired = slot.retired.read().unwrap_or_else(PoisonError::into_inner);
            if *retired {
                // Released while we waited; the map already holds a fresh slot or none.
                continue;
            }
            let handle = slot
                .handle
                .get_or_try_init(|| self.open_or_create(tenant_id))?;
            return f(handle);
        }
    }

    fn slot(&self, tenant_id: &str) -> Slot<E::Handle> {
        if let Some(slot) = self.slots.get(tenant_id) {
            return Arc::clone(&slot);
        }
        let entry = self
            .slots
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(TenantSlot::new()));
        Arc::clone(&entry)
    }

    fn open_or_create(&self, tenant_id: &str) -> Result<Arc<E::Handle>> {
        let path = self.storage_path(tenant_id);

        let opened = self.engine.open(&path).map_err(|e| {
            tracing::error!(tenant = tenant_id, path = %path.display(), "failed to open index: {}", e);
            e
        })?;
        if let Some(handle) = opened {
            tracing::info!(tenant = tenant_id, path = %path.display(), "opened existing index");
            return Ok(Arc::new(handle));
        }

        let handle = self.engine.create(&path).map_err(|e| {
            tracing::error!(tenant = tenant_id, path = %path.display(), "failed to create index: {}", e);
            e
        })?;
        tracing::info!(tenant = tenant_id, path = %path.display(), "created new index");
        Ok(Arc::new(handle))
    }

    /// Close the tenant's index and stop tracking it.
    ///
    /// Fails with [`TenantdexError::NotFound`] when the tenant has no open
    /// index. A first open still in flight is waited for and then closed.
    /// The entry is removed even if closing fails; the close outcome is
    /// reported in [`Released::closed`].
    pub fn release(&self, tenant_id: &str) -> Result<Released> {
        let not_found = || TenantdexError::NotFound(tenant_id.to_string());
        let slot = self
            .slots
            .get(tenant_id)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or_else(not_found)?;

        let closed = self.retire(tenant_id, &slot).ok_or_else(not_found)?;
        Ok(Released {
            tenant_id: tenant_id.to_string(),
            closed,
        })
    }

    /// Close every open index and empty the registry.
    ///
    /// All tenants are attempted, including those whose first open is in
    /// flight; failures are collected into a single
    /// [`TenantdexError::CloseFailed`] ordered by tenant id.
    pub fn release_all(&self) -> Result<()> {
        let mut tracked: Vec<(TenantId, Slot<E::Handle>)> = self
            .slots
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        tracked.sort_by(|a, b| a.0.cmp(&b.0));

        let mut released = 0usize;
        let mut failures = Vec::new();
        for (tenant_id, slot) in &tracked {
            match self.retire(tenant_id, slot) {
                Some(Ok(())) => released += 1,
                Some(Err(e)) => {
                    released += 1;
                    failures.push(CloseFailure {
                        tenant_id: tenant_id.clone(),
                        message: e.to_string(),
                    });
                }
                None => {}
            }
        }

        tracing::info!(
            released,
            failed = failures.len(),
            "released all tenant indexes"
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TenantdexError::CloseFailed(failures))
        }
    }

    /// Close the slot's index and drop the slot from the map.
    ///
    /// Returns `None` when there was nothing to close: the slot was already
    /// retired, or its open failed. An empty slot is left in place.
    fn retire(&self, tenant_id: &str, slot: &Slot<E::Handle>) -> Option<Result<()>> {
        let mut retired = slot.retired.write().unwrap_or_else(PoisonError::into_inner);
        if *retired {
            return None;
        }
        let handle = slot.handle.get()?;

        *retired = true;
        let closed = self.close_handle(tenant_id, handle);
        self.slots
            .remove_if(tenant_id, |_, current| Arc::ptr_eq(current, slot));
        Some(closed)
    }

    fn close_handle(&self, tenant_id: &str, handle: &E::Handle) -> Result<()> {
        match self.engine.close(handle) {
            Ok(()) => {
                tracing::info!(tenant = tenant_id, "closed index");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(tenant = tenant_id, "failed to close index: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_open(&self, tenant_id: &str) -> bool {
        self.slots
            .get(tenant_id)
            .is_some_and(|slot| slot.handle.get().is_some())
    }

    /// Number of tenants with an open index.
    pub fn open_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|e| e.value().handle.get().is_some())
            .count()
    }

    /// Tenants with an open index, sorted.
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self
            .slots
            .iter()
            .filter(|e| e.value().handle.get().is_some())
            .map(|e| e.key().clone())
            .collect();
        tenants.sort();
        tenants
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn storage_path_is_deterministic_and_contained() {
        let tmp = TempDir::new().unwrap();
        let registry = IndexRegistry::with_tantivy(tmp.path());

        assert_eq!(
            registry.storage_path("acme"),
            tmp.path().join("acme.tantivy")
        );
        assert_eq!(registry.storage_path("acme"), registry.storage_path("acme"));

        for hostile in ["../etc", "a/b", "a\\b", "/abs"] {
            let path = registry.storage_path(hostile);
            assert_eq!(path.parent(), Some(tmp.path()), "{hostile} escaped");
        }
        assert_ne!(registry.storage_path("a/b"), registry.storage_path("a%2Fb"));
    }

    #[test]
    fn acquire_rejects_empty_tenant() {
        let tmp = TempDir::new().unwrap();
        let registry = IndexRegistry::with_tantivy(tmp.path());
        assert!(matches!(
            registry.acquire(""),
            Err(TenantdexError::InvalidArgument(_))
        ));
        assert_eq!(registry.open_count(), 0);
    }

    #[test]
    fn acquire_returns_same_handle_until_released() {
        let tmp = TempDir::new().unwrap();
        let registry = IndexRegistry::with_tantivy(tmp.path());

        let first = registry.acquire("acme").unwrap();
        let second = registry.acquire("acme").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.storage_path("acme").join("meta.json").exists());
        assert_eq!(registry.tenants(), vec!["acme".to_string()]);

        registry.release("acme").unwrap().into_result().unwrap();
        assert!(!registry.is_open("acme"));
        assert!(first.is_closed());

        let third = registry.acquire("acme").unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
    }

    #[test]
    fn release_unknown_tenant_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let registry = IndexRegistry::with_tantivy(tmp.path());
        match registry.release("ghost") {
            Err(TenantdexError::NotFound(t)) => assert_eq!(t, "ghost"),
            other => panic!("expected NotFound, got {:?}", other.map(|r| r.tenant_id)),
        }
    }
}
