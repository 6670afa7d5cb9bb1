use std::sync::Arc;

use tenantdex::{IndexRegistry, Result, SearchService, TenantdexError};

pub mod documents;
pub mod health;
pub mod indexes;
pub mod search;

pub struct AppState {
    pub service: SearchService,
}

impl AppState {
    pub fn new(service: SearchService) -> Arc<Self> {
        Arc::new(AppState { service })
    }

    pub fn registry(&self) -> &Arc<IndexRegistry> {
        self.service.registry()
    }
}

/// Run engine work off the async executor. Tantivy commits, merges and
/// directory locks are all blocking.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| TenantdexError::Storage(format!("spawn_blocking join error: {}", e)))?
}

pub use documents::index_document;
pub use health::health;
pub use indexes::release_index;
pub use search::{fuzzy_search, search};
