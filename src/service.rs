use crate::error::{Result, TenantdexError};
use crate::index::engine::IndexEngine;
use crate::index::registry::IndexRegistry;
use crate::index::TantivyEngine;
use crate::key::DocumentKey;
use crate::types::{Document, Fuzziness, SearchResult};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Upper bound on hits returned per search.
    pub max_hits: usize,
}

impl ServiceConfig {
    pub const DEFAULT_MAX_HITS: usize = 10;
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            max_hits: Self::DEFAULT_MAX_HITS,
        }
    }
}

/// Validated indexing and search over the tenant registry.
///
/// Every operation checks its arguments before touching the registry, so a
/// rejected request never opens or creates an index.
pub struct SearchService<E: IndexEngine = TantivyEngine> {
    registry: Arc<IndexRegistry<E>>,
    config: ServiceConfig,
}

impl<E: IndexEngine> SearchService<E> {
    pub fn new(registry: Arc<IndexRegistry<E>>, config: ServiceConfig) -> Self {
        SearchService { registry, config }
    }

    pub fn registry(&self) -> &Arc<IndexRegistry<E>> {
        &self.registry
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Index (or re-index) one document and return its key.
    pub fn index_document(
        &self,
        tenant: &str,
        project: &str,
        document_type: &str,
        caller_id: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<DocumentKey> {
        let key = DocumentKey::build(tenant, project, document_type, caller_id)?;
        if title.trim().is_empty() {
            return Err(TenantdexError::InvalidArgument(
                "title is required".to_string(),
            ));
        }

        let doc = Document {
            id: key.clone(),
            project_code: project.to_string(),
            document_type: document_type.to_string(),
            tenant_code: tenant.to_string(),
            title: title.to_string(),
            body: body.map(str::to_string),
        };

        self.registry
            .with_index(tenant, |index| self.registry.engine().put(index, &doc))
            .map_err(|e| {
                tracing::error!(tenant, document_id = %key, "indexing failed: {}", e);
                e
            })?;

        tracing::info!(tenant, document_id = %key, "indexed document");
        Ok(key)
    }

    pub fn search(&self, tenant: &str, query: &str) -> Result<SearchResult> {
        validate_query(tenant, query)?;

        let result = self.registry.with_index(tenant, |index| {
            self.registry
                .engine()
                .query(index, query, self.config.max_hits)
        })?;

        tracing::debug!(
            tenant,
            query,
            hits = result.hits.len(),
            total_hits = result.total_hits,
            "search complete"
        );
        Ok(result)
    }

    /// Typo-tolerant search; `fuzziness` is the maximum edit distance (0 to 2).
    pub fn fuzzy_search<F>(&self, tenant: &str, query: &str, fuzziness: F) -> Result<SearchResult>
    where
        F: TryInto<Fuzziness>,
        F::Error: Into<TenantdexError>,
    {
        validate_query(tenant, query)?;
        let fuzziness: Fuzziness = fuzziness.try_into().map_err(Into::into)?;

        let result = self.registry.with_index(tenant, |index| {
            self.registry
                .engine()
                .fuzzy_query(index, query, fuzziness, self.config.max_hits)
        })?;

        tracing::debug!(
            tenant,
            query,
            fuzziness = fuzziness.distance(),
            hits = result.hits.len(),
            total_hits = result.total_hits,
            "fuzzy search complete"
        );
        Ok(result)
    }
}

fn validate_query(tenant: &str, query: &str) -> Result<()> {
    if tenant.is_empty() {
        return Err(TenantdexError::InvalidArgument(
            "tenant code is required".to_string(),
        ));
    }
    if query.trim().is_empty() {
        return Err(TenantdexError::InvalidArgument(
            "search query is required".to_string(),
        ));
    }
    Ok(())
}
