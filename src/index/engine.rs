use std::path::Path;

use crate::error::Result;
use crate::types::{Document, Fuzziness, SearchResult};

/// The contract between the tenant registry and an inverted-index backend.
///
/// A backend owns its document mapping, tokenization, scoring and on-disk
/// format. Every failure it reports is a [`crate::TenantdexError::Storage`].
/// Handles are shared behind `Arc` by the registry, so all operations take
/// `&Self::Handle` and the backend is responsible for serializing writes.
pub trait IndexEngine: Send + Sync + 'static {
    type Handle: Send + Sync + 'static;

    /// Open the index persisted at `path`, or `Ok(None)` if there is none.
    fn open(&self, path: &Path) -> Result<Option<Self::Handle>>;

    /// Create a new, empty index at `path` using the engine's mapping.
    fn create(&self, path: &Path) -> Result<Self::Handle>;

    /// Insert `doc` under `doc.id`, replacing any document with the same key.
    /// The document is searchable once this returns.
    fn put(&self, handle: &Self::Handle, doc: &Document) -> Result<()>;

    fn query(&self, handle: &Self::Handle, query: &str, limit: usize) -> Result<SearchResult>;

    fn fuzzy_query(
        &self,
        handle: &Self::Handle,
        query: &str,
        fuzziness: Fuzziness,
        limit: usize,
    ) -> Result<SearchResult>;

    fn close(&self, handle: &Self::Handle) -> Result<()>;
}

/// Tuning knobs for [`super::TantivyEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Indexing heap per tenant writer, in bytes. Tantivy requires at least 15 MB.
    pub writer_heap_bytes: usize,
}

impl EngineConfig {
    pub const DEFAULT_WRITER_HEAP_BYTES: usize = 20_000_000;
    pub const MIN_WRITER_HEAP_BYTES: usize = 15_000_000;
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            writer_heap_bytes: Self::DEFAULT_WRITER_HEAP_BYTES,
        }
    }
}
