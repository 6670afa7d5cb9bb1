//! # Tenantdex
//!
//! Multi-tenant full-text search built on [Tantivy](https://github.com/quickwit-oss/tantivy).
//! Every tenant gets its own persistent index, opened lazily on first use and
//! kept open until released. Documents are addressed by a composite
//! [`DocumentKey`] and can be searched exactly or with typo tolerance.
//!
//! The HTTP service lives in the companion `tenantdex-http` crate.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use tenantdex::{IndexRegistry, SearchService, ServiceConfig};
//!
//! # fn main() -> tenantdex::Result<()> {
//! let registry = IndexRegistry::with_tantivy("./indexes");
//! let service = SearchService::new(registry.clone(), ServiceConfig::default());
//!
//! let key = service.index_document(
//!     "acme", "p1", "faq", "1",
//!     "Refund Policy", Some("How to request a refund"),
//! )?;
//! assert_eq!(key.as_str(), "acme:p1:faq:1");
//!
//! let results = service.search("acme", "refund")?;
//! assert!(results.contains("acme:p1:faq:1"));
//!
//! let typo = service.fuzzy_search("acme", "refnud", 2u8)?;
//! println!("{} fuzzy hits", typo.total_hits);
//!
//! registry.release_all()?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod index;
pub mod key;
pub mod service;
pub mod types;

pub use error::{CloseFailure, Result, TenantdexError};
pub use index::engine::{EngineConfig, IndexEngine};
pub use index::registry::{IndexRegistry, Released};
pub use index::{Index, TantivyEngine};
pub use key::DocumentKey;
pub use service::{SearchService, ServiceConfig};
pub use types::*;
