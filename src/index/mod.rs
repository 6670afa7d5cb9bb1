pub mod engine;
pub mod registry;
pub mod schema;

use crate::error::{Result, TenantdexError};
use crate::types::{Document, Fuzziness, SearchHit, SearchResult};
use engine::{EngineConfig, IndexEngine};
use schema::{build_schema, resolve_fields, Fields, TEXT_TOKENIZER};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser};
use tantivy::schema::{Field, OwnedValue};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream};
use tantivy::{Index as TantivyIndex, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

/// One tenant's open search index, backed by Tantivy.
///
/// The index keeps a single writer for its whole lifetime, which also holds
/// the directory lock, so a second `Index` over the same path cannot be
/// opened for writing until this one is closed. Every [`Index::put`]
/// commits and reloads the reader, so documents are visible to the next
/// search.
pub struct Index {
    inner: TantivyIndex,
    reader: IndexReader,
    writer: Mutex<Option<IndexWriter>>,
    fields: Fields,
    path: PathBuf,
}

impl Index {
    /// Create a new, empty index at `path`.
    ///
    /// Creates the directory (and parents) if it does not exist.
    pub fn create_in_dir<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;
        let inner = TantivyIndex::create_in_dir(path, build_schema())?;
        Self::from_tantivy(inner, path, config)
    }

    /// Open the index persisted at `path`, or `None` if nothing was ever
    /// committed there.
    pub fn open_in_dir<P: AsRef<Path>>(path: P, config: &EngineConfig) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.join("meta.json").exists() {
            return Ok(None);
        }
        let inner = TantivyIndex::open_in_dir(path)?;
        Self::from_tantivy(inner, path, config).map(Some)
    }

    fn from_tantivy(inner: TantivyIndex, path: &Path, config: &EngineConfig) -> Result<Self> {
        register_tokenizers(&inner);
        let fields = resolve_fields(&inner.schema())?;

        let reader: IndexReader = inner
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        let writer: IndexWriter = inner.writer_with_num_threads(1, config.writer_heap_bytes)?;

        Ok(Index {
            inner,
            reader,
            writer: Mutex::new(Some(writer)),
            fields,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live documents visible to searches.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    pub fn is_closed(&self) -> bool {
        self.lock_writer().map(|w| w.is_none()).unwrap_or(true)
    }

    /// Upsert a document by its key, commit, and refresh the reader.
    pub fn put(&self, doc: &Document) -> Result<()> {
        let mut guard = self.lock_writer()?;
        let writer = guard.as_mut().ok_or_else(|| self.closed_error())?;

        writer.delete_term(Term::from_field_text(self.fields.id, doc.id.as_str()));

        let mut tantivy_doc = TantivyDocument::default();
        tantivy_doc.add_text(self.fields.id, doc.id.as_str());
        tantivy_doc.add_text(self.fields.tenant_code, &doc.tenant_code);
        tantivy_doc.add_text(self.fields.project_code, &doc.project_code);
        tantivy_doc.add_text(self.fields.document_type, &doc.document_type);
        tantivy_doc.add_text(self.fields.title, &doc.title);
        if let Some(body) = &doc.body {
            tantivy_doc.add_text(self.fields.body, body);
        }

        let written = match writer.add_document(tantivy_doc) {
            Ok(_) => writer.commit().map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(rollback_err) = writer.rollback() {
                tracing::warn!(
                    path = %self.path.display(),
                    "rollback after failed write also failed: {}",
                    rollback_err
                );
            }
            return Err(e.into());
        }
        drop(guard);

        self.reader.reload()?;
        Ok(())
    }

    /// Parse `query_text` with the default query syntax over title and body.
    ///
    /// Syntax errors never fail the search: the lenient parser keeps every
    /// clause it understood.
    pub fn search(&self, query_text: &str, limit: usize) -> Result<SearchResult> {
        let started = Instant::now();
        let parser = QueryParser::for_index(&self.inner, self.fields.text_fields().to_vec());
        let (query, errors) = parser.parse_query_lenient(query_text);
        if !errors.is_empty() {
            tracing::debug!(
                query = query_text,
                "ignored {} unparseable query clause(s)",
                errors.len()
            );
        }
        self.collect(&*query, limit, started)
    }

    /// Match each analyzed query term within `fuzziness` edits, in any text field.
    pub fn fuzzy_search(
        &self,
        query_text: &str,
        fuzziness: Fuzziness,
        limit: usize,
    ) -> Result<SearchResult> {
        let started = Instant::now();
        let terms = self.analyze(query_text)?;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for term in &terms {
            for field in self.fields.text_fields() {
                clauses.push((
                    Occur::Should,
                    Box::new(FuzzyTermQuery::new(
                        Term::from_field_text(field, term),
                        fuzziness.distance(),
                        true,
                    )),
                ));
            }
        }

        if clauses.is_empty() {
            return Ok(SearchResult {
                took_ms: started.elapsed().as_millis() as u64,
                ..Default::default()
            });
        }

        let query = BooleanQuery::new(clauses);
        self.collect(&query, limit, started)
    }

    /// Release the writer and its directory lock. Idempotent.
    ///
    /// The handle stays readable; further writes fail.
    pub fn close(&self) -> Result<()> {
        let writer = self.lock_writer()?.take();
        if let Some(writer) = writer {
            writer.wait_merging_threads()?;
        }
        Ok(())
    }

    fn collect(&self, query: &dyn Query, limit: usize, started: Instant) -> Result<SearchResult> {
        let searcher = self.reader.searcher();
        let (total_hits, top_docs) =
            searcher.search(query, &(Count, TopDocs::with_limit(limit.max(1))))?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, address) in top_docs {
            let doc: TantivyDocument = searcher.doc(address)?;
            hits.push(SearchHit {
                id: stored_text(&doc, self.fields.id).unwrap_or_default(),
                score,
                project_code: stored_text(&doc, self.fields.project_code).unwrap_or_default(),
                document_type: stored_text(&doc, self.fields.document_type).unwrap_or_default(),
                title: stored_text(&doc, self.fields.title).unwrap_or_default(),
                body: stored_text(&doc, self.fields.body),
            });
        }

        let max_score = hits.first().map(|h| h.score).unwrap_or(0.0);
        Ok(SearchResult {
            hits,
            total_hits,
            max_score,
            took_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn analyze(&self, text: &str) -> Result<Vec<String>> {
        let mut analyzer = self.inner.tokenizers().get(TEXT_TOKENIZER).ok_or_else(|| {
            TenantdexError::Storage(format!("tokenizer '{}' not registered", TEXT_TOKENIZER))
        })?;
        let mut stream = analyzer.token_stream(text);
        let mut terms = Vec::new();
        while stream.advance() {
            let token = &stream.token().text;
            if !terms.contains(token) {
                terms.push(token.clone());
            }
        }
        Ok(terms)
    }

    fn lock_writer(&self) -> Result<MutexGuard<'_, Option<IndexWriter>>> {
        self.writer
            .lock()
            .map_err(|_| TenantdexError::Storage("index writer lock poisoned".to_string()))
    }

    fn closed_error(&self) -> TenantdexError {
        TenantdexError::Storage(format!("index at {} is closed", self.path.display()))
    }
}

fn register_tokenizers(inner: &TantivyIndex) {
    let simple = TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(RemoveLongFilter::limit(40))
        .filter(LowerCaser)
        .build();
    inner.tokenizers().register(TEXT_TOKENIZER, simple);
}

fn stored_text(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field).and_then(|v| {
        let owned: OwnedValue = v.into();
        match owned {
            OwnedValue::Str(s) => Some(s),
            _ => None,
        }
    })
}

/// The production [`IndexEngine`]: one Tantivy directory per tenant.
#[derive(Debug, Clone, Default)]
pub struct TantivyEngine {
    config: EngineConfig,
}

impl TantivyEngine {
    pub fn new(config: EngineConfig) -> Self {
        TantivyEngine { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl IndexEngine for TantivyEngine {
    type Handle = Index;

    fn open(&self, path: &Path) -> Result<Option<Index>> {
        Index::open_in_dir(path, &self.config)
    }

    fn create(&self, path: &Path) -> Result<Index> {
        Index::create_in_dir(path, &self.config)
    }

    fn put(&self, handle: &Index, doc: &Document) -> Result<()> {
        handle.put(doc)
    }

    fn query(&self, handle: &Index, query: &str, limit: usize) -> Result<SearchResult> {
        handle.search(query, limit)
    }

    fn fuzzy_query(
        &self,
        handle: &Index,
        query: &str,
        fuzziness: Fuzziness,
        limit: usize,
    ) -> Result<SearchResult> {
        handle.fuzzy_search(query, fuzziness, limit)
    }

    fn close(&self, handle: &Index) -> Result<()> {
        handle.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::DocumentKey;
    use tempfile::TempDir;

    fn doc(id: &str, title: &str, body: Option<&str>) -> Document {
        Document {
            id: DocumentKey::build("acme", "p1", "faq", id).unwrap(),
            project_code: "p1".into(),
            document_type: "faq".into(),
            tenant_code: "acme".into(),
            title: title.into(),
            body: body.map(str::to_string),
        }
    }

    #[test]
    fn open_missing_directory_is_none() {
        let tmp = TempDir::new().unwrap();
        let opened = Index::open_in_dir(tmp.path().join("nope"), &EngineConfig::default()).unwrap();
        assert!(opened.is_none());
    }

    #[test]
    fn put_is_visible_and_upserts() {
        let tmp = TempDir::new().unwrap();
        let index = Index::create_in_dir(tmp.path(), &EngineConfig::default()).unwrap();

        index.put(&doc("1", "Refund Policy", Some("How to request a refund"))).unwrap();
        assert_eq!(index.num_docs(), 1);
        assert!(index.search("refund", 10).unwrap().contains("acme:p1:faq:1"));

        index.put(&doc("1", "Shipping Times", None)).unwrap();
        assert_eq!(index.num_docs(), 1);
        assert!(index.search("refund", 10).unwrap().is_empty());
        let hits = index.search("shipping", 10).unwrap();
        assert_eq!(hits.hits.len(), 1);
        assert_eq!(hits.hits[0].title, "Shipping Times");
        assert_eq!(hits.hits[0].body, None);
    }

    #[test]
    fn fuzzy_search_tolerates_typos() {
        let tmp = TempDir::new().unwrap();
        let index = Index::create_in_dir(tmp.path(), &EngineConfig::default()).unwrap();
        index.put(&doc("2", "Widgit quality issue", None)).unwrap();

        assert!(index.search("Widget", 10).unwrap().is_empty());
        let exact_only = index.fuzzy_search("Widget", Fuzziness::try_from(0i64).unwrap(), 10).unwrap();
        assert!(exact_only.is_empty());
        let fuzzy = index.fuzzy_search("Widget", Fuzziness::default(), 10).unwrap();
        assert!(fuzzy.contains("acme:p1:faq:2"));
    }

    #[test]
    fn punctuation_only_fuzzy_query_is_empty() {
        let tmp = TempDir::new().unwrap();
        let index = Index::create_in_dir(tmp.path(), &EngineConfig::default()).unwrap();
        index.put(&doc("1", "anything", None)).unwrap();
        let result = index.fuzzy_search("?!", Fuzziness::default(), 10).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.total_hits, 0);
    }

    #[test]
    fn close_rejects_writes_and_reopen_sees_data() {
        let tmp = TempDir::new().unwrap();
        let config = EngineConfig::default();
        let index = Index::create_in_dir(tmp.path(), &config).unwrap();
        index.put(&doc("1", "persisted title", None)).unwrap();
        index.close().unwrap();
        index.close().unwrap();
        assert!(index.is_closed());

        let err = index.put(&doc("2", "late", None)).unwrap_err();
        assert!(matches!(err, TenantdexError::Storage(_)));
        drop(index);

        let reopened = Index::open_in_dir(tmp.path(), &config).unwrap().unwrap();
        assert!(reopened.search("persisted", 10).unwrap().contains("acme:p1:faq:1"));
    }
}
