use serde::{Deserialize, Serialize};
use tenantdex::SearchResult;
use utoipa::{IntoParams, ToSchema};

/// Body of `POST /{tenant}/{project}/{type}/documents`.
///
/// Missing fields deserialize as empty and are rejected by validation, so the
/// client sees which field is required rather than a serde error.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IndexDocumentRequest {
    /// Caller-chosen id, unique within tenant/project/type.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IndexDocumentResponse {
    pub status: String,
    /// Composite key `{tenant}:{project}:{type}:{id}`.
    pub document_id: String,
    pub tenant: String,
}

/// Query string for the search routes. `fuzziness` is kept as text so that
/// non-numeric values surface as a validation error.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Query text.
    #[serde(default)]
    pub q: String,
    /// Maximum edit distance, 0 to 2.
    #[serde(default)]
    pub fuzziness: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResponse {
    #[schema(value_type = Object)]
    pub results: SearchResult,
    pub query: String,
    pub tenant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReleaseIndexResponse {
    pub status: String,
    pub tenant: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub open_indexes: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}
