use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use std::sync::Arc;

use tenantdex::TenantdexError;

use super::{run_blocking, AppState};
use crate::dto::{IndexDocumentRequest, IndexDocumentResponse};

/// Index or re-index a document
#[utoipa::path(
    post,
    path = "/{tenant_code}/{project_code}/{document_type}/documents",
    tag = "documents",
    params(
        ("tenant_code" = String, Path, description = "Tenant identifier"),
        ("project_code" = String, Path, description = "Project within the tenant"),
        ("document_type" = String, Path, description = "Document category")
    ),
    request_body = IndexDocumentRequest,
    responses(
        (status = 200, description = "Document indexed", body = IndexDocumentResponse),
        (status = 400, description = "Missing id/title or malformed JSON", body = crate::dto::ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = crate::dto::ErrorBody),
        (status = 500, description = "Index storage failure", body = crate::dto::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn index_document(
    State(state): State<Arc<AppState>>,
    Path((tenant_code, project_code, document_type)): Path<(String, String, String)>,
    payload: Result<Json<IndexDocumentRequest>, JsonRejection>,
) -> Result<Json<IndexDocumentResponse>, TenantdexError> {
    let Json(req) = payload.map_err(|e| {
        TenantdexError::InvalidArgument(format!("invalid JSON body: {}", e.body_text()))
    })?;

    let tenant = tenant_code.clone();
    let key = run_blocking(move || {
        state.service.index_document(
            &tenant_code,
            &project_code,
            &document_type,
            &req.id,
            &req.title,
            req.body.as_deref(),
        )
    })
    .await?;

    Ok(Json(IndexDocumentResponse {
        status: "indexed".to_string(),
        document_id: key.into_string(),
        tenant,
    }))
}
