use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use tenantdex::{Fuzziness, TenantdexError};

use super::{run_blocking, AppState};
use crate::dto::{SearchParams, SearchResponse};

/// Search a tenant's documents
///
/// Without `fuzziness` this is a plain query; with it the request is handled
/// as a fuzzy search. The project and type segments are part of the route
/// only: results span the whole tenant.
#[utoipa::path(
    get,
    path = "/{tenant_code}/{project_code}/{document_type}/search",
    tag = "search",
    params(
        ("tenant_code" = String, Path, description = "Tenant identifier"),
        ("project_code" = String, Path, description = "Project within the tenant"),
        ("document_type" = String, Path, description = "Document category"),
        SearchParams
    ),
    responses(
        (status = 200, description = "Ranked hits", body = SearchResponse),
        (status = 400, description = "Empty query or bad fuzziness", body = crate::dto::ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = crate::dto::ErrorBody),
        (status = 500, description = "Index storage failure", body = crate::dto::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Path((tenant_code, _project_code, _document_type)): Path<(String, String, String)>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, TenantdexError> {
    let fuzziness = params
        .fuzziness
        .as_deref()
        .map(str::parse::<Fuzziness>)
        .transpose()?;
    run_search(state, tenant_code, params.q, fuzziness).await
}

/// Typo-tolerant search; `fuzziness` defaults to 1
#[utoipa::path(
    get,
    path = "/{tenant_code}/{project_code}/{document_type}/fuzzy_search",
    tag = "search",
    params(
        ("tenant_code" = String, Path, description = "Tenant identifier"),
        ("project_code" = String, Path, description = "Project within the tenant"),
        ("document_type" = String, Path, description = "Document category"),
        SearchParams
    ),
    responses(
        (status = 200, description = "Ranked hits", body = SearchResponse),
        (status = 400, description = "Empty query or bad fuzziness", body = crate::dto::ErrorBody),
        (status = 401, description = "Missing or invalid bearer token", body = crate::dto::ErrorBody),
        (status = 500, description = "Index storage failure", body = crate::dto::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn fuzzy_search(
    State(state): State<Arc<AppState>>,
    Path((tenant_code, _project_code, _document_type)): Path<(String, String, String)>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, TenantdexError> {
    let fuzziness = match params.fuzziness.as_deref() {
        Some(raw) => raw.parse::<Fuzziness>()?,
        None => Fuzziness::default(),
    };
    run_search(state, tenant_code, params.q, Some(fuzziness)).await
}

async fn run_search(
    state: Arc<AppState>,
    tenant: String,
    query: String,
    fuzziness: Option<Fuzziness>,
) -> Result<Json<SearchResponse>, TenantdexError> {
    let (t, q) = (tenant.clone(), query.clone());
    let results = run_blocking(move || match fuzziness {
        Some(f) => state.service.fuzzy_search(&t, &q, f),
        None => state.service.search(&t, &q),
    })
    .await?;

    Ok(Json(SearchResponse {
        results,
        query,
        tenant,
        fuzziness: fuzziness.map(Fuzziness::distance),
    }))
}
