use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use tenantdex::TenantdexError;

use super::{run_blocking, AppState};
use crate::dto::ReleaseIndexResponse;

/// Close a tenant's open index
///
/// The tenant is forgotten even when closing fails; the failure is then
/// reported as a 500. The next request for the tenant reopens its index.
#[utoipa::path(
    delete,
    path = "/{tenant_code}/index",
    tag = "indexes",
    params(("tenant_code" = String, Path, description = "Tenant identifier")),
    responses(
        (status = 200, description = "Index closed", body = ReleaseIndexResponse),
        (status = 401, description = "Missing or invalid bearer token", body = crate::dto::ErrorBody),
        (status = 404, description = "Tenant has no open index", body = crate::dto::ErrorBody),
        (status = 500, description = "Index was released but did not close cleanly", body = crate::dto::ErrorBody)
    ),
    security(("bearer" = []))
)]
pub async fn release_index(
    State(state): State<Arc<AppState>>,
    Path(tenant_code): Path<String>,
) -> Result<Json<ReleaseIndexResponse>, TenantdexError> {
    let tenant = tenant_code.clone();
    run_blocking(move || state.registry().release(&tenant_code)?.into_result()).await?;

    Ok(Json(ReleaseIndexResponse {
        status: "closed".to_string(),
        tenant,
    }))
}
