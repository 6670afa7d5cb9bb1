use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tenantdex API",
        version = "0.1.0",
        description = "Multi-tenant full-text search. Each tenant owns an isolated index; documents are addressed by tenant, project, type and id.",
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::documents::index_document,
        crate::handlers::search::search,
        crate::handlers::search::fuzzy_search,
        crate::handlers::indexes::release_index,
    ),
    components(
        schemas(
            crate::dto::IndexDocumentRequest,
            crate::dto::IndexDocumentResponse,
            crate::dto::SearchResponse,
            crate::dto::ReleaseIndexResponse,
            crate::dto::HealthResponse,
            crate::dto::ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "documents", description = "Document indexing"),
        (name = "search", description = "Exact and fuzzy search"),
        (name = "indexes", description = "Tenant index lifecycle"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for expected in [
            "/health",
            "/{tenant_code}/{project_code}/{document_type}/documents",
            "/{tenant_code}/{project_code}/{document_type}/search",
            "/{tenant_code}/{project_code}/{document_type}/fuzzy_search",
            "/{tenant_code}/index",
        ] {
            assert!(
                paths.iter().any(|p| p.as_str() == expected),
                "missing {expected} in {paths:?}"
            );
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
