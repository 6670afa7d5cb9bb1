use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tenantdex::{IndexRegistry, SearchService, TantivyEngine};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{authenticate, generate_hex_key, ApiKeyGuard};
use crate::config::{load_dotenv, EnvMode, ServerConfig};
use crate::handlers::{fuzzy_search, health, index_document, release_index, search, AppState};
use crate::openapi::ApiDoc;

/// Assemble the application router.
///
/// Tenant routes sit behind bearer auth when `guard` is set; `/health` and
/// the API docs never do.
pub fn build_router(
    state: Arc<AppState>,
    guard: Option<Arc<ApiKeyGuard>>,
    max_body_bytes: usize,
) -> Router {
    let auth_middleware = middleware::from_fn(
        move |mut request: axum::extract::Request, next: middleware::Next| {
            let guard = guard.clone();
            async move {
                if let Some(g) = guard {
                    request.extensions_mut().insert(g);
                }
                authenticate(request, next).await
            }
        },
    );

    let protected = Router::new()
        .route(
            "/:tenant_code/:project_code/:document_type/documents",
            post(index_document),
        )
        .route(
            "/:tenant_code/:project_code/:document_type/search",
            get(search),
        )
        .route(
            "/:tenant_code/:project_code/:document_type/fuzzy_search",
            get(fuzzy_search),
        )
        .route("/:tenant_code/index", delete(release_index))
        .layer(auth_middleware)
        .with_state(state.clone());

    let health_route = Router::new()
        .route("/health", get(health))
        .with_state(state);

    let swagger = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi());

    Router::new()
        .merge(health_route)
        .merge(swagger)
        .merge(protected)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::very_permissive().max_age(std::time::Duration::from_secs(86400)))
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_path = load_dotenv();
    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = config.check_auth() {
        eprintln!("ERROR: {}", e);
        if config.api_key.is_none() {
            eprintln!("Suggested key: {}", generate_hex_key());
        }
        std::process::exit(1);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = &dotenv_path {
        tracing::info!(path = %path.display(), "loaded environment file");
    }

    let guard = match &config.api_key {
        Some(key) => {
            tracing::info!("API key authentication enabled");
            Some(Arc::new(ApiKeyGuard::new(key)))
        }
        None => {
            if config.env_mode == EnvMode::Development {
                tracing::warn!("No TENANTDEX_API_KEY set: all routes unprotected.");
                tracing::warn!("Set TENANTDEX_ENV=production to enforce authentication.");
            }
            None
        }
    };

    let registry = IndexRegistry::new(&config.data_dir, TantivyEngine::new(config.engine_config()));
    let state = AppState::new(SearchService::new(
        Arc::clone(&registry),
        config.service_config(),
    ));
    let app = build_router(state, guard, config.max_body_bytes());

    tracing::info!(
        data_dir = %config.data_dir.display(),
        max_hits = config.max_hits,
        writer_heap_mb = config.writer_heap_mb,
        "Tenantdex configuration loaded"
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    println!("Tenantdex listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(open = registry.open_count(), "shutting down, closing tenant indexes");
    let closed = tokio::task::spawn_blocking(move || registry.release_all()).await?;
    if let Err(e) = closed {
        tracing::error!("{}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
