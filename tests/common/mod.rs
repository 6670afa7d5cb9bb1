use std::sync::Arc;
use tempfile::TempDir;
use tenantdex::{IndexRegistry, SearchService, ServiceConfig};
use tenantdex_http::auth::ApiKeyGuard;
use tenantdex_http::handlers::AppState;
use tokio::net::TcpListener;

#[allow(dead_code)]
pub struct TestServer {
    pub addr: String,
    pub registry: Arc<IndexRegistry>,
    pub temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

#[allow(dead_code)]
pub async fn spawn_server() -> TestServer {
    spawn_server_with_key(None).await
}

pub async fn spawn_server_with_key(api_key: Option<&str>) -> TestServer {
    let temp_dir = TempDir::new().unwrap();
    let registry = IndexRegistry::with_tantivy(temp_dir.path());
    let state = AppState::new(SearchService::new(
        Arc::clone(&registry),
        ServiceConfig::default(),
    ));
    let guard = api_key.map(|k| Arc::new(ApiKeyGuard::new(k)));

    let app = tenantdex_http::build_router(state, guard, 1024 * 1024);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    TestServer {
        addr,
        registry,
        temp_dir,
    }
}
