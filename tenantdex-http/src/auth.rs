use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

const BEARER_PREFIX: &str = "Bearer ";

/// The process-wide API key, kept only as a SHA-256 digest.
///
/// Presented tokens are hashed before comparison so that the comparison
/// always runs over 32 bytes regardless of what the client sent.
#[derive(Clone)]
pub struct ApiKeyGuard {
    digest: [u8; 32],
}

impl std::fmt::Debug for ApiKeyGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGuard").finish_non_exhaustive()
    }
}

impl ApiKeyGuard {
    pub fn new(api_key: &str) -> Self {
        ApiKeyGuard {
            digest: Sha256::digest(api_key.as_bytes()).into(),
        }
    }

    pub fn verify(&self, presented: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(presented.as_bytes()).into();
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Token from an `Authorization: Bearer <token>` header, if present.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
}

/// Random 32-character hex key, suggested when production starts without one.
pub fn generate_hex_key() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": "unauthorized" })),
    )
        .into_response()
}

/// Rejects requests without a matching bearer token.
///
/// The guard is looked up in request extensions; when none is installed
/// (development without a key) every request passes.
pub async fn authenticate(request: Request, next: Next) -> Result<Response, Response> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let Some(guard) = request.extensions().get::<Arc<ApiKeyGuard>>() else {
        return Ok(next.run(request).await);
    };

    let authorized = extract_bearer(request.headers()).is_some_and(|token| guard.verify(token));
    if !authorized {
        tracing::debug!(path = %request.uri().path(), "rejected unauthenticated request");
        return Err(unauthorized());
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn verify_matches_only_exact_key() {
        let guard = ApiKeyGuard::new("s3cret-key");
        assert!(guard.verify("s3cret-key"));
        assert!(!guard.verify("s3cret-key "));
        assert!(!guard.verify("S3CRET-KEY"));
        assert!(!guard.verify(""));
    }

    #[test]
    fn extract_bearer_requires_prefix() {
        assert_eq!(extract_bearer(&headers("Bearer abc")), Some("abc"));
        assert_eq!(extract_bearer(&headers("Bearer ")), Some(""));
        assert_eq!(extract_bearer(&headers("bearer abc")), None);
        assert_eq!(extract_bearer(&headers("Basic abc")), None);
        assert_eq!(extract_bearer(&headers("abc")), None);
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
    }

    #[test]
    fn generated_keys_are_hex() {
        let key = generate_hex_key();
        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_hex_key());
    }

    #[test]
    fn debug_does_not_leak_digest() {
        let rendered = format!("{:?}", ApiKeyGuard::new("topsecret"));
        assert_eq!(rendered, "ApiKeyGuard { .. }");
    }
}
