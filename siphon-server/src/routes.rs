//! Router and request handlers.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use serde_json::Value;
use siphon_core::TargetUrl;
use tower_http::services::ServeDir;

use crate::AppState;
use crate::envelope;

pub(crate) fn router(state: Arc<AppState>) -> Router {
    // Only the artifacts subdirectory is exposed; the durable state store
    // lives under `<cache.dir>/state` and must never be reachable over HTTP.
    let artifacts = ServeDir::new(state.config.cache.dir.join("artifacts"));
    Router::new()
        .route("/", get(resolve))
        .route("/resolve", get(resolve))
        .route("/health", get(health))
        .nest_service("/cache", artifacts)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// The single inbound resolution operation: admission check, cache lookup,
/// engine run, envelope formatting. All outcome shaping lives in
/// [`envelope`]; this handler only parses the request.
async fn resolve(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> (StatusCode, Json<Value>) {
    // Reject before touching the limiter, the cache or the network.
    let Some(target) = params.get("url").and_then(|raw| TargetUrl::new(raw.as_str())) else {
        return envelope::bad_request();
    };
    let identity = caller_identity(&headers, peer);

    tracing::debug!(target_url = %target, %identity, "resolution request");
    match state.siphon.handle(&target, &identity).await {
        Ok(outcome) => envelope::success(&state.config, &target, outcome),
        Err(error) => envelope::failure(&state.config, error),
    }
}

/// Rate-limiter identity: the first `X-Forwarded-For` hop when present
/// (the service usually sits behind a reverse proxy), otherwise the peer
/// address.
fn caller_identity(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use siphon::{Config, Siphon};
    use siphon_backend::MemoryBackend;
    use tower::ServiceExt;

    /// Router over a config whose endpoint list does not exist: any request
    /// that reaches the engine fails loudly, proving short-circuit paths
    /// never get that far.
    fn test_router(tweak: impl FnOnce(&mut Config)) -> Router {
        let mut config = Config::default();
        config.endpoints_file = "/nonexistent/endpoints.txt".into();
        config.proxies_file = "/nonexistent/proxies.txt".into();
        config.cache.dir = std::env::temp_dir().join("siphon-router-tests");
        tweak(&mut config);
        let siphon = Siphon::new(&config, Arc::new(MemoryBackend::new())).unwrap();
        router(Arc::new(AppState { config, siphon }))
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4040))))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_url_parameter_yields_400() {
        let router = test_router(|_| {});
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn empty_url_parameter_yields_400() {
        let router = test_router(|_| {});
        let response = router
            .oneshot(Request::get("/resolve?url=").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn throttled_caller_receives_429_envelope() {
        let router = test_router(|config| {
            config.rate_limit.per_minute = 0;
        });
        let response = router
            .oneshot(
                Request::get("/?url=https%3A%2F%2Fv.example.com%2F1")
                    .header("x-forwarded-for", "203.0.113.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        let body = body_json(response).await;
        assert_eq!(body["code"], 429);
        assert!(body["msg"].as_str().unwrap().starts_with("too many requests"));
    }

    #[tokio::test]
    async fn unreadable_endpoint_list_yields_500() {
        let router = test_router(|config| {
            config.rate_limit.enabled = false;
            config.cache.enabled = false;
        });
        let response = router
            .oneshot(
                Request::get("/?url=https%3A%2F%2Fv.example.com%2F1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["code"], 500);
    }

    #[tokio::test]
    async fn state_files_are_not_served_under_cache() {
        let dir = tempfile::tempdir().unwrap();
        let state_dir = dir.path().join("state");
        std::fs::create_dir_all(&state_dir).unwrap();
        std::fs::write(state_dir.join("rate-abc"), b"{}").unwrap();
        let artifacts = dir.path().join("artifacts");
        std::fs::create_dir_all(&artifacts).unwrap();
        std::fs::write(artifacts.join("deadbeef.m3u8"), b"#EXTM3U").unwrap();

        let router = test_router(|config| {
            config.cache.dir = dir.path().to_path_buf();
        });

        let served = router
            .clone()
            .oneshot(
                Request::get("/cache/deadbeef.m3u8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(served.status(), StatusCode::OK);

        // Rate state and cache entries next to the artifacts stay private.
        let hidden = router
            .oneshot(
                Request::get("/cache/state/rate-abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_is_always_fresh() {
        let router = test_router(|_| {});
        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
