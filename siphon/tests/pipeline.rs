//! End-to-end pipeline tests: admission, cache short-circuit, fallback and
//! error surfacing through [`Siphon::handle`].

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use siphon::{Config, ResolveError, Siphon, TargetUrl};
use siphon_backend::MemoryBackend;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    siphon: Siphon,
    // Keeps the endpoint list file alive for the test's duration.
    _endpoints: tempfile::NamedTempFile,
}

fn harness(server: &MockServer, routes: usize, tweak: impl FnOnce(&mut Config)) -> Harness {
    let mut endpoints = tempfile::NamedTempFile::new().unwrap();
    for i in 0..routes {
        writeln!(endpoints, "{}/api{}?url=", server.uri(), i).unwrap();
    }

    let mut config = Config::default();
    config.endpoints_file = endpoints.path().to_path_buf();
    config.proxies_file = "/nonexistent/proxies.txt".into();
    config.engine.request_timeout = Duration::from_secs(2);
    config.evasion.enabled = false;
    tweak(&mut config);

    let siphon = Siphon::new(&config, Arc::new(MemoryBackend::new())).unwrap();
    Harness {
        siphon,
        _endpoints: endpoints,
    }
}

fn target() -> TargetUrl {
    TargetUrl::new("https://v.example.com/play?id=1").unwrap()
}

#[tokio::test]
async fn second_request_within_ttl_is_served_from_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "http://a/ok.m3u8", "quality": "hd"
        })))
        // The whole point: the upstream must be hit exactly once.
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(&server, 1, |_| {});

    let first = harness.siphon.handle(&target(), "10.0.0.1").await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.raw_url, "http://a/ok.m3u8");

    let second = harness.siphon.handle(&target(), "10.0.0.1").await.unwrap();
    assert!(second.cached);
    assert_eq!(second.raw_url, first.raw_url);
    assert_eq!(second.payload, first.payload);
}

#[tokio::test]
async fn expired_ttl_triggers_fresh_resolution() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "http://a/ok.m3u8"
        })))
        .expect(2)
        .mount(&server)
        .await;

    let harness = harness(&server, 1, |config| {
        config.cache.ttl = Duration::ZERO;
    });

    assert!(!harness.siphon.handle(&target(), "10.0.0.1").await.unwrap().cached);
    assert!(!harness.siphon.handle(&target(), "10.0.0.1").await.unwrap().cached);
}

#[tokio::test]
async fn rate_limited_caller_is_rejected_before_any_network_activity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "http://a/ok.m3u8"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = harness(&server, 1, |config| {
        config.cache.enabled = false;
        config.rate_limit.per_minute = 1;
    });

    assert!(harness.siphon.handle(&target(), "10.0.0.9").await.is_ok());
    let error = harness.siphon.handle(&target(), "10.0.0.9").await.unwrap_err();
    assert!(matches!(error, ResolveError::RateLimited(_)));
}

#[tokio::test]
async fn exhaustion_reports_endpoints_tried_and_trace() {
    let server = MockServer::start().await;
    for i in 0..2 {
        Mock::given(method("GET"))
            .and(path(format!("/api{i}")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
    }

    let harness = harness(&server, 2, |config| {
        config.rate_limit.enabled = false;
    });

    match harness.siphon.handle(&target(), "10.0.0.1").await {
        Err(ResolveError::Exhausted { tried, trace }) => {
            assert_eq!(tried, 2);
            assert_eq!(trace.len(), 2);
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_endpoint_list_is_a_config_error() {
    let mut config = Config::default();
    config.endpoints_file = "/nonexistent/endpoints.txt".into();
    config.rate_limit.enabled = false;
    config.cache.enabled = false;

    let siphon = Siphon::new(&config, Arc::new(MemoryBackend::new())).unwrap();
    assert!(matches!(
        siphon.handle(&target(), "10.0.0.1").await,
        Err(ResolveError::Config(_))
    ));
}
