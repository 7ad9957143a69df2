//! Router-level tests driving the full middleware stack with stub probes.
//!
//! Run with: cargo test --test routes

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;

use vigil::config::AppConfig;
use vigil::health::{CacheRoundTrip, DependencyUnreachable, Probe};
use vigil::{create_router, AppState};

/// Probe with a fixed outcome that counts its calls
struct StubProbe {
    name: &'static str,
    outcome: Result<(), &'static str>,
    calls: AtomicUsize,
}

impl StubProbe {
    fn up(name: &'static str) -> Arc<Self> {
        Self::with(name, Ok(()))
    }

    fn down(name: &'static str, detail: &'static str) -> Arc<Self> {
        Self::with(name, Err(detail))
    }

    fn with(name: &'static str, outcome: Result<(), &'static str>) -> Arc<Self> {
        Arc::new(Self {
            name,
            outcome,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Probe for StubProbe {
    fn name(&self) -> &str {
        self.name
    }

    async fn check(&self) -> Result<(), DependencyUnreachable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.map_err(DependencyUnreachable::new)
    }
}

/// In-memory cache stand-in
struct StubCache {
    ping: Result<(), &'static str>,
    round_trip: Result<&'static str, &'static str>,
    hang: bool,
}

impl StubCache {
    fn up() -> Arc<Self> {
        Arc::new(Self {
            ping: Ok(()),
            round_trip: Ok("ok"),
            hang: false,
        })
    }

    fn down(detail: &'static str) -> Arc<Self> {
        Arc::new(Self {
            ping: Err(detail),
            round_trip: Err(detail),
            hang: false,
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            ping: Ok(()),
            round_trip: Ok("ok"),
            hang: true,
        })
    }
}

#[async_trait]
impl Probe for StubCache {
    fn name(&self) -> &str {
        "cache"
    }

    async fn check(&self) -> Result<(), DependencyUnreachable> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.ping.map_err(DependencyUnreachable::new)
    }
}

#[async_trait]
impl CacheRoundTrip for StubCache {
    async fn round_trip(&self) -> Result<String, DependencyUnreachable> {
        if self.hang {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        self.round_trip
            .map(str::to_string)
            .map_err(DependencyUnreachable::new)
    }
}

fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.host = "db".to_string();
    config.database.user = "postgres".to_string();
    config.database.dbname = "postgres".to_string();
    config.cache.host = "cache".to_string();
    config.probe.timeout_ms = 100;
    config
}

fn state(database: Arc<StubProbe>, cache: Arc<StubCache>) -> AppState {
    AppState::new(test_config(), database, cache)
}

async fn get(state: AppState, uri: &str) -> Response {
    create_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn liveness_does_not_probe() {
    let database = StubProbe::down("database", "connection refused");
    let response = get(state(database.clone(), StubCache::down("refused")), "/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("running"));
    assert_eq!(database.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_all_reachable() {
    let response = get(state(StubProbe::up("database"), StubCache::up()), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"], "healthy");
    assert_eq!(body["services"]["cache"], "healthy");
    assert_eq!(body["issues"], Value::Array(vec![]));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn health_database_down() {
    let response = get(
        state(
            StubProbe::down("database", "connection refused"),
            StubCache::up(),
        ),
        "/health",
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    let issues = body["issues"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["service"], "database");
    assert_eq!(issues[0]["error"], "connection refused");
    assert_eq!(body["services"]["cache"], "healthy");
}

#[tokio::test]
async fn health_both_down() {
    let response = get(
        state(
            StubProbe::down("database", "connection refused"),
            StubCache::down("connection refused"),
        ),
        "/health",
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["issues"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn health_results_follow_registration_order() {
    let response = get(state(StubProbe::up("database"), StubCache::up()), "/health").await;
    let body = body_json(response).await;
    let names: Vec<&str> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["database", "cache"]);
}

#[tokio::test]
async fn health_slow_cache_times_out() {
    let response = get(state(StubProbe::up("database"), StubCache::hanging()), "/health").await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["issues"][0]["service"], "cache");
    assert_eq!(body["issues"][0]["error"], "timed out after 100ms");
    assert_eq!(body["services"]["database"], "healthy");
}

#[tokio::test]
async fn ready_reports_version_and_uptime() {
    let response = get(state(StubProbe::up("database"), StubCache::up()), "/ready").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["uptime"].is_u64());
}

#[tokio::test]
async fn ready_uses_configured_version() {
    let mut config = test_config();
    config.readiness.version = Some("v2.3.4".to_string());
    let state = AppState::new(config, StubProbe::up("database"), StubCache::up());

    let body = body_json(get(state, "/ready").await).await;
    assert_eq!(body["version"], "v2.3.4");
}

#[tokio::test]
async fn ready_unready_when_dependency_down() {
    let response = get(
        state(StubProbe::up("database"), StubCache::down("refused")),
        "/ready",
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unready");
    assert_eq!(body["issues"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn db_check_healthy() {
    let response = get(
        state(StubProbe::up("database"), StubCache::down("refused")),
        "/db-check",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "database");
    assert_eq!(body["healthy"], true);
    assert_eq!(body["status"], "healthy");
    assert!(body.get("error").is_none());
}

#[tokio::test]
async fn db_check_unreachable() {
    let response = get(
        state(
            StubProbe::down("database", "password authentication failed"),
            StubCache::up(),
        ),
        "/db-check",
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["healthy"], false);
    assert_eq!(body["error"], "password authentication failed");
}

#[tokio::test]
async fn cache_check_round_trip() {
    let response = get(
        state(StubProbe::down("database", "refused"), StubCache::up()),
        "/cache-check",
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "cache");
    assert_eq!(body["healthy"], true);
    assert_eq!(body["value"], "ok");
}

#[tokio::test]
async fn cache_check_unreachable_has_no_value() {
    let response = get(
        state(
            StubProbe::up("database"),
            StubCache::down("connection refused"),
        ),
        "/cache-check",
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["error"], "connection refused");
    assert!(body.get("value").is_none());
}

#[tokio::test]
async fn cache_check_slow_round_trip_times_out() {
    let response = get(
        state(StubProbe::up("database"), StubCache::hanging()),
        "/cache-check",
    )
    .await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["healthy"], false);
    assert_eq!(body["error"], "timed out after 100ms");
    assert!(body.get("value").is_none());
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let response = get(state(StubProbe::up("database"), StubCache::up()), "/metrics").await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let request_id = response.headers()["x-request-id"]
        .to_str()
        .unwrap()
        .to_string();
    let body = body_json(response).await;
    assert_eq!(body["status"], 404);
    assert_eq!(body["request_id"], request_id);
}

#[tokio::test]
async fn responses_carry_request_id_and_no_store() {
    let response = get(state(StubProbe::up("database"), StubCache::up()), "/health").await;

    assert_eq!(
        response.headers().get(header::CACHE_CONTROL).unwrap(),
        "no-store"
    );
    let request_id = response.headers().get("x-request-id").unwrap();
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn cors_allows_any_origin_by_default() {
    let response = create_router(state(StubProbe::up("database"), StubCache::up()))
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://localhost:5173")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "*"
    );
}

#[tokio::test]
async fn cors_restricted_origins() {
    let mut config = test_config();
    config.cors.allowed_origins = vec!["https://status.example.com".to_string()];
    let state = AppState::new(config, StubProbe::up("database"), StubCache::up());

    let response = create_router(state)
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::ORIGIN, "https://evil.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
