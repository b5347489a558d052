//! Router-level tests for the region service.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use regiond::{ServiceConfig, build_router};

async fn get(config: ServiceConfig, uri: &str) -> (StatusCode, String) {
    let router = build_router(config);
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn root_reports_running_version() {
    let (status, body) = get(ServiceConfig::new("v2", "region-us-east", 0.0), "/").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "running");
    assert_eq!(json["version"], "v2");
    assert_eq!(json["region"], "region-us-east");
}

#[tokio::test]
async fn health_is_healthy_without_failure_rate() {
    let (status, body) = get(ServiceConfig::new("v2", "region-us-east", 0.0), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json.get("reason").is_none());
}

#[tokio::test]
async fn health_always_fails_at_full_failure_rate() {
    for _ in 0..5 {
        let (status, body) = get(ServiceConfig::new("v3", "region-us-west", 1.0), "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "unhealthy");
        assert_eq!(json["reason"], "simulated failure");
    }
}

#[tokio::test]
async fn metrics_exposes_gauges() {
    let (status, body) = get(ServiceConfig::new("v2", "region-ap-south", 0.0), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("service_up{version=\"v2\",region=\"region-ap-south\"} 1"));
    assert!(body.contains("service_info{version=\"v2\",region=\"region-ap-south\"} 1"));
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _) = get(ServiceConfig::new("v1", "region-us-west", 0.0), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
