// tests/handler_tests.rs
use hyper::{Body, Method, Request, StatusCode};
use rust_health_checks::config::ChecksConfig;
use rust_health_checks::health::{callback, HealthChecks, ProcedureError, Status};
use rust_health_checks::metrics::MetricsRegistry;
use rust_health_checks::server::HealthCheckHandler;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn checks() -> Arc<HealthChecks> {
    let checks = HealthChecks::new(&ChecksConfig {
        timeout_ms: 100,
        ..ChecksConfig::default()
    });
    checks
        .register("sub/A", || async { Ok::<_, ProcedureError>(Status::ok()) })
        .and_then(|c| c.register("sub/B", || async { Ok::<_, ProcedureError>(Status::ok()) }))
        .and_then(|c| c.register("sub2/c/C1", || async { Ok::<_, ProcedureError>(Status::ok()) }))
        .and_then(|c| c.register("sub2/c/C2", || async { Ok::<_, ProcedureError>(Status::ko()) }))
        .unwrap();
    Arc::new(checks)
}

async fn call(handler: &HealthCheckHandler, method: Method, uri: &str) -> (StatusCode, Option<Value>) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = handler.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, json)
}

#[tokio::test]
async fn test_empty_registry_answers_no_content() {
    let empty = Arc::new(HealthChecks::new(&ChecksConfig::default()));
    let handler = HealthCheckHandler::new(empty, "/health");

    let (status, body) = call(&handler, Method::GET, "/health").await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, None);
}

#[tokio::test]
async fn test_status_codes() {
    let handler = HealthCheckHandler::new(checks(), "/health");

    assert_eq!(call(&handler, Method::GET, "/health").await.0, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(call(&handler, Method::GET, "/health/sub").await.0, StatusCode::OK);
    assert_eq!(call(&handler, Method::POST, "/health/sub/A").await.0, StatusCode::OK);
    assert_eq!(call(&handler, Method::GET, "/health/missing").await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        call(&handler, Method::GET, "/health/sub2/c/C1/foo").await.0,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(call(&handler, Method::GET, "/elsewhere").await.0, StatusCode::NOT_FOUND);
    assert_eq!(
        call(&handler, Method::DELETE, "/health").await.0,
        StatusCode::METHOD_NOT_ALLOWED
    );
}

#[tokio::test]
async fn test_execution_error_is_500() {
    let checks = checks();
    checks.register("sub2/hang", callback(|_| {})).unwrap();
    let handler = HealthCheckHandler::new(checks, "/health");

    let (status, body) = call(&handler, Method::GET, "/health/sub2").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let body = body.unwrap();
    let hang = body["checks"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == json!("hang"))
        .unwrap();
    assert_eq!(hang["data"]["cause"], json!("Timeout"));
}

#[tokio::test]
async fn test_body_and_headers() {
    let handler = HealthCheckHandler::new(checks(), "/health/");
    let request = Request::get("/health/sub").body(Body::empty()).unwrap();
    let response = handler.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["content-type"],
        "application/json;charset=UTF-8"
    );
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(
        body,
        json!({
            "id": "sub",
            "status": "UP",
            "outcome": "UP",
            "checks": [
                {"id": "A", "status": "UP", "data": {}},
                {"id": "B", "status": "UP", "data": {}}
            ]
        })
    );
}

#[tokio::test]
async fn test_result_mapper() {
    let handler = HealthCheckHandler::new(checks(), "/health").with_result_mapper(|mut payload| {
        if let Value::Object(map) = &mut payload {
            map.insert("service".to_string(), json!("billing"));
        }
        payload
    });

    let (status, body) = call(&handler, Method::GET, "/health/sub/A").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["service"], json!("billing"));
}

#[tokio::test]
async fn test_queries_are_counted() {
    let registry = MetricsRegistry::new().unwrap();
    let metrics = registry.collector();
    let checks = HealthChecks::new(&ChecksConfig::default()).with_metrics(metrics.clone());
    checks
        .register("db", || async { Ok::<_, ProcedureError>(Status::ok()) })
        .unwrap();
    let handler = HealthCheckHandler::new(Arc::new(checks), "/health").with_metrics(metrics.clone());

    call(&handler, Method::GET, "/health").await;
    call(&handler, Method::GET, "/health/missing").await;

    assert_eq!(metrics.queries_in_flight.get(), 0);
    assert_eq!(metrics.check_runs_total.with_label_values(&["db", "UP"]).get(), 1);
    let text = String::from_utf8(registry.gather().unwrap()).unwrap();
    assert!(text.contains("health_queries_total{category=\"success\"} 1"));
    assert!(text.contains("health_queries_total{category=\"not_found\"} 1"));
}

#[tokio::test]
async fn test_abandoned_request_leaves_no_query_in_flight() {
    let registry = MetricsRegistry::new().unwrap();
    let metrics = registry.collector();
    let checks = HealthChecks::new(&ChecksConfig::default()).with_metrics(metrics.clone());
    checks
        .register("slow", || async {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Ok::<_, ProcedureError>(Status::ok())
        })
        .unwrap();
    let handler = HealthCheckHandler::new(Arc::new(checks), "/health").with_metrics(metrics.clone());

    // The client goes away while the check is still running.
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let abandoned = tokio::time::timeout(Duration::from_millis(20), handler.oneshot(request)).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(metrics.queries_in_flight.get(), 0);
}

#[tokio::test]
async fn test_check_names_are_percent_decoded() {
    let checks = checks();
    checks
        .register("my check", || async { Ok::<_, ProcedureError>(Status::ok()) })
        .unwrap();
    let handler = HealthCheckHandler::new(checks, "/health");

    let (status, body) = call(&handler, Method::GET, "/health/my%20check").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.unwrap()["id"], json!("my check"));

    assert_eq!(call(&handler, Method::GET, "/health/sub%2FA").await.0, StatusCode::OK);
    assert_eq!(call(&handler, Method::GET, "/health/%FF").await.0, StatusCode::BAD_REQUEST);
}
