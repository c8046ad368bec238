// src/server/handler.rs
use hyper::header::{HeaderValue, ALLOW, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::{debug, error, Instrument};
use uuid::Uuid;

use crate::health::{CheckResponse, HealthChecks};
use crate::metrics::MetricsCollector;

const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Post-processes a payload before it is written out.
pub type ResultMapper = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Serves `GET`/`POST <route>[/<check path>]` from a [`HealthChecks`] engine.
#[derive(Clone)]
pub struct HealthCheckHandler {
    checks: Arc<HealthChecks>,
    route: Arc<str>,
    mapper: Option<ResultMapper>,
    metrics: Option<Arc<MetricsCollector>>,
}

impl HealthCheckHandler {
    pub fn new(checks: Arc<HealthChecks>, route: &str) -> Self {
        let route = route.trim_end_matches('/');
        Self {
            checks,
            route: Arc::from(route),
            mapper: None,
            metrics: None,
        }
    }

    pub fn with_result_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.mapper = Some(Arc::new(mapper));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let Some(path) = self.check_path(req.uri().path()) else {
            return plain(StatusCode::NOT_FOUND);
        };

        if req.method() != Method::GET && req.method() != Method::POST {
            let mut response = plain(StatusCode::METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET, POST"));
            return response;
        }

        // Check names may hold any character; the URI carries them escaped.
        let Ok(path) = percent_decode_str(path).decode_utf8() else {
            debug!("Check path {:?} is not valid UTF-8 once decoded", path);
            return plain(StatusCode::BAD_REQUEST);
        };

        let _in_flight = self.metrics.as_ref().map(|metrics| metrics.track_query());
        let response = self.checks.check_status(&path).await;

        self.to_http(response)
    }

    /// Part of `uri_path` below the mounted route, or `None` when the request
    /// is not for us.
    fn check_path<'a>(&self, uri_path: &'a str) -> Option<&'a str> {
        let rest = uri_path.strip_prefix(&*self.route)?;
        if rest.is_empty() {
            Some(rest)
        } else if self.route.is_empty() || rest.starts_with('/') {
            Some(rest.trim_start_matches('/'))
        } else {
            None
        }
    }

    fn to_http(&self, response: CheckResponse) -> Response<Body> {
        let status = StatusCode::from_u16(response.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let payload = match response.payload {
            Some(payload) if response.category.has_body() => payload,
            _ => return plain(status),
        };
        let payload = match &self.mapper {
            Some(mapper) => mapper(payload),
            None => payload,
        };

        match serde_json::to_vec(&payload) {
            Ok(bytes) => {
                let mut http = Response::new(Body::from(bytes));
                *http.status_mut() = status;
                http.headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                http
            }
            Err(e) => {
                error!("Failed to encode health payload: {}", e);
                plain(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

fn plain(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}

impl Service<Request<Body>> for HealthCheckHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "health_request",
            %request_id,
            method = %req.method(),
            path = %req.uri().path()
        );

        Box::pin(
            async move {
                let mut response = handler.handle(req).await;
                debug!(status = %response.status(), "health request served");
                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert("x-request-id", value);
                }
                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChecksConfig;

    fn handler(route: &str) -> HealthCheckHandler {
        HealthCheckHandler::new(Arc::new(HealthChecks::new(&ChecksConfig::default())), route)
    }

    #[test]
    fn test_check_path() {
        let h = handler("/health");
        assert_eq!(h.check_path("/health"), Some(""));
        assert_eq!(h.check_path("/health/"), Some(""));
        assert_eq!(h.check_path("/health/sub/A"), Some("sub/A"));
        assert_eq!(h.check_path("/healthz"), None);
        assert_eq!(h.check_path("/other"), None);
    }

    #[test]
    fn test_check_path_on_root_route() {
        let h = handler("/");
        assert_eq!(h.check_path("/"), Some(""));
        assert_eq!(h.check_path("/sub/A"), Some("sub/A"));
    }
}
