//! Metrics endpoint.

use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;

use status_telemetry::{MetricsRegistry, render_prometheus};

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// `GET /metrics` (Prometheus text) and `GET /healthz`.
pub fn build_router(registry: MetricsRegistry) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(registry)
}

async fn metrics(State(registry): State<MetricsRegistry>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        render_prometheus(&registry.families()),
    )
}

async fn healthz() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use status_telemetry::{KeyValue, Meter};
    use tower::ServiceExt;

    async fn get_text(router: Router, uri: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthz_ok() {
        let (status, body) = get_text(build_router(MetricsRegistry::new()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn metrics_renders_registry() {
        let registry = MetricsRegistry::new();
        let status = registry
            .i64_up_down_counter("status.http.status", "1", "Status of the HTTP request")
            .unwrap();
        status.record(1, &[KeyValue::string("http.status_class", "2xx")]);

        let (code, body) = get_text(build_router(registry), "/metrics").await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("# TYPE status_http_status gauge"));
        assert!(body.contains("status_http_status{http_status_class=\"2xx\"} 1"));
    }

    #[tokio::test]
    async fn unknown_path_is_404() {
        let (status, _) = get_text(build_router(MetricsRegistry::new()), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
