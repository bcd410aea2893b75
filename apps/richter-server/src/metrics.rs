//! Prometheus metrics for richter-server.
//!
//! Exposes HTTP request metrics in Prometheus format at the `/metrics` endpoint.

use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering.
///
/// Must be called once at server startup before any metrics are recorded.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    describe_counter!(
        "richter_http_requests_total",
        "Total number of HTTP requests processed"
    );
    describe_histogram!(
        "richter_http_request_duration_seconds",
        "Duration of HTTP requests in seconds"
    );

    Ok(handle)
}

/// Router serving the rendered metrics.
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .with_state(handle)
}

async fn render(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

/// A helper to time a request and record metrics on completion.
pub struct RequestTimer {
    method: String,
    path: String,
    start: Instant,
}

impl RequestTimer {
    pub fn new(method: String, path: String) -> Self {
        Self {
            method,
            path,
            start: Instant::now(),
        }
    }

    pub fn finish(self, status: StatusCode) {
        let elapsed = self.start.elapsed().as_secs_f64();
        counter!(
            "richter_http_requests_total",
            "method" => self.method.clone(),
            "path" => self.path.clone(),
            "status" => status.as_u16().to_string()
        )
        .increment(1);
        histogram!(
            "richter_http_request_duration_seconds",
            "method" => self.method,
            "path" => self.path
        )
        .record(elapsed);
    }
}

/// Middleware recording one counter and one histogram sample per routed request.
///
/// Labels use the route template, not the raw URI, so path parameters such as emails
/// never become label values.
pub async fn track_http(req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let timer = RequestTimer::new(req.method().to_string(), path);

    let response = next.run(req).await;
    timer.finish(response.status());
    response
}
