use crate::api::{ApiResponse, AppState, HealthDto};
use axum::{
    Json,
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, field::Empty, info, info_span};
use uuid::Uuid;

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match state.shared.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check database ping failed");
            false
        }
    };

    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthDto {
        status: if database { "ok" } else { "degraded" },
        database,
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    };

    (status, Json(ApiResponse::success(body)))
}

/// Wraps every request in a `request` span. `account` stays empty until
/// [`crate::api::auth::auth_middleware`] records the bearer's id.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %method,
        path = %path,
        route = route.as_deref().unwrap_or("unmatched"),
        account = Empty,
    );

    async move {
        let response = next.run(req).await;
        let status = response.status().as_u16();

        // Label by route template; the raw path only when nothing matched.
        record_request_metrics(&method, route.as_deref().unwrap_or(&path), status, start);

        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            status_code = status,
            outcome = request_outcome(status),
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

fn record_request_metrics(method: &str, route: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("path", route.to_string()),
        ("status", status.to_string()),
    ];

    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

const fn request_outcome(status: u16) -> &'static str {
    match status {
        500.. => "error",
        400..=499 => "client_error",
        _ => "success",
    }
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "referrer-policy",
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static(
            "default-src 'none'; frame-ancestors 'none'",
        ),
    );

    response
}
