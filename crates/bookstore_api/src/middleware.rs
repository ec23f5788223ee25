//! Request logging middleware.
//!
//! # Responsibility
//! - Assign or propagate an `x-request-id` for every request.
//! - Log one line per request with status and duration.
//! - Complete error bodies with the request path and timestamp.

use crate::error::ErrorBody;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::{info, warn};
use std::time::Instant;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

pub async fn track_requests(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(request).await;

    if let Some(mut body) = response.extensions_mut().remove::<ErrorBody>() {
        body.path = path.clone();
        body.timestamp = state.now_ms();
        let status = response.status();
        response = (status, Json(body)).into_response();
    }
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }

    let status = response.status();
    let duration_ms = started.elapsed().as_millis();
    if status.is_server_error() {
        warn!(
            "event=http_request module=api status=error http_status={} method={method} path={path} request_id={request_id} duration_ms={duration_ms}",
            status.as_u16()
        );
    } else {
        info!(
            "event=http_request module=api status=ok http_status={} method={method} path={path} request_id={request_id} duration_ms={duration_ms}",
            status.as_u16()
        );
    }
    response
}
