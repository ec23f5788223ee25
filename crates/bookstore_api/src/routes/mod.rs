//! Route tables per resource plus the service-level endpoints.

use crate::error::ApiError;
use axum::http::Uri;
use axum::Json;
use serde_json::{json, Value};

pub mod books;
pub mod loans;
pub mod members;
pub mod orders;

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "UP",
        "version": bookstore_core::core_version(),
    }))
}

pub async fn fallback(uri: Uri) -> ApiError {
    ApiError::route_not_found(uri.path())
}
