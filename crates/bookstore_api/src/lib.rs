//! HTTP surface for the bookstore service.
//!
//! # Responsibility
//! - Map REST routes onto `bookstore_core` services.
//! - Own request-scoped concerns: transactions, error bodies, request logs.
//!
//! # Invariants
//! - Handlers hold no business rules; they parse input and delegate.

pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ErrorBody};
pub use state::AppState;

use axum::routing::get;
use axum::Router;

/// Builds the full application router with logging middleware attached.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .merge(routes::books::router())
        .merge(routes::members::router())
        .merge(routes::loans::router())
        .merge(routes::orders::router())
        .fallback(routes::fallback)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests,
        ))
        .with_state(state)
}
