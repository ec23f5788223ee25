//! `/api/loans` handlers.

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bookstore_core::{BookId, Loan, LoanId, MemberId};
use serde::Deserialize;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/loans", post(borrow_book))
        .route("/api/loans/{id}", get(get_loan))
        .route("/api/loans/{id}/return", post(return_book))
        .route("/api/loans/active", get(active_loans))
        .route("/api/loans/overdue", get(overdue_loans))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BorrowRequest {
    member_id: MemberId,
    book_id: BookId,
}

async fn borrow_book(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<BorrowRequest>,
) -> Result<(StatusCode, Json<Loan>), ApiError> {
    let loan = state.transaction(|services| {
        services
            .loans()
            .borrow_book(request.member_id, request.book_id)
    })?;
    Ok((StatusCode::CREATED, Json(loan)))
}

async fn get_loan(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<LoanId>,
) -> Result<Json<Loan>, ApiError> {
    Ok(Json(state.transaction(|services| services.loans().get_loan(id))?))
}

async fn return_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<LoanId>,
) -> Result<Json<Loan>, ApiError> {
    Ok(Json(state.transaction(|services| services.loans().return_book(id))?))
}

async fn active_loans(State(state): State<AppState>) -> Result<Json<Vec<Loan>>, ApiError> {
    Ok(Json(state.transaction(|services| services.loans().active_loans())?))
}

async fn overdue_loans(State(state): State<AppState>) -> Result<Json<Vec<Loan>>, ApiError> {
    Ok(Json(state.transaction(|services| services.loans().overdue_loans())?))
}
