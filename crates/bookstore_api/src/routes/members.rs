//! `/api/members` handlers.

use crate::error::ApiError;
use crate::extract::{parse_enum, ApiJson, ApiPath, ApiQuery, PageParams};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use bookstore_core::{
    Loan, Member, MemberDraft, MemberId, MemberLoanLimit, MemberUpdate, MembershipType, Page,
};
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u32 = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/members", post(create_member).get(list_members))
        .route(
            "/api/members/{id}",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/api/members/search", get(search_members))
        .route("/api/members/membership/{membership_type}", get(members_by_type))
        .route("/api/members/{id}/membership", put(upgrade_membership))
        .route("/api/members/email/validate", get(validate_email))
        .route("/api/members/{id}/loan-limit", get(loan_limit))
        .route("/api/members/{id}/loans", get(member_loans))
}

#[derive(Debug, Default, Deserialize)]
struct NameParams {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembershipParams {
    membership_type: String,
}

#[derive(Debug, Default, Deserialize)]
struct EmailParams {
    #[serde(default)]
    email: String,
}

async fn create_member(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<MemberDraft>,
) -> Result<(StatusCode, Json<Member>), ApiError> {
    let member = state.transaction(|services| services.members().create_member(&draft))?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn list_members(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Member>>, ApiError> {
    let request = params.request(DEFAULT_PAGE_SIZE);
    Ok(Json(state.transaction(|services| {
        services.members().list_members(request)
    })?))
}

async fn get_member(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MemberId>,
) -> Result<Json<Member>, ApiError> {
    Ok(Json(state.transaction(|services| services.members().get_member(id))?))
}

async fn update_member(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MemberId>,
    ApiJson(update): ApiJson<MemberUpdate>,
) -> Result<Json<Member>, ApiError> {
    let member = state.transaction(|services| services.members().update_member(id, &update))?;
    Ok(Json(member))
}

async fn delete_member(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MemberId>,
) -> Result<StatusCode, ApiError> {
    state.transaction(|services| services.members().delete_member(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn search_members(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<NameParams>,
) -> Result<Json<Vec<Member>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.members().search_by_name(&params.name)
    })?))
}

async fn members_by_type(
    State(state): State<AppState>,
    ApiPath(raw): ApiPath<String>,
) -> Result<Json<Vec<Member>>, ApiError> {
    let membership_type: MembershipType = parse_enum(&raw)?;
    Ok(Json(state.transaction(|services| {
        services.members().members_by_type(membership_type)
    })?))
}

async fn upgrade_membership(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MemberId>,
    ApiQuery(params): ApiQuery<MembershipParams>,
) -> Result<Json<Member>, ApiError> {
    let target: MembershipType = parse_enum(&params.membership_type)?;
    Ok(Json(state.transaction(|services| {
        services.members().upgrade_membership(id, target)
    })?))
}

/// `true` when the email is already registered.
async fn validate_email(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<EmailParams>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.members().email_exists(&params.email)
    })?))
}

async fn loan_limit(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MemberId>,
) -> Result<Json<MemberLoanLimit>, ApiError> {
    Ok(Json(state.transaction(|services| services.members().loan_limit(id))?))
}

async fn member_loans(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<MemberId>,
) -> Result<Json<Vec<Loan>>, ApiError> {
    Ok(Json(state.transaction(|services| services.loans().loans_for_member(id))?))
}
