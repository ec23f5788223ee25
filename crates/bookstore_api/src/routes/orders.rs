//! `/api/orders` handlers.

use crate::error::ApiError;
use crate::extract::{parse_enum, ApiJson, ApiPath, ApiQuery, PageParams};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use bookstore_core::model::order::{DailyOrderStatistics, TopSellingBook};
use bookstore_core::repo::order_repo::OrderSort;
use bookstore_core::{BookId, Order, OrderId, OrderSorting, OrderStatistics, OrderStatus, Page};
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", post(create_order).get(list_orders))
        .route("/api/orders/{id}", get(get_order).put(update_items))
        .route("/api/orders/{id}/status", patch(update_status))
        .route("/api/orders/{id}/cancel", post(cancel_order))
        .route("/api/orders/status/{status}", get(orders_by_status))
        .route("/api/orders/period", get(orders_by_period))
        .route("/api/orders/statistics", get(statistics))
        .route("/api/orders/statistics/daily", get(daily_statistics))
        .route("/api/orders/statistics/top-books", get(top_selling_books))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderRequest {
    #[serde(default)]
    book_ids: Vec<BookId>,
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeriodParams {
    start_date: i64,
    end_date: i64,
}

#[derive(Debug, Default, Deserialize)]
struct TopBooksParams {
    limit: Option<u32>,
}

fn sorting(params: &PageParams) -> Result<OrderSorting, ApiError> {
    Ok(OrderSorting {
        sort: params.sort(OrderSort::parse)?,
        direction: params.direction()?,
    })
}

async fn create_order(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.transaction(|services| services.orders().create_order(&request.book_ids))?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let sorting = sorting(&params)?;
    let request = params.request(DEFAULT_PAGE_SIZE);
    Ok(Json(state.transaction(|services| {
        services.orders().list_orders(request, sorting)
    })?))
}

async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.transaction(|services| services.orders().get_order(id))?))
}

async fn update_items(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(request): ApiJson<OrderRequest>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.orders().update_items(id, &request.book_ids)
    })?))
}

async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
    ApiQuery(params): ApiQuery<StatusParams>,
) -> Result<Json<Order>, ApiError> {
    let status: OrderStatus = parse_enum(&params.status)?;
    Ok(Json(state.transaction(|services| {
        services.orders().update_status(id, status)
    })?))
}

async fn cancel_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<OrderId>,
) -> Result<Json<Order>, ApiError> {
    Ok(Json(state.transaction(|services| services.orders().cancel_order(id))?))
}

async fn orders_by_status(
    State(state): State<AppState>,
    ApiPath(raw): ApiPath<String>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let status: OrderStatus = parse_enum(&raw)?;
    let sorting = sorting(&params)?;
    let request = params.request(DEFAULT_PAGE_SIZE);
    Ok(Json(state.transaction(|services| {
        services.orders().orders_by_status(status, request, sorting)
    })?))
}

async fn orders_by_period(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(period): ApiQuery<PeriodParams>,
) -> Result<Json<Page<Order>>, ApiError> {
    let sorting = sorting(&page)?;
    let request = page.request(DEFAULT_PAGE_SIZE);
    Ok(Json(state.transaction(|services| {
        services
            .orders()
            .orders_by_period(period.start_date, period.end_date, request, sorting)
    })?))
}

async fn statistics(State(state): State<AppState>) -> Result<Json<OrderStatistics>, ApiError> {
    Ok(Json(state.transaction(|services| services.orders().statistics())?))
}

async fn daily_statistics(
    State(state): State<AppState>,
    ApiQuery(period): ApiQuery<PeriodParams>,
) -> Result<Json<Vec<DailyOrderStatistics>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services
            .orders()
            .daily_statistics(period.start_date, period.end_date)
    })?))
}

async fn top_selling_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TopBooksParams>,
) -> Result<Json<Vec<TopSellingBook>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.orders().top_selling_books(params.limit)
    })?))
}
