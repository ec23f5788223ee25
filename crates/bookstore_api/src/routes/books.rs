//! `/api/books` handlers.

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, PageParams};
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use bookstore_core::repo::book_repo::BookSort;
use bookstore_core::{Book, BookDraft, BookId, BookSearch, BookStatistics, ExportFormat, Page};
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u32 = 10;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/books", post(create_book).get(list_books))
        .route(
            "/api/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/api/books/{id}/restore", patch(restore_book))
        .route("/api/books/{id}/availability", patch(update_availability))
        .route("/api/books/isbn/{isbn}", get(get_book_by_isbn))
        .route("/api/books/search", get(search_books))
        .route("/api/books/search/title", get(search_by_title))
        .route("/api/books/search/author", get(search_by_author))
        .route("/api/books/search/keyword", get(search_by_keyword))
        .route("/api/books/search/price", get(search_by_price))
        .route("/api/books/availability/{available}", get(books_by_availability))
        .route("/api/books/validate/isbn", get(validate_isbn))
        .route("/api/books/statistics", get(statistics))
        .route("/api/books/export", get(export_books))
        .route("/api/books/import", post(import_books))
}

#[derive(Debug, Default, Deserialize)]
struct TitleParams {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Default, Deserialize)]
struct AuthorParams {
    #[serde(default)]
    author: String,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordParams {
    #[serde(default)]
    keyword: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceParams {
    min_price: Option<i64>,
    max_price: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    title: Option<String>,
    author: Option<String>,
    keyword: Option<String>,
    min_price: Option<i64>,
    max_price: Option<i64>,
    available: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    available: bool,
}

#[derive(Debug, Default, Deserialize)]
struct IsbnParams {
    #[serde(default)]
    isbn: String,
}

#[derive(Debug, Default, Deserialize)]
struct ExportParams {
    format: Option<String>,
}

async fn create_book(
    State(state): State<AppState>,
    ApiJson(draft): ApiJson<BookDraft>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    let book = state.transaction(|services| services.books().create_book(&draft))?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<Json<Page<Book>>, ApiError> {
    let sort = params.sort(BookSort::parse)?;
    let direction = params.direction()?;
    let request = params.request(DEFAULT_PAGE_SIZE);
    let page = state.transaction(|services| services.books().list_books(request, sort, direction))?;
    Ok(Json(page))
}

async fn get_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.transaction(|services| services.books().get_book(id))?))
}

async fn update_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
    ApiJson(draft): ApiJson<BookDraft>,
) -> Result<Json<Book>, ApiError> {
    let book = state.transaction(|services| services.books().update_book(id, &draft))?;
    Ok(Json(book))
}

async fn delete_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<StatusCode, ApiError> {
    state.transaction(|services| services.books().delete_book(id))?;
    Ok(StatusCode::NO_CONTENT)
}

async fn restore_book(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.transaction(|services| services.books().restore_book(id))?))
}

async fn update_availability(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<BookId>,
    ApiQuery(params): ApiQuery<AvailabilityParams>,
) -> Result<Json<Book>, ApiError> {
    let book = state.transaction(|services| {
        services.books().update_availability(id, params.available)
    })?;
    Ok(Json(book))
}

async fn get_book_by_isbn(
    State(state): State<AppState>,
    ApiPath(isbn): ApiPath<String>,
) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.transaction(|services| services.books().get_book_by_isbn(&isbn))?))
}

async fn search_books(
    State(state): State<AppState>,
    ApiQuery(page): ApiQuery<PageParams>,
    ApiQuery(params): ApiQuery<SearchParams>,
) -> Result<Json<Page<Book>>, ApiError> {
    let sort = page.sort(BookSort::parse)?;
    let direction = page.direction()?;
    let request = page.request(DEFAULT_PAGE_SIZE);
    let search = BookSearch {
        title: params.title,
        author: params.author,
        keyword: params.keyword,
        min_price: params.min_price,
        max_price: params.max_price,
        available: params.available,
    };
    let result = state.transaction(|services| {
        services.books().search_books(&search, request, sort, direction)
    })?;
    Ok(Json(result))
}

async fn search_by_title(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TitleParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.books().search_by_title(&params.title)
    })?))
}

async fn search_by_author(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AuthorParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.books().search_by_author(&params.author)
    })?))
}

async fn search_by_keyword(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<KeywordParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.books().search_by_keyword(&params.keyword)
    })?))
}

async fn search_by_price(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<PriceParams>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services
            .books()
            .search_by_price_range(params.min_price, params.max_price)
    })?))
}

async fn books_by_availability(
    State(state): State<AppState>,
    ApiPath(available): ApiPath<bool>,
) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.books().books_by_availability(available)
    })?))
}

/// `true` when the ISBN is already taken, including by a deleted book.
async fn validate_isbn(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<IsbnParams>,
) -> Result<Json<bool>, ApiError> {
    Ok(Json(state.transaction(|services| {
        services.books().isbn_exists(&params.isbn)
    })?))
}

async fn statistics(State(state): State<AppState>) -> Result<Json<BookStatistics>, ApiError> {
    Ok(Json(state.transaction(|services| services.books().statistics())?))
}

async fn export_books(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ExportParams>,
) -> Result<impl IntoResponse, ApiError> {
    let raw = params.format.as_deref().unwrap_or("csv");
    let format = ExportFormat::parse(raw)
        .ok_or_else(|| ApiError::bad_request(format!("unknown export format `{raw}`")))?;
    let exporter = format.exporter();
    let body = state.transaction(|services| services.books().export_books(&*exporter))?;
    Ok(([(header::CONTENT_TYPE, exporter.content_type())], body))
}

async fn import_books(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Vec<Book>>), ApiError> {
    let feed = std::str::from_utf8(&body)
        .map_err(|_| ApiError::bad_request("catalog feed must be UTF-8 text"))?;
    let books = state.transaction(|services| services.books().import_feed(feed))?;
    Ok((StatusCode::CREATED, Json(books)))
}
