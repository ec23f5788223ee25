//! Book catalog use cases.
//!
//! # Responsibility
//! - Validate and persist catalog writes.
//! - Enforce soft-delete state transitions.
//! - Serve catalog searches over active books.
//!
//! # Invariants
//! - Reads never return soft-deleted books; statistics count them.
//! - ISBNs are unique across every row, deleted ones included.

use crate::clock::Clock;
use crate::export::{BookExporter, CatalogFeedAdapter};
use crate::model::book::{normalize_isbn, Book, BookDraft, BookId, BookStatistics};
use crate::model::page::{Page, PageRequest};
use crate::model::validation::ValidationError;
use crate::repo::book_repo::{BookQuery, BookRepository, BookSort, DeletedFilter};
use crate::repo::SortDirection;
use crate::service::error::{
    ServiceError, ServiceResult, DELETED_BOOK_ACCESS, INVALID_BOOK_STATE, INVALID_PRICE_RANGE,
};
use log::info;
use std::sync::Arc;

/// Filters for the paged catalog search. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSearch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub keyword: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub available: Option<bool>,
}

/// Use-case service for the book catalog.
pub struct BookService<R: BookRepository> {
    repo: R,
    clock: Arc<dyn Clock>,
}

impl<R: BookRepository> BookService<R> {
    pub fn new(repo: R, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Creates a book after validation and ISBN uniqueness checks.
    pub fn create_book(&self, draft: &BookDraft) -> ServiceResult<Book> {
        let draft = draft.normalized()?;
        if self.repo.isbn_exists(&draft.isbn)? {
            return Err(ServiceError::DuplicateIsbn(draft.isbn));
        }

        let book = self.repo.create_book(&draft, self.clock.now_ms())?;
        info!(
            "event=book_create module=service status=ok book_id={} isbn={}",
            book.id, book.isbn
        );
        Ok(book)
    }

    /// Gets an active book.
    pub fn get_book(&self, id: BookId) -> ServiceResult<Book> {
        self.repo
            .get_book(id, false)?
            .ok_or_else(|| ServiceError::not_found("Book", id))
    }

    /// Gets an active book by ISBN in any accepted spelling.
    pub fn get_book_by_isbn(&self, isbn: &str) -> ServiceResult<Book> {
        let normalized = parse_isbn(isbn)?;
        self.repo
            .find_book_by_isbn(&normalized, false)?
            .ok_or_else(|| ServiceError::not_found("Book", isbn))
    }

    pub fn list_books(
        &self,
        request: PageRequest,
        sort: BookSort,
        direction: SortDirection,
    ) -> ServiceResult<Page<Book>> {
        self.page(
            BookQuery {
                sort,
                direction,
                ..BookQuery::default()
            },
            request,
        )
    }

    /// Replaces every editable field of an active book.
    pub fn update_book(&self, id: BookId, draft: &BookDraft) -> ServiceResult<Book> {
        let mut book = self.load_any(id)?;
        if !book.is_active() {
            return Err(ServiceError::invalid_state(
                DELETED_BOOK_ACCESS,
                format!("deleted book cannot be modified: {id}"),
            ));
        }

        let draft = draft.normalized()?;
        if draft.isbn != book.isbn && self.repo.isbn_exists(&draft.isbn)? {
            return Err(ServiceError::DuplicateIsbn(draft.isbn));
        }

        book.apply(&draft, self.clock.now_ms());
        self.repo.update_book(&book)?;
        info!("event=book_update module=service status=ok book_id={id}");
        Ok(book)
    }

    /// Soft-deletes a book; the row stays for statistics and restore.
    pub fn delete_book(&self, id: BookId) -> ServiceResult<()> {
        let mut book = self.load_any(id)?;
        if !book.is_active() {
            return Err(ServiceError::invalid_state(
                DELETED_BOOK_ACCESS,
                format!("book is already deleted: {id}"),
            ));
        }

        book.soft_delete(self.clock.now_ms());
        self.repo.update_book(&book)?;
        info!("event=book_delete module=service status=ok book_id={id}");
        Ok(())
    }

    pub fn restore_book(&self, id: BookId) -> ServiceResult<Book> {
        let mut book = self.load_any(id)?;
        if book.is_active() {
            return Err(ServiceError::invalid_state(
                INVALID_BOOK_STATE,
                format!("book is not deleted: {id}"),
            ));
        }

        book.restore(self.clock.now_ms());
        self.repo.update_book(&book)?;
        info!("event=book_restore module=service status=ok book_id={id}");
        Ok(book)
    }

    /// Blank input yields an empty list.
    pub fn search_by_title(&self, title: &str) -> ServiceResult<Vec<Book>> {
        self.search_text(title, |query, value| query.title = Some(value))
    }

    pub fn search_by_author(&self, author: &str) -> ServiceResult<Vec<Book>> {
        self.search_text(author, |query, value| query.author = Some(value))
    }

    /// Matches the keyword in title or author.
    pub fn search_by_keyword(&self, keyword: &str) -> ServiceResult<Vec<Book>> {
        self.search_text(keyword, |query, value| query.keyword = Some(value))
    }

    /// Missing lower bound means zero; missing upper bound means no limit.
    pub fn search_by_price_range(
        &self,
        min_price: Option<i64>,
        max_price: Option<i64>,
    ) -> ServiceResult<Vec<Book>> {
        check_price_range(min_price, max_price)?;
        Ok(self.repo.list_books(&BookQuery {
            min_price: Some(min_price.unwrap_or(0)),
            max_price,
            sort: BookSort::Price,
            direction: SortDirection::Asc,
            ..BookQuery::default()
        })?)
    }

    /// Paged search combining every filter in `search`.
    pub fn search_books(
        &self,
        search: &BookSearch,
        request: PageRequest,
        sort: BookSort,
        direction: SortDirection,
    ) -> ServiceResult<Page<Book>> {
        check_price_range(search.min_price, search.max_price)?;
        self.page(
            BookQuery {
                title: search.title.clone(),
                author: search.author.clone(),
                keyword: search.keyword.clone(),
                min_price: search.min_price,
                max_price: search.max_price,
                available: search.available,
                sort,
                direction,
                ..BookQuery::default()
            },
            request,
        )
    }

    pub fn books_by_availability(&self, available: bool) -> ServiceResult<Vec<Book>> {
        Ok(self.repo.list_books(&BookQuery {
            available: Some(available),
            ..BookQuery::default()
        })?)
    }

    pub fn update_availability(&self, id: BookId, available: bool) -> ServiceResult<Book> {
        let mut book = self.load_any(id)?;
        if !book.is_active() {
            return Err(ServiceError::invalid_state(
                DELETED_BOOK_ACCESS,
                format!("availability of a deleted book cannot change: {id}"),
            ));
        }

        book.available = available;
        book.updated_at = Some(self.clock.now_ms());
        self.repo.update_book(&book)?;
        info!(
            "event=book_availability module=service status=ok book_id={id} available={available}"
        );
        Ok(book)
    }

    /// Whether any book, deleted or not, already uses this ISBN.
    pub fn isbn_exists(&self, isbn: &str) -> ServiceResult<bool> {
        let normalized = parse_isbn(isbn)?;
        Ok(self.repo.isbn_exists(&normalized)?)
    }

    pub fn statistics(&self) -> ServiceResult<BookStatistics> {
        let total_books = self.repo.count_books(&BookQuery {
            deleted: DeletedFilter::All,
            ..BookQuery::default()
        })?;
        let active_books = self.repo.count_books(&BookQuery::default())?;
        let deleted_books = self.repo.count_books(&BookQuery {
            deleted: DeletedFilter::DeletedOnly,
            ..BookQuery::default()
        })?;
        Ok(BookStatistics {
            total_books,
            active_books,
            deleted_books,
        })
    }

    /// Renders every active book, oldest first, with `exporter`.
    pub fn export_books(&self, exporter: &dyn BookExporter) -> ServiceResult<String> {
        let books = self.repo.list_books(&BookQuery {
            sort: BookSort::Id,
            direction: SortDirection::Asc,
            ..BookQuery::default()
        })?;
        exporter.export(&books).map_err(|err| {
            ServiceError::Validation(ValidationError::single("format", None, err.to_string()))
        })
    }

    /// Creates one book per feed line. Any failure aborts the whole import.
    pub fn import_feed(&self, feed: &str) -> ServiceResult<Vec<Book>> {
        let drafts = CatalogFeedAdapter.parse(feed)?;
        let mut created = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            created.push(self.create_book(draft)?);
        }
        info!(
            "event=book_import module=service status=ok count={}",
            created.len()
        );
        Ok(created)
    }

    fn load_any(&self, id: BookId) -> ServiceResult<Book> {
        self.repo
            .get_book(id, true)?
            .ok_or_else(|| ServiceError::not_found("Book", id))
    }

    fn search_text(
        &self,
        value: &str,
        set: impl FnOnce(&mut BookQuery, String),
    ) -> ServiceResult<Vec<Book>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = BookQuery {
            sort: BookSort::Title,
            direction: SortDirection::Asc,
            ..BookQuery::default()
        };
        set(&mut query, value.to_string());
        Ok(self.repo.list_books(&query)?)
    }

    fn page(&self, mut query: BookQuery, request: PageRequest) -> ServiceResult<Page<Book>> {
        query.deleted = DeletedFilter::ActiveOnly;
        let total = self.repo.count_books(&query)?;
        query.limit = Some(request.size);
        query.offset = request.offset();
        let books = self.repo.list_books(&query)?;
        Ok(Page::new(books, request, total))
    }
}

fn parse_isbn(raw: &str) -> ServiceResult<String> {
    normalize_isbn(raw).ok_or_else(|| {
        ServiceError::Validation(ValidationError::single(
            "isbn",
            Some(raw),
            "isbn must contain 10 or 13 digits",
        ))
    })
}

fn check_price_range(min_price: Option<i64>, max_price: Option<i64>) -> ServiceResult<()> {
    let mut errors = ValidationError::new();
    if let Some(min) = min_price.filter(|value| *value < 0) {
        errors.push(
            "minPrice",
            Some(&min.to_string()),
            "minPrice must be zero or greater",
        );
    }
    if let Some(max) = max_price.filter(|value| *value < 0) {
        errors.push(
            "maxPrice",
            Some(&max.to_string()),
            "maxPrice must be zero or greater",
        );
    }
    errors.into_result()?;

    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            return Err(ServiceError::invalid_state(
                INVALID_PRICE_RANGE,
                format!("minPrice {min} is greater than maxPrice {max}"),
            ));
        }
    }
    Ok(())
}
