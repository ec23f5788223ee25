//! Book repository contract and SQLite implementation.
//!
//! # Invariants
//! - Drafts reaching `create_book` are already normalized by the service.
//! - Soft-deleted rows stay in `books`; reads filter on `deleted_at`.

use crate::model::book::{Book, BookDraft, BookId};
use crate::repo::{
    bool_to_int, contains_pattern, count_to_u64, int_to_bool, push_window, RepoError, RepoResult,
    SortDirection,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const BOOK_SELECT_SQL: &str = "SELECT
    id,
    title,
    author,
    isbn,
    price,
    available,
    created_at,
    updated_at,
    deleted_at
FROM books";

/// Which rows a query sees with respect to soft deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeletedFilter {
    #[default]
    ActiveOnly,
    DeletedOnly,
    All,
}

/// Sortable book columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookSort {
    Id,
    Title,
    Author,
    Price,
    #[default]
    CreatedAt,
}

impl BookSort {
    /// Accepts the JSON field names used by the HTTP API.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "id" => Some(Self::Id),
            "title" => Some(Self::Title),
            "author" => Some(Self::Author),
            "price" => Some(Self::Price),
            "createdAt" | "createdDate" | "created_at" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Author => "author",
            Self::Price => "price",
            Self::CreatedAt => "created_at",
        }
    }
}

/// Filter, sort and window options for book lists.
///
/// Text filters match case-insensitively anywhere in the column. `keyword`
/// matches title or author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub keyword: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub available: Option<bool>,
    pub deleted: DeletedFilter,
    pub sort: BookSort,
    pub direction: SortDirection,
    pub limit: Option<u32>,
    pub offset: u64,
}

/// Repository interface for book persistence.
pub trait BookRepository {
    fn create_book(&self, draft: &BookDraft, created_at: i64) -> RepoResult<Book>;
    fn get_book(&self, id: BookId, include_deleted: bool) -> RepoResult<Option<Book>>;
    fn find_book_by_isbn(&self, isbn: &str, include_deleted: bool) -> RepoResult<Option<Book>>;
    /// Checks every row, soft-deleted ones included.
    fn isbn_exists(&self, isbn: &str) -> RepoResult<bool>;
    fn update_book(&self, book: &Book) -> RepoResult<()>;
    fn list_books(&self, query: &BookQuery) -> RepoResult<Vec<Book>>;
    /// Counts rows matching the filters of `query`, ignoring its window.
    fn count_books(&self, query: &BookQuery) -> RepoResult<u64>;
}

/// SQLite-backed book repository.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BookRepository for SqliteBookRepository<'_> {
    fn create_book(&self, draft: &BookDraft, created_at: i64) -> RepoResult<Book> {
        self.conn.execute(
            "INSERT INTO books (
                title,
                author,
                isbn,
                price,
                available,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                draft.title.as_str(),
                draft.author.as_str(),
                draft.isbn.as_str(),
                draft.price,
                bool_to_int(draft.available),
                created_at,
            ],
        )?;

        Ok(Book {
            id: self.conn.last_insert_rowid(),
            title: draft.title.clone(),
            author: draft.author.clone(),
            isbn: draft.isbn.clone(),
            price: draft.price,
            available: draft.available,
            created_at,
            updated_at: None,
            deleted_at: None,
        })
    }

    fn get_book(&self, id: BookId, include_deleted: bool) -> RepoResult<Option<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             WHERE id = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;
        let mut rows = stmt.query(params![id, bool_to_int(include_deleted)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_book_row(row)?)),
            None => Ok(None),
        }
    }

    fn find_book_by_isbn(&self, isbn: &str, include_deleted: bool) -> RepoResult<Option<Book>> {
        let mut stmt = self.conn.prepare(&format!(
            "{BOOK_SELECT_SQL}
             WHERE isbn = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;
        let mut rows = stmt.query(params![isbn, bool_to_int(include_deleted)])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_book_row(row)?)),
            None => Ok(None),
        }
    }

    fn isbn_exists(&self, isbn: &str) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM books WHERE isbn = ?1;", [isbn], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn update_book(&self, book: &Book) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE books
             SET
                title = ?1,
                author = ?2,
                isbn = ?3,
                price = ?4,
                available = ?5,
                updated_at = ?6,
                deleted_at = ?7
             WHERE id = ?8;",
            params![
                book.title.as_str(),
                book.author.as_str(),
                book.isbn.as_str(),
                book.price,
                bool_to_int(book.available),
                book.updated_at,
                book.deleted_at,
                book.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "Book",
                id: book.id,
            });
        }
        Ok(())
    }

    fn list_books(&self, query: &BookQuery) -> RepoResult<Vec<Book>> {
        let mut sql = format!("{BOOK_SELECT_SQL} WHERE 1 = 1");
        let mut binds = Vec::new();
        push_book_filters(query, &mut sql, &mut binds);

        sql.push_str(&format!(
            " ORDER BY {} {}, id {}",
            query.sort.column(),
            query.direction.as_sql(),
            query.direction.as_sql()
        ));
        push_window(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut books = Vec::new();
        while let Some(row) = rows.next()? {
            books.push(parse_book_row(row)?);
        }
        Ok(books)
    }

    fn count_books(&self, query: &BookQuery) -> RepoResult<u64> {
        let mut sql = "SELECT COUNT(*) FROM books WHERE 1 = 1".to_string();
        let mut binds = Vec::new();
        push_book_filters(query, &mut sql, &mut binds);

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(count_to_u64(count))
    }
}

fn push_book_filters(query: &BookQuery, sql: &mut String, binds: &mut Vec<Value>) {
    match query.deleted {
        DeletedFilter::ActiveOnly => sql.push_str(" AND deleted_at IS NULL"),
        DeletedFilter::DeletedOnly => sql.push_str(" AND deleted_at IS NOT NULL"),
        DeletedFilter::All => {}
    }

    if let Some(title) = non_blank(query.title.as_deref()) {
        sql.push_str(" AND title LIKE ? ESCAPE '\\'");
        binds.push(Value::Text(contains_pattern(title)));
    }
    if let Some(author) = non_blank(query.author.as_deref()) {
        sql.push_str(" AND author LIKE ? ESCAPE '\\'");
        binds.push(Value::Text(contains_pattern(author)));
    }
    if let Some(keyword) = non_blank(query.keyword.as_deref()) {
        sql.push_str(" AND (title LIKE ? ESCAPE '\\' OR author LIKE ? ESCAPE '\\')");
        let pattern = contains_pattern(keyword);
        binds.push(Value::Text(pattern.clone()));
        binds.push(Value::Text(pattern));
    }
    if let Some(min_price) = query.min_price {
        sql.push_str(" AND price >= ?");
        binds.push(Value::Integer(min_price));
    }
    if let Some(max_price) = query.max_price {
        sql.push_str(" AND price <= ?");
        binds.push(Value::Integer(max_price));
    }
    if let Some(available) = query.available {
        sql.push_str(" AND available = ?");
        binds.push(Value::Integer(bool_to_int(available)));
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_book_row(row: &Row<'_>) -> RepoResult<Book> {
    let price: i64 = row.get("price")?;
    if price < 0 {
        return Err(RepoError::InvalidData(format!(
            "negative price `{price}` in books.price"
        )));
    }

    Ok(Book {
        id: row.get("id")?,
        title: row.get("title")?,
        author: row.get("author")?,
        isbn: row.get("isbn")?,
        price,
        available: int_to_bool(row.get("available")?, "books.available")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        deleted_at: row.get("deleted_at")?,
    })
}
