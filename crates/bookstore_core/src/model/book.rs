//! Book catalog model.
//!
//! # Invariants
//! - `isbn` is stored in normalized form (digits, optional trailing `X`).
//! - `price` is an integer amount in the currency's minor unit within
//!   `0..=PRICE_MAX`.
//! - `deleted_at` is the source of truth for soft-delete state.

use crate::model::validation::ValidationError;
use serde::{Deserialize, Serialize};

pub type BookId = i64;

pub const TITLE_MAX_CHARS: usize = 200;
pub const AUTHOR_MAX_CHARS: usize = 100;
/// Largest accepted price, in minor units.
pub const PRICE_MAX: i64 = 100_000_000_000;

/// Persisted catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub price: i64,
    pub available: bool,
    pub created_at: i64,
    pub updated_at: Option<i64>,
    /// Soft delete tombstone. Rows are never removed.
    pub deleted_at: Option<i64>,
}

impl Book {
    /// Returns whether this book is visible to catalog reads.
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }

    pub fn soft_delete(&mut self, now_ms: i64) {
        self.deleted_at = Some(now_ms);
        self.updated_at = Some(now_ms);
    }

    pub fn restore(&mut self, now_ms: i64) {
        self.deleted_at = None;
        self.updated_at = Some(now_ms);
    }

    /// Overwrites editable fields from an already validated draft.
    pub fn apply(&mut self, draft: &BookDraft, now_ms: i64) {
        self.title = draft.title.clone();
        self.author = draft.author.clone();
        self.isbn = draft.isbn.clone();
        self.price = draft.price;
        self.available = draft.available;
        self.updated_at = Some(now_ms);
    }
}

/// Write model for create and full-replacement update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub price: i64,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl BookDraft {
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
        price: i64,
    ) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
            price,
            available: true,
        }
    }

    /// Validates fields and returns a copy with trimmed text and normalized ISBN.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push("title", Some(&self.title), "title is required");
        } else if title.chars().count() > TITLE_MAX_CHARS {
            errors.push(
                "title",
                Some(&self.title),
                format!("title must be at most {TITLE_MAX_CHARS} characters"),
            );
        }

        let author = self.author.trim();
        if author.is_empty() {
            errors.push("author", Some(&self.author), "author is required");
        } else if author.chars().count() > AUTHOR_MAX_CHARS {
            errors.push(
                "author",
                Some(&self.author),
                format!("author must be at most {AUTHOR_MAX_CHARS} characters"),
            );
        }

        let isbn = if self.isbn.trim().is_empty() {
            errors.push("isbn", Some(&self.isbn), "isbn is required");
            None
        } else {
            let normalized = normalize_isbn(&self.isbn);
            if normalized.is_none() {
                errors.push(
                    "isbn",
                    Some(&self.isbn),
                    "isbn must contain 10 or 13 digits",
                );
            }
            normalized
        };

        if self.price < 0 {
            errors.push(
                "price",
                Some(&self.price.to_string()),
                "price must be zero or greater",
            );
        } else if self.price > PRICE_MAX {
            errors.push(
                "price",
                Some(&self.price.to_string()),
                format!("price must be at most {PRICE_MAX}"),
            );
        }

        errors.into_result()?;
        Ok(Self {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.unwrap_or_default(),
            price: self.price,
            available: self.available,
        })
    }
}

/// Normalizes an ISBN-10 or ISBN-13 by dropping separators.
///
/// Returns `None` when the remaining characters do not form a valid shape.
/// Checksums are not verified.
pub fn normalize_isbn(raw: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|ch| *ch != '-' && !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();

    let valid = match compact.len() {
        13 => compact.chars().all(|ch| ch.is_ascii_digit()),
        10 => {
            let (body, check) = compact.split_at(9);
            body.chars().all(|ch| ch.is_ascii_digit())
                && check.chars().all(|ch| ch.is_ascii_digit() || ch == 'X')
        }
        _ => false,
    };

    valid.then_some(compact)
}

/// Catalog counters including soft-deleted rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStatistics {
    pub total_books: u64,
    pub active_books: u64,
    pub deleted_books: u64,
}
