//! Catalog export and import formats.
//!
//! # Responsibility
//! - Render book lists through a fixed header/rows/footer algorithm.
//! - Adapt the external tab-separated catalog feed to `BookDraft`.

use crate::model::book::Book;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod feed;

pub use feed::CatalogFeedAdapter;

#[derive(Debug)]
pub enum ExportError {
    Json(serde_json::Error),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "json encode failed: {err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Export format with a fixed rendering skeleton.
///
/// Implementors supply the steps; `export` decides their order.
pub trait BookExporter {
    fn content_type(&self) -> &'static str;

    fn header(&self) -> Option<String> {
        None
    }

    fn row(&self, book: &Book) -> Result<String, ExportError>;

    fn footer(&self, _row_count: usize) -> Option<String> {
        None
    }

    /// Renders `books` as header, one line per book, then footer.
    fn export(&self, books: &[Book]) -> Result<String, ExportError> {
        let mut out = String::new();
        if let Some(header) = self.header() {
            out.push_str(&header);
            out.push('\n');
        }
        for book in books {
            out.push_str(&self.row(book)?);
            out.push('\n');
        }
        if let Some(footer) = self.footer(books.len()) {
            out.push_str(&footer);
            out.push('\n');
        }
        Ok(out)
    }
}

/// RFC 4180 style CSV with a header row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

impl BookExporter for CsvExporter {
    fn content_type(&self) -> &'static str {
        "text/csv; charset=utf-8"
    }

    fn header(&self) -> Option<String> {
        Some("id,title,author,isbn,price,available".to_string())
    }

    fn row(&self, book: &Book) -> Result<String, ExportError> {
        Ok(format!(
            "{},{},{},{},{},{}",
            book.id,
            csv_field(&book.title),
            csv_field(&book.author),
            book.isbn,
            book.price,
            book.available
        ))
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// One JSON object per line, same keys as the HTTP API.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLinesExporter;

impl BookExporter for JsonLinesExporter {
    fn content_type(&self) -> &'static str {
        "application/x-ndjson"
    }

    fn row(&self, book: &Book) -> Result<String, ExportError> {
        Ok(serde_json::to_string(book)?)
    }
}

/// Selectable export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    JsonLines,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "jsonl" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    pub fn exporter(self) -> Box<dyn BookExporter + Send + Sync> {
        match self {
            Self::Csv => Box::new(CsvExporter),
            Self::JsonLines => Box::new(JsonLinesExporter),
        }
    }
}
