//! Bookstore domain core: catalog, members, loans and orders over SQLite.
//!
//! # Responsibility
//! - Own every business rule; outer crates only translate transport.
//! - Expose services that run against any repository implementation.

pub mod clock;
pub mod db;
pub mod event;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, FixedClock, SystemClock};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use event::{DomainEvent, EmailNotifier, EventBus, EventListener, LogEmailSender};
pub use export::{BookExporter, CatalogFeedAdapter, CsvExporter, ExportFormat, JsonLinesExporter};
pub use logging::{
    default_log_level, init_logging, logging_status, LogLevel, LogSettings, LogTarget, LoggingError,
};
pub use model::book::{Book, BookDraft, BookId, BookStatistics};
pub use model::loan::{Loan, LoanId};
pub use model::member::{Member, MemberDraft, MemberId, MemberLoanLimit, MemberUpdate, MembershipType};
pub use model::order::{Order, OrderId, OrderItem, OrderStatistics, OrderStatus};
pub use model::page::{Page, PageRequest};
pub use model::validation::{FieldViolation, ValidationError};
pub use repo::logged::Logged;
pub use repo::{RepoError, RepoResult, SortDirection};
pub use service::book_service::{BookSearch, BookService};
pub use service::loan_service::{LoanService, DEFAULT_LOAN_PERIOD_DAYS};
pub use service::member_service::MemberService;
pub use service::order_service::{OrderService, OrderSorting};
pub use service::{ServiceError, ServiceResult};

/// Version of this crate, reported by `/health` and the CLI.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
