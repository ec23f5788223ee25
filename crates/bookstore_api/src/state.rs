//! Shared handler state and the per-request transaction scope.
//!
//! # Invariants
//! - Every handler touches the database through `AppState::transaction`.
//! - A unit of work commits only when it returns `Ok`; any error rolls back.
//! - A panic inside a unit of work drops its transaction, which rolls back,
//!   so a poisoned connection lock is taken over rather than reported.
//!
//! Units of work are short synchronous SQLite calls and run on the calling
//! runtime worker. Requests queue on the single connection lock, so they
//! never overlap in the database.

use crate::error::ApiError;
use bookstore_core::repo::book_repo::SqliteBookRepository;
use bookstore_core::repo::loan_repo::SqliteLoanRepository;
use bookstore_core::repo::member_repo::SqliteMemberRepository;
use bookstore_core::repo::order_repo::SqliteOrderRepository;
use bookstore_core::{
    BookService, Clock, EventBus, LoanService, Logged, MemberService, OrderService, ServiceResult,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex, PoisonError};

pub type BookRepo<'c> = Logged<SqliteBookRepository<'c>>;
pub type MemberRepo<'c> = Logged<SqliteMemberRepository<'c>>;
pub type LoanRepo<'c> = Logged<SqliteLoanRepository<'c>>;
pub type OrderRepo<'c> = Logged<SqliteOrderRepository<'c>>;

#[derive(Clone)]
pub struct AppState {
    conn: Arc<Mutex<Connection>>,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    loan_period_days: u32,
}

impl AppState {
    pub fn new(
        conn: Connection,
        events: EventBus,
        clock: Arc<dyn Clock>,
        loan_period_days: u32,
    ) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            events: Arc::new(events),
            clock,
            loan_period_days,
        }
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Runs `work` inside one SQLite transaction while holding the connection.
    pub fn transaction<T>(
        &self,
        work: impl FnOnce(&Services<'_>) -> ServiceResult<T>,
    ) -> Result<T, ApiError> {
        let mut conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let tx = conn.transaction()?;
        let services = Services {
            conn: &tx,
            state: self,
        };
        let value = work(&services)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Service factory bound to one open transaction.
pub struct Services<'c> {
    conn: &'c Connection,
    state: &'c AppState,
}

impl<'c> Services<'c> {
    pub fn books(&self) -> BookService<BookRepo<'c>> {
        BookService::new(
            Logged::new(SqliteBookRepository::new(self.conn)),
            Arc::clone(&self.state.clock),
        )
    }

    pub fn members(&self) -> MemberService<MemberRepo<'c>, LoanRepo<'c>> {
        MemberService::new(
            Logged::new(SqliteMemberRepository::new(self.conn)),
            Logged::new(SqliteLoanRepository::new(self.conn)),
            Arc::clone(&self.state.events),
            Arc::clone(&self.state.clock),
        )
    }

    pub fn loans(&self) -> LoanService<LoanRepo<'c>, MemberRepo<'c>, BookRepo<'c>> {
        LoanService::new(
            Logged::new(SqliteLoanRepository::new(self.conn)),
            Logged::new(SqliteMemberRepository::new(self.conn)),
            Logged::new(SqliteBookRepository::new(self.conn)),
            Arc::clone(&self.state.clock),
            self.state.loan_period_days,
        )
    }

    pub fn orders(&self) -> OrderService<OrderRepo<'c>, BookRepo<'c>> {
        OrderService::new(
            Logged::new(SqliteOrderRepository::new(self.conn)),
            Logged::new(SqliteBookRepository::new(self.conn)),
            Arc::clone(&self.state.events),
            Arc::clone(&self.state.clock),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use bookstore_core::{open_db_in_memory, BookDraft, EventBus, FixedClock, ServiceResult};
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(
            open_db_in_memory().unwrap(),
            EventBus::new(),
            Arc::new(FixedClock::new(0)),
            14,
        )
    }

    #[test]
    fn panicking_unit_of_work_rolls_back_and_releases_connection() {
        let state = state();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = state.transaction(|services| -> ServiceResult<()> {
                services
                    .books()
                    .create_book(&BookDraft::new("Dune", "Frank Herbert", "9780441013593", 1999))?;
                panic!("unit of work failed midway");
            });
        }));
        assert!(outcome.is_err());

        let count = state
            .transaction(|services| Ok(services.books().statistics()?.total_books))
            .unwrap();
        assert_eq!(count, 0);
    }
}
