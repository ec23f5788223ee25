//! Timing decorator for repository implementations.
//!
//! # Responsibility
//! - Wrap any repository and emit one `repo_call` debug event per call.
//!
//! # Invariants
//! - Results pass through untouched; the wrapper never retries or maps errors.

use crate::model::book::{Book, BookDraft, BookId};
use crate::model::loan::{Loan, LoanId};
use crate::model::member::{Member, MemberDraft, MemberId, MembershipType};
use crate::model::order::{
    DailyOrderStatistics, NewOrderItem, Order, OrderId, OrderStatus, RevenueSummary,
    TopSellingBook,
};
use crate::repo::book_repo::{BookQuery, BookRepository};
use crate::repo::loan_repo::{LoanQuery, LoanRepository};
use crate::repo::member_repo::{MemberQuery, MemberRepository};
use crate::repo::order_repo::{OrderPeriod, OrderQuery, OrderRepository};
use crate::repo::RepoResult;
use log::debug;
use std::time::Instant;

/// Repository wrapper that logs the duration and outcome of every call.
#[derive(Debug, Clone)]
pub struct Logged<R> {
    inner: R,
}

impl<R> Logged<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn call<T>(&self, op: &'static str, f: impl FnOnce(&R) -> RepoResult<T>) -> RepoResult<T> {
        let started_at = Instant::now();
        let result = f(&self.inner);
        match &result {
            Ok(_) => debug!(
                "event=repo_call module=repo op={} status=ok duration_ms={}",
                op,
                started_at.elapsed().as_millis()
            ),
            Err(err) => debug!(
                "event=repo_call module=repo op={} status=error duration_ms={} error={}",
                op,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

impl<R: BookRepository> BookRepository for Logged<R> {
    fn create_book(&self, draft: &BookDraft, created_at: i64) -> RepoResult<Book> {
        self.call("create_book", |repo| repo.create_book(draft, created_at))
    }

    fn get_book(&self, id: BookId, include_deleted: bool) -> RepoResult<Option<Book>> {
        self.call("get_book", |repo| repo.get_book(id, include_deleted))
    }

    fn find_book_by_isbn(&self, isbn: &str, include_deleted: bool) -> RepoResult<Option<Book>> {
        self.call("find_book_by_isbn", |repo| {
            repo.find_book_by_isbn(isbn, include_deleted)
        })
    }

    fn isbn_exists(&self, isbn: &str) -> RepoResult<bool> {
        self.call("isbn_exists", |repo| repo.isbn_exists(isbn))
    }

    fn update_book(&self, book: &Book) -> RepoResult<()> {
        self.call("update_book", |repo| repo.update_book(book))
    }

    fn list_books(&self, query: &BookQuery) -> RepoResult<Vec<Book>> {
        self.call("list_books", |repo| repo.list_books(query))
    }

    fn count_books(&self, query: &BookQuery) -> RepoResult<u64> {
        self.call("count_books", |repo| repo.count_books(query))
    }
}

impl<R: MemberRepository> MemberRepository for Logged<R> {
    fn create_member(
        &self,
        draft: &MemberDraft,
        membership_type: MembershipType,
        join_date: i64,
    ) -> RepoResult<Member> {
        self.call("create_member", |repo| {
            repo.create_member(draft, membership_type, join_date)
        })
    }

    fn get_member(&self, id: MemberId) -> RepoResult<Option<Member>> {
        self.call("get_member", |repo| repo.get_member(id))
    }

    fn find_member_by_email(&self, email: &str) -> RepoResult<Option<Member>> {
        self.call("find_member_by_email", |repo| repo.find_member_by_email(email))
    }

    fn email_exists(&self, email: &str) -> RepoResult<bool> {
        self.call("email_exists", |repo| repo.email_exists(email))
    }

    fn update_member(&self, member: &Member) -> RepoResult<()> {
        self.call("update_member", |repo| repo.update_member(member))
    }

    fn delete_member(&self, id: MemberId) -> RepoResult<()> {
        self.call("delete_member", |repo| repo.delete_member(id))
    }

    fn list_members(&self, query: &MemberQuery) -> RepoResult<Vec<Member>> {
        self.call("list_members", |repo| repo.list_members(query))
    }

    fn count_members(&self, query: &MemberQuery) -> RepoResult<u64> {
        self.call("count_members", |repo| repo.count_members(query))
    }
}

impl<R: LoanRepository> LoanRepository for Logged<R> {
    fn create_loan(
        &self,
        member_id: MemberId,
        book_id: BookId,
        loan_date: i64,
        due_date: i64,
    ) -> RepoResult<Loan> {
        self.call("create_loan", |repo| {
            repo.create_loan(member_id, book_id, loan_date, due_date)
        })
    }

    fn get_loan(&self, id: LoanId) -> RepoResult<Option<Loan>> {
        self.call("get_loan", |repo| repo.get_loan(id))
    }

    fn update_loan(&self, loan: &Loan) -> RepoResult<()> {
        self.call("update_loan", |repo| repo.update_loan(loan))
    }

    fn list_loans(&self, query: &LoanQuery) -> RepoResult<Vec<Loan>> {
        self.call("list_loans", |repo| repo.list_loans(query))
    }

    fn count_active_loans_for_member(&self, member_id: MemberId) -> RepoResult<u32> {
        self.call("count_active_loans_for_member", |repo| {
            repo.count_active_loans_for_member(member_id)
        })
    }

    fn is_book_on_loan(&self, book_id: BookId) -> RepoResult<bool> {
        self.call("is_book_on_loan", |repo| repo.is_book_on_loan(book_id))
    }
}

impl<R: OrderRepository> OrderRepository for Logged<R> {
    fn create_order(
        &self,
        total_amount: i64,
        order_date: i64,
        status: OrderStatus,
        items: &[NewOrderItem],
    ) -> RepoResult<Order> {
        self.call("create_order", |repo| {
            repo.create_order(total_amount, order_date, status, items)
        })
    }

    fn get_order(&self, id: OrderId) -> RepoResult<Option<Order>> {
        self.call("get_order", |repo| repo.get_order(id))
    }

    fn replace_items(
        &self,
        id: OrderId,
        total_amount: i64,
        items: &[NewOrderItem],
    ) -> RepoResult<()> {
        self.call("replace_items", |repo| {
            repo.replace_items(id, total_amount, items)
        })
    }

    fn update_status(&self, id: OrderId, status: OrderStatus) -> RepoResult<()> {
        self.call("update_status", |repo| repo.update_status(id, status))
    }

    fn list_orders(&self, query: &OrderQuery) -> RepoResult<Vec<Order>> {
        self.call("list_orders", |repo| repo.list_orders(query))
    }

    fn count_orders(&self, query: &OrderQuery) -> RepoResult<u64> {
        self.call("count_orders", |repo| repo.count_orders(query))
    }

    fn count_by_status(&self, status: OrderStatus) -> RepoResult<u64> {
        self.call("count_by_status", |repo| repo.count_by_status(status))
    }

    fn revenue_summary(&self) -> RepoResult<RevenueSummary> {
        self.call("revenue_summary", |repo| repo.revenue_summary())
    }

    fn daily_statistics(&self, period: OrderPeriod) -> RepoResult<Vec<DailyOrderStatistics>> {
        self.call("daily_statistics", |repo| repo.daily_statistics(period))
    }

    fn top_selling_books(&self, limit: u32) -> RepoResult<Vec<TopSellingBook>> {
        self.call("top_selling_books", |repo| repo.top_selling_books(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::Logged;
    use crate::db::open_db_in_memory;
    use crate::model::book::BookDraft;
    use crate::repo::book_repo::{BookRepository, SqliteBookRepository};
    use crate::repo::RepoError;

    #[test]
    fn logged_repository_passes_results_through() {
        let conn = open_db_in_memory().expect("open db");
        let repo = Logged::new(SqliteBookRepository::new(&conn));

        let draft = BookDraft::new("Dune", "Frank Herbert", "9780441013593", 1999);
        let created = repo.create_book(&draft, 1_000).expect("create");
        let loaded = repo
            .get_book(created.id, false)
            .expect("get")
            .expect("book exists");
        assert_eq!(loaded, created);

        let mut missing = created;
        missing.id = 999;
        assert!(matches!(
            repo.update_book(&missing),
            Err(RepoError::NotFound { entity: "Book", id: 999 })
        ));
    }
}
