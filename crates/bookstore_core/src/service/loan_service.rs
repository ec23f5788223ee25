//! Lending use cases.
//!
//! # Invariants
//! - A book has at most one active loan.
//! - A member never holds more active loans than their tier allows.
//! - Borrowing clears the book's `available` flag; returning sets it again.

use crate::clock::Clock;
use crate::model::book::BookId;
use crate::model::loan::{due_date_after, Loan, LoanId};
use crate::model::member::{MemberId, MemberLoanLimit};
use crate::repo::book_repo::BookRepository;
use crate::repo::loan_repo::{LoanQuery, LoanRepository};
use crate::repo::member_repo::MemberRepository;
use crate::service::error::{
    ServiceError, ServiceResult, BOOK_NOT_AVAILABLE, DELETED_BOOK_ACCESS, LOAN_ALREADY_RETURNED,
    LOAN_LIMIT_EXCEEDED,
};
use log::info;
use std::sync::Arc;

pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

pub struct LoanService<L, M, B>
where
    L: LoanRepository,
    M: MemberRepository,
    B: BookRepository,
{
    loans: L,
    members: M,
    books: B,
    clock: Arc<dyn Clock>,
    period_days: u32,
}

impl<L, M, B> LoanService<L, M, B>
where
    L: LoanRepository,
    M: MemberRepository,
    B: BookRepository,
{
    pub fn new(loans: L, members: M, books: B, clock: Arc<dyn Clock>, period_days: u32) -> Self {
        Self {
            loans,
            members,
            books,
            clock,
            period_days,
        }
    }

    /// Lends `book_id` to `member_id` for the configured period.
    pub fn borrow_book(&self, member_id: MemberId, book_id: BookId) -> ServiceResult<Loan> {
        let member = self
            .members
            .get_member(member_id)?
            .ok_or_else(|| ServiceError::not_found("Member", member_id))?;
        let current = self.loans.count_active_loans_for_member(member_id)?;
        let limit = MemberLoanLimit::compute(&member, current);
        if !limit.can_loan {
            return Err(ServiceError::invalid_state(
                LOAN_LIMIT_EXCEEDED,
                format!(
                    "member {member_id} ({}) holds {current} of {} allowed loans",
                    member.membership_type, limit.max_loan_count
                ),
            ));
        }

        let mut book = self
            .books
            .get_book(book_id, true)?
            .ok_or_else(|| ServiceError::not_found("Book", book_id))?;
        if !book.is_active() {
            return Err(ServiceError::invalid_state(
                DELETED_BOOK_ACCESS,
                format!("deleted book cannot be borrowed: {book_id}"),
            ));
        }
        if !book.available || self.loans.is_book_on_loan(book_id)? {
            return Err(ServiceError::invalid_state(
                BOOK_NOT_AVAILABLE,
                format!("book is not available for loan: {book_id}"),
            ));
        }

        let now = self.clock.now_ms();
        let loan = self.loans.create_loan(
            member_id,
            book_id,
            now,
            due_date_after(now, self.period_days),
        )?;

        book.available = false;
        book.updated_at = Some(now);
        self.books.update_book(&book)?;

        info!(
            "event=loan_create module=service status=ok loan_id={} member_id={member_id} book_id={book_id}",
            loan.id
        );
        Ok(loan)
    }

    pub fn return_book(&self, id: LoanId) -> ServiceResult<Loan> {
        let mut loan = self.get_loan(id)?;
        if !loan.is_active() {
            return Err(ServiceError::invalid_state(
                LOAN_ALREADY_RETURNED,
                format!("loan is already returned: {id}"),
            ));
        }

        let now = self.clock.now_ms();
        loan.return_date = Some(now);
        self.loans.update_loan(&loan)?;

        if let Some(mut book) = self.books.get_book(loan.book_id, true)? {
            book.available = true;
            book.updated_at = Some(now);
            self.books.update_book(&book)?;
        }

        info!(
            "event=loan_return module=service status=ok loan_id={id} overdue={}",
            loan.due_date < now
        );
        Ok(loan)
    }

    pub fn get_loan(&self, id: LoanId) -> ServiceResult<Loan> {
        self.loans
            .get_loan(id)?
            .ok_or_else(|| ServiceError::not_found("Loan", id))
    }

    /// Full loan history of one member, newest first.
    pub fn loans_for_member(&self, member_id: MemberId) -> ServiceResult<Vec<Loan>> {
        if self.members.get_member(member_id)?.is_none() {
            return Err(ServiceError::not_found("Member", member_id));
        }
        Ok(self.loans.list_loans(&LoanQuery {
            member_id: Some(member_id),
            ..LoanQuery::default()
        })?)
    }

    pub fn active_loans(&self) -> ServiceResult<Vec<Loan>> {
        Ok(self.loans.list_loans(&LoanQuery {
            active_only: true,
            ..LoanQuery::default()
        })?)
    }

    pub fn overdue_loans(&self) -> ServiceResult<Vec<Loan>> {
        Ok(self.loans.list_loans(&LoanQuery {
            overdue_at: Some(self.clock.now_ms()),
            ..LoanQuery::default()
        })?)
    }
}
