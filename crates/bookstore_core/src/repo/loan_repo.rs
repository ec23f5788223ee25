//! Loan repository contract and SQLite implementation.

use crate::model::book::BookId;
use crate::model::loan::{Loan, LoanId};
use crate::model::member::MemberId;
use crate::repo::{push_window, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const LOAN_SELECT_SQL: &str = "SELECT
    id,
    member_id,
    book_id,
    loan_date,
    due_date,
    return_date
FROM loans";

/// Filter options for loan lists. Results are ordered by loan date, newest
/// first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanQuery {
    pub member_id: Option<MemberId>,
    pub active_only: bool,
    /// Keeps only active loans whose due date is before this instant.
    pub overdue_at: Option<i64>,
    pub limit: Option<u32>,
    pub offset: u64,
}

/// Repository interface for loan persistence.
pub trait LoanRepository {
    fn create_loan(
        &self,
        member_id: MemberId,
        book_id: BookId,
        loan_date: i64,
        due_date: i64,
    ) -> RepoResult<Loan>;
    fn get_loan(&self, id: LoanId) -> RepoResult<Option<Loan>>;
    fn update_loan(&self, loan: &Loan) -> RepoResult<()>;
    fn list_loans(&self, query: &LoanQuery) -> RepoResult<Vec<Loan>>;
    fn count_active_loans_for_member(&self, member_id: MemberId) -> RepoResult<u32>;
    fn is_book_on_loan(&self, book_id: BookId) -> RepoResult<bool>;
}

/// SQLite-backed loan repository.
pub struct SqliteLoanRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLoanRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LoanRepository for SqliteLoanRepository<'_> {
    fn create_loan(
        &self,
        member_id: MemberId,
        book_id: BookId,
        loan_date: i64,
        due_date: i64,
    ) -> RepoResult<Loan> {
        self.conn.execute(
            "INSERT INTO loans (member_id, book_id, loan_date, due_date)
             VALUES (?1, ?2, ?3, ?4);",
            params![member_id, book_id, loan_date, due_date],
        )?;

        Ok(Loan {
            id: self.conn.last_insert_rowid(),
            member_id,
            book_id,
            loan_date,
            due_date,
            return_date: None,
        })
    }

    fn get_loan(&self, id: LoanId) -> RepoResult<Option<Loan>> {
        let loan = self
            .conn
            .query_row(
                &format!("{LOAN_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_loan_row,
            )
            .optional()?;
        Ok(loan)
    }

    fn update_loan(&self, loan: &Loan) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE loans
             SET due_date = ?1, return_date = ?2
             WHERE id = ?3;",
            params![loan.due_date, loan.return_date, loan.id],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "Loan",
                id: loan.id,
            });
        }
        Ok(())
    }

    fn list_loans(&self, query: &LoanQuery) -> RepoResult<Vec<Loan>> {
        let mut sql = format!("{LOAN_SELECT_SQL} WHERE 1 = 1");
        let mut binds = Vec::new();

        if let Some(member_id) = query.member_id {
            sql.push_str(" AND member_id = ?");
            binds.push(Value::Integer(member_id));
        }
        if query.active_only || query.overdue_at.is_some() {
            sql.push_str(" AND return_date IS NULL");
        }
        if let Some(now_ms) = query.overdue_at {
            sql.push_str(" AND due_date < ?");
            binds.push(Value::Integer(now_ms));
        }

        sql.push_str(" ORDER BY loan_date DESC, id DESC");
        push_window(&mut sql, &mut binds, query.limit, query.offset);

        let mut stmt = self.conn.prepare(&sql)?;
        let loans = stmt
            .query_map(params_from_iter(binds), parse_loan_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(loans)
    }

    fn count_active_loans_for_member(&self, member_id: MemberId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM loans WHERE member_id = ?1 AND return_date IS NULL;",
            [member_id],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn is_book_on_loan(&self, book_id: BookId) -> RepoResult<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM loans WHERE book_id = ?1 AND return_date IS NULL LIMIT 1;",
                [book_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

fn parse_loan_row(row: &Row<'_>) -> rusqlite::Result<Loan> {
    Ok(Loan {
        id: row.get("id")?,
        member_id: row.get("member_id")?,
        book_id: row.get("book_id")?,
        loan_date: row.get("loan_date")?,
        due_date: row.get("due_date")?,
        return_date: row.get("return_date")?,
    })
}
