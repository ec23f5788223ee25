//! Loan model.
//!
//! A loan is active while `return_date` is unset.

use crate::model::book::BookId;
use crate::model::member::MemberId;
use serde::{Deserialize, Serialize};

pub type LoanId = i64;

pub const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: LoanId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub loan_date: i64,
    pub due_date: i64,
    pub return_date: Option<i64>,
}

impl Loan {
    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now_ms: i64) -> bool {
        self.is_active() && self.due_date < now_ms
    }
}

/// Computes the due date for a loan starting at `loan_date`.
pub fn due_date_after(loan_date: i64, period_days: u32) -> i64 {
    loan_date.saturating_add(i64::from(period_days).saturating_mul(DAY_MS))
}
