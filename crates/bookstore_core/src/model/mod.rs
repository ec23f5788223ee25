//! Bookstore domain model.
//!
//! # Responsibility
//! - Define persisted records (books, members, loans, orders).
//! - Validate write models before they reach repositories.
//!
//! # Invariants
//! - Timestamps are Unix epoch milliseconds.
//! - Money is an integer amount in the currency's minor unit.

pub mod book;
pub mod loan;
pub mod member;
pub mod order;
pub mod page;
pub mod validation;
