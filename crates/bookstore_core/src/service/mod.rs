//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Enforce business rules that span more than one record.
//! - Publish domain events after successful writes.
//!
//! # Invariants
//! - Services receive their collaborators through constructors and never
//!   open connections themselves.
//! - Callers wrap each service call in one transaction.

pub mod book_service;
pub mod error;
pub mod loan_service;
pub mod member_service;
pub mod order_service;

pub use error::{ServiceError, ServiceResult};
