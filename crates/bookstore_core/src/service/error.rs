//! Service-level error type shared by every use case.

use crate::model::validation::ValidationError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

pub const DELETED_BOOK_ACCESS: &str = "DELETED_BOOK_ACCESS";
pub const INVALID_BOOK_STATE: &str = "INVALID_BOOK_STATE";
pub const INVALID_PRICE_RANGE: &str = "INVALID_PRICE_RANGE";
pub const BOOK_NOT_AVAILABLE: &str = "BOOK_NOT_AVAILABLE";
pub const LOAN_LIMIT_EXCEEDED: &str = "LOAN_LIMIT_EXCEEDED";
pub const LOAN_ALREADY_RETURNED: &str = "LOAN_ALREADY_RETURNED";
pub const INVALID_ORDER_STATE: &str = "INVALID_ORDER_STATE";
pub const MEMBER_HAS_ACTIVE_LOANS: &str = "MEMBER_HAS_ACTIVE_LOANS";

/// Failure of a use-case call.
#[derive(Debug)]
pub enum ServiceError {
    NotFound { entity: &'static str, key: String },
    DuplicateEmail(String),
    DuplicateIsbn(String),
    Validation(ValidationError),
    /// Business rule rejected the call; `code` is one of the constants above.
    InvalidState { code: &'static str, message: String },
    MembershipUpgrade(String),
    Repo(RepoError),
}

impl ServiceError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn invalid_state(code: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidState {
            code,
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "ENTITY_NOT_FOUND",
            Self::DuplicateEmail(_) => "DUPLICATE_EMAIL",
            Self::DuplicateIsbn(_) => "DUPLICATE_ISBN",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::InvalidState { code, .. } => *code,
            Self::MembershipUpgrade(_) => "MEMBERSHIP_UPGRADE_ERROR",
            Self::Repo(RepoError::AmountOverflow(_)) => "AMOUNT_OVERFLOW",
            Self::Repo(_) => "INTERNAL_ERROR",
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::DuplicateEmail(email) => write!(f, "email already registered: {email}"),
            Self::DuplicateIsbn(isbn) => write!(f, "isbn already exists: {isbn}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::InvalidState { message, .. } => f.write_str(message),
            Self::MembershipUpgrade(message) => f.write_str(message),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::not_found(entity, id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}
