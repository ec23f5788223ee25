//! SQLite-backed storage for books, members, loans and orders.
//!
//! # Responsibility
//! - One trait per aggregate, shaped by what the services ask for.
//! - Keep SQL text and row decoding out of `service`.
//!
//! # Invariants
//! - Missing rows on update/delete surface as `RepoError::NotFound`.
//! - Rows whose enum columns fail to decode are reported, never defaulted.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod book_repo;
pub mod loan_repo;
pub mod logged;
pub mod member_repo;
pub mod order_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    InvalidData(String),
    /// An aggregate amount does not fit in an `i64`.
    AmountOverflow(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "no {entity} with id {id}"),
            Self::InvalidData(message) => write!(f, "stored row is unreadable: {message}"),
            Self::AmountOverflow(what) => write!(f, "{what} exceeds the largest supported amount"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) | Self::AmountOverflow(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Sort direction for list queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    /// Parses `asc`/`desc` case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Appends `LIMIT`/`OFFSET` clauses the way SQLite expects them.
pub(crate) fn push_window(
    sql: &mut String,
    binds: &mut Vec<rusqlite::types::Value>,
    limit: Option<u32>,
    offset: u64,
) {
    use rusqlite::types::Value;

    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        binds.push(Value::Integer(i64::from(limit)));
        if offset > 0 {
            sql.push_str(" OFFSET ?");
            binds.push(Value::Integer(offset));
        }
    } else if offset > 0 {
        sql.push_str(" LIMIT -1 OFFSET ?");
        binds.push(Value::Integer(offset));
    }
}

/// Builds a `LIKE` pattern matching `needle` anywhere, with `\` as escape.
pub(crate) fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn count_to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

/// Amounts are summed in SQL as `(x / AMOUNT_SPLIT, x % AMOUNT_SPLIT)` so
/// SQLite's `SUM` never leaves the `i64` range.
pub(crate) const AMOUNT_SPLIT: i64 = 1_000_000_000;

/// `SUM` expressions for the high and low halves of `expr`.
pub(crate) fn split_sum_sql(expr: &str) -> String {
    format!(
        "COALESCE(SUM(({expr}) / {AMOUNT_SPLIT}), 0), COALESCE(SUM(({expr}) % {AMOUNT_SPLIT}), 0)"
    )
}

/// Recombines the halves produced by `split_sum_sql`.
pub(crate) fn join_split_sum(high: i64, low: i64, what: &'static str) -> RepoResult<i64> {
    let total = i128::from(high) * i128::from(AMOUNT_SPLIT) + i128::from(low);
    i64::try_from(total).map_err(|_| RepoError::AmountOverflow(what))
}

#[cfg(test)]
mod tests {
    use super::{contains_pattern, join_split_sum, push_window, RepoError, SortDirection, AMOUNT_SPLIT};

    #[test]
    fn contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!(SortDirection::parse("ASC"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse(" desc "), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("sideways"), None);
    }

    #[test]
    fn split_sums_recombine_up_to_i64_max() {
        let high = i64::MAX / AMOUNT_SPLIT;
        let low = i64::MAX % AMOUNT_SPLIT;
        assert_eq!(join_split_sum(high, low, "revenue").unwrap(), i64::MAX);
        assert!(matches!(
            join_split_sum(high, low + 1, "revenue"),
            Err(RepoError::AmountOverflow("revenue"))
        ));
    }

    #[test]
    fn window_without_limit_uses_negative_limit() {
        let mut sql = String::new();
        let mut binds = Vec::new();
        push_window(&mut sql, &mut binds, None, 20);
        assert_eq!(sql, " LIMIT -1 OFFSET ?");
        assert_eq!(binds.len(), 1);
    }
}
