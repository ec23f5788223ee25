//! Field-level validation results shared by all write models.

use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One rejected field with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldViolation {
    pub field: &'static str,
    pub rejected_value: Option<String>,
    pub message: String,
}

/// Collected violations for one write model.
///
/// An empty collection never escapes `into_result`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an error holding exactly one violation.
    pub fn single(
        field: &'static str,
        rejected_value: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        let mut error = Self::new();
        error.push(field, rejected_value, message);
        error
    }

    pub fn push(
        &mut self,
        field: &'static str,
        rejected_value: Option<&str>,
        message: impl Into<String>,
    ) {
        self.violations.push(FieldViolation {
            field,
            rejected_value: rejected_value.map(str::to_string),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Returns `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed")?;
        for (index, violation) in self.violations.iter().enumerate() {
            let separator = if index == 0 { ": " } else { "; " };
            write!(f, "{separator}{} {}", violation.field, violation.message)?;
        }
        Ok(())
    }
}

impl Error for ValidationError {}
