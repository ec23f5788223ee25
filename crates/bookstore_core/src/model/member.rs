//! Member and membership tier model.
//!
//! # Invariants
//! - `email` is unique across members (enforced by storage and service).
//! - Only `Regular -> Premium` is an allowed upgrade.

use crate::model::validation::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub type MemberId = i64;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const EMAIL_MAX_CHARS: usize = 100;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));

/// Membership tier governing loan limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipType {
    Regular,
    Premium,
    Suspended,
}

impl MembershipType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "REGULAR",
            Self::Premium => "PREMIUM",
            Self::Suspended => "SUSPENDED",
        }
    }

    /// Maximum number of simultaneous loans for this tier.
    pub fn max_loans(self) -> u32 {
        match self {
            Self::Regular => 5,
            Self::Premium => 10,
            Self::Suspended => 0,
        }
    }

    pub fn can_upgrade_to(self, target: Self) -> bool {
        matches!((self, target), (Self::Regular, Self::Premium))
    }
}

impl Display for MembershipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MembershipType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "REGULAR" => Ok(Self::Regular),
            "PREMIUM" => Ok(Self::Premium),
            "SUSPENDED" => Ok(Self::Suspended),
            other => Err(format!("unknown membership type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub name: String,
    pub email: String,
    pub membership_type: MembershipType,
    pub join_date: i64,
}

/// Write model for member registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub email: String,
    /// Defaults to `Regular` when omitted.
    #[serde(default)]
    pub membership_type: Option<MembershipType>,
}

impl MemberDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            membership_type: None,
        }
    }

    /// Validates fields and returns a copy with trimmed values.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let name = self.name.trim();
        let email = self.email.trim();
        check_name(name, &self.name, &mut errors);
        check_email(email, &self.email, &mut errors);
        errors.into_result()?;

        Ok(Self {
            name: name.to_string(),
            email: email.to_string(),
            membership_type: self.membership_type,
        })
    }
}

/// Partial update; blank or missing fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl MemberUpdate {
    /// Drops blank fields, then validates what remains.
    pub fn normalized(&self) -> Result<Self, ValidationError> {
        let mut errors = ValidationError::new();
        let name = non_blank(self.name.as_deref());
        let email = non_blank(self.email.as_deref());

        if let Some(value) = name {
            check_name(value, value, &mut errors);
        }
        if let Some(value) = email {
            check_email(value, value, &mut errors);
        }
        errors.into_result()?;

        Ok(Self {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn check_name(name: &str, raw: &str, errors: &mut ValidationError) {
    let chars = name.chars().count();
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&chars) {
        errors.push(
            "name",
            Some(raw),
            format!("name must be between {NAME_MIN_CHARS} and {NAME_MAX_CHARS} characters"),
        );
    }
}

fn check_email(email: &str, raw: &str, errors: &mut ValidationError) {
    if email.is_empty() {
        errors.push("email", Some(raw), "email is required");
    } else if email.chars().count() > EMAIL_MAX_CHARS || !EMAIL_RE.is_match(email) {
        errors.push("email", Some(raw), "email format is invalid");
    }
}

/// Loan allowance derived from tier and active loans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberLoanLimit {
    pub member_id: MemberId,
    pub member_name: String,
    pub membership_type: MembershipType,
    pub max_loan_count: u32,
    pub current_loan_count: u32,
    pub remaining_loan_count: u32,
    pub can_loan: bool,
}

impl MemberLoanLimit {
    pub fn compute(member: &Member, current_loan_count: u32) -> Self {
        let max_loan_count = member.membership_type.max_loans();
        let remaining_loan_count = max_loan_count.saturating_sub(current_loan_count);
        Self {
            member_id: member.id,
            member_name: member.name.clone(),
            membership_type: member.membership_type,
            max_loan_count,
            current_loan_count,
            remaining_loan_count,
            can_loan: member.membership_type != MembershipType::Suspended
                && remaining_loan_count > 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Member, MemberDraft, MemberLoanLimit, MemberUpdate, MembershipType};

    fn member(tier: MembershipType) -> Member {
        Member {
            id: 1,
            name: "Hong".to_string(),
            email: "hong@example.com".to_string(),
            membership_type: tier,
            join_date: 0,
        }
    }

    #[test]
    fn only_regular_to_premium_upgrade_is_allowed() {
        assert!(MembershipType::Regular.can_upgrade_to(MembershipType::Premium));
        assert!(!MembershipType::Regular.can_upgrade_to(MembershipType::Regular));
        assert!(!MembershipType::Premium.can_upgrade_to(MembershipType::Regular));
        assert!(!MembershipType::Suspended.can_upgrade_to(MembershipType::Premium));
    }

    #[test]
    fn loan_limit_saturates_at_zero() {
        let limit = MemberLoanLimit::compute(&member(MembershipType::Regular), 7);
        assert_eq!(limit.max_loan_count, 5);
        assert_eq!(limit.remaining_loan_count, 0);
        assert!(!limit.can_loan);
    }

    #[test]
    fn suspended_members_cannot_loan() {
        let limit = MemberLoanLimit::compute(&member(MembershipType::Suspended), 0);
        assert_eq!(limit.max_loan_count, 0);
        assert!(!limit.can_loan);
    }

    #[test]
    fn draft_rejects_short_name_and_bad_email() {
        let error = MemberDraft::new("A", "not-an-email")
            .normalized()
            .expect_err("draft should be invalid");
        assert_eq!(error.violations().len(), 2);
    }

    #[test]
    fn update_ignores_blank_fields() {
        let update = MemberUpdate {
            name: Some("   ".to_string()),
            email: Some(" new@example.com ".to_string()),
        };
        let normalized = update.normalized().expect("update should be valid");
        assert_eq!(normalized.name, None);
        assert_eq!(normalized.email.as_deref(), Some("new@example.com"));
    }
}
