//! Pure validation rules shared by group and item mutations.
//!
//! # Responsibility
//! - Normalize and check display names before they enter the store.
//! - Provide the case-insensitive duplicate probe used for both groups and
//!   items.
//!
//! # Invariants
//! - Validation never mutates caller state; rejected input leaves the
//!   collection exactly as it was.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Shortest display name accepted after trimming.
pub const MIN_NAME_CHARS: usize = 2;

static HEX_COLOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid hex color regex"));

/// Rejection reasons raised at the mutation boundary.
///
/// The store performs no partial work when validation fails; surfacing the
/// condition to the end user is the presentation layer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Name is empty after trimming.
    NameRequired,
    /// Name is shorter than [`MIN_NAME_CHARS`] after trimming.
    NameTooShort,
    /// Another sibling already uses this name (case-insensitive).
    DuplicateName(String),
    /// Counter step must be at least 1.
    InvalidStep,
    /// Color is not a `#RRGGBB` hex literal.
    InvalidColor(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NameRequired => write!(f, "name is required"),
            Self::NameTooShort => {
                write!(f, "name must be at least {MIN_NAME_CHARS} characters")
            }
            Self::DuplicateName(name) => write!(f, "name already in use: {name}"),
            Self::InvalidStep => write!(f, "step must be a positive integer"),
            Self::InvalidColor(value) => write!(f, "invalid hex color: {value}"),
        }
    }
}

impl Error for ValidationError {}

/// Record with a stable identity and a display name.
///
/// Lets [`name_exists`] serve group collections and item lists through one
/// implementation.
pub trait NamedRecord {
    fn record_id(&self) -> Uuid;
    fn record_name(&self) -> &str;
}

/// Trims and checks a display name, returning the normalized form.
pub fn validate_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::NameRequired);
    }
    if trimmed.chars().count() < MIN_NAME_CHARS {
        return Err(ValidationError::NameTooShort);
    }
    Ok(trimmed.to_string())
}

/// Case-insensitive duplicate probe over any named collection.
///
/// `exclude` skips one record by id so a rename does not collide with
/// itself.
pub fn name_exists<T: NamedRecord>(name: &str, records: &[T], exclude: Option<Uuid>) -> bool {
    let needle = name.trim().to_lowercase();
    records.iter().any(|record| {
        exclude != Some(record.record_id())
            && record.record_name().trim().to_lowercase() == needle
    })
}

/// Checks that a counter step is usable (strictly positive).
pub fn validate_step(step: u32) -> Result<u32, ValidationError> {
    if step == 0 {
        return Err(ValidationError::InvalidStep);
    }
    Ok(step)
}

/// Checks a `#RRGGBB` color literal.
pub fn validate_color(value: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{name_exists, validate_color, validate_name, validate_step, ValidationError};
    use crate::model::group::Group;
    use chrono::Utc;

    fn group(name: &str) -> Group {
        Group::new(name, "#1A237E", "Lena", "Pixel 7", Utc::now())
    }

    #[test]
    fn validate_name_trims_and_accepts() {
        assert_eq!(validate_name("  Orders  ").unwrap(), "Orders");
    }

    #[test]
    fn validate_name_rejects_blank_and_short_input() {
        assert_eq!(validate_name("   "), Err(ValidationError::NameRequired));
        assert_eq!(validate_name("x"), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn name_exists_is_case_insensitive() {
        let groups = vec![group("Orders")];
        assert!(name_exists("orders", &groups, None));
        assert!(name_exists("  ORDERS ", &groups, None));
        assert!(!name_exists("Returns", &groups, None));
    }

    #[test]
    fn name_exists_can_exclude_the_record_being_renamed() {
        let groups = vec![group("Orders"), group("Returns")];
        assert!(!name_exists("Orders", &groups, Some(groups[0].id)));
        assert!(name_exists("Returns", &groups, Some(groups[0].id)));
    }

    #[test]
    fn validate_step_rejects_zero() {
        assert_eq!(validate_step(0), Err(ValidationError::InvalidStep));
        assert_eq!(validate_step(5).unwrap(), 5);
    }

    #[test]
    fn validate_color_accepts_six_digit_hex_only() {
        assert!(validate_color("#1a237e").is_ok());
        assert!(validate_color("#FF9800").is_ok());
        assert!(validate_color("#123").is_err());
        assert!(validate_color("1a237e").is_err());
        assert!(validate_color("#12345g").is_err());
    }
}
