//! Request validation
//!
//! Request bodies implement [`RequestValidation`]; the macros below return
//! an [`ApiError::Validation`](crate::error::ApiError) from the enclosing
//! function when a check fails.

use crate::error::ApiError;

pub trait RequestValidation {
    fn validate(&self) -> Result<(), ApiError>;
}

/// `validate_field!(self.age, self.age >= 0, "Age cannot be negative")`
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Non-empty after trimming
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// Character count within `min..=max`
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Basic shape check: something@something.tld
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(
            $field,
            $crate::validation::looks_like_email(&$field),
            $message
        );
    };
}

#[macro_export]
macro_rules! validate_range {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        $crate::validate_field!($field, $field >= $min && $field <= $max, $message);
    };
}

/// Optional strings are checked only when present
#[macro_export]
macro_rules! validate_optional_email {
    ($field:expr, $message:expr) => {
        if let Some(value) = $field.as_deref() {
            $crate::validate_email!(value, $message);
        }
    };
}

pub fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// Seven to fifteen digits, optional leading `+`, separators ignored
pub fn looks_like_phone(value: &str) -> bool {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    let allowed = value
        .chars()
        .enumerate()
        .all(|(i, c)| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')') || (c == '+' && i == 0));
    allowed && (7..=15).contains(&digits)
}
