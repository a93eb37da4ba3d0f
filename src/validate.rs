//! Input validation for identifiers, names and plates.
//!
//! Every write path runs its raw inputs through these helpers before any SQL
//! is issued, so malformed input fails with `InvalidInput` and never reaches
//! the database.

use crate::error::{LedgerError, Result};
use crate::money::Money;

/// Longest accepted identifier (driver id, agent id, staff member id).
pub const MAX_ID_LEN: usize = 64;

/// Longest accepted free-text field (names, models, descriptions).
pub const MAX_TEXT_LEN: usize = 128;

/// Trims and checks an external identifier.
///
/// Identifiers are non-empty, at most [`MAX_ID_LEN`] bytes, and contain only
/// ASCII alphanumerics, `-`, `_` and `.`.
pub fn identifier(kind: &str, raw: &str) -> Result<String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} must not be empty", kind)));
    }
    if id.len() > MAX_ID_LEN {
        return Err(LedgerError::InvalidInput(format!(
            "{} longer than {} characters",
            kind, MAX_ID_LEN
        )));
    }
    if let Some(bad) = id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(LedgerError::InvalidInput(format!(
            "{} '{}' contains invalid character {:?}",
            kind, id, bad
        )));
    }
    Ok(id.to_string())
}

/// Trims and checks a required free-text field.
pub fn text(kind: &str, raw: &str) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} must not be empty", kind)));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(LedgerError::InvalidInput(format!(
            "{} longer than {} characters",
            kind, MAX_TEXT_LEN
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(LedgerError::InvalidInput(format!(
            "{} contains control characters",
            kind
        )));
    }
    Ok(value.to_string())
}

/// Like [`text`], but blank input becomes `None`.
pub fn optional_text(kind: &str, raw: Option<&str>) -> Result<Option<String>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => text(kind, value).map(Some),
    }
}

/// Normalizes a plate or chassis number: trimmed, uppercase, alphanumeric
/// plus `-`.
pub fn plate(kind: &str, raw: &str) -> Result<String> {
    let value = raw.trim().to_uppercase();
    if value.is_empty() {
        return Err(LedgerError::InvalidInput(format!("{} must not be empty", kind)));
    }
    if value.len() > MAX_ID_LEN {
        return Err(LedgerError::InvalidInput(format!(
            "{} longer than {} characters",
            kind, MAX_ID_LEN
        )));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(LedgerError::InvalidInput(format!(
            "{} '{}' must be alphanumeric",
            kind, value
        )));
    }
    Ok(value)
}

/// Rejects negative amounts and amounts above [`Money::MAX_UNITS`].
pub fn amount(kind: &str, amount: Money) -> Result<Money> {
    if amount.is_negative() {
        return Err(LedgerError::InvalidInput(format!(
            "{} must not be negative (got {})",
            kind, amount
        )));
    }
    if amount.exceeds_max() {
        return Err(LedgerError::InvalidInput(format!(
            "{} exceeds the maximum of {} (got {})",
            kind,
            Money::MAX_UNITS,
            amount
        )));
    }
    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_identifier_trims_and_accepts() {
        assert_eq!(identifier("driver id", "  RG-123_a.b ").unwrap(), "RG-123_a.b");
    }

    #[test]
    fn test_identifier_rejects_malformed() {
        assert!(identifier("driver id", "").is_err());
        assert!(identifier("driver id", "   ").is_err());
        assert!(identifier("driver id", "has space").is_err());
        assert!(identifier("driver id", "semi;colon").is_err());
        assert!(identifier("driver id", &"x".repeat(MAX_ID_LEN + 1)).is_err());
    }

    #[test]
    fn test_plate_is_uppercased() {
        assert_eq!(plate("plate", " abc1d23 ").unwrap(), "ABC1D23");
        assert_eq!(plate("plate", "abc-1234").unwrap(), "ABC-1234");
        assert!(plate("plate", "ab c").is_err());
        assert!(plate("plate", "").is_err());
    }

    #[test]
    fn test_text_rules() {
        assert_eq!(text("name", " João Silva ").unwrap(), "João Silva");
        assert!(text("name", "").is_err());
        assert!(text("name", "line\nbreak").is_err());
        assert_eq!(optional_text("contact", Some("  ")).unwrap(), None);
        assert_eq!(optional_text("contact", None).unwrap(), None);
        assert_eq!(
            optional_text("contact", Some("555-0101")).unwrap(),
            Some("555-0101".to_string())
        );
    }

    #[test]
    fn test_amount_bounds() {
        assert!(amount("amount", Money::from_str("-1").unwrap()).is_err());
        assert!(amount("amount", Money::ZERO).is_ok());
        assert!(amount("amount", Money::from_units(Money::MAX_UNITS)).is_ok());
        assert!(amount("amount", Money::from_str("70000000000000000000000000").unwrap()).is_err());
    }
}
