//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Parse an optional UUID column.
pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

/// Trim a mandatory text field, collapsing inner whitespace and composing
/// Unicode (NFC) so that visually equal names are stored identically.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let collapsed = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Err(EngineError::InvalidName(format!("{label} must not be empty")));
    }
    Ok(collapsed.nfc().collect())
}

/// Trim an optional text field; blank values become `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.nfc().collect())
}

/// Permissive text used by bulk loaders: missing or blank becomes empty.
pub(crate) fn text_or_empty(value: Option<&str>) -> String {
    normalize_optional_text(value).unwrap_or_default()
}

/// Audited edits and voids must carry a non-blank reason.
pub(crate) fn require_reason(reason: &str, action: &str) -> ResultEngine<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(EngineError::MissingReason(format!(
            "{action} requires a reason"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn require_non_negative(value: i64, label: &str) -> ResultEngine<()> {
    if value < 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be >= 0")));
    }
    Ok(())
}

pub(crate) fn require_positive(value: i64, label: &str) -> ResultEngine<()> {
    if value <= 0 {
        return Err(EngineError::InvalidAmount(format!("{label} must be > 0")));
    }
    Ok(())
}

/// `count × unit`, refused when the amount does not fit.
pub(crate) fn checked_product(count: i64, unit: i64, label: &str) -> ResultEngine<i64> {
    count
        .checked_mul(unit)
        .ok_or_else(|| EngineError::InvalidAmount(format!("{label} is too large")))
}

/// `a + b`, refused when the amount does not fit.
pub(crate) fn checked_total(a: i64, b: i64, label: &str) -> ResultEngine<i64> {
    a.checked_add(b)
        .ok_or_else(|| EngineError::InvalidAmount(format!("{label} is too large")))
}

/// Build the lookup key for a user-facing name: accents stripped,
/// lowercase, punctuation folded to single spaces.
///
/// `"Retard à la réunion"` and `"retard a la reunion!"` share the key
/// `"retard a la reunion"`.
pub(crate) fn normalize_lookup_key(input: &str) -> ResultEngine<String> {
    let mut out = String::new();
    let mut prev_space = false;
    for ch in input.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim_end();
    if normalized.is_empty() {
        return Err(EngineError::InvalidName("name must not be empty".to_string()));
    }
    Ok(normalized.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_key_folds_accents_case_and_punctuation() {
        assert_eq!(
            normalize_lookup_key("  Retard à la  Réunion! ").unwrap(),
            "retard a la reunion"
        );
        assert_eq!(normalize_lookup_key("ABSENCE").unwrap(), "absence");
        assert!(normalize_lookup_key(" !! ").is_err());
    }

    #[test]
    fn required_text_collapses_whitespace() {
        assert_eq!(
            normalize_required_text("  Abakundakurya   Group ", "group name").unwrap(),
            "Abakundakurya Group"
        );
        assert!(normalize_required_text("   ", "group name").is_err());
    }

    #[test]
    fn reason_must_not_be_blank() {
        assert_eq!(
            require_reason("   ", "void"),
            Err(EngineError::MissingReason("void requires a reason".to_string()))
        );
        assert_eq!(require_reason(" typo ", "edit").unwrap(), "typo");
    }
}
