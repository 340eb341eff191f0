//! Internal helpers for input validation and name normalization.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation logic so every operation enforces the same rules.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::{EngineError, ResultEngine};

/// Trims `value` and rejects it when empty or longer than `max_chars`.
pub(crate) fn normalize_required_text(
    value: &str,
    label: &str,
    max_chars: usize,
) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidName(format!(
            "{label} must not be empty"
        )));
    }
    if trimmed.chars().count() > max_chars {
        return Err(EngineError::InvalidName(format!(
            "{label} must be at most {max_chars} characters"
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims optional free text, mapping blank input to `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Case and accent insensitive key used to compare names.
///
/// `"  Café   Bar "` and `"cafe bar"` share the key `"cafe bar"`.
pub(crate) fn normalize_key(input: &str) -> Option<String> {
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
        None
    } else {
        Some(normalized.to_string())
    }
}
