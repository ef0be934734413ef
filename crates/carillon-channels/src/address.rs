//! Channel address validation and normalization.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
        .expect("email pattern compiles")
});

/// Normalize a raw phone string into the digits-only chat address form.
///
/// Keeps digits and honors one leading `+`. Numbers without a country prefix
/// get leading zeros stripped and `default_country_code` prepended. Returns
/// `None` when nothing usable remains.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let has_prefix = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if has_prefix {
        if digits.is_empty() {
            return None;
        }
        return Some(digits);
    }

    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() {
        return None;
    }
    let cc = default_country_code.trim_start_matches('+');
    Some(format!("{cc}{stripped}"))
}

/// Whether `email` looks like a deliverable address (`local@domain.tld`).
pub fn is_valid_email(email: &str) -> bool {
    !email.is_empty() && EMAIL_RE.is_match(email)
}
