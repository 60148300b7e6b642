//! Format checks for common string patterns
//!
//! Pre-compiled regexes backing the [`email`](crate::rules::email) and
//! [`url`](crate::rules::url) rules.

use once_cell::sync::Lazy;
use regex::Regex;

// ============================================================================
// Pre-compiled Regex Patterns
// ============================================================================

/// Email regex pattern (RFC 5322 simplified)
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// URL regex pattern (http/https)
static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());

pub(crate) fn email_regex() -> &'static Regex {
    &EMAIL_REGEX
}

pub(crate) fn url_regex() -> &'static Regex {
    &URL_REGEX
}

// ============================================================================
// Format Checks
// ============================================================================

/// Check email format
///
/// # Example
/// ```
/// use ouroboros_model_validation::formats::is_email;
///
/// assert!(is_email("user@example.com"));
/// assert!(!is_email("invalid-email"));
/// ```
pub fn is_email(value: &str) -> bool {
    EMAIL_REGEX.is_match(value)
}

/// Check URL format (http/https)
///
/// # Example
/// ```
/// use ouroboros_model_validation::formats::is_url;
///
/// assert!(is_url("https://example.com"));
/// assert!(is_url("http://localhost:8080/path"));
/// assert!(!is_url("ftp://example.com"));
/// ```
pub fn is_url(value: &str) -> bool {
    URL_REGEX.is_match(value)
}
