//! Primitive string checks.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Longest string [`sanitize_input`] returns, in characters.
pub const MAX_SANITIZED_CHARS: usize = 1000;

// Intentionally loose: something@something.something, no whitespace.
static EMAIL_REGEX: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$"));

/// Loose `local@domain.tld` shape check.
pub fn validate_email(email: &str) -> bool {
    match &*EMAIL_REGEX {
        Ok(re) => re.is_match(email),
        Err(_) => false,
    }
}

/// Whether `url` parses as an absolute URL.
pub fn validate_url(url: &str) -> bool {
    Url::parse(url).is_ok()
}

/// Strip `<`, `>`, `"` and `'`, trim, and cap the length.
///
/// This is not output encoding; render user input escaped regardless.
pub fn sanitize_input(input: &str) -> String {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | '"' | '\''))
        .collect();

    stripped.trim().chars().take(MAX_SANITIZED_CHARS).collect()
}
