//! Utility helpers shared by the Runway node crates.

pub mod async_runtime;
pub mod http;
pub mod path_processing;

pub use async_runtime::block_on_future;
pub use http::{JsonParseError, parse_response_json_strict, status_error_message};
pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::Regex;

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization:\s*(?:bearer\s+)?)([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(?:KEY|TOKEN|SECRET|PASSWORD)=)([^\s]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
///
/// ```rust
/// use runway_util::redact_sensitive;
///
/// let line = redact_sensitive("authorization: Bearer abc123");
/// assert_eq!(line, "authorization: Bearer <redacted>");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SENSITIVE_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &regex::Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}<redacted>")
            })
            .to_string();
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_token_assignments() {
        assert_eq!(redact_sensitive("RUNWAY_TOKEN=abc def"), "RUNWAY_TOKEN=<redacted> def");
    }

    #[test]
    fn leaves_plain_text_alone() {
        assert_eq!(redact_sensitive("model inactive"), "model inactive");
    }
}
