//! Helpers for sanitizing data before it enters log lines and span attributes.
//!
//! Suite logs get pasted into CI output, so no OAuth material or full local
//! paths should leak through them.

use std::path::Path;

/// Maximum length for API error bodies kept in error messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Keeps the first four characters of a token, masking the rest.
///
/// - `ya29.a0AfB_byC...` → `ya29****`
/// - `abc` → `****`
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    if prefix.chars().count() < 4 || token.chars().count() <= 8 {
        return "****".to_string();
    }
    format!("{}****", prefix)
}

/// Truncates a response body so token fragments or HTML error pages don't
/// flood the log. Cuts on a char boundary.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &body[..end])
}
