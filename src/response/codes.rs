//! Machine-readable status identifiers for error envelopes.

use axum::http::StatusCode;

/// Upper-snake identifier for a status, e.g. `404` → `"NOT_FOUND"`.
///
/// Derived from the canonical reason phrase; statuses without one map to `None`.
pub fn code_from_status(status: StatusCode) -> Option<String> {
    let reason = status.canonical_reason()?;
    let mut code = String::with_capacity(reason.len());
    for ch in reason.chars() {
        if ch.is_ascii_alphanumeric() {
            code.push(ch.to_ascii_uppercase());
        } else if ch == '\'' {
            continue;
        } else if !code.ends_with('_') {
            code.push('_');
        }
    }
    Some(code.trim_matches('_').to_string())
}
