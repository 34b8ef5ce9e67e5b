//! Header values and media types used across the crate.
//!
//! Header *names* come from `axum::http::header`; this module only holds the
//! values the builders and formatters emit.

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT_XML: &str = "text/xml";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_PLAIN: &str = "text/plain";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_MULTIPART_FORM: &str = "multipart/form-data";
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";

pub const ENCODING_BROTLI: &str = "br";
pub const ENCODING_GZIP: &str = "gzip";
pub const ENCODING_DEFLATE: &str = "deflate";

pub const NOSNIFF: &str = "nosniff";
pub const FRAME_OPTIONS_DENY: &str = "DENY";
pub const REFERRER_STRICT_ORIGIN_WHEN_CROSS_ORIGIN: &str = "strict-origin-when-cross-origin";

/// Strip parameters and normalise case: `"Application/JSON; charset=utf-8"` → `"application/json"`.
pub fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// `Content-Disposition` value for a downloadable file.
pub fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{}\"", filename.replace('"', "\\\""))
}
