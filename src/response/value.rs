//! The response value handlers return and middleware decorate.

use std::fmt;
use std::sync::Arc;

use axum::http::header::{
    AsHeaderName, IntoHeaderName, ACCESS_CONTROL_ALLOW_HEADERS,
    ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL, CONTENT_LENGTH,
    CONTENT_TYPE, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS, X_FRAME_OPTIONS,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use tokio::io::AsyncRead;

use crate::format::Formatter;
use crate::response::body::{BinaryBody, FormattedBody, Release};
use crate::response::headers::{FRAME_OPTIONS_DENY, NOSNIFF, REFERRER_STRICT_ORIGIN_WHEN_CROSS_ORIGIN};
use crate::response::payload::{Payload, SharedPayload};

const DEFAULT_HEADERS_CAPACITY: usize = 5;

/// In-process HTTP response before serialization.
///
/// Every `with_*` method consumes the value and returns the updated one, so a
/// value handed to another owner can never be changed behind its back.
pub struct DataResponse {
    status: StatusCode,
    data: Option<SharedPayload>,
    headers: HeaderMap,
    binary: Option<BinaryBody>,
    filename: Option<String>,
    formatter: Option<Formatter>,
    formatted: Option<FormattedBody>,
    release: Option<Release>,
}

impl DataResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            data: None,
            headers: HeaderMap::with_capacity(DEFAULT_HEADERS_CAPACITY),
            binary: None,
            filename: None,
            formatter: None,
            formatted: None,
            release: None,
        }
    }

    /// Response carrying a structured payload.
    pub fn with_payload<T: Payload>(status: StatusCode, data: T) -> Self {
        Self::new(status).with_data(data)
    }

    // --- Accessors ---

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn data(&self) -> Option<&dyn Payload> {
        self.data.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header<K: AsHeaderName>(&self, key: K) -> Option<&str> {
        self.headers.get(key).and_then(|v| v.to_str().ok())
    }

    /// All values of a header, in insertion order.
    pub fn header_values<K: AsHeaderName>(&self, key: K) -> Vec<&str> {
        self.headers
            .get_all(key)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    pub fn has_header<K: AsHeaderName>(&self, key: K) -> bool {
        self.headers.contains_key(key)
    }

    /// Explicit `Content-Type` override, if one was set.
    pub fn content_type(&self) -> Option<&str> {
        self.header(CONTENT_TYPE)
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// True iff a binary stream is attached.
    pub fn is_binary(&self) -> bool {
        self.binary.is_some()
    }

    pub fn binary_mut(&mut self) -> Option<&mut BinaryBody> {
        self.binary.as_mut()
    }

    /// Formatter bound by negotiation, if any.
    pub fn formatter(&self) -> Option<&Formatter> {
        self.formatter.as_ref()
    }

    pub fn has_formatted(&self) -> bool {
        self.formatted.is_some()
    }

    /// Body length known before writing: `Content-Length`, then a
    /// pre-formatted body, then a binary stream's declared size.
    pub fn known_size(&self) -> Option<u64> {
        self.header(CONTENT_LENGTH)
            .and_then(|v| v.parse().ok())
            .or_else(|| self.formatted.as_ref().and_then(FormattedBody::size))
            .or_else(|| self.binary.as_ref().and_then(BinaryBody::size))
    }

    pub fn take_formatted(&mut self) -> Option<FormattedBody> {
        self.formatted.take()
    }

    pub fn take_release(&mut self) -> Option<Release> {
        self.release.take()
    }

    // --- Builders ---

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Replace the payload; drops any attached stream.
    pub fn with_data<T: Payload>(mut self, data: T) -> Self {
        self.data = Some(Arc::new(data));
        self.binary = None;
        self
    }

    /// Replace the payload with an already shared one.
    pub fn with_shared_data(mut self, data: SharedPayload) -> Self {
        self.data = Some(data);
        self.binary = None;
        self
    }

    /// Attach a binary stream; drops any structured payload.
    pub fn with_stream<R>(mut self, stream: R, size: Option<u64>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        self.binary = Some(BinaryBody::new(Box::new(stream), size));
        self.data = None;
        self
    }

    /// Filename used for `Content-Disposition` and MIME inference.
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Append a header value (multiple values per key are kept).
    pub fn with_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        match value.try_into() {
            Ok(value) => {
                self.headers.append(key, value);
            }
            Err(_) => tracing::warn!("Dropping invalid header value"),
        }
        self
    }

    /// Set a header value, replacing existing values.
    pub fn set_header<K, V>(mut self, key: K, value: V) -> Self
    where
        K: IntoHeaderName,
        V: TryInto<HeaderValue>,
    {
        match value.try_into() {
            Ok(value) => {
                self.headers.insert(key, value);
            }
            Err(_) => tracing::warn!("Dropping invalid header value"),
        }
        self
    }

    pub fn without_header<K: AsHeaderName>(mut self, key: K) -> Self {
        self.headers.remove(key);
        self
    }

    /// Merge all values of `headers` (append semantics).
    pub fn with_headers(mut self, headers: &HeaderMap) -> Self {
        for (key, value) in headers.iter() {
            self.headers.append(key.clone(), value.clone());
        }
        self
    }

    pub fn with_content_type(self, content_type: &str) -> Self {
        self.set_header(CONTENT_TYPE, content_type)
    }

    pub fn with_cache_control(self, value: &str) -> Self {
        self.with_header(CACHE_CONTROL, value)
    }

    /// Add CORS headers; empty `methods`/`headers` are skipped.
    pub fn with_cors(self, origin: &str, methods: &str, headers: &str) -> Self {
        let mut resp = self.with_header(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
        if !methods.is_empty() {
            resp = resp.with_header(ACCESS_CONTROL_ALLOW_METHODS, methods);
        }
        if !headers.is_empty() {
            resp = resp.with_header(ACCESS_CONTROL_ALLOW_HEADERS, headers);
        }
        resp
    }

    pub fn with_security_headers(self) -> Self {
        self.with_header(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static(NOSNIFF))
            .with_header(X_FRAME_OPTIONS, HeaderValue::from_static(FRAME_OPTIONS_DENY))
            .with_header(
                REFERRER_POLICY,
                HeaderValue::from_static(REFERRER_STRICT_ORIGIN_WHEN_CROSS_ORIGIN),
            )
    }

    /// Bind a formatter; the `Content-Type` header is left untouched.
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Attach a body that is already formatted (and possibly compressed).
    pub fn with_formatted(mut self, formatted: FormattedBody) -> Self {
        self.formatted = Some(formatted);
        self
    }

    pub fn with_release(mut self, release: Release) -> Self {
        self.release = Some(release);
        self
    }
}

impl fmt::Debug for DataResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataResponse")
            .field("status", &self.status)
            .field("data", &self.data)
            .field("headers", &self.headers)
            .field("binary", &self.binary)
            .field("filename", &self.filename)
            .field("formatter", &self.formatter)
            .field("formatted", &self.formatted)
            .field("release", &self.release.is_some())
            .finish()
    }
}
