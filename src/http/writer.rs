//! Write pipeline.
//!
//! # States
//! ```text
//! Idle → Formatting → HeaderCommitted → BodyWriting → Done
//!            │                              │
//!            └──────→ Recovering ───────────┤ (error page, same formatter)
//!                          │                │
//!                          └→ MinimalError ─┘ (text/plain 500)
//! ```
//!
//! `commit` is the only place a status line is written for a formatted body;
//! the release handle is closed once, after the body write attempt.

use std::sync::Arc;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::{FormatError, ResponseError, WriteError};
use crate::factory::Factory;
use crate::format::Formatter;
use crate::http::sink::ResponseSink;
use crate::observability::metrics;
use crate::response::headers::{attachment, CONTENT_TYPE_PLAIN};
use crate::response::{BodyReader, DataResponse, FormattedBody};

const COPY_BUFFER_SIZE: usize = 8 * 1024;
const MINIMAL_ERROR_BODY: &[u8] = b"Internal Server Error";

/// Serializes a `DataResponse` onto a `ResponseSink`.
#[derive(Debug, Clone)]
pub struct ResponseWriter {
    factory: Arc<Factory>,
    binary_fallback: Option<Formatter>,
}

impl ResponseWriter {
    /// Writer using `factory` for defaults and error pages, with the built-in
    /// binary formatter as binary fallback.
    pub fn new(factory: Arc<Factory>) -> Self {
        Self {
            factory,
            binary_fallback: Some(Formatter::binary()),
        }
    }

    /// Replace (or remove) the formatter substituted for binary responses.
    pub fn with_binary_fallback(mut self, fallback: Option<Formatter>) -> Self {
        self.binary_fallback = fallback;
        self
    }

    pub fn factory(&self) -> &Arc<Factory> {
        &self.factory
    }

    /// Bound formatter, else the factory default; binary responses get the
    /// binary fallback when the resolved formatter cannot handle them.
    pub fn resolve_formatter(&self, resp: &DataResponse) -> Formatter {
        let formatter = resp
            .formatter()
            .unwrap_or_else(|| self.factory.formatter())
            .clone();

        if resp.is_binary() && !formatter.can_format_binary() {
            if let Some(fallback) = &self.binary_fallback {
                return fallback.clone();
            }
        }
        formatter
    }

    /// Write `resp` to `sink`.
    ///
    /// Returns `Ok` when the response, or an error page replacing it, was
    /// written in full. Returns the original format error when only the
    /// minimal fallback could be sent, and the write error when the transport
    /// failed.
    pub async fn write<S: ResponseSink>(
        &self,
        sink: &mut S,
        mut resp: DataResponse,
    ) -> Result<(), ResponseError> {
        let release = resp.take_release();
        let result = self.write_response(sink, resp).await;

        if let Some(release) = release {
            if let Err(err) = release.close() {
                tracing::warn!(error = %err, "Failed to release response resource");
            }
        }
        result
    }

    async fn write_response<S: ResponseSink>(
        &self,
        sink: &mut S,
        mut resp: DataResponse,
    ) -> Result<(), ResponseError> {
        let formatter = self.resolve_formatter(&resp);

        let formatted = match resp.take_formatted() {
            Some(body) => Ok(body),
            None => formatter.format(&mut resp),
        };

        match formatted {
            Ok(body) => self.commit(sink, resp, body).await.map_err(Into::into),
            Err(err) => {
                tracing::error!(
                    error = %err,
                    status = %resp.status(),
                    formatter = formatter.name(),
                    "Failed to format response"
                );
                drop(resp);
                self.recover(sink, &formatter, err).await
            }
        }
    }

    /// Serve an internal-error page with the same formatter, else the minimal error.
    async fn recover<S: ResponseSink>(
        &self,
        sink: &mut S,
        formatter: &Formatter,
        err: FormatError,
    ) -> Result<(), ResponseError> {
        let mut error_resp = self.factory.internal_error(&err);

        match formatter.format(&mut error_resp) {
            Ok(body) => self.commit(sink, error_resp, body).await.map_err(Into::into),
            Err(recovery_err) => {
                let minimal = write_minimal(sink).await;
                tracing::error!(error = %recovery_err, "Failed to format error response");
                if let Err(write_err) = minimal {
                    metrics::record_write_failure(write_err.kind());
                    tracing::error!(error = %write_err, "Failed to write minimal error response");
                }
                Err(ResponseError::Format(err))
            }
        }
    }

    /// Merge headers, commit the status line, then stream the body.
    pub async fn commit<S: ResponseSink>(
        &self,
        sink: &mut S,
        resp: DataResponse,
        body: FormattedBody,
    ) -> Result<(), WriteError> {
        let (content_type, stream, size) = body.into_parts();
        let status = write_head(sink, &resp, &content_type, size);
        drop(resp);

        if !allows_body(status) {
            return Ok(());
        }

        if let Err(err) = copy_body(sink, stream, size).await {
            metrics::record_write_failure(err.kind());
            tracing::error!(error = %err, status = %status, "Failed to write response body");
            return Err(err);
        }
        Ok(())
    }
}

/// Build the sink headers from `resp` and commit its status.
fn write_head<S: ResponseSink>(
    sink: &mut S,
    resp: &DataResponse,
    formatted_type: &str,
    size: Option<u64>,
) -> StatusCode {
    let status = resp.status();
    let headers = sink.headers_mut();
    for (key, value) in resp.headers() {
        headers.append(key.clone(), value.clone());
    }

    let content_type = resp.content_type().unwrap_or(formatted_type);
    if !content_type.is_empty() {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                headers.insert(CONTENT_TYPE, value);
            }
            Err(_) => tracing::warn!(content_type, "Dropping invalid Content-Type"),
        }
    }

    if resp.is_binary() {
        if let Some(filename) = resp.filename() {
            match HeaderValue::from_str(&attachment(filename)) {
                Ok(value) => {
                    headers.insert(CONTENT_DISPOSITION, value);
                }
                Err(_) => tracing::warn!(filename, "Dropping invalid Content-Disposition"),
            }
        }
    }

    match size {
        Some(size) if allows_body(status) => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(size));
        }
        _ => {
            headers.remove(CONTENT_LENGTH);
        }
    }

    sink.write_head(status);
    status
}

/// 1xx, 204 and 304 never carry a body.
pub(crate) fn allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Copy `size` bytes exactly, or until EOF when the size is unknown.
async fn copy_body<S: ResponseSink>(
    sink: &mut S,
    mut stream: BodyReader,
    size: Option<u64>,
) -> Result<u64, WriteError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut copied: u64 = 0;

    loop {
        let want = match size {
            Some(expected) if copied >= expected => break,
            Some(expected) => (expected - copied).min(buf.len() as u64) as usize,
            None => buf.len(),
        };

        let n = stream.read(&mut buf[..want]).await?;
        if n == 0 {
            if let Some(expected) = size {
                return Err(WriteError::ShortSource { expected, copied });
            }
            break;
        }

        write_chunk(sink, &buf[..n]).await?;
        copied += n as u64;
    }

    sink.flush().await?;
    Ok(copied)
}

/// Write all of `chunk`; a write that makes no progress is a partial write.
///
/// `AsyncWrite` may legally accept fewer bytes than offered, so "bytes written
/// differ from bytes requested" is detected as a zero-progress write, not retried forever.
async fn write_chunk<S: ResponseSink>(sink: &mut S, chunk: &[u8]) -> Result<(), WriteError> {
    let mut written = 0;
    while written < chunk.len() {
        let n = sink.write(&chunk[written..]).await?;
        if n == 0 {
            return Err(WriteError::PartialWrite {
                expected: chunk.len(),
                written,
            });
        }
        written += n;
    }
    Ok(())
}

/// Last resort: fixed `text/plain` 500 with no formatter involved.
async fn write_minimal<S: ResponseSink>(sink: &mut S) -> Result<(), WriteError> {
    let headers = sink.headers_mut();
    headers.clear();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_PLAIN));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(MINIMAL_ERROR_BODY.len()));
    sink.write_head(StatusCode::INTERNAL_SERVER_ERROR);

    write_chunk(sink, MINIMAL_ERROR_BODY).await?;
    sink.flush().await?;
    Ok(())
}
