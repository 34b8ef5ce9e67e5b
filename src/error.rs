//! Error taxonomy for response resolution and writing.
//!
//! # Recovery rules
//! - `Format` is recovered locally by the write pipeline (internal-error page)
//! - `Compression` never reaches a caller; the middleware logs it and passes through
//! - `Write` after the status line is committed is only logged and returned

use std::io;

use axum::http::StatusCode;
use thiserror::Error;

/// Top-level error surfaced by the write pipeline and middleware.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// No registered formatter matched and no default exists.
    #[error("not acceptable")]
    NotAcceptable,

    /// Request body media type rejected by the content-type validator.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    /// Serialization against a formatter failed.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Compression codec failure.
    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// Transport write failure.
    #[error(transparent)]
    Write(#[from] WriteError),

    /// A handler panicked while producing its response.
    #[error("handler panicked: {0}")]
    HandlerPanic(String),

    /// Opening or inspecting a file for a file response failed.
    #[error("{context}: {source}")]
    File {
        context: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ResponseError {
    /// HTTP status this error maps to when rendered as a response.
    pub fn status(&self) -> StatusCode {
        match self {
            ResponseError::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            ResponseError::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Errors produced by formatters.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A structured formatter was handed a binary response.
    #[error("cannot format binary as {0}")]
    BinaryUnsupported(&'static str),

    /// The binary formatter was handed a response without a stream.
    #[error("response is not binary")]
    NotBinary,

    /// The binary stream was already consumed by an earlier format pass.
    #[error("binary stream already consumed")]
    StreamConsumed,

    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to encode XML: {0}")]
    Xml(String),

    /// Default HTML rendering only accepts string payloads.
    #[error("data is not stringable")]
    NotStringable,

    #[error("failed to render template: {0}")]
    Template(String),

    /// Raised by user-provided formatters.
    #[error("{0}")]
    Custom(String),
}

/// Errors produced while compressing a formatted body.
#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("{encoding} encoder failed: {source}")]
    Codec {
        encoding: &'static str,
        #[source]
        source: io::Error,
    },

    /// Reading the formatted body into memory failed.
    #[error("failed to read body for compression: {0}")]
    Read(#[source] io::Error),
}

/// Errors produced while writing to the transport sink.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write failed: {0}")]
    Io(#[from] io::Error),

    /// The sink accepted fewer bytes than requested.
    #[error("partial write: expected {expected} bytes, wrote {written}")]
    PartialWrite { expected: usize, written: usize },

    /// The body source ended before its declared size.
    #[error("body ended early: expected {expected} bytes, copied {copied}")]
    ShortSource { expected: u64, copied: u64 },
}

impl WriteError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            WriteError::Io(_) => "io",
            WriteError::PartialWrite { .. } => "partial_write",
            WriteError::ShortSource { .. } => "short_source",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ResponseError::NotAcceptable.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(
            ResponseError::UnsupportedContentType("text/csv".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            ResponseError::from(FormatError::NotStringable).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_partial_write_message() {
        let err = WriteError::PartialWrite { expected: 10, written: 5 };
        assert!(err.to_string().contains("partial write"));
        assert_eq!(err.kind(), "partial_write");
    }
}
