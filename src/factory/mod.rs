//! Response factory.
//!
//! # Data Flow
//! ```text
//! handler
//!     → Factory::{success, created, not_found, validation_error, file, ...}
//!     → ErrorBuilder / ValidationErrorBuilder (envelope.rs by default)
//!     → DataResponse
//! ```
//!
//! # Design Decisions
//! - The factory never binds a formatter to the responses it builds; its
//!   formatter is the pipeline default for responses that have none
//! - Error detail exposure is a single verbosity switch, off by default
//! - Builders are shared closures so a factory is cheap to clone

pub mod envelope;

use std::backtrace::{Backtrace, BacktraceStatus};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use serde_json::{json, Value};
use tokio::io::AsyncRead;

use crate::config::{FormatKind, FormattingConfig, ResponseConfig};
use crate::error::ResponseError;
use crate::format::{Formatter, JsonFormatter, XmlFormatter};
use crate::response::headers::CONTENT_TYPE_OCTET_STREAM;
use crate::response::{DataResponse, Payload, SharedPayload};

pub use envelope::{ErrorEnvelope, FieldError};

const INTERNAL_ERROR_TITLE: &str = "Internal server error";
const VALIDATION_FAILED_TITLE: &str = "Validation failed";

/// Builds the payload of an error response from status, title and optional details.
pub type ErrorBuilder = Arc<dyn Fn(StatusCode, &str, Option<Value>) -> SharedPayload + Send + Sync>;

/// Builds the payload of a validation error response.
pub type ValidationErrorBuilder =
    Arc<dyn Fn(&str, &BTreeMap<String, Vec<String>>) -> SharedPayload + Send + Sync>;

/// Creates standardized responses.
#[derive(Clone)]
pub struct Factory {
    verbosity: bool,
    debug_mode: bool,
    formatter: Formatter,
    error_builder: ErrorBuilder,
    validation_builder: ValidationErrorBuilder,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

impl Factory {
    pub fn new() -> Self {
        Self {
            verbosity: false,
            debug_mode: false,
            formatter: Formatter::json(),
            error_builder: Arc::new(default_error_builder),
            validation_builder: Arc::new(default_validation_builder),
        }
    }

    pub fn from_config(config: &ResponseConfig) -> Self {
        Self::new()
            .with_verbosity(config.errors.verbosity)
            .with_debug_mode(config.errors.debug_mode)
            .with_formatter(formatter_from_config(&config.formatting))
    }

    /// Expose error details (and causes) in error envelopes.
    pub fn with_verbosity(mut self, verbose: bool) -> Self {
        self.verbosity = verbose;
        self
    }

    pub fn with_debug_mode(mut self, debug: bool) -> Self {
        self.debug_mode = debug;
        self
    }

    /// Default formatter for responses without a bound one.
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_error_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(StatusCode, &str, Option<Value>) -> SharedPayload + Send + Sync + 'static,
    {
        self.error_builder = Arc::new(builder);
        self
    }

    pub fn with_validation_builder<F>(mut self, builder: F) -> Self
    where
        F: Fn(&str, &BTreeMap<String, Vec<String>>) -> SharedPayload + Send + Sync + 'static,
    {
        self.validation_builder = Arc::new(builder);
        self
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    pub fn verbosity(&self) -> bool {
        self.verbosity
    }

    // --- Success responses ---

    pub fn response<T: Payload>(&self, status: StatusCode, data: T) -> DataResponse {
        if self.debug_mode {
            tracing::debug!(status = %status, "Creating response");
        }
        DataResponse::with_payload(status, data)
    }

    pub fn success<T: Payload>(&self, data: T) -> DataResponse {
        self.response(StatusCode::OK, data)
    }

    /// 201 with a `Location` header when `location` is non-empty.
    pub fn created<T: Payload>(&self, data: T, location: &str) -> DataResponse {
        let resp = self.response(StatusCode::CREATED, data);
        if location.is_empty() {
            resp
        } else {
            resp.with_header(LOCATION, location)
        }
    }

    pub fn accepted<T: Payload>(&self, data: T) -> DataResponse {
        self.response(StatusCode::ACCEPTED, data)
    }

    pub fn no_content(&self) -> DataResponse {
        if self.debug_mode {
            tracing::debug!(status = %StatusCode::NO_CONTENT, "Creating response");
        }
        DataResponse::new(StatusCode::NO_CONTENT)
    }

    // --- Error responses ---

    /// Error envelope for `status`; an empty message falls back to the reason phrase.
    pub fn error(&self, status: StatusCode, message: &str) -> DataResponse {
        let message = if message.is_empty() {
            status.canonical_reason().unwrap_or_default()
        } else {
            message
        };

        if self.debug_mode {
            tracing::debug!(status = %status, title = message, "Creating error response");
        }

        let data = (self.error_builder)(status, message, None);
        DataResponse::new(status).with_shared_data(data)
    }

    pub fn bad_request(&self, message: &str) -> DataResponse {
        self.error(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(&self, message: &str) -> DataResponse {
        self.error(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(&self, message: &str) -> DataResponse {
        self.error(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(&self, message: &str) -> DataResponse {
        self.error(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(&self, message: &str) -> DataResponse {
        self.error(StatusCode::CONFLICT, message)
    }

    pub fn not_acceptable(&self, message: &str) -> DataResponse {
        self.error(StatusCode::NOT_ACCEPTABLE, message)
    }

    pub fn unsupported_media_type(&self, message: &str) -> DataResponse {
        self.error(StatusCode::UNSUPPORTED_MEDIA_TYPE, message)
    }

    pub fn service_unavailable(&self, message: &str) -> DataResponse {
        self.error(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// 500 response; details are only attached when verbosity is on.
    ///
    /// Callers log the error themselves; this only traces in debug mode.
    pub fn internal_error(&self, err: &(dyn StdError + 'static)) -> DataResponse {
        if self.debug_mode {
            tracing::debug!(error = %err, "Creating internal error response");
        }

        let details = self.verbosity.then(|| error_details(err));
        let data = (self.error_builder)(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR_TITLE,
            details,
        );
        DataResponse::new(StatusCode::INTERNAL_SERVER_ERROR).with_shared_data(data)
    }

    /// 422 response with one envelope entry per field message.
    pub fn validation_error(
        &self,
        message: &str,
        attribute_errors: &BTreeMap<String, Vec<String>>,
    ) -> DataResponse {
        let message = if message.is_empty() {
            VALIDATION_FAILED_TITLE
        } else {
            message
        };

        if self.debug_mode {
            tracing::debug!(errors_count = attribute_errors.len(), "Creating validation error response");
        }

        let data = (self.validation_builder)(message, attribute_errors);
        DataResponse::new(StatusCode::UNPROCESSABLE_ENTITY).with_shared_data(data)
    }

    // --- Binary responses ---

    /// Stream `reader` as a download named after the last path segment of `filename`.
    pub fn binary<R>(&self, reader: R, filename: &str, size: Option<u64>) -> DataResponse
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let name = base_name(filename);
        let content_type = mime_guess::from_path(name)
            .first_raw()
            .unwrap_or(CONTENT_TYPE_OCTET_STREAM);

        if self.debug_mode {
            tracing::debug!(filename = name, size = ?size, "Creating binary response");
        }

        DataResponse::new(StatusCode::OK)
            .with_stream(reader, size)
            .with_filename(name)
            .with_content_type(content_type)
    }

    /// Binary response from a file on disk; open/stat failures become a 500.
    pub async fn file(&self, path: impl AsRef<Path>) -> DataResponse {
        let path = path.as_ref();

        let file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(source) => {
                return self.file_error(path, ResponseError::File {
                    context: "failed to open file",
                    source,
                })
            }
        };

        let size = match file.metadata().await {
            Ok(meta) => meta.len(),
            Err(source) => {
                return self.file_error(path, ResponseError::File {
                    context: "failed to stat file",
                    source,
                })
            }
        };

        self.binary(file, &path.to_string_lossy(), Some(size))
    }

    fn file_error(&self, path: &Path, err: ResponseError) -> DataResponse {
        tracing::error!(error = %err, path = %path.display(), "File response failed");
        self.internal_error(&err)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("verbosity", &self.verbosity)
            .field("debug_mode", &self.debug_mode)
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

fn formatter_from_config(config: &FormattingConfig) -> Formatter {
    match config.default_format {
        FormatKind::Json if config.json_indent => Formatter::Json(JsonFormatter::indented()),
        FormatKind::Json => Formatter::json(),
        FormatKind::Xml => {
            let xml = if config.xml_indent {
                XmlFormatter::indented()
            } else {
                XmlFormatter::new()
            };
            match &config.xml_root {
                Some(root) => Formatter::Xml(xml.with_root(root.clone())),
                None => Formatter::Xml(xml),
            }
        }
        FormatKind::Html => Formatter::html(),
    }
}

fn default_error_builder(status: StatusCode, message: &str, details: Option<Value>) -> SharedPayload {
    Arc::new(ErrorEnvelope::new(status, message).with_details(details))
}

fn default_validation_builder(
    message: &str,
    attribute_errors: &BTreeMap<String, Vec<String>>,
) -> SharedPayload {
    Arc::new(
        ErrorEnvelope::new(StatusCode::UNPROCESSABLE_ENTITY, message)
            .with_field_errors(attribute_errors),
    )
}

fn error_details(err: &(dyn StdError + 'static)) -> Value {
    let mut causes = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    let mut details = json!({ "error": err.to_string(), "causes": causes });
    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        details["backtrace"] = Value::String(backtrace.to_string());
    }
    details
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(filename)
}
