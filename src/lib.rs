//! HTTP response resolution and writing.
//!
//! Handlers return a [`DataResponse`]; middleware negotiate a formatter,
//! validate request media types and compress bodies; the
//! [`ResponseWriter`] formats and writes the result with a three-tier
//! fallback (response, internal-error page, minimal plain-text 500).

pub mod config;
pub mod error;
pub mod factory;
pub mod format;
pub mod http;
pub mod middleware;
pub mod observability;
pub mod response;

pub use config::schema::ResponseConfig;
pub use error::{CompressionError, FormatError, ResponseError, WriteError};
pub use factory::Factory;
pub use format::{Format, Formatter};
pub use http::{DataResponseService, ResponseSink, ResponseWriter};
pub use middleware::Handler;
pub use response::{DataResponse, FormattedBody, Payload};
