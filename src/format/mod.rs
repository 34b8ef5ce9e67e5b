//! Formatter subsystem.
//!
//! # Data Flow
//! ```text
//! DataResponse
//!     → Formatter (json.rs | xml.rs | html.rs | binary.rs | Custom)
//!     → FormattedBody { content_type, stream, size }
//! ```
//!
//! # Design Decisions
//! - Closed enum over the built-in kinds, `Custom` for user formatters
//! - Formatting never touches the transport; failures are plain values
//! - Formatters are immutable after construction and cheap to clone

pub mod binary;
pub mod html;
pub mod json;
pub mod xml;

use std::fmt;
use std::sync::Arc;

use crate::error::FormatError;
use crate::response::{DataResponse, FormattedBody};

pub use binary::BinaryFormatter;
pub use html::{HtmlFormatter, HtmlRenderer};
pub use json::JsonFormatter;
pub use xml::XmlFormatter;

/// Contract for user-provided formatters.
pub trait Format: Send + Sync + fmt::Debug {
    /// Serialize the response into a write-ready body.
    ///
    /// May take the binary stream out of `resp`; must not write anywhere.
    fn format(&self, resp: &mut DataResponse) -> Result<FormattedBody, FormatError>;

    /// Default `Content-Type` this formatter produces.
    fn content_type(&self) -> &str;

    fn can_format_binary(&self) -> bool {
        false
    }
}

/// A response formatter.
#[derive(Clone, Debug)]
pub enum Formatter {
    Json(JsonFormatter),
    Xml(XmlFormatter),
    Html(HtmlFormatter),
    Binary(BinaryFormatter),
    Custom(Arc<dyn Format>),
}

impl Formatter {
    pub fn json() -> Self {
        Formatter::Json(JsonFormatter::new())
    }

    pub fn json_indent() -> Self {
        Formatter::Json(JsonFormatter::indented())
    }

    pub fn xml() -> Self {
        Formatter::Xml(XmlFormatter::new())
    }

    pub fn html() -> Self {
        Formatter::Html(HtmlFormatter::new())
    }

    pub fn binary() -> Self {
        Formatter::Binary(BinaryFormatter::new())
    }

    pub fn custom<F: Format + 'static>(formatter: F) -> Self {
        Formatter::Custom(Arc::new(formatter))
    }

    pub fn format(&self, resp: &mut DataResponse) -> Result<FormattedBody, FormatError> {
        match self {
            Formatter::Json(f) => f.format(resp),
            Formatter::Xml(f) => f.format(resp),
            Formatter::Html(f) => f.format(resp),
            Formatter::Binary(f) => f.format(resp),
            Formatter::Custom(f) => f.format(resp),
        }
    }

    pub fn content_type(&self) -> &str {
        match self {
            Formatter::Json(f) => f.content_type(),
            Formatter::Xml(f) => f.content_type(),
            Formatter::Html(f) => f.content_type(),
            Formatter::Binary(f) => f.content_type(),
            Formatter::Custom(f) => f.content_type(),
        }
    }

    pub fn can_format_binary(&self) -> bool {
        match self {
            Formatter::Binary(_) => true,
            Formatter::Custom(f) => f.can_format_binary(),
            Formatter::Json(_) | Formatter::Xml(_) | Formatter::Html(_) => false,
        }
    }

    /// Short name for log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Formatter::Json(_) => "json",
            Formatter::Xml(_) => "xml",
            Formatter::Html(_) => "html",
            Formatter::Binary(_) => "binary",
            Formatter::Custom(_) => "custom",
        }
    }
}
