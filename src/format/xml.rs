//! XML formatter.

use std::borrow::Cow;

use crate::error::FormatError;
use crate::response::headers::CONTENT_TYPE_XML;
use crate::response::{DataResponse, FormattedBody};

/// Standard prolog emitted before every non-empty document.
pub const XML_HEADER: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

/// Serializes the payload as an XML document.
#[derive(Debug, Clone, Default)]
pub struct XmlFormatter {
    indent: bool,
    root: Option<Cow<'static, str>>,
}

impl XmlFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn indented() -> Self {
        Self {
            indent: true,
            root: None,
        }
    }

    /// Root element name; defaults to the payload's type name.
    pub fn with_root(mut self, root: impl Into<Cow<'static, str>>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn format(&self, resp: &mut DataResponse) -> Result<FormattedBody, FormatError> {
        if resp.is_binary() {
            return Err(FormatError::BinaryUnsupported("XML"));
        }

        let Some(data) = resp.data() else {
            return Ok(FormattedBody::empty(self.content_type()));
        };

        let document = data.to_xml(self.root.as_deref(), self.indent)?;
        let mut out = String::with_capacity(XML_HEADER.len() + document.len());
        out.push_str(XML_HEADER);
        out.push_str(&document);

        Ok(FormattedBody::from_bytes(self.content_type(), out))
    }

    pub fn content_type(&self) -> &str {
        CONTENT_TYPE_XML
    }
}
