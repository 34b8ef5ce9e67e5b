//! JSON formatter.

use crate::error::FormatError;
use crate::response::headers::CONTENT_TYPE_JSON;
use crate::response::{DataResponse, FormattedBody};

const NULL: &[u8] = b"null";

/// Serializes the payload as JSON; no trailing newline.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    indent: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self { indent: false }
    }

    /// Pretty-printing variant (two-space indent).
    pub fn indented() -> Self {
        Self { indent: true }
    }

    pub fn format(&self, resp: &mut DataResponse) -> Result<FormattedBody, FormatError> {
        if resp.is_binary() {
            return Err(FormatError::BinaryUnsupported("JSON"));
        }

        let bytes = match resp.data() {
            Some(data) => data.to_json(self.indent)?,
            None => NULL.to_vec(),
        };

        Ok(FormattedBody::from_bytes(self.content_type(), bytes))
    }

    pub fn content_type(&self) -> &str {
        CONTENT_TYPE_JSON
    }
}
