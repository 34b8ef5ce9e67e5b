//! Binary (octet-stream) formatter.

use std::path::Path;

use crate::error::FormatError;
use crate::response::headers::CONTENT_TYPE_OCTET_STREAM;
use crate::response::{DataResponse, FormattedBody};

/// Hands the attached stream to the pipeline without buffering it.
#[derive(Debug, Clone, Default)]
pub struct BinaryFormatter;

impl BinaryFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format(&self, resp: &mut DataResponse) -> Result<FormattedBody, FormatError> {
        let content_type = resolve_content_type(resp);
        let binary = resp.binary_mut().ok_or(FormatError::NotBinary)?;
        let size = binary.size();
        let stream = binary.take_stream().ok_or(FormatError::StreamConsumed)?;

        Ok(FormattedBody::new(content_type, stream, size))
    }

    pub fn content_type(&self) -> &str {
        CONTENT_TYPE_OCTET_STREAM
    }
}

/// Explicit header, else the filename extension, else octet-stream.
fn resolve_content_type(resp: &DataResponse) -> String {
    if let Some(content_type) = resp.content_type() {
        return content_type.to_string();
    }
    resp.filename()
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .and_then(|ext| mime_guess::from_ext(ext).first_raw())
        .unwrap_or(CONTENT_TYPE_OCTET_STREAM)
        .to_string()
}
