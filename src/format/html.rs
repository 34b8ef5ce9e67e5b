//! HTML formatter.

use std::fmt;
use std::sync::Arc;

use crate::error::FormatError;
use crate::response::headers::CONTENT_TYPE_HTML;
use crate::response::{DataResponse, FormattedBody, Payload};

/// Renders a payload into an HTML document.
pub type HtmlRenderer = Arc<dyn Fn(&dyn Payload) -> Result<String, FormatError> + Send + Sync>;

/// Emits HTML either through a renderer or, without one, the payload text as-is.
#[derive(Clone, Default)]
pub struct HtmlFormatter {
    renderer: Option<HtmlRenderer>,
}

impl HtmlFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer<F>(mut self, render: F) -> Self
    where
        F: Fn(&dyn Payload) -> Result<String, FormatError> + Send + Sync + 'static,
    {
        self.renderer = Some(Arc::new(render));
        self
    }

    pub fn format(&self, resp: &mut DataResponse) -> Result<FormattedBody, FormatError> {
        if resp.is_binary() {
            return Err(FormatError::BinaryUnsupported("HTML"));
        }

        let html = match (&self.renderer, resp.data()) {
            (Some(render), Some(data)) => render(data)?,
            (Some(render), None) => render(&())?,
            (None, Some(data)) => data.as_text().ok_or(FormatError::NotStringable)?,
            (None, None) => return Err(FormatError::NotStringable),
        };

        Ok(FormattedBody::from_bytes(self.content_type(), html))
    }

    pub fn content_type(&self) -> &str {
        CONTENT_TYPE_HTML
    }
}

impl fmt::Debug for HtmlFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlFormatter")
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}
