//! Type-erased structured payloads.
//!
//! Any `Serialize` value can ride inside a [`DataResponse`](super::DataResponse);
//! the formatters only ever see it through the [`Payload`] trait.

use std::fmt;
use std::sync::Arc;

use quick_xml::se::Serializer as XmlSerializer;
use serde::Serialize;
use serde_json::Value;

use crate::error::FormatError;

/// Shared handle to an erased payload.
pub type SharedPayload = Arc<dyn Payload>;

/// Serialization surface exposed to formatters.
pub trait Payload: Send + Sync + 'static {
    /// Encode as JSON, optionally with two-space indentation.
    fn to_json(&self, pretty: bool) -> Result<Vec<u8>, serde_json::Error>;

    /// Encode as an XML document body (no prolog).
    ///
    /// Without an explicit `root`, the payload's type name becomes the root element.
    fn to_xml(&self, root: Option<&str>, indent: bool) -> Result<String, FormatError>;

    /// Convert into a generic JSON value (used by custom formatters and renderers).
    fn to_value(&self) -> Result<Value, serde_json::Error>;

    /// The payload as text, if it is a plain string.
    fn as_text(&self) -> Option<String> {
        match self.to_value() {
            Ok(Value::String(text)) => Some(text),
            _ => None,
        }
    }
}

impl<T> Payload for T
where
    T: Serialize + Send + Sync + 'static,
{
    fn to_json(&self, pretty: bool) -> Result<Vec<u8>, serde_json::Error> {
        if pretty {
            serde_json::to_vec_pretty(self)
        } else {
            serde_json::to_vec(self)
        }
    }

    fn to_xml(&self, root: Option<&str>, indent: bool) -> Result<String, FormatError> {
        let mut buffer = String::new();
        let mut serializer = match root {
            Some(root) => XmlSerializer::with_root(&mut buffer, Some(root))
                .map_err(|e| FormatError::Xml(e.to_string()))?,
            None => XmlSerializer::new(&mut buffer),
        };
        if indent {
            serializer.indent(' ', 2);
        }
        self.serialize(serializer)
            .map_err(|e| FormatError::Xml(e.to_string()))?;
        Ok(buffer)
    }

    fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl fmt::Debug for dyn Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Ok(value) => write!(f, "Payload({})", value),
            Err(_) => f.write_str("Payload(<unserializable>)"),
        }
    }
}
