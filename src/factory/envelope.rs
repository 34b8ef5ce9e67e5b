//! Default error envelope shape.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::response::code_from_status;

/// Body of every error response built by the default builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "error")]
pub struct ErrorEnvelope {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    pub status: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FieldError>,
}

/// One (field, message) pair of a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub pointer: String,
    pub detail: String,
}

impl ErrorEnvelope {
    pub fn new(status: StatusCode, title: impl Into<String>) -> Self {
        Self {
            code: code_from_status(status).unwrap_or_default(),
            status: status.as_u16().to_string(),
            title: title.into(),
            details: None,
            errors: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }

    /// One entry per message, fields in key order.
    pub fn with_field_errors(mut self, attribute_errors: &BTreeMap<String, Vec<String>>) -> Self {
        self.errors = attribute_errors
            .iter()
            .flat_map(|(field, messages)| {
                messages.iter().map(move |message| FieldError {
                    pointer: field.clone(),
                    detail: message.clone(),
                })
            })
            .collect();
        self
    }
}
