//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (compression level)
//! - Validate media-type patterns and the XML root name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ResponseConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;

use crate::config::schema::ResponseConfig;

/// Highest level any supported codec accepts (brotli quality).
pub const MAX_COMPRESSION_LEVEL: u32 = 11;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &ResponseConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.compression.level > MAX_COMPRESSION_LEVEL {
        errors.push(ValidationError::new(
            "compression.level",
            format!("must be between 0 and {}", MAX_COMPRESSION_LEVEL),
        ));
    }

    for (i, pattern) in config.compression.content_types.iter().enumerate() {
        if !is_media_pattern(pattern) {
            errors.push(ValidationError::new(
                format!("compression.content_types[{}]", i),
                format!("'{}' is not a media type pattern", pattern),
            ));
        }
    }

    if let Some(root) = &config.formatting.xml_root {
        if root.trim().is_empty() || root.chars().any(char::is_whitespace) {
            errors.push(ValidationError::new(
                "formatting.xml_root",
                "must be a non-empty element name",
            ));
        }
    }

    if config.observability.log_level.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_level", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `type/subtype`, `type/*` and `*/*`.
pub(crate) fn is_media_pattern(pattern: &str) -> bool {
    let Some((kind, subtype)) = pattern.split_once('/') else {
        return false;
    };
    let valid = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    match (kind, subtype) {
        ("*", "*") => true,
        ("*", _) => false,
        (kind, "*") => valid(kind),
        (kind, subtype) => valid(kind) && valid(subtype),
    }
}
