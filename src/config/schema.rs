//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the response
//! pipeline. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResponseConfig {
    /// Default formatter and formatter options.
    pub formatting: FormattingConfig,

    /// Error response rendering.
    pub errors: ErrorConfig,

    /// Response compression settings.
    pub compression: CompressionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Built-in formatter kinds selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    #[default]
    Json,
    Xml,
    Html,
}

/// Formatter configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FormattingConfig {
    /// Formatter used when a response has none bound.
    pub default_format: FormatKind,

    /// Pretty-print JSON with two-space indentation.
    pub json_indent: bool,

    /// Indent XML output.
    pub xml_indent: bool,

    /// Root element for XML documents (defaults to the payload type name).
    pub xml_root: Option<String>,
}

/// Error response configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ErrorConfig {
    /// Expose error details and causes to clients (dev/staging only).
    pub verbosity: bool,

    /// Log every constructed response at debug level.
    pub debug_mode: bool,
}

/// Compression configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Enable the compression middleware.
    pub enabled: bool,

    /// Codec level (0-9 for gzip/deflate, 0-11 for brotli).
    pub level: u32,

    /// Bodies smaller than this many bytes are sent as-is.
    pub min_size: u64,

    /// Compressible media types; empty means all.
    pub content_types: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 6,
            min_size: 1024,
            content_types: vec![
                "application/json".to_string(),
                "application/xml".to_string(),
                "text/*".to_string(),
            ],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Record response metrics.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ResponseConfig = toml::from_str("").unwrap();
        assert_eq!(config.formatting.default_format, FormatKind::Json);
        assert_eq!(config.compression.min_size, 1024);
        assert!(!config.errors.verbosity);
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config: ResponseConfig = toml::from_str(
            r#"
            [formatting]
            default_format = "xml"
            xml_root = "response"

            [compression]
            level = 11
            content_types = []

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.formatting.default_format, FormatKind::Xml);
        assert_eq!(config.formatting.xml_root.as_deref(), Some("response"));
        assert_eq!(config.compression.level, 11);
        assert_eq!(config.compression.min_size, 1024);
        assert!(config.compression.content_types.is_empty());
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
