//! Structured error types for configuration loading and binding.

use crate::config::{ConversionError, ValueKind};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Source errors, abort the whole build
    UnsupportedSourceFormat,
    SourceLoadFailed,
    InvalidOverride,

    // Schema errors
    InvalidSchema,
    UnknownProperty,
    KindMismatch,

    // Access errors, local to one property
    MissingProperty,
    ConversionFailed,
}

/// Errors raised while building or reading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No loader handles the source's format.
    #[error("Unsupported configuration format '{extension}' for {}", .path.display())]
    UnsupportedSourceFormat { path: PathBuf, extension: String },

    /// A source of a supported format could not be read or parsed.
    #[error("Failed to load configuration source {label}: {reason}")]
    SourceLoadFailed { label: String, reason: String },

    /// A `key=value` override could not be parsed.
    #[error("Invalid override '{definition}': {reason}")]
    InvalidOverride { definition: String, reason: String },

    /// A descriptor violates a schema invariant.
    #[error("Invalid schema {schema}: property '{property}' {reason}")]
    InvalidSchema {
        schema: String,
        property: String,
        reason: String,
    },

    /// The schema declares no property with that name.
    #[error("Schema {schema} has no property '{property}'")]
    UnknownProperty { schema: String, property: String },

    /// The property was read as a different kind than it is declared.
    #[error("Property '{property}' is declared as {declared}, not {requested}")]
    KindMismatch {
        property: String,
        declared: ValueKind,
        requested: ValueKind,
    },

    /// A required key is absent and has no default.
    #[error("The configuration key {path} is not set")]
    MissingProperty { path: String },

    /// The value at a key cannot be converted to the declared type.
    #[error("Value at {path} cannot be converted: {source}")]
    ConversionFailed {
        path: String,
        #[source]
        source: ConversionError,
    },
}

impl ConfigError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::UnsupportedSourceFormat { .. } => ErrorCode::UnsupportedSourceFormat,
            ConfigError::SourceLoadFailed { .. } => ErrorCode::SourceLoadFailed,
            ConfigError::InvalidOverride { .. } => ErrorCode::InvalidOverride,
            ConfigError::InvalidSchema { .. } => ErrorCode::InvalidSchema,
            ConfigError::UnknownProperty { .. } => ErrorCode::UnknownProperty,
            ConfigError::KindMismatch { .. } => ErrorCode::KindMismatch,
            ConfigError::MissingProperty { .. } => ErrorCode::MissingProperty,
            ConfigError::ConversionFailed { .. } => ErrorCode::ConversionFailed,
        }
    }

    // Convenience constructors

    pub fn load_failed(label: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        ConfigError::SourceLoadFailed {
            label: label.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_schema(
        schema: impl Into<String>,
        property: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidSchema {
            schema: schema.into(),
            property: property.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(path: impl Into<String>) -> Self {
        ConfigError::MissingProperty { path: path.into() }
    }

    pub fn conversion(path: impl Into<String>, source: ConversionError) -> Self {
        ConfigError::ConversionFailed {
            path: path.into(),
            source,
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalarType;

    #[test]
    fn test_codes_serialize_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::UnsupportedSourceFormat).unwrap();
        assert_eq!(json, "\"UNSUPPORTED_SOURCE_FORMAT\"");
    }

    #[test]
    fn test_messages_name_the_key() {
        let err = ConfigError::missing("/nonexistent_hash");
        assert_eq!(err.code(), ErrorCode::MissingProperty);
        assert_eq!(err.to_string(), "The configuration key /nonexistent_hash is not set");

        let err = ConfigError::conversion(
            "/version",
            ConversionError {
                value: "2.1".into(),
                target: ScalarType::I32,
                reason: "not an integer literal".into(),
            },
        );
        assert_eq!(err.code(), ErrorCode::ConversionFailed);
        assert!(err.to_string().starts_with("Value at /version cannot be converted"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = ConfigError::UnsupportedSourceFormat {
            path: PathBuf::from("config.xlsx"),
            extension: "xlsx".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported configuration format 'xlsx' for config.xlsx"
        );
    }
}
