//! # Error Types
//!
//! Only configuration problems are errors. Data-quality problems inside a
//! document degrade to a logged warning or an [`Issue`](crate::Issue) and
//! never surface here.
//!
//! [`ConfigError`] is the distinguishable type callers catch at startup when
//! a scheme, rule configuration, or registry lookup is unusable.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or checking configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A scheme names a query type that no registered query implements.
    #[error("unknown query type {query_type:?}")]
    UnknownQuery { query_type: String },

    /// An output definition names an unregistered post-processor.
    #[error("unknown post-processor {name:?}")]
    UnknownPostProcessor { name: String },

    /// The rule configuration enables an unregistered verifier.
    #[error("unknown verifier {name:?}")]
    UnknownVerifier { name: String },

    /// A validator tag is bound to an unregistered validator function.
    #[error("validator tag {tag:?} refers to unknown validator {validator:?}")]
    UnknownValidator { tag: String, validator: String },

    /// A required configuration key is absent.
    #[error("{context}: missing required key {key:?}")]
    MissingKey { context: String, key: String },

    /// A configuration value has the wrong shape or content.
    #[error("{context}: {reason}")]
    Invalid { context: String, reason: String },

    /// A regular expression in the configuration does not compile.
    #[error("{context}: invalid pattern {pattern:?}: {source}")]
    Pattern {
        context: String,
        pattern: String,
        source: regex::Error,
    },

    /// YAML parsing failed.
    #[error("failed to parse YAML at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// JSON parsing failed.
    #[error("failed to parse JSON at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// A required file was not found.
    #[error("required file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// I/O error while reading configuration.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level error type for the verifier.
#[derive(Debug, Error)]
pub enum TmvError {
    /// Configuration could not be loaded or checked.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for TmvError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_query_display() {
        let err = ConfigError::UnknownQuery {
            query_type: "xpath".to_string(),
        };
        assert!(format!("{err}").contains("xpath"));
    }

    #[test]
    fn unknown_validator_names_both_sides() {
        let err = ConfigError::UnknownValidator {
            tag: "validate-date".to_string(),
            validator: "datetime".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("validate-date"));
        assert!(msg.contains("datetime"));
    }

    #[test]
    fn missing_key_display() {
        let err = ConfigError::MissingKey {
            context: "common".to_string(),
            key: "asset-data-tag".to_string(),
        };
        assert_eq!(format!("{err}"), "common: missing required key \"asset-data-tag\"");
    }

    #[test]
    fn file_not_found_display() {
        let err = ConfigError::FileNotFound {
            path: PathBuf::from("/tmp/missing.yaml"),
        };
        assert!(format!("{err}").contains("/tmp/missing.yaml"));
    }

    #[test]
    fn config_error_wraps_into_tmv_error() {
        let err = TmvError::from(ConfigError::UnknownVerifier {
            name: "spelling".to_string(),
        });
        assert!(matches!(err, TmvError::Config(_)));
        assert!(format!("{err}").contains("spelling"));
    }

    #[test]
    fn serde_json_error_becomes_serialization() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = TmvError::from(parse);
        assert!(matches!(err, TmvError::Serialization(_)));
    }
}
