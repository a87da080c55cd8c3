//! Configuration error types

use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while parsing or validating plugin properties.
///
/// Configuration problems are the only fatal error class: any of these
/// aborts plugin initialization.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The property document itself is not valid JSON
    #[error("failed to parse plugin properties: {0}")]
    Parse(#[from] serde_json::Error),

    /// The property document is valid JSON but not an object
    #[error("plugin properties must be a JSON object")]
    NotAnObject,

    /// A sink list failed to parse
    #[error("invalid {key}: {source}")]
    InvalidSinks {
        /// Property key, `sinks` or `clustersinks`
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A sink list property holds something other than a JSON array or a
    /// string containing one
    #[error("{key} must be a JSON array of sink descriptors")]
    SinksNotAnArray { key: &'static str },

    /// A boolean property holds an unrecognised value
    #[error("{key} must be a boolean, got '{value}'")]
    InvalidBool { key: &'static str, value: String },

    /// A string property holds a non-string value
    #[error("{key} must be a string")]
    NotAString { key: &'static str },

    /// Neither `sinks` nor `clustersinks` yields a sink
    #[error("no sinks configured - set sinks or clustersinks")]
    NoSinksConfigured,

    /// A sink descriptor's address is not `host:port`
    #[error("sink '{name}' has invalid addr '{addr}': expected host:port")]
    InvalidAddr { name: String, addr: String },
}
