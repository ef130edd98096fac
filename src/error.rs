//! `WebTerm` Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.
//!
//! Parser anomalies are deliberately absent: an unterminated escape sequence
//! degrades to literal text and never surfaces as an error.

use thiserror::Error;

use crate::transport::ConnectionState;

/// Top-level error type for `WebTerm`
#[derive(Error, Debug)]
pub enum WebTermError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Transport-related errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Not connected (state: {state})")]
    NotConnected { state: ConnectionState },

    #[error("Maximum reconnection attempts reached ({attempts})")]
    ReconnectExhausted { attempts: u32 },

    #[error("Failed to send frame: {0}")]
    Send(String),

    #[error("Failed to decode frame: {0}")]
    Decode(String),

    #[error("Transport channel closed")]
    Closed,
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type alias for `WebTerm` operations
pub type Result<T> = std::result::Result<T, WebTermError>;

/// Result type alias for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Result type alias for Config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransportError::ReconnectExhausted { attempts: 5 };
        assert_eq!(err.to_string(), "Maximum reconnection attempts reached (5)");

        let err = TransportError::NotConnected {
            state: ConnectionState::Disconnected,
        };
        assert_eq!(err.to_string(), "Not connected (state: disconnected)");
    }

    #[test]
    fn test_error_conversion() {
        let err = TransportError::Closed;
        let top: WebTermError = err.into();
        assert!(matches!(top, WebTermError::Transport(_)));

        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: TransportError = json_err.into();
        assert!(matches!(err, TransportError::Decode(_)));
    }
}
