// src/error.rs

//! Unified error handling for the offer poller.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for poller operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Listing fetch or mail transport failed
    #[error("Network error: {0}")]
    Network(String),

    /// Fetched document could not be interpreted as markup
    #[error("Parse error: {0}")]
    Parse(String),

    /// Mail server rejected the login
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Mail message could not be transmitted
    #[error("Send error: {0}")]
    Send(String),

    /// Offer cache file could not be read or written
    #[error("Cache I/O error on {}: {source}", .path.display())]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Mailbox address parsing failed
    #[error("Invalid mail address '{address}': {message}")]
    Address { address: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create a network error.
    pub fn network(message: impl fmt::Display) -> Self {
        Self::Network(message.to_string())
    }

    /// Create a markup parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create a mail authentication error.
    pub fn auth(message: impl fmt::Display) -> Self {
        Self::Auth(message.to_string())
    }

    /// Create a mail send error.
    pub fn send(message: impl fmt::Display) -> Self {
        Self::Send(message.to_string())
    }

    /// Create a cache I/O error bound to the cache file path.
    pub fn store_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::StoreIo {
            path: path.into(),
            source,
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a mailbox parsing error.
    pub fn address(address: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Address {
            address: address.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        Self::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_io_message_includes_path() {
        let err = AppError::store_io(
            "offers.dat",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let message = err.to_string();
        assert!(message.contains("offers.dat"));
        assert!(message.contains("denied"));
    }

    #[test]
    fn test_reqwest_maps_to_network() {
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();
        assert!(matches!(AppError::from(err), AppError::Network(_)));
    }
}
