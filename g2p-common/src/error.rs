//! Common error types for the Hermes G2P service

use thiserror::Error;

/// Common result type for G2P service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the G2P service crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload encode/decode error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid inbound request payload
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Publish/subscribe transport failure
    #[error("Transport error: {0}")]
    Transport(String),
}
