//! # Error Types Module
//!
//! This module defines the error types returned by the remote clients.
//! Handlers turn them into user-facing messages; nothing here is retried.

/// Errors returned by the background-removal client
#[derive(Debug, Clone)]
pub enum RemovalError {
    /// The request did not complete within the configured timeout
    Timeout(String),
    /// The service answered with a non-success status
    Rejected { status: u16, body: String },
    /// Network or protocol failure before a response was received
    Transport(String),
}

impl std::fmt::Display for RemovalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemovalError::Timeout(msg) => write!(f, "Timeout error: {msg}"),
            RemovalError::Rejected { status, body } => {
                write!(f, "Rejected with status {status}: {body}")
            }
            RemovalError::Transport(msg) => write!(f, "Transport error: {msg}"),
        }
    }
}

impl std::error::Error for RemovalError {}

impl From<reqwest::Error> for RemovalError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemovalError::Timeout(err.to_string())
        } else {
            RemovalError::Transport(err.to_string())
        }
    }
}

/// Errors returned by the remote user store
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Network failure or timeout talking to the backend
    Transport(String),
    /// The backend answered with a non-success status
    Rejected { status: u16, body: String },
    /// The backend answered with a body we could not decode
    Decode(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Transport(msg) => write!(f, "Store transport error: {msg}"),
            StoreError::Rejected { status, body } => {
                write!(f, "Store rejected request with status {status}: {body}")
            }
            StoreError::Decode(msg) => write!(f, "Store decode error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Transport(err.to_string())
        }
    }
}
