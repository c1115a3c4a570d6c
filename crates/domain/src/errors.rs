//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for LiefClock
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum LiefClockError {
    /// Durable store unavailable or corrupted. Never swallowed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Connectivity failure during a remote call.
    #[error("Network error: {0}")]
    Network(String),

    /// The server was reached but refused the request on business rules.
    #[error("Server rejected request: {0}")]
    ServerRejection(String),

    /// Geolocation, reachability probe or wait exceeded its bound.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Device location or notification permission denied.
    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LiefClockError {
    /// Connection-level failure: the network is presumed down.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Transient conditions that resolve on the next natural trigger.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }

    pub fn is_server_rejection(&self) -> bool {
        matches!(self, Self::ServerRejection(_))
    }

    pub fn is_permission(&self) -> bool {
        matches!(self, Self::Permission(_))
    }
}

/// Result type alias for LiefClock operations
pub type Result<T> = std::result::Result<T, LiefClockError>;
