//! API-specific error types
//!
//! Provides error classification for GraphQL operations with retry metadata.

use std::time::Duration;

use liefclock_domain::LiefClockError;
use thiserror::Error;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403) - retry after token refresh
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) - non-retryable
    Client,
    /// Business-rule refusal reported in the GraphQL `errors` array
    Rejected,
    /// Network/connection errors - retryable
    Network,
    /// Configuration errors - non-retryable
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    /// First message of the GraphQL `errors` array.
    #[error("{0}")]
    GraphQl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::GraphQl(_) => ApiErrorCategory::Rejected,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
        }
    }

    /// Check if this error should be retried
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::Authentication
                | ApiErrorCategory::RateLimit
                | ApiErrorCategory::Server
                | ApiErrorCategory::Network
        )
    }
}

/// Retryable failures become `Network` (or `Timeout`) so a sync pass stops
/// and waits for the next trigger; refusals become `ServerRejection` and
/// count against the action's retry budget.
impl From<ApiError> for LiefClockError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Timeout(after) => {
                LiefClockError::Timeout(format!("request exceeded {}ms", after.as_millis()))
            }
            ApiError::Config(message) => LiefClockError::Config(message),
            ApiError::GraphQl(message) => LiefClockError::ServerRejection(message),
            other if other.should_retry() => LiefClockError::Network(other.to_string()),
            other => LiefClockError::ServerRejection(other.to_string()),
        }
    }
}

impl From<LiefClockError> for ApiError {
    fn from(err: LiefClockError) -> Self {
        match err {
            LiefClockError::Network(message) => Self::Network(message),
            LiefClockError::Timeout(message) => Self::Network(message),
            LiefClockError::ServerRejection(message) => Self::Client(message),
            LiefClockError::Config(message) => Self::Config(message),
            other => Self::Server(other.to_string()),
        }
    }
}
