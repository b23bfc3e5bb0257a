//! Failure taxonomy of the data-access layer.

use thiserror::Error;

use crate::schema::SchemaError;
use crate::transport::TransportError;

/// Errors returned by [`super::UserClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Backend unreachable, timed out, or answered with a server error.
    #[error("network failure: {0}")]
    Network(String),

    /// A payload or response body did not match its schema.
    #[error(transparent)]
    Validation(#[from] SchemaError),

    #[error("user {id} not found")]
    NotFound { id: String },

    /// The backend refused the request (4xx other than a missing user).
    #[error("request rejected with status {status}: {message}")]
    Client { status: u16, message: String },
}

/// Coarse grouping shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Failure,
    NotFound,
    Rejected,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network(_) | Self::Validation(_) => ErrorKind::Failure,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Client { .. } => ErrorKind::Rejected,
        }
    }

    /// Only network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        Self::Network(err.to_string())
    }
}
