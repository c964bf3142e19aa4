use super::client::TransportError;
use crate::auth::AuthError;
use crate::domain::ValidationError;
use crate::reliability::RetryPolicy;
use std::time::Duration;
use thiserror::Error;

/// Final outcome of a failed submission. Only the most recent attempt's error
/// is surfaced.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidField(#[from] ValidationError),

    #[error("Invalid submission options: {0}")]
    InvalidOptions(String),

    #[error("No auth token available: {0}")]
    MissingCredential(#[from] AuthError),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Logging API responded {status}: {body}")]
    ClientError { status: u16, body: String },

    #[error("Logging API responded {status}")]
    ServerError { status: u16 },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to encode log event: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Submission cancelled")]
    Cancelled,

    #[error("Unknown logging error")]
    UnknownSubmissionError,
}

impl SubmitError {
    /// Whether another attempt could produce a different outcome.
    pub fn is_retryable(&self, policy: &RetryPolicy) -> bool {
        match self {
            SubmitError::Timeout(_) | SubmitError::ServerError { .. } | SubmitError::Transport(_) => {
                true
            }
            SubmitError::ClientError { .. } => policy.retry_client_errors,
            SubmitError::InvalidField(_)
            | SubmitError::InvalidOptions(_)
            | SubmitError::MissingCredential(_)
            | SubmitError::Encoding(_)
            | SubmitError::Cancelled
            | SubmitError::UnknownSubmissionError => false,
        }
    }

    /// HTTP status of the last response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            SubmitError::ClientError { status, .. } | SubmitError::ServerError { status } => {
                Some(*status)
            }
            _ => None,
        }
    }
}
