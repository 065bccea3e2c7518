//! Webhook processing errors with HTTP status mapping.

use http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

/// Errors surfaced while reconciling a webhook notification.
///
/// Only persistence failures are retryable: they return 500 so the gateway
/// redelivers, and the idempotent ledger absorbs the retry. Everything else
/// is a permanent rejection.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Signature verification failed")]
    SignatureMismatch,

    #[error("Persistence failure: {0}")]
    Persistence(String),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::MissingField(_) | WebhookError::SignatureMismatch => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, WebhookError::Persistence(_))
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        WebhookError::Persistence(err.to_string())
    }
}
