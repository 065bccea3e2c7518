//! User notification port.
//!
//! Notification delivery is best-effort and sits outside the reconciliation
//! transaction: a failed send is logged and the webhook is still
//! acknowledged, since the payment state has already been persisted.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::UserId;

#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Notification transport failure: {0}")]
    Transport(String),

    #[error("Notification rejected by platform: {0}")]
    Rejected(String),
}

/// Port for sending a message to a user on the chat platform.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, user_id: UserId, text: &str) -> Result<(), NotifierError>;
}
