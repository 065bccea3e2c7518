//! Subscription store port.

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, UserId};

/// Port for the one-row-per-user subscription store.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Credits `duration_days` of paid time to the user.
    ///
    /// An unexpired subscription is extended from its current expiry, a
    /// lapsed or absent one restarts from now. The row always ends up
    /// active. Returns the subscription as stored.
    async fn extend_or_activate(
        &self,
        user_id: UserId,
        duration_days: i64,
    ) -> Result<Subscription, DomainError>;

    /// Fetches the user's subscription, if any.
    async fn find(&self, user_id: UserId) -> Result<Option<Subscription>, DomainError>;

    /// Whether the user currently holds an active, unexpired subscription.
    ///
    /// Fail-secure: callers should treat an error as no access.
    async fn is_entitled(&self, user_id: UserId) -> Result<bool, DomainError>;
}
