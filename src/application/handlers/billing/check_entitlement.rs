//! Entitlement gate query handler.

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::domain::foundation::{Timestamp, UserId};
use crate::ports::SubscriptionStore;

/// Current access state for one user.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementView {
    pub user_id: UserId,
    pub entitled: bool,
    pub expires_at: Option<Timestamp>,
}

pub struct CheckEntitlementHandler {
    subscription_store: Arc<dyn SubscriptionStore>,
}

impl CheckEntitlementHandler {
    pub fn new(subscription_store: Arc<dyn SubscriptionStore>) -> Self {
        Self { subscription_store }
    }

    /// Fail-secure: a storage fault denies access instead of erroring out.
    pub async fn handle(&self, user_id: UserId) -> EntitlementView {
        let now = Timestamp::now();
        match self.subscription_store.find(user_id).await {
            Ok(Some(subscription)) => EntitlementView {
                user_id,
                entitled: subscription.is_active_at(&now),
                expires_at: Some(subscription.expires_at),
            },
            Ok(None) => EntitlementView {
                user_id,
                entitled: false,
                expires_at: None,
            },
            Err(err) => {
                warn!(%user_id, %err, "entitlement lookup failed, denying access");
                EntitlementView {
                    user_id,
                    entitled: false,
                    expires_at: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    use crate::domain::billing::{Subscription, SubscriptionStatus};
    use crate::domain::foundation::DomainError;

    enum Behavior {
        Found(Subscription),
        Missing,
        Failing,
    }

    struct StubStore(Behavior);

    #[async_trait]
    impl SubscriptionStore for StubStore {
        async fn extend_or_activate(
            &self,
            _user_id: UserId,
            _duration_days: i64,
        ) -> Result<Subscription, DomainError> {
            unimplemented!("not exercised here")
        }

        async fn find(&self, _user_id: UserId) -> Result<Option<Subscription>, DomainError> {
            match &self.0 {
                Behavior::Found(sub) => Ok(Some(sub.clone())),
                Behavior::Missing => Ok(None),
                Behavior::Failing => Err(DomainError::database("database is locked")),
            }
        }

        async fn is_entitled(&self, user_id: UserId) -> Result<bool, DomainError> {
            let now = Timestamp::now();
            Ok(self.find(user_id).await?.is_some_and(|s| s.is_active_at(&now)))
        }
    }

    fn subscription(user_id: i64, days_from_now: i64) -> Subscription {
        let now = Timestamp::now();
        Subscription {
            user_id: UserId::new(user_id),
            status: SubscriptionStatus::Active,
            created_at: now,
            expires_at: if days_from_now >= 0 {
                now.add_days(days_from_now)
            } else {
                now.minus_days(-days_from_now)
            },
        }
    }

    #[tokio::test]
    async fn active_subscription_grants_access() {
        let handler = CheckEntitlementHandler::new(Arc::new(StubStore(Behavior::Found(
            subscription(42, 10),
        ))));
        let view = handler.handle(UserId::new(42)).await;
        assert!(view.entitled);
        assert!(view.expires_at.is_some());
    }

    #[tokio::test]
    async fn lapsed_subscription_denies_access() {
        let handler = CheckEntitlementHandler::new(Arc::new(StubStore(Behavior::Found(
            subscription(42, -1),
        ))));
        let view = handler.handle(UserId::new(42)).await;
        assert!(!view.entitled);
        assert!(view.expires_at.is_some());
    }

    #[tokio::test]
    async fn missing_subscription_denies_access() {
        let handler = CheckEntitlementHandler::new(Arc::new(StubStore(Behavior::Missing)));
        let view = handler.handle(UserId::new(42)).await;
        assert!(!view.entitled);
        assert!(view.expires_at.is_none());
    }

    #[tokio::test]
    async fn storage_fault_denies_access() {
        let handler = CheckEntitlementHandler::new(Arc::new(StubStore(Behavior::Failing)));
        let view = handler.handle(UserId::new(42)).await;
        assert!(!view.entitled);
    }
}
