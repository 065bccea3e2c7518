//! SQLite implementation of the subscription store.
//!
//! The extension rule runs inside one transaction so a concurrent webhook
//! for the same user cannot read a stale expiry. Timestamps are stored in
//! the format sqlx uses for `DateTime<Utc>`, which compares correctly as
//! text within SQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::billing::{extended_expiry, Subscription, SubscriptionStatus};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::SubscriptionStore;

pub struct SqliteSubscriptionStore {
    pool: SqlitePool,
}

impl SqliteSubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for SqliteSubscriptionStore {
    async fn extend_or_activate(
        &self,
        user_id: UserId,
        duration_days: i64,
    ) -> Result<Subscription, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|err| {
            DomainError::database(format!("Failed to open transaction: {}", err))
        })?;

        let current: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT expires_at FROM subscriptions WHERE user_id = ?")
                .bind(user_id.as_i64())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|err| {
                    DomainError::database(format!("Failed to read subscription: {}", err))
                })?;

        let now = Timestamp::now();
        let new_expiry = extended_expiry(
            current.map(|(expires_at,)| Timestamp::from_datetime(expires_at)),
            now,
            duration_days,
        );

        sqlx::query(
            "INSERT INTO subscriptions (user_id, status, created_at, expires_at) \
             VALUES (?, 'active', ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET status = 'active', expires_at = excluded.expires_at",
        )
        .bind(user_id.as_i64())
        .bind(*now.as_datetime())
        .bind(*new_expiry.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|err| DomainError::database(format!("Failed to upsert subscription: {}", err)))?;

        let row: (DateTime<Utc>, DateTime<Utc>) =
            sqlx::query_as("SELECT created_at, expires_at FROM subscriptions WHERE user_id = ?")
                .bind(user_id.as_i64())
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| {
                    DomainError::database(format!("Failed to re-read subscription: {}", err))
                })?;

        tx.commit().await.map_err(|err| {
            DomainError::database(format!("Failed to commit subscription update: {}", err))
        })?;

        Ok(Subscription {
            user_id,
            status: SubscriptionStatus::Active,
            created_at: Timestamp::from_datetime(row.0),
            expires_at: Timestamp::from_datetime(row.1),
        })
    }

    async fn find(&self, user_id: UserId) -> Result<Option<Subscription>, DomainError> {
        let row: Option<(String, DateTime<Utc>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT status, created_at, expires_at FROM subscriptions WHERE user_id = ?",
        )
        .bind(user_id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| DomainError::database(format!("Failed to read subscription: {}", err)))?;

        row.map(|(status, created_at, expires_at)| {
            let status = SubscriptionStatus::parse(&status).ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InternalError,
                    format!("Unknown subscription status '{}'", status),
                )
            })?;
            Ok(Subscription {
                user_id,
                status,
                created_at: Timestamp::from_datetime(created_at),
                expires_at: Timestamp::from_datetime(expires_at),
            })
        })
        .transpose()
    }

    async fn is_entitled(&self, user_id: UserId) -> Result<bool, DomainError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM subscriptions \
             WHERE user_id = ? AND status = 'active' AND expires_at > ?",
        )
        .bind(user_id.as_i64())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|err| DomainError::database(format!("Failed to check entitlement: {}", err)))?;

        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::tests::memory_pool;

    #[tokio::test]
    async fn first_payment_activates_from_now() {
        let store = SqliteSubscriptionStore::new(memory_pool().await);
        let before = Timestamp::now();

        let sub = store
            .extend_or_activate(UserId::new(42), 30)
            .await
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.expires_at.is_after(&before.add_days(29)));
        assert!(store.is_entitled(UserId::new(42)).await.unwrap());
    }

    #[tokio::test]
    async fn active_subscription_extends_additively() {
        let store = SqliteSubscriptionStore::new(memory_pool().await);

        let first = store
            .extend_or_activate(UserId::new(42), 30)
            .await
            .unwrap();
        let second = store
            .extend_or_activate(UserId::new(42), 30)
            .await
            .unwrap();

        assert_eq!(second.expires_at, first.expires_at.add_days(30));
        // created_at is preserved across extensions
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn unknown_user_is_not_entitled() {
        let store = SqliteSubscriptionStore::new(memory_pool().await);
        assert!(!store.is_entitled(UserId::new(7)).await.unwrap());
        assert!(store.find(UserId::new(7)).await.unwrap().is_none());
    }
}
