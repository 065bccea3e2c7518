//! SQLite implementation of the payment ledger.
//!
//! Idempotency leans on the schema: `transaction_id` is UNIQUE, so a
//! duplicate insert is detected by the constraint rather than a racy
//! check-then-insert, and completion is a guarded UPDATE whose affected
//! row count distinguishes a fresh transition from a redelivery.
//!
//! Settlement writes the completion and the subscription credit in one
//! transaction. A fault rolls both back, the payment stays pending, and
//! the gateway retry replays the whole settlement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::billing::{
    extended_expiry, CompletionOutcome, Payment, PaymentStatus, RecordOutcome, SettlementOutcome,
    Subscription, SubscriptionStatus,
};
use crate::domain::foundation::{
    DomainError, ErrorCode, Timestamp, TransactionId, UserId,
};
use crate::ports::PaymentLedger;

pub struct SqlitePaymentLedger {
    pool: SqlitePool,
}

impl SqlitePaymentLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentLedger for SqlitePaymentLedger {
    async fn record_attempt(
        &self,
        user_id: UserId,
        transaction_id: &TransactionId,
        amount: &str,
    ) -> Result<RecordOutcome, DomainError> {
        let now = Timestamp::now();
        let result = sqlx::query(
            "INSERT INTO payments (user_id, transaction_id, amount, status, created_at) \
             VALUES (?, ?, ?, 'pending', ?)",
        )
        .bind(user_id.as_i64())
        .bind(transaction_id.as_str())
        .bind(amount)
        .bind(*now.as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(RecordOutcome::Recorded),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(RecordOutcome::DuplicateTransaction)
            }
            Err(err) => Err(DomainError::database(format!(
                "Failed to record payment attempt: {}",
                err
            ))),
        }
    }

    async fn mark_completed(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<CompletionOutcome, DomainError> {
        let now = Timestamp::now();
        let result = sqlx::query(
            "UPDATE payments SET status = 'completed', completed_at = ? \
             WHERE transaction_id = ? AND status <> 'completed'",
        )
        .bind(*now.as_datetime())
        .bind(transaction_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|err| {
            DomainError::database(format!("Failed to mark payment completed: {}", err))
        })?;

        if result.rows_affected() > 0 {
            return Ok(CompletionOutcome::Completed);
        }

        let exists: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM payments WHERE transaction_id = ?")
                .bind(transaction_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|err| {
                    DomainError::database(format!("Failed to look up payment: {}", err))
                })?;

        if exists.is_some() {
            Ok(CompletionOutcome::AlreadyCompleted)
        } else {
            Err(DomainError::new(
                ErrorCode::PaymentNotFound,
                format!("No payment with transaction id {}", transaction_id),
            ))
        }
    }

    async fn complete_and_extend(
        &self,
        transaction_id: &TransactionId,
        duration_days: i64,
    ) -> Result<SettlementOutcome, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|err| {
            DomainError::database(format!("Failed to open settlement transaction: {}", err))
        })?;

        let now = Timestamp::now();
        let updated = sqlx::query(
            "UPDATE payments SET status = 'completed', completed_at = ? \
             WHERE transaction_id = ? AND status <> 'completed'",
        )
        .bind(*now.as_datetime())
        .bind(transaction_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            DomainError::database(format!("Failed to mark payment completed: {}", err))
        })?;

        if updated.rows_affected() == 0 {
            // dropping the transaction rolls back, nothing was written
            let exists: Option<(i64,)> =
                sqlx::query_as("SELECT 1 FROM payments WHERE transaction_id = ?")
                    .bind(transaction_id.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|err| {
                        DomainError::database(format!("Failed to look up payment: {}", err))
                    })?;

            return if exists.is_some() {
                Ok(SettlementOutcome::AlreadySettled)
            } else {
                Err(DomainError::new(
                    ErrorCode::PaymentNotFound,
                    format!("No payment with transaction id {}", transaction_id),
                ))
            };
        }

        let (user_id,): (i64,) =
            sqlx::query_as("SELECT user_id FROM payments WHERE transaction_id = ?")
                .bind(transaction_id.as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| {
                    DomainError::database(format!("Failed to look up payment: {}", err))
                })?;

        let current: Option<(DateTime<Utc>,)> =
            sqlx::query_as("SELECT expires_at FROM subscriptions WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|err| {
                    DomainError::database(format!("Failed to read subscription: {}", err))
                })?;

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
        .bind(user_id)
        .bind(*now.as_datetime())
        .bind(*new_expiry.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|err| DomainError::database(format!("Failed to upsert subscription: {}", err)))?;

        let row: (DateTime<Utc>, DateTime<Utc>) =
            sqlx::query_as("SELECT created_at, expires_at FROM subscriptions WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|err| {
                    DomainError::database(format!("Failed to re-read subscription: {}", err))
                })?;

        tx.commit().await.map_err(|err| {
            DomainError::database(format!("Failed to commit settlement: {}", err))
        })?;

        Ok(SettlementOutcome::Extended(Subscription {
            user_id: UserId::new(user_id),
            status: SubscriptionStatus::Active,
            created_at: Timestamp::from_datetime(row.0),
            expires_at: Timestamp::from_datetime(row.1),
        }))
    }

    async fn find(&self, transaction_id: &TransactionId) -> Result<Option<Payment>, DomainError> {
        type Row = (
            i64,
            String,
            String,
            String,
            DateTime<Utc>,
            Option<DateTime<Utc>>,
        );

        let row: Option<Row> = sqlx::query_as(
            "SELECT user_id, transaction_id, amount, status, created_at, completed_at \
             FROM payments WHERE transaction_id = ?",
        )
        .bind(transaction_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| DomainError::database(format!("Failed to look up payment: {}", err)))?;

        row.map(payment_from_row).transpose()
    }
}

fn payment_from_row(
    (user_id, transaction_id, amount, status, created_at, completed_at): (
        i64,
        String,
        String,
        String,
        DateTime<Utc>,
        Option<DateTime<Utc>>,
    ),
) -> Result<Payment, DomainError> {
    let status = PaymentStatus::parse(&status).ok_or_else(|| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Unknown payment status '{}' in ledger", status),
        )
    })?;
    let transaction_id = TransactionId::new(transaction_id).map_err(|err| {
        DomainError::new(
            ErrorCode::InternalError,
            format!("Corrupt transaction id in ledger: {}", err),
        )
    })?;

    Ok(Payment {
        user_id: UserId::new(user_id),
        transaction_id,
        amount,
        status,
        created_at: Timestamp::from_datetime(created_at),
        completed_at: completed_at.map(Timestamp::from_datetime),
    })
}
