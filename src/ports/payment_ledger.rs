//! Payment ledger port.
//!
//! The ledger is the idempotency boundary for webhook reconciliation: every
//! payment attempt is keyed by its gateway transaction id, and completion is
//! a one-way transition that reports whether this call actually moved the
//! row. Redelivered notifications must observe [`RecordOutcome::DuplicateTransaction`]
//! and [`CompletionOutcome::AlreadyCompleted`] rather than errors.

use async_trait::async_trait;

use crate::domain::billing::{CompletionOutcome, Payment, RecordOutcome, SettlementOutcome};
use crate::domain::foundation::{DomainError, TransactionId, UserId};

/// Port for the append-mostly payment ledger.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Records a payment attempt.
    ///
    /// A transaction id seen before leaves the existing row untouched and
    /// returns [`RecordOutcome::DuplicateTransaction`].
    async fn record_attempt(
        &self,
        user_id: UserId,
        transaction_id: &TransactionId,
        amount: &str,
    ) -> Result<RecordOutcome, DomainError>;

    /// Marks a payment completed.
    ///
    /// Only the first call for a transaction returns
    /// [`CompletionOutcome::Completed`]; later calls see
    /// [`CompletionOutcome::AlreadyCompleted`]. An unknown transaction id is
    /// a `PAYMENT_NOT_FOUND` error.
    async fn mark_completed(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<CompletionOutcome, DomainError>;

    /// Completes the payment and credits the owning user's subscription in
    /// one storage transaction.
    ///
    /// Atomicity is the contract: a fault rolls both mutations back, so
    /// the payment stays pending and the gateway retry replays the whole
    /// settlement. A payment can never end up completed without its
    /// subscription credit. The user is taken from the recorded payment
    /// row; an unknown transaction id is a `PAYMENT_NOT_FOUND` error.
    async fn complete_and_extend(
        &self,
        transaction_id: &TransactionId,
        duration_days: i64,
    ) -> Result<SettlementOutcome, DomainError>;

    /// Looks up a payment by transaction id.
    async fn find(&self, transaction_id: &TransactionId) -> Result<Option<Payment>, DomainError>;
}
