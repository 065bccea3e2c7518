//! Payment ledger entities and reconciliation outcomes.

use serde::{Deserialize, Serialize};

use super::subscription::Subscription;
use crate::domain::foundation::{Timestamp, TransactionId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "completed" => Some(PaymentStatus::Completed),
            "failed" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

/// One payment attempt as recorded in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub user_id: UserId,
    pub transaction_id: TransactionId,
    pub amount: String,
    pub status: PaymentStatus,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}

/// Result of recording a payment attempt in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// The transaction id already exists; the prior row is left untouched.
    DuplicateTransaction,
}

/// Result of marking a payment completed.
///
/// Only [`CompletionOutcome::Completed`] represents a fresh state change;
/// a redelivered notification lands on [`CompletionOutcome::AlreadyCompleted`]
/// and must not extend the subscription again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Completed,
    AlreadyCompleted,
}

/// Result of settling a payment: completing it and crediting the
/// subscription together.
///
/// [`SettlementOutcome::AlreadySettled`] guarantees a prior settlement
/// committed both mutations, so a redelivery can be acknowledged without
/// checking the subscription again.
#[derive(Debug, Clone)]
pub enum SettlementOutcome {
    /// Fresh completion; the subscription reflects the credit.
    Extended(Subscription),
    AlreadySettled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_round_trips_through_text() {
        assert_eq!(PaymentStatus::parse("pending"), Some(PaymentStatus::Pending));
        assert_eq!(
            PaymentStatus::parse("completed"),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(PaymentStatus::parse("failed"), Some(PaymentStatus::Failed));
        assert_eq!(PaymentStatus::parse("refunded"), None);
        assert_eq!(PaymentStatus::Completed.as_str(), "completed");
    }
}
