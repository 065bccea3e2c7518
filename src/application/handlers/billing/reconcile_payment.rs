//! Webhook reconciliation command handler.
//!
//! Drives one gateway result notification through verification, the
//! idempotent ledger, and subscription extension. The acknowledgment body
//! is `OK{InvId}`; the gateway keeps redelivering until it sees it, so
//! every verified notification must reach an acknowledged outcome even
//! when nothing new happened.
//!
//! Completion and extension commit together through
//! [`PaymentLedger::complete_and_extend`]. A fault there leaves the
//! payment pending and surfaces as a retryable error, so the gateway
//! redelivery replays the whole settlement instead of finding a completed
//! payment with a missing credit.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::domain::billing::{
    normalize_amount, PaymentNotification, RecordOutcome, SettlementOutcome, SignatureCodec,
    WebhookError, FIELD_AMOUNT, FIELD_INVOICE, FIELD_SIGNATURE, SHP_USER_ID,
};
use crate::domain::foundation::{Timestamp, TransactionId, UserId};
use crate::ports::{Notifier, PaymentLedger};

/// What reconciliation did with a verified notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Fresh completion; the subscription was extended.
    Extended {
        user_id: UserId,
        expires_at: Timestamp,
    },
    /// Redelivery of an already-settled payment; no state changed.
    AlreadyProcessed,
    /// Valid signature but no usable user attribution; acknowledged so the
    /// gateway stops redelivering, logged for manual follow-up.
    AcknowledgedDropped,
}

/// Acknowledged reconciliation result.
#[derive(Debug, Clone)]
pub struct ReconcileReceipt {
    /// Literal body the gateway expects back, `OK{InvId}`.
    pub ack: String,
    pub outcome: ReconcileOutcome,
}

pub struct ReconcilePaymentHandler {
    signature_codec: Arc<SignatureCodec>,
    payment_ledger: Arc<dyn PaymentLedger>,
    notifier: Arc<dyn Notifier>,
    subscription_days: i64,
}

impl ReconcilePaymentHandler {
    pub fn new(
        signature_codec: Arc<SignatureCodec>,
        payment_ledger: Arc<dyn PaymentLedger>,
        notifier: Arc<dyn Notifier>,
        subscription_days: i64,
    ) -> Self {
        Self {
            signature_codec,
            payment_ledger,
            notifier,
            subscription_days,
        }
    }

    pub async fn handle(
        &self,
        notification: &PaymentNotification,
    ) -> Result<ReconcileReceipt, WebhookError> {
        let raw_amount = notification
            .amount()
            .ok_or(WebhookError::MissingField(FIELD_AMOUNT))?;
        let invoice_id = notification
            .invoice_id()
            .ok_or(WebhookError::MissingField(FIELD_INVOICE))?;
        let signature = notification
            .signature()
            .ok_or(WebhookError::MissingField(FIELD_SIGNATURE))?;

        // A malformed amount still gets a signature check against the raw
        // text; the gateway signed whatever it sent.
        let amount = match normalize_amount(raw_amount) {
            Ok(canonical) => canonical,
            Err(err) => {
                warn!(raw = raw_amount, %err, "amount not canonicalizable, verifying raw");
                raw_amount.to_string()
            }
        };

        let shp_params = notification.shp_params();
        if !self
            .signature_codec
            .verify_inbound(&amount, invoice_id, &shp_params, signature)
        {
            warn!(invoice_id, "signature mismatch on result notification");
            return Err(WebhookError::SignatureMismatch);
        }

        let ack = format!("OK{}", invoice_id);

        let Some(user_id) = notification.user_id() else {
            error!(
                invoice_id,
                field = SHP_USER_ID,
                "verified notification has no usable user attribution, dropping"
            );
            return Ok(ReconcileReceipt {
                ack,
                outcome: ReconcileOutcome::AcknowledgedDropped,
            });
        };

        let transaction_id = TransactionId::new(invoice_id)
            .map_err(|_| WebhookError::MissingField(FIELD_INVOICE))?;

        match self
            .payment_ledger
            .record_attempt(user_id, &transaction_id, &amount)
            .await?
        {
            RecordOutcome::Recorded => {
                debug!(%transaction_id, %user_id, "payment attempt recorded");
            }
            RecordOutcome::DuplicateTransaction => {
                debug!(%transaction_id, "transaction already in ledger");
            }
        }

        match self
            .payment_ledger
            .complete_and_extend(&transaction_id, self.subscription_days)
            .await?
        {
            SettlementOutcome::AlreadySettled => {
                info!(%transaction_id, "redelivery of settled payment, acknowledging");
                Ok(ReconcileReceipt {
                    ack,
                    outcome: ReconcileOutcome::AlreadyProcessed,
                })
            }
            SettlementOutcome::Extended(subscription) => {
                info!(
                    %transaction_id,
                    %user_id,
                    expires_at = %subscription.expires_at.as_datetime(),
                    "payment settled, subscription extended"
                );

                let text = format!(
                    "✅ Оплата получена! Ваша подписка активна до {}.",
                    subscription.expires_at.as_datetime().format("%d.%m.%Y")
                );
                if let Err(err) = self.notifier.send(user_id, &text).await {
                    warn!(%user_id, %err, "payment confirmation not delivered");
                }

                Ok(ReconcileReceipt {
                    ack,
                    outcome: ReconcileOutcome::Extended {
                        user_id,
                        expires_at: subscription.expires_at,
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use md5::{Digest, Md5};
    use secrecy::SecretString;

    use crate::domain::billing::{
        extended_expiry, CompletionOutcome, Payment, PaymentStatus, SigningScheme, Subscription,
        SubscriptionStatus,
    };
    use crate::domain::foundation::{DomainError, ErrorCode};
    use crate::ports::NotifierError;

    const INBOUND_SECRET: &str = "pw_two";

    fn codec() -> Arc<SignatureCodec> {
        Arc::new(SignatureCodec::new(
            "demo_shop",
            SecretString::new("pw_one".into()),
            SecretString::new(INBOUND_SECRET.into()),
            SigningScheme::EmptyInvoice,
        ))
    }

    fn sign(base: &str) -> String {
        let mut hasher = Md5::new();
        hasher.update(base.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// In-memory ledger with the same all-or-nothing settlement semantics
    /// as the SQLite adapter: an injected fault mutates nothing.
    #[derive(Default)]
    struct InMemoryLedger {
        rows: Mutex<HashMap<String, Payment>>,
        expiries: Mutex<HashMap<i64, Timestamp>>,
        failing_settlements: Mutex<u32>,
    }

    impl InMemoryLedger {
        fn fail_next_settlement(&self) {
            *self.failing_settlements.lock().unwrap() += 1;
        }

        fn expiry_of(&self, user_id: UserId) -> Option<Timestamp> {
            self.expiries.lock().unwrap().get(&user_id.as_i64()).copied()
        }
    }

    #[async_trait]
    impl PaymentLedger for InMemoryLedger {
        async fn record_attempt(
            &self,
            user_id: UserId,
            transaction_id: &TransactionId,
            amount: &str,
        ) -> Result<RecordOutcome, DomainError> {
            let mut rows = self.rows.lock().unwrap();
            if rows.contains_key(transaction_id.as_str()) {
                return Ok(RecordOutcome::DuplicateTransaction);
            }
            rows.insert(
                transaction_id.as_str().to_string(),
                Payment {
                    user_id,
                    transaction_id: transaction_id.clone(),
                    amount: amount.to_string(),
                    status: PaymentStatus::Pending,
                    created_at: Timestamp::now(),
                    completed_at: None,
                },
            );
            Ok(RecordOutcome::Recorded)
        }

        async fn mark_completed(
            &self,
            transaction_id: &TransactionId,
        ) -> Result<CompletionOutcome, DomainError> {
            let mut rows = self.rows.lock().unwrap();
            let payment = rows
                .get_mut(transaction_id.as_str())
                .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "missing"))?;
            if payment.status == PaymentStatus::Completed {
                return Ok(CompletionOutcome::AlreadyCompleted);
            }
            payment.status = PaymentStatus::Completed;
            payment.completed_at = Some(Timestamp::now());
            Ok(CompletionOutcome::Completed)
        }

        async fn complete_and_extend(
            &self,
            transaction_id: &TransactionId,
            duration_days: i64,
        ) -> Result<SettlementOutcome, DomainError> {
            {
                let mut failing = self.failing_settlements.lock().unwrap();
                if *failing > 0 {
                    *failing -= 1;
                    return Err(DomainError::database("database is locked"));
                }
            }

            let mut rows = self.rows.lock().unwrap();
            let payment = rows
                .get_mut(transaction_id.as_str())
                .ok_or_else(|| DomainError::new(ErrorCode::PaymentNotFound, "missing"))?;
            if payment.status == PaymentStatus::Completed {
                return Ok(SettlementOutcome::AlreadySettled);
            }

            let now = Timestamp::now();
            payment.status = PaymentStatus::Completed;
            payment.completed_at = Some(now);

            let mut expiries = self.expiries.lock().unwrap();
            let current = expiries.get(&payment.user_id.as_i64()).copied();
            let new_expiry = extended_expiry(current, now, duration_days);
            expiries.insert(payment.user_id.as_i64(), new_expiry);

            Ok(SettlementOutcome::Extended(Subscription {
                user_id: payment.user_id,
                status: SubscriptionStatus::Active,
                created_at: now,
                expires_at: new_expiry,
            }))
        }

        async fn find(
            &self,
            transaction_id: &TransactionId,
        ) -> Result<Option<Payment>, DomainError> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .get(transaction_id.as_str())
                .cloned())
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(UserId, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, user_id: UserId, text: &str) -> Result<(), NotifierError> {
            if self.fail {
                return Err(NotifierError::Transport("connection refused".into()));
            }
            self.sent.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        notifier: Arc<RecordingNotifier>,
        handler: ReconcilePaymentHandler,
    }

    fn fixture_with_notifier(notifier: RecordingNotifier) -> Fixture {
        let ledger = Arc::new(InMemoryLedger::default());
        let notifier = Arc::new(notifier);
        let handler =
            ReconcilePaymentHandler::new(codec(), ledger.clone(), notifier.clone(), 30);
        Fixture {
            ledger,
            notifier,
            handler,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_notifier(RecordingNotifier::default())
    }

    fn notification(amount: &str, invoice: &str, user_id: &str) -> PaymentNotification {
        let signature = sign(&format!(
            "{}:{}:{}:Shp_user_id={}",
            amount, invoice, INBOUND_SECRET, user_id
        ));
        PaymentNotification::from_transports(
            vec![
                ("OutSum".into(), amount.into()),
                ("InvId".into(), invoice.into()),
                ("SignatureValue".into(), signature),
                ("Shp_user_id".into(), user_id.into()),
            ],
            vec![],
        )
    }

    #[tokio::test]
    async fn fresh_payment_extends_subscription_and_notifies() {
        let fx = fixture();
        let receipt = fx.handler.handle(&notification("500", "7", "42")).await.unwrap();

        assert_eq!(receipt.ack, "OK7");
        assert!(matches!(
            receipt.outcome,
            ReconcileOutcome::Extended { user_id, .. } if user_id == UserId::new(42)
        ));
        assert!(fx.ledger.expiry_of(UserId::new(42)).is_some());
        assert_eq!(fx.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn redelivery_acknowledges_without_second_extension() {
        let fx = fixture();
        let n = notification("500", "7", "42");
        fx.handler.handle(&n).await.unwrap();
        let first_expiry = fx.ledger.expiry_of(UserId::new(42)).unwrap();

        let receipt = fx.handler.handle(&n).await.unwrap();
        assert_eq!(receipt.ack, "OK7");
        assert_eq!(receipt.outcome, ReconcileOutcome::AlreadyProcessed);
        assert_eq!(fx.ledger.expiry_of(UserId::new(42)), Some(first_expiry));
        assert_eq!(fx.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settlement_fault_is_retried_without_losing_the_credit() {
        let fx = fixture();
        let n = notification("500", "7", "42");

        fx.ledger.fail_next_settlement();
        let err = fx.handler.handle(&n).await.unwrap_err();
        assert!(err.is_retryable());

        // nothing committed, so the redelivery settles the payment
        let payment = fx
            .ledger
            .find(&TransactionId::new("7").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(fx.ledger.expiry_of(UserId::new(42)).is_none());

        let receipt = fx.handler.handle(&n).await.unwrap();
        assert!(matches!(receipt.outcome, ReconcileOutcome::Extended { .. }));
        assert!(fx.ledger.expiry_of(UserId::new(42)).is_some());
        assert_eq!(fx.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn amount_rendering_differences_still_verify() {
        let fx = fixture();
        // signed over the canonical form, delivered with trailing zeros
        let signature = sign(&format!("500:7:{}:Shp_user_id=42", INBOUND_SECRET));
        let n = PaymentNotification::from_transports(
            vec![
                ("OutSum".into(), "500.00".into()),
                ("InvId".into(), "7".into()),
                ("SignatureValue".into(), signature),
                ("Shp_user_id".into(), "42".into()),
            ],
            vec![],
        );

        let receipt = fx.handler.handle(&n).await.unwrap();
        assert!(matches!(receipt.outcome, ReconcileOutcome::Extended { .. }));
    }

    #[tokio::test]
    async fn tampered_amount_is_rejected() {
        let fx = fixture();
        let signature = sign(&format!("500:7:{}:Shp_user_id=42", INBOUND_SECRET));
        let n = PaymentNotification::from_transports(
            vec![
                ("OutSum".into(), "999".into()),
                ("InvId".into(), "7".into()),
                ("SignatureValue".into(), signature),
                ("Shp_user_id".into(), "42".into()),
            ],
            vec![],
        );

        let err = fx.handler.handle(&n).await.unwrap_err();
        assert!(matches!(err, WebhookError::SignatureMismatch));
        assert!(fx
            .ledger
            .find(&TransactionId::new("7").unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let fx = fixture();
        let n = PaymentNotification::from_transports(
            vec![("OutSum".into(), "500".into())],
            vec![],
        );

        let err = fx.handler.handle(&n).await.unwrap_err();
        assert!(matches!(err, WebhookError::MissingField("InvId")));
    }

    #[tokio::test]
    async fn unattributable_notification_is_acknowledged_and_dropped() {
        let fx = fixture();
        let signature = sign(&format!("500:7:{}", INBOUND_SECRET));
        let n = PaymentNotification::from_transports(
            vec![
                ("OutSum".into(), "500".into()),
                ("InvId".into(), "7".into()),
                ("SignatureValue".into(), signature),
            ],
            vec![],
        );

        let receipt = fx.handler.handle(&n).await.unwrap();
        assert_eq!(receipt.ack, "OK7");
        assert_eq!(receipt.outcome, ReconcileOutcome::AcknowledgedDropped);
        assert!(fx.ledger.expiry_of(UserId::new(42)).is_none());
    }

    #[tokio::test]
    async fn notifier_failure_does_not_fail_reconciliation() {
        let fx = fixture_with_notifier(RecordingNotifier {
            fail: true,
            ..Default::default()
        });

        let receipt = fx.handler.handle(&notification("500", "7", "42")).await.unwrap();
        assert_eq!(receipt.ack, "OK7");
        assert!(matches!(receipt.outcome, ReconcileOutcome::Extended { .. }));
    }
}
