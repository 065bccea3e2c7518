//! Billing domain: payment verification and subscription lifecycle.

mod amount;
mod errors;
mod notification;
mod payment;
mod signature;
mod subscription;

pub use amount::{normalize_amount, AmountError};
pub use errors::WebhookError;
pub use notification::{
    PaymentNotification, FIELD_AMOUNT, FIELD_INVOICE, FIELD_SIGNATURE, SHP_PREFIX, SHP_USER_ID,
};
pub use payment::{CompletionOutcome, Payment, PaymentStatus, RecordOutcome, SettlementOutcome};
pub use signature::{SignatureCodec, SigningScheme};
pub use subscription::{extended_expiry, Subscription, SubscriptionStatus};
