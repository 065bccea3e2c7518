mod check_entitlement;
mod create_payment_link;
mod reconcile_payment;

pub use check_entitlement::{CheckEntitlementHandler, EntitlementView};
pub use create_payment_link::{CreatePaymentLinkHandler, PaymentLink};
pub use reconcile_payment::{ReconcileOutcome, ReconcilePaymentHandler, ReconcileReceipt};
