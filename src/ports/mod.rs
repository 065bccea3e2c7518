//! Ports: async trait boundaries between the application core and adapters.

mod notifier;
mod payment_ledger;
mod subscription_store;

pub use notifier::{Notifier, NotifierError};
pub use payment_ledger::PaymentLedger;
pub use subscription_store::SubscriptionStore;
