//! Subscription entity and the additive extension rule.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    /// Set by an expiry sweep or manual action; reconciliation only ever
    /// writes `Active`.
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "inactive" => Some(SubscriptionStatus::Inactive),
            _ => None,
        }
    }
}

/// One subscription row; at most one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl Subscription {
    /// Whether the subscription grants access at the given instant.
    ///
    /// Requires both an active status and an unexpired deadline, so a row
    /// whose status lags behind its expiry still denies access.
    pub fn is_active_at(&self, now: &Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && self.expires_at.is_after(now)
    }
}

/// Computes the expiry after crediting `days` of paid time.
///
/// Remaining paid time is never forfeited: an unexpired subscription is
/// extended from its current expiry, a lapsed or absent one restarts from
/// now.
pub fn extended_expiry(current: Option<Timestamp>, now: Timestamp, days: i64) -> Timestamp {
    match current {
        Some(expiry) if expiry.is_after(&now) => expiry.add_days(days),
        _ => now.add_days(days),
    }
}
