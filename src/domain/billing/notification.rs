//! Inbound webhook notification model.
//!
//! The gateway delivers result notifications over GET (query string) or
//! POST (form-encoded body), and some deployments send both transports in
//! one request. Parameters from both are merged into a single view before
//! reconciliation.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use crate::domain::foundation::UserId;

pub const FIELD_AMOUNT: &str = "OutSum";
pub const FIELD_INVOICE: &str = "InvId";
pub const FIELD_SIGNATURE: &str = "SignatureValue";
pub const SHP_USER_ID: &str = "Shp_user_id";
pub const SHP_PREFIX: &str = "Shp_";

/// One gateway notification, merged across transports.
#[derive(Debug, Clone)]
pub struct PaymentNotification {
    params: HashMap<String, String>,
}

impl PaymentNotification {
    /// Merges query-string and body parameters into one notification.
    ///
    /// On a key present in both transports the body value wins; a mismatch
    /// between the two values is logged since it usually signals a proxy
    /// rewriting the request.
    pub fn from_transports(
        query: Vec<(String, String)>,
        body: Vec<(String, String)>,
    ) -> Self {
        let mut params: HashMap<String, String> = query.into_iter().collect();
        for (key, value) in body {
            if let Some(previous) = params.get(&key) {
                if previous != &value {
                    warn!(field = %key, "conflicting values across transports, body wins");
                }
            }
            params.insert(key, value);
        }
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn amount(&self) -> Option<&str> {
        self.get(FIELD_AMOUNT)
    }

    pub fn invoice_id(&self) -> Option<&str> {
        self.get(FIELD_INVOICE)
    }

    pub fn signature(&self) -> Option<&str> {
        self.get(FIELD_SIGNATURE)
    }

    /// Extracts the user attribution carried in `Shp_user_id`.
    ///
    /// Returns None when the parameter is missing or not a valid integer;
    /// the caller decides how an unattributable notification is handled.
    pub fn user_id(&self) -> Option<UserId> {
        self.get(SHP_USER_ID)?.parse().ok()
    }

    /// All `Shp_`-prefixed parameters, sorted ascending by name as the
    /// signature base requires.
    pub fn shp_params(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .filter(|(key, _)| key.starts_with(SHP_PREFIX))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}
