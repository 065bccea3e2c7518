//! Response DTOs for the billing HTTP surface.

use serde::Serialize;

use crate::application::handlers::billing::EntitlementView;

/// Body for the user-facing success/fail redirect pages.
#[derive(Debug, Serialize)]
pub struct RedirectResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub inv_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EntitlementResponse {
    pub user_id: i64,
    pub entitled: bool,
    pub expires_at: Option<String>,
}

impl From<EntitlementView> for EntitlementResponse {
    fn from(view: EntitlementView) -> Self {
        Self {
            user_id: view.user_id.as_i64(),
            entitled: view.entitled,
            expires_at: view
                .expires_at
                .map(|ts| ts.as_datetime().to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}
