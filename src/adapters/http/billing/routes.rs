//! Axum router for the billing endpoints.

use axum::routing::get;
use axum::Router;

use super::handlers::{
    check_entitlement, handle_fail, handle_result, handle_success, health, index,
    BillingAppState,
};

/// Builds the full billing router.
///
/// # Routes
/// - `GET|POST /webhook/result` - gateway result notification (signature verified)
/// - `GET|POST /webhook/success` - user-facing success redirect
/// - `GET|POST /webhook/fail` - user-facing failure redirect
/// - `GET /api/entitlement/:user_id` - entitlement gate
/// - `GET /health` - liveness probe
/// - `GET /` - service info
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .route("/webhook/result", get(handle_result).post(handle_result))
        .route("/webhook/success", get(handle_success).post(handle_success))
        .route("/webhook/fail", get(handle_fail).post(handle_fail))
        .route("/api/entitlement/:user_id", get(check_entitlement))
        .route("/health", get(health))
        .route("/", get(index))
}
