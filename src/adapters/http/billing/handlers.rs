//! HTTP handlers for the billing endpoints.
//!
//! The result endpoint accepts the gateway notification over GET or POST
//! and feeds both the query string and the form body into reconciliation.
//! Success and fail are user-facing redirect targets and always answer
//! 200 so the browser lands on a page, never a gateway retry loop.

use std::sync::Arc;

use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info, warn};

use crate::application::handlers::billing::{
    CheckEntitlementHandler, ReconcilePaymentHandler,
};
use crate::domain::billing::{PaymentNotification, SignatureCodec, FIELD_INVOICE};
use crate::domain::foundation::UserId;
use crate::ports::{Notifier, PaymentLedger, SubscriptionStore};

use super::dto::{EntitlementResponse, HealthResponse, RedirectResponse, ServiceInfoResponse};

/// Shared state for the billing routes, cloned per request.
#[derive(Clone)]
pub struct BillingAppState {
    pub payment_ledger: Arc<dyn PaymentLedger>,
    pub subscription_store: Arc<dyn SubscriptionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub signature_codec: Arc<SignatureCodec>,
    pub subscription_days: i64,
}

impl BillingAppState {
    pub fn reconcile_handler(&self) -> ReconcilePaymentHandler {
        ReconcilePaymentHandler::new(
            self.signature_codec.clone(),
            self.payment_ledger.clone(),
            self.notifier.clone(),
            self.subscription_days,
        )
    }

    pub fn entitlement_handler(&self) -> CheckEntitlementHandler {
        CheckEntitlementHandler::new(self.subscription_store.clone())
    }
}

fn parse_form(input: &str) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input.as_bytes())
        .into_owned()
        .collect()
}

fn notification_from_request(query: Option<&str>, body: &str) -> PaymentNotification {
    PaymentNotification::from_transports(
        parse_form(query.unwrap_or("")),
        parse_form(body),
    )
}

/// `GET|POST /webhook/result`, the gateway's result notification.
pub async fn handle_result(
    State(state): State<BillingAppState>,
    RawQuery(query): RawQuery,
    body: String,
) -> impl IntoResponse {
    let notification = notification_from_request(query.as_deref(), &body);

    match state.reconcile_handler().handle(&notification).await {
        Ok(receipt) => (StatusCode::OK, receipt.ack).into_response(),
        Err(err) => {
            if err.is_retryable() {
                error!(%err, "webhook reconciliation failed, gateway will retry");
            } else {
                warn!(%err, "webhook rejected");
            }
            (err.status_code(), err.to_string()).into_response()
        }
    }
}

/// `GET|POST /webhook/success`, the browser redirect after payment.
pub async fn handle_success(RawQuery(query): RawQuery, body: String) -> impl IntoResponse {
    let notification = notification_from_request(query.as_deref(), &body);
    let inv_id = notification.get(FIELD_INVOICE).map(str::to_string);
    info!(?inv_id, "payment success redirect");

    Json(RedirectResponse {
        status: "success",
        message: "Спасибо за оплату! Ваша подписка активирована. Вернитесь в Telegram бота.",
        inv_id,
    })
}

/// `GET|POST /webhook/fail`, the browser redirect after a cancelled payment.
pub async fn handle_fail(RawQuery(query): RawQuery, body: String) -> impl IntoResponse {
    let notification = notification_from_request(query.as_deref(), &body);
    let inv_id = notification.get(FIELD_INVOICE).map(str::to_string);
    warn!(?inv_id, "payment failed or cancelled");

    Json(RedirectResponse {
        status: "failed",
        message: "Платёж не был завершён. Пожалуйста, попробуйте снова.",
        inv_id,
    })
}

/// `GET /api/entitlement/:user_id`.
pub async fn check_entitlement(
    State(state): State<BillingAppState>,
    Path(user_id): Path<i64>,
) -> Json<EntitlementResponse> {
    let view = state
        .entitlement_handler()
        .handle(UserId::new(user_id))
        .await;
    Json(view.into())
}

/// `GET /health`.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "healthy" })
}

/// `GET /`.
pub async fn index() -> Json<ServiceInfoResponse> {
    Json(ServiceInfoResponse {
        name: "Wise Guide Billing",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}
