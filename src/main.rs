use std::sync::Arc;
use std::time::Duration;

use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wise_guide_billing::adapters::http::billing::{billing_router, BillingAppState};
use wise_guide_billing::adapters::sqlite::{
    connect_pool, SqlitePaymentLedger, SqliteSubscriptionStore,
};
use wise_guide_billing::adapters::telegram::TelegramNotifier;
use wise_guide_billing::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    let pool = connect_pool(&config.database).await?;

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let state = BillingAppState {
        payment_ledger: Arc::new(SqlitePaymentLedger::new(pool.clone())),
        subscription_store: Arc::new(SqliteSubscriptionStore::new(pool)),
        notifier: Arc::new(TelegramNotifier::new(
            http_client,
            config.telegram.api_base.clone(),
            config.telegram.bot_token.clone(),
        )),
        signature_codec: Arc::new(config.gateway.signature_codec()),
        subscription_days: config.gateway.subscription_days,
    };

    let app = billing_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

    let listener = tokio::net::TcpListener::bind(config.server.bind_addr()).await?;
    info!(addr = %listener.local_addr()?, "billing service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
