//! Paystate service binary.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use paystate::adapters::http::{cors_layer, router, AppState};
use paystate::adapters::postgres::PostgresEntitlementStore;
use paystate::adapters::stripe::{StripeGateway, StripeGatewayConfig};
use paystate::config::AppConfig;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("paystate failed to start: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.log_level))
        .init();

    tracing::info!(
        mode = %config.payment.mode,
        environment = ?config.server.environment,
        "starting paystate"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.store.max_connections)
        .connect(&config.store.url)
        .await?;

    let store = PostgresEntitlementStore::new(pool);
    store.ensure_schema().await?;

    let gateway = StripeGateway::new(StripeGatewayConfig::from_payment_config(&config.payment)?);

    let state = AppState::new(Arc::new(store), Arc::new(gateway));
    let app = router(
        state,
        cors_layer(&config.server.cors_origins_list()),
        std::time::Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app).await?;
    Ok(())
}
