//! Billing reconciler server entry point.

use std::error::Error;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use billing_reconciler::adapters::http::{app_router, ApiTokens, BillingAppState, BillingPorts};
use billing_reconciler::adapters::postgres::{
    create_pool, run_migrations, PostgresProcessedEventLedger, PostgresReconciliationStore,
    PostgresSubscriptionRepository, PostgresTenantRepository,
};
use billing_reconciler::adapters::{LogBillingNotifier, StripeConfig, StripeGateway};
use billing_reconciler::config::{AppConfig, ServerConfig};
use billing_reconciler::domain::billing::StripeWebhookVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Starting billing reconciler"
    );

    let pool = create_pool(&config.database).await?;
    if config.database.run_migrations {
        run_migrations(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let gateway = StripeGateway::new(
        StripeConfig::new(config.payment.stripe_secret_key.clone())
            .with_base_url(&config.payment.stripe_api_base_url),
    )?;
    let ports = BillingPorts {
        tenants: Arc::new(PostgresTenantRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        ledger: Arc::new(PostgresProcessedEventLedger::new(pool.clone())),
        store: Arc::new(PostgresReconciliationStore::new(pool.clone())),
        gateway: Arc::new(gateway),
        notifier: Arc::new(LogBillingNotifier),
    };
    let verifier = StripeWebhookVerifier::new(config.payment.stripe_webhook_secret.clone())
        .with_tolerance(config.payment.signature_tolerance_secs);
    let state = BillingAppState::new(ports, config.payment.price_table(), verifier)
        .with_trial_days(config.payment.trial_days);

    let tokens = ApiTokens::new(config.auth.tokens());
    if tokens.is_empty() {
        tracing::warn!("No API tokens configured, provisioning endpoints will reject every request");
    }

    let app = app_router(state, tokens)
        .layer(cors_layer(&config.server))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening for incoming connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Billing reconciler stopped");
    Ok(())
}

/// `RUST_LOG` wins over the configured filter. JSON output in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.is_production() {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .into_iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
