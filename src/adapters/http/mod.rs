//! HTTP adapters - REST API implementations.

pub mod billing;
pub mod middleware;

use axum::{routing::get, Json, Router};

pub use billing::{billing_router, BillingAppState, BillingPorts};
pub use middleware::ApiTokens;

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Full application router, without transport layers.
pub fn app_router(state: BillingAppState, tokens: ApiTokens) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/billing", billing_router(tokens))
        .with_state(state)
}
