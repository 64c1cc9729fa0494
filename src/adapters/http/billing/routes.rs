//! Axum router configuration for billing endpoints.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers::{
    create_customer, create_subscription, get_tenant_access, handle_stripe_webhook, open_portal,
    BillingAppState,
};
use crate::adapters::http::middleware::{bearer_auth, ApiTokens};

/// Provisioning endpoints, behind the bearer token check.
///
/// - `POST /customers`
/// - `POST /subscriptions`
/// - `POST /portal`
/// - `GET /tenants/:tenant_id/access`
pub fn provisioning_routes(tokens: ApiTokens) -> Router<BillingAppState> {
    Router::new()
        .route("/customers", post(create_customer))
        .route("/subscriptions", post(create_subscription))
        .route("/portal", post(open_portal))
        .route("/tenants/:tenant_id/access", get(get_tenant_access))
        .route_layer(middleware::from_fn_with_state(tokens, bearer_auth))
}

/// Webhook endpoints. No bearer token; the signature authenticates the caller.
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// Billing module router, mounted at `/api/billing`.
pub fn billing_router(tokens: ApiTokens) -> Router<BillingAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .merge(provisioning_routes(tokens))
}
