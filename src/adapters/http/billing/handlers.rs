//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the application layer command/query handlers.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::{
    CreateCustomerCommand, CreateCustomerHandler, CreateSubscriptionCommand,
    CreateSubscriptionHandler, GetTenantAccessHandler, GetTenantAccessQuery, HandleWebhookCommand,
    HandleWebhookHandler, OpenPortalCommand, OpenPortalHandler,
};
use crate::domain::billing::{
    BillingError, EventRouter, IdempotentWebhookProcessor, PriceTable, StripeWebhookVerifier,
    SubscriptionReconciler, WebhookError, WebhookResult,
};
use crate::domain::foundation::TenantId;
use crate::ports::{
    BillingNotifier, PaymentGateway, ProcessedEventLedger, ReconciliationStore,
    SubscriptionRepository, TenantRepository,
};

use super::dto::{
    CreateCustomerRequest, CreateSubscriptionRequest, CustomerResponse, ErrorResponse,
    OpenPortalRequest, PortalResponse, SubscriptionResponse, TenantAccessResponse, WebhookAck,
    WebhookErrorResponse,
};

/// Header carrying the gateway's webhook signature.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Adapters the billing endpoints run on.
#[derive(Clone)]
pub struct BillingPorts {
    pub tenants: Arc<dyn TenantRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub ledger: Arc<dyn ProcessedEventLedger>,
    pub store: Arc<dyn ReconciliationStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn BillingNotifier>,
}

/// Shared state, cloned per request. Handlers are built on demand from it.
#[derive(Clone)]
pub struct BillingAppState {
    ports: BillingPorts,
    prices: PriceTable,
    trial_days: u32,
    webhooks: Arc<HandleWebhookHandler>,
}

impl BillingAppState {
    pub fn new(ports: BillingPorts, prices: PriceTable, verifier: StripeWebhookVerifier) -> Self {
        let reconciler = Arc::new(SubscriptionReconciler::new(
            ports.tenants.clone(),
            ports.subscriptions.clone(),
            prices.clone(),
        ));
        let router = EventRouter::standard(reconciler, ports.gateway.clone());
        let processor = IdempotentWebhookProcessor::new(
            ports.ledger.clone(),
            ports.store.clone(),
            Arc::new(router),
            ports.notifier.clone(),
        );

        Self {
            webhooks: Arc::new(HandleWebhookHandler::new(verifier, Arc::new(processor))),
            ports,
            prices,
            trial_days: 0,
        }
    }

    /// Trial length for subscriptions whose request does not name one.
    pub fn with_trial_days(mut self, days: u32) -> Self {
        self.trial_days = days;
        self
    }

    pub fn create_customer_handler(&self) -> CreateCustomerHandler {
        CreateCustomerHandler::new(self.ports.tenants.clone(), self.ports.gateway.clone())
    }

    pub fn create_subscription_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(
            self.ports.tenants.clone(),
            self.ports.subscriptions.clone(),
            self.ports.store.clone(),
            self.ports.gateway.clone(),
            self.prices.clone(),
        )
        .with_default_trial_days(self.trial_days)
    }

    pub fn open_portal_handler(&self) -> OpenPortalHandler {
        OpenPortalHandler::new(self.ports.tenants.clone(), self.ports.gateway.clone())
    }

    pub fn tenant_access_handler(&self) -> GetTenantAccessHandler {
        GetTenantAccessHandler::new(self.ports.tenants.clone())
    }

    pub fn webhook_handler(&self) -> Arc<HandleWebhookHandler> {
        self.webhooks.clone()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Provisioning Endpoints
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/customers
pub async fn create_customer(
    State(state): State<BillingAppState>,
    body: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = body.map_err(BillingApiError::from_rejection)?;

    let result = state
        .create_customer_handler()
        .handle(CreateCustomerCommand {
            tenant_id: request.tenant_id,
            email: request.email,
            name: request.name,
            metadata: request.metadata,
        })
        .await?;

    let status = if result.existing {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(CustomerResponse {
            customer_id: result.customer_id,
            existing: result.existing,
        }),
    ))
}

/// POST /api/billing/subscriptions
pub async fn create_subscription(
    State(state): State<BillingAppState>,
    body: Result<Json<CreateSubscriptionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = body.map_err(BillingApiError::from_rejection)?;

    let result = state
        .create_subscription_handler()
        .handle(CreateSubscriptionCommand {
            tenant_id: request.tenant_id,
            plan: request.plan_type,
            cycle: request.billing_cycle,
            extra_seats: request.extra_users_count,
            trial_days: request.trial_days,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(SubscriptionResponse::from(result))))
}

/// POST /api/billing/portal
pub async fn open_portal(
    State(state): State<BillingAppState>,
    body: Result<Json<OpenPortalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, BillingApiError> {
    let Json(request) = body.map_err(BillingApiError::from_rejection)?;

    let result = state
        .open_portal_handler()
        .handle(OpenPortalCommand {
            customer_id: request.customer_id,
            return_url: request.return_url,
        })
        .await?;

    Ok(Json(PortalResponse { url: result.url }))
}

/// GET /api/billing/tenants/:tenant_id/access
pub async fn get_tenant_access(
    State(state): State<BillingAppState>,
    Path(tenant_id): Path<String>,
) -> Result<impl IntoResponse, BillingApiError> {
    let tenant_id: TenantId = tenant_id
        .parse()
        .map_err(|_| BillingError::validation("tenant_id", "must be a UUID"))?;

    let result = state
        .tenant_access_handler()
        .handle(GetTenantAccessQuery { tenant_id })
        .await?;

    Ok(Json(TenantAccessResponse::from(result)))
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhook Endpoint
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/billing/webhooks/stripe
///
/// The body is taken as raw bytes; the signature covers them exactly.
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, WebhookApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let result = state
        .webhook_handler()
        .handle(HandleWebhookCommand {
            payload: body.to_vec(),
            signature,
        })
        .await?;

    let ack = match result {
        WebhookResult::Processed => WebhookAck::processed(),
        WebhookResult::AlreadyProcessed => WebhookAck::duplicate(),
    };
    Ok(Json(ack))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Converts billing errors to JSON error responses.
#[derive(Debug)]
pub struct BillingApiError(BillingError);

impl BillingApiError {
    fn from_rejection(rejection: JsonRejection) -> Self {
        Self(BillingError::validation("body", rejection.body_text()))
    }

    pub fn status(&self) -> StatusCode {
        match &self.0 {
            BillingError::ValidationFailed { .. }
            | BillingError::CustomerRequired(_)
            | BillingError::AlreadySubscribed(_) => StatusCode::BAD_REQUEST,
            BillingError::EntryFeeUnpaid(_) => StatusCode::FORBIDDEN,
            BillingError::TenantNotFound(_) | BillingError::CustomerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            BillingError::Gateway(_) => StatusCode::BAD_GATEWAY,
            BillingError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BillingError> for BillingApiError {
    fn from(err: BillingError) -> Self {
        Self(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error_code = self.0.code(), error = %self.0, "Billing request failed");
        }

        let mut body = ErrorResponse::new(self.0.code(), self.0.message());
        if let BillingError::ValidationFailed { field, .. } = &self.0 {
            body = body.with_details(serde_json::json!({ "field": field }));
        }
        (status, Json(body)).into_response()
    }
}

/// Converts webhook errors to the status the gateway's retry logic reads.
#[derive(Debug)]
pub struct WebhookApiError(WebhookError);

impl From<WebhookError> for WebhookApiError {
    fn from(err: WebhookError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebhookApiError {
    fn into_response(self) -> Response {
        let body = WebhookErrorResponse {
            error: self.0.to_string(),
        };
        (self.0.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: BillingError) -> StatusCode {
        BillingApiError::from(err).status()
    }

    #[test]
    fn business_rule_errors_map_to_documented_statuses() {
        let id = TenantId::new();
        assert_eq!(status_of(BillingError::EntryFeeUnpaid(id)), StatusCode::FORBIDDEN);
        assert_eq!(status_of(BillingError::AlreadySubscribed(id)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BillingError::CustomerRequired(id)), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(BillingError::TenantNotFound(id)), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_errors_map_to_server_statuses() {
        assert_eq!(
            status_of(BillingError::Gateway("timeout".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(BillingError::infrastructure("db down")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn customer_not_found_is_404() {
        assert_eq!(
            status_of(BillingError::customer_not_found("cus_x")),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn webhook_signature_error_is_400() {
        let response = WebhookApiError::from(WebhookError::InvalidSignature).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn webhook_database_error_is_500() {
        let response =
            WebhookApiError::from(WebhookError::Database("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
