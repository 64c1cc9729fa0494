//! Payment gateway port.
//!
//! The engine calls the gateway only to create customers and subscriptions, to
//! re-fetch a subscription's current state, and to open the billing portal.
//! Calls fail fast; retries belong to the caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::billing::{GatewaySubscription, LineItem};
use crate::domain::foundation::{DomainError, ErrorCode, TenantId};

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a customer. The tenant id is stored in the customer's metadata.
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<GatewayCustomer, PaymentError>;

    /// Create a subscription and return the gateway's immediate view of it.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, PaymentError>;

    /// Fetch a subscription's current state. `None` if the gateway has no such id.
    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, PaymentError>;

    /// Create a self-service billing portal session.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    /// Extra metadata forwarded verbatim.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Customer in the payment system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayCustomer {
    /// Provider's customer ID.
    pub id: String,
    pub email: Option<String>,
}

/// Request to create a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionRequest {
    pub customer_id: String,
    pub items: Vec<LineItem>,
    /// Trial length in days, zero for none.
    pub trial_days: u32,
    /// Subscription metadata; always carries the tenant id.
    pub metadata: HashMap<String, String>,
    /// Idempotency key for safe retries by the caller.
    pub idempotency_key: Option<String>,
}

/// Billing portal session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalSession {
    pub id: String,
    /// Opaque URL the user is sent to.
    pub url: String,
}

/// Gateway call failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct PaymentError {
    pub code: PaymentErrorCode,
    pub message: String,
    /// Stripe's own `error.code`, e.g. `card_declined`.
    pub provider_code: Option<String>,
    pub retryable: bool,
}

impl PaymentError {
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Transport failure before Stripe answered.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    /// Stripe answered with a 5xx or a body we could not read.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }
}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        let code = if err.code == PaymentErrorCode::NotFound {
            ErrorCode::NotFound
        } else {
            ErrorCode::ExternalServiceError
        };
        DomainError::new(code, err.message)
    }
}

/// Failure category, derived from the HTTP status Stripe returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    NetworkError,
    AuthenticationError,
    CardDeclined,
    InvalidRequest,
    NotFound,
    RateLimitExceeded,
    ProviderError,
}

impl PaymentErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::AuthenticationError => "authentication_error",
            Self::CardDeclined => "card_declined",
            Self::InvalidRequest => "invalid_request",
            Self::NotFound => "not_found",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::ProviderError => "provider_error",
        }
    }

    /// Transient failures worth retrying with the same idempotency key.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::RateLimitExceeded | Self::ProviderError
        )
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
