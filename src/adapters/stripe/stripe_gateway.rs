//! Stripe payment gateway adapter.
//!
//! Implements `PaymentGateway` against the Stripe REST API: form-encoded
//! requests, HTTP basic auth with the secret key, JSON responses.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(secret_key).with_base_url("http://localhost:12111");
//! let gateway = StripeGateway::new(config);
//! ```

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::billing::{GatewaySubscription, LineItem, ROLE_METADATA_KEY, TENANT_METADATA_KEY};
use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, GatewayCustomer, PaymentError,
    PaymentErrorCode, PaymentGateway, PortalSession,
};

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    secret_key: SecretString,

    api_base_url: String,

    timeout: Duration,
}

impl StripeConfig {
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Point the client at another host (stripe-mock, a proxy).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stripe gateway adapter.
pub struct StripeGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeGateway {
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(String, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, PaymentError> {
        let mut request = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .form(params);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;
        read_response(operation, response).await
    }
}

/// Stripe's error envelope.
#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripePortalSession {
    id: String,
    url: String,
}

async fn read_response<T: for<'de> Deserialize<'de>>(
    operation: &'static str,
    response: reqwest::Response,
) -> Result<T, PaymentError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = error_from_response(status.as_u16(), &body);
        tracing::error!(
            operation,
            status = status.as_u16(),
            code = %error.code,
            error = %error.message,
            "Stripe request failed"
        );
        return Err(error);
    }

    response.json().await.map_err(|e| {
        PaymentError::provider(format!("Failed to parse Stripe {} response: {}", operation, e))
    })
}

/// Classify a non-2xx Stripe response.
fn error_from_response(status: u16, body: &str) -> PaymentError {
    let detail = serde_json::from_str::<StripeErrorBody>(body).ok().map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error (HTTP {})", status));

    let code = match status {
        400 => PaymentErrorCode::InvalidRequest,
        401 | 403 => PaymentErrorCode::AuthenticationError,
        402 => PaymentErrorCode::CardDeclined,
        404 => PaymentErrorCode::NotFound,
        429 => PaymentErrorCode::RateLimitExceeded,
        _ => PaymentErrorCode::ProviderError,
    };

    let error = PaymentError::new(code, message);
    match detail.and_then(|d| d.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

fn customer_params(request: &CreateCustomerRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("email".to_string(), request.email.clone()),
        ("name".to_string(), request.name.clone()),
        (
            format!("metadata[{}]", TENANT_METADATA_KEY),
            request.tenant_id.to_string(),
        ),
    ];
    for (key, value) in &request.metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }
    params
}

/// Form parameters for `POST /v1/subscriptions`.
///
/// Every item carries its role in metadata so reconciliation can classify it
/// without knowing the price table.
fn subscription_params(request: &CreateSubscriptionRequest) -> Vec<(String, String)> {
    let mut params = vec![
        ("customer".to_string(), request.customer_id.clone()),
        ("payment_behavior".to_string(), "default_incomplete".to_string()),
        (
            "expand[]".to_string(),
            "latest_invoice.payment_intent".to_string(),
        ),
    ];
    for (i, item) in request.items.iter().enumerate() {
        params.extend(item_params(i, item));
    }
    if request.trial_days > 0 {
        params.push((
            "trial_period_days".to_string(),
            request.trial_days.to_string(),
        ));
    }
    let mut metadata: Vec<_> = request.metadata.iter().collect();
    metadata.sort();
    for (key, value) in metadata {
        params.push((format!("metadata[{}]", key), value.clone()));
    }
    params
}

fn item_params(index: usize, item: &LineItem) -> Vec<(String, String)> {
    vec![
        (format!("items[{}][price]", index), item.price_id().to_string()),
        (
            format!("items[{}][quantity]", index),
            item.quantity().to_string(),
        ),
        (
            format!("items[{}][metadata][{}]", index, ROLE_METADATA_KEY),
            item.role().as_str().to_string(),
        ),
    ]
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<GatewayCustomer, PaymentError> {
        let customer: StripeCustomer = self
            .post_form(
                "create_customer",
                "/v1/customers",
                &customer_params(&request),
                Some(&format!("customer-{}", request.tenant_id)),
            )
            .await?;

        Ok(GatewayCustomer {
            id: customer.id,
            email: customer.email.or(Some(request.email)),
        })
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, PaymentError> {
        self.post_form(
            "create_subscription",
            "/v1/subscriptions",
            &subscription_params(&request),
            request.idempotency_key.as_deref(),
        )
        .await
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, PaymentError> {
        let response = self
            .http_client
            .get(self.url(&format!("/v1/subscriptions/{}", subscription_id)))
            .basic_auth(self.config.secret_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(|e| PaymentError::network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        read_response("get_subscription", response).await.map(Some)
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        let params = vec![
            ("customer".to_string(), customer_id.to_string()),
            ("return_url".to_string(), return_url.to_string()),
        ];
        let session: StripePortalSession = self
            .post_form(
                "create_portal_session",
                "/v1/billing_portal/sessions",
                &params,
                None,
            )
            .await?;

        Ok(PortalSession {
            id: session.id,
            url: session.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{test_price_table, BillingCycle, PlanType};
    use crate::domain::foundation::TenantId;
    use std::collections::HashMap;

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn subscription_params_encode_items_with_roles() {
        let request = CreateSubscriptionRequest {
            customer_id: "cus_1".to_string(),
            items: LineItem::build_order(
                &test_price_table(),
                PlanType::Premium,
                BillingCycle::Yearly,
                4,
            ),
            trial_days: 14,
            metadata: HashMap::from([("tenant_id".to_string(), "t_1".to_string())]),
            idempotency_key: None,
        };

        let params = subscription_params(&request);

        assert_eq!(param(&params, "customer"), Some("cus_1"));
        assert_eq!(param(&params, "items[0][price]"), Some("price_prem_y"));
        assert_eq!(param(&params, "items[0][metadata][role]"), Some("plan"));
        assert_eq!(param(&params, "items[1][price]"), Some("price_seat_y"));
        assert_eq!(param(&params, "items[1][quantity]"), Some("4"));
        assert_eq!(param(&params, "items[1][metadata][role]"), Some("extra_seat"));
        assert_eq!(param(&params, "trial_period_days"), Some("14"));
        assert_eq!(param(&params, "metadata[tenant_id]"), Some("t_1"));
        assert_eq!(param(&params, "expand[]"), Some("latest_invoice.payment_intent"));
    }

    #[test]
    fn subscription_params_omit_trial_when_zero() {
        let request = CreateSubscriptionRequest {
            customer_id: "cus_1".to_string(),
            items: vec![],
            trial_days: 0,
            metadata: HashMap::new(),
            idempotency_key: None,
        };

        assert_eq!(param(&subscription_params(&request), "trial_period_days"), None);
    }

    #[test]
    fn customer_params_carry_tenant_metadata() {
        let tenant_id = TenantId::new();
        let request = CreateCustomerRequest {
            tenant_id,
            email: "a@acme.test".to_string(),
            name: "Acme".to_string(),
            metadata: HashMap::new(),
        };

        let params = customer_params(&request);

        assert_eq!(param(&params, "metadata[tenant_id]"), Some(tenant_id.to_string().as_str()));
        assert_eq!(param(&params, "name"), Some("Acme"));
    }

    #[test]
    fn error_response_is_classified_by_status() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;

        let err = error_from_response(402, body);

        assert_eq!(err.code, PaymentErrorCode::CardDeclined);
        assert_eq!(err.provider_code.as_deref(), Some("card_declined"));
        assert_eq!(err.message, "Your card was declined.");
        assert!(!err.retryable);
    }

    #[test]
    fn unparseable_server_error_is_retryable() {
        let err = error_from_response(503, "<html>unavailable</html>");

        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(err.retryable);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let config = StripeConfig::new(SecretString::new("sk_test_x".to_string()))
            .with_base_url("http://localhost:12111/");

        assert_eq!(config.api_base_url, "http://localhost:12111");
    }
}
