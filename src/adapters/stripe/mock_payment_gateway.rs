//! Mock payment gateway for testing.
//!
//! Configurable `PaymentGateway` used by unit and integration tests. Supports:
//! - Pre-configured subscriptions for re-fetch
//! - The status returned by `create_subscription`
//! - Error injection, per method or for the next call
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::billing::{
    GatewayItem, GatewayItemList, GatewayPrice, GatewaySubscription, ROLE_METADATA_KEY,
};
use crate::ports::{
    CreateCustomerRequest, CreateSubscriptionRequest, GatewayCustomer, PaymentError,
    PaymentGateway, PortalSession,
};

/// Mock payment gateway. Clones share state.
#[derive(Clone, Default)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Subscriptions known to the "gateway", by id.
    subscriptions: HashMap<String, GatewaySubscription>,

    /// Status given to subscriptions created through the mock. Defaults to "active".
    created_status: Option<String>,

    /// Client secret attached to created subscriptions.
    client_secret: Option<String>,

    next_error: Option<PaymentError>,
    method_errors: HashMap<String, PaymentError>,

    customer_requests: Vec<CreateCustomerRequest>,
    subscription_requests: Vec<CreateSubscriptionRequest>,
    call_log: Vec<MethodCall>,
    sequence: u32,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration
    // ════════════════════════════════════════════════════════════════════════════

    /// Add or replace a subscription returned by `get_subscription`.
    pub fn put_subscription(&self, subscription: GatewaySubscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Change the status of a known subscription, as the gateway would over time.
    pub fn set_subscription_status(&self, subscription_id: &str, status: &str) {
        if let Some(sub) = self.state().subscriptions.get_mut(subscription_id) {
            sub.status = status.to_string();
        }
    }

    /// Status reported by subsequent `create_subscription` calls.
    pub fn set_created_status(&self, status: &str) {
        self.state().created_status = Some(status.to_string());
    }

    pub fn set_client_secret(&self, secret: &str) {
        self.state().client_secret = Some(secret.to_string());
    }

    /// Fail the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Fail every call to `method` until cleared.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn customer_requests(&self) -> Vec<CreateCustomerRequest> {
        self.state().customer_requests.clone()
    }

    pub fn subscription_requests(&self) -> Vec<CreateSubscriptionRequest> {
        self.state().subscription_requests.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    fn record_call(&self, method: &str, args: Vec<String>) {
        self.state().call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        match state.next_error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut state = self.state();
        state.sequence += 1;
        format!("{}_mock_{}", prefix, state.sequence)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<GatewayCustomer, PaymentError> {
        self.record_call(
            "create_customer",
            vec![request.tenant_id.to_string(), request.email.clone()],
        );
        self.check_error("create_customer")?;

        let customer = GatewayCustomer {
            id: self.next_id("cus"),
            email: Some(request.email.clone()),
        };
        self.state().customer_requests.push(request);
        Ok(customer)
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<GatewaySubscription, PaymentError> {
        self.record_call(
            "create_subscription",
            vec![request.customer_id.clone(), request.items.len().to_string()],
        );
        self.check_error("create_subscription")?;

        let id = self.next_id("sub");
        let mut state = self.state();
        let items = request
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| GatewayItem {
                id: format!("si_mock_{}", i),
                price: GatewayPrice {
                    id: item.price_id().to_string(),
                    metadata: HashMap::new(),
                },
                quantity: Some(item.quantity()),
                metadata: HashMap::from([(
                    ROLE_METADATA_KEY.to_string(),
                    item.role().as_str().to_string(),
                )]),
            })
            .collect();
        let latest_invoice = state.client_secret.as_ref().map(|secret| {
            serde_json::json!({ "payment_intent": { "client_secret": secret } })
        });

        let subscription = GatewaySubscription {
            id,
            customer: request.customer_id.clone(),
            status: state
                .created_status
                .clone()
                .unwrap_or_else(|| "active".to_string()),
            metadata: request.metadata.clone(),
            items: GatewayItemList { data: items },
            current_period_end: None,
            trial_end: None,
            latest_invoice,
        };
        state
            .subscriptions
            .insert(subscription.id.clone(), subscription.clone());
        state.subscription_requests.push(request);
        Ok(subscription)
    }

    async fn get_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<Option<GatewaySubscription>, PaymentError> {
        self.record_call("get_subscription", vec![subscription_id.to_string()]);
        self.check_error("get_subscription")?;

        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<PortalSession, PaymentError> {
        self.record_call(
            "create_portal_session",
            vec![customer_id.to_string(), return_url.to_string()],
        );
        self.check_error("create_portal_session")?;

        let id = self.next_id("bps");
        Ok(PortalSession {
            url: format!("https://billing.stripe.com/p/session/{}", id),
            id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::test_price_table;
    use crate::domain::billing::{BillingCycle, LineItem, PlanType};

    fn subscription_request() -> CreateSubscriptionRequest {
        CreateSubscriptionRequest {
            customer_id: "cus_1".to_string(),
            items: LineItem::build_order(
                &test_price_table(),
                PlanType::Standard,
                BillingCycle::Monthly,
                3,
            ),
            trial_days: 0,
            metadata: HashMap::from([("tenant_id".to_string(), "t".to_string())]),
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn created_subscription_can_be_refetched() {
        let mock = MockPaymentGateway::new();

        let created = mock.create_subscription(subscription_request()).await.unwrap();
        let fetched = mock.get_subscription(&created.id).await.unwrap();

        assert_eq!(fetched, Some(created.clone()));
        assert_eq!(created.status, "active");
        assert_eq!(created.items.data.len(), 2);
    }

    #[tokio::test]
    async fn method_error_persists_until_cleared() {
        let mock = MockPaymentGateway::new();
        mock.set_method_error("get_subscription", PaymentError::network("down"));

        assert!(mock.get_subscription("sub_1").await.is_err());
        assert!(mock.get_subscription("sub_1").await.is_err());

        mock.clear_errors();
        assert_eq!(mock.get_subscription("sub_1").await.unwrap(), None);
        assert_eq!(mock.call_count("get_subscription"), 3);
    }

    #[tokio::test]
    async fn next_error_is_consumed_once() {
        let mock = MockPaymentGateway::new();
        mock.set_error(PaymentError::provider("boom"));

        assert!(mock.create_portal_session("cus_1", "https://x").await.is_err());
        assert!(mock.create_portal_session("cus_1", "https://x").await.is_ok());
    }
}
