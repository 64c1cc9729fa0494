//! OpenPortalHandler - Self-service billing portal link.

use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::ports::{PaymentGateway, TenantRepository};

#[derive(Debug, Clone)]
pub struct OpenPortalCommand {
    pub customer_id: String,
    pub return_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenPortalResult {
    pub url: String,
}

/// Proxies a portal session request for a customer some tenant owns. No local writes.
pub struct OpenPortalHandler {
    tenants: Arc<dyn TenantRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl OpenPortalHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { tenants, gateway }
    }

    pub async fn handle(&self, cmd: OpenPortalCommand) -> Result<OpenPortalResult, BillingError> {
        if cmd.customer_id.trim().is_empty() {
            return Err(BillingError::validation("customer_id", "must not be empty"));
        }
        if !(cmd.return_url.starts_with("https://") || cmd.return_url.starts_with("http://")) {
            return Err(BillingError::validation(
                "return_url",
                "must be an absolute http(s) URL",
            ));
        }

        let tenant = self
            .tenants
            .find_by_customer_ref(&cmd.customer_id)
            .await?
            .ok_or_else(|| BillingError::customer_not_found(&cmd.customer_id))?;

        let session = self
            .gateway
            .create_portal_session(&cmd.customer_id, &cmd.return_url)
            .await?;

        tracing::info!(tenant_id = %tenant.id, customer = %cmd.customer_id, "Opened billing portal session");
        Ok(OpenPortalResult { url: session.url })
    }
}
