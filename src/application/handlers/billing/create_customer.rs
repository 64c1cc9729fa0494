//! CreateCustomerHandler - Provisions the gateway customer for a tenant.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::billing::BillingError;
use crate::domain::foundation::TenantId;
use crate::ports::{CreateCustomerRequest, PaymentGateway, TenantRepository};

#[derive(Debug, Clone)]
pub struct CreateCustomerCommand {
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCustomerResult {
    pub customer_id: String,
    /// True when the tenant already had a customer and nothing was created.
    pub existing: bool,
}

/// Creates the gateway customer and stores its reference on the tenant.
///
/// Safe to retry: a tenant that already has a reference gets it back unchanged.
pub struct CreateCustomerHandler {
    tenants: Arc<dyn TenantRepository>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CreateCustomerHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { tenants, gateway }
    }

    pub async fn handle(
        &self,
        cmd: CreateCustomerCommand,
    ) -> Result<CreateCustomerResult, BillingError> {
        if cmd.email.trim().is_empty() {
            return Err(BillingError::validation("email", "must not be empty"));
        }
        if cmd.name.trim().is_empty() {
            return Err(BillingError::validation("name", "must not be empty"));
        }

        let tenant = self
            .tenants
            .find_by_id(&cmd.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound(cmd.tenant_id))?;

        if let Some(existing) = tenant.customer_ref {
            tracing::info!(
                tenant_id = %cmd.tenant_id,
                customer = %existing,
                "Tenant already has a billing customer"
            );
            return Ok(CreateCustomerResult {
                customer_id: existing,
                existing: true,
            });
        }

        let customer = self
            .gateway
            .create_customer(CreateCustomerRequest {
                tenant_id: cmd.tenant_id,
                email: cmd.email,
                name: cmd.name,
                metadata: cmd.metadata,
            })
            .await?;

        if let Err(e) = self
            .tenants
            .set_customer_ref(&cmd.tenant_id, &customer.id)
            .await
        {
            tracing::error!(
                critical = true,
                tenant_id = %cmd.tenant_id,
                customer = %customer.id,
                error = %e,
                "Gateway customer created but not stored on tenant, manual reconciliation required"
            );
            return Err(e.into());
        }

        tracing::info!(tenant_id = %cmd.tenant_id, customer = %customer.id, "Created billing customer");
        Ok(CreateCustomerResult {
            customer_id: customer.id,
            existing: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryBillingStore;
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::billing::Tenant;
    use crate::ports::PaymentError;

    fn setup() -> (Arc<InMemoryBillingStore>, MockPaymentGateway, CreateCustomerHandler) {
        let store = Arc::new(InMemoryBillingStore::new());
        let gateway = MockPaymentGateway::new();
        let handler = CreateCustomerHandler::new(store.clone(), Arc::new(gateway.clone()));
        (store, gateway, handler)
    }

    fn command(tenant_id: TenantId) -> CreateCustomerCommand {
        CreateCustomerCommand {
            tenant_id,
            email: "billing@acme.test".to_string(),
            name: "Acme".to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn creates_customer_and_stores_reference() {
        let (store, gateway, handler) = setup();
        let tenant = Tenant::new("Acme", "billing@acme.test", true);
        store.insert_tenant(tenant.clone());

        let result = handler.handle(command(tenant.id)).await.unwrap();

        assert!(!result.existing);
        assert_eq!(gateway.call_count("create_customer"), 1);
        assert_eq!(
            store.tenant(&tenant.id).unwrap().customer_ref,
            Some(result.customer_id)
        );
    }

    #[tokio::test]
    async fn existing_reference_is_returned_without_gateway_call() {
        let (store, gateway, handler) = setup();
        let tenant = Tenant::new("Acme", "billing@acme.test", true).with_customer_ref("cus_existing");
        store.insert_tenant(tenant.clone());

        let result = handler.handle(command(tenant.id)).await.unwrap();

        assert_eq!(
            result,
            CreateCustomerResult {
                customer_id: "cus_existing".to_string(),
                existing: true
            }
        );
        assert_eq!(gateway.call_count("create_customer"), 0);
    }

    #[tokio::test]
    async fn unknown_tenant_is_rejected() {
        let (_store, gateway, handler) = setup();
        let missing = TenantId::new();

        let err = handler.handle(command(missing)).await.unwrap_err();

        assert_eq!(err, BillingError::TenantNotFound(missing));
        assert_eq!(gateway.call_count("create_customer"), 0);
    }

    #[tokio::test]
    async fn blank_email_fails_validation() {
        let (_store, _gateway, handler) = setup();
        let cmd = CreateCustomerCommand {
            email: "  ".to_string(),
            ..command(TenantId::new())
        };

        let err = handler.handle(cmd).await.unwrap_err();

        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn gateway_failure_leaves_tenant_untouched() {
        let (store, gateway, handler) = setup();
        let tenant = Tenant::new("Acme", "billing@acme.test", true);
        store.insert_tenant(tenant.clone());
        gateway.set_error(PaymentError::network("connection reset"));

        let err = handler.handle(command(tenant.id)).await.unwrap_err();

        assert!(matches!(err, BillingError::Gateway(_)));
        assert!(store.tenant(&tenant.id).unwrap().customer_ref.is_none());
    }
}
