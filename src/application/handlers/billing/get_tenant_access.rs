//! GetTenantAccessHandler - Reads a tenant's current access decision.

use std::sync::Arc;

use crate::domain::billing::{AccessStatus, BillingError};
use crate::domain::foundation::TenantId;
use crate::ports::TenantRepository;

#[derive(Debug, Clone)]
pub struct GetTenantAccessQuery {
    pub tenant_id: TenantId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTenantAccessResult {
    pub tenant_id: TenantId,
    pub access_status: AccessStatus,
    pub has_paid_entry_fee: bool,
}

pub struct GetTenantAccessHandler {
    tenants: Arc<dyn TenantRepository>,
}

impl GetTenantAccessHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>) -> Self {
        Self { tenants }
    }

    pub async fn handle(
        &self,
        query: GetTenantAccessQuery,
    ) -> Result<GetTenantAccessResult, BillingError> {
        let tenant = self
            .tenants
            .find_by_id(&query.tenant_id)
            .await?
            .ok_or(BillingError::TenantNotFound(query.tenant_id))?;

        Ok(GetTenantAccessResult {
            tenant_id: tenant.id,
            access_status: tenant.access_status,
            has_paid_entry_fee: tenant.has_paid_entry_fee,
        })
    }
}
