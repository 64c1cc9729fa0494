//! Outbound billing notices (trial ending, payment failed).
//!
//! Delivery is best effort: a failed notice is logged by the caller and never
//! blocks reconciliation.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};

#[async_trait]
pub trait BillingNotifier: Send + Sync {
    async fn trial_ending(
        &self,
        tenant_id: &TenantId,
        trial_end: Option<Timestamp>,
    ) -> Result<(), DomainError>;

    async fn payment_failed(&self, tenant_id: &TenantId, invoice_id: &str)
        -> Result<(), DomainError>;
}
