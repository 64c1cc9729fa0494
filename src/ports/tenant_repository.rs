//! Tenant repository port.
//!
//! Tenants are created elsewhere in the application; the billing engine only
//! attaches a gateway customer to them and reads them back. Access status is
//! written through [`ReconciliationStore`](super::ReconciliationStore) so it
//! always moves together with the subscription row.

use async_trait::async_trait;

use crate::domain::billing::Tenant;
use crate::domain::foundation::{DomainError, TenantId};

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    /// Find the tenant that owns a gateway customer reference.
    async fn find_by_customer_ref(&self, customer_ref: &str)
        -> Result<Option<Tenant>, DomainError>;

    /// Attach a gateway customer reference.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` if the tenant does not exist
    /// - `Conflict` if the tenant already has a different reference
    async fn set_customer_ref(&self, id: &TenantId, customer_ref: &str)
        -> Result<(), DomainError>;
}
