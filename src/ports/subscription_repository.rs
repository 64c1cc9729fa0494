//! Subscription repository port (read side).
//!
//! Writes go through [`ReconciliationStore`](super::ReconciliationStore).

use async_trait::async_trait;

use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, TenantId};

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// The tenant's current subscription record.
    ///
    /// Prefers the non-terminal record; falls back to the most recently
    /// created canceled one. `None` if the tenant never subscribed.
    async fn find_current_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Find by gateway subscription reference.
    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Subscription>, DomainError>;
}
