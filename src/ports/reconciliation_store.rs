//! Reconciliation store port.
//!
//! Persists the subscription row and the tenant access flag as one unit. When a
//! ledger entry is supplied it is inserted first in the same unit; a uniqueness
//! conflict on it aborts the unit without touching either row.

use async_trait::async_trait;

use super::processed_event_ledger::ProcessedEvent;
use crate::domain::billing::{AccessStatus, Subscription};
use crate::domain::foundation::DomainError;

/// Full target state for one tenant: its subscription row and access flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationWrite {
    /// Inserted when its id is unknown, otherwise overwritten.
    pub subscription: Subscription,
    /// Access written to `subscription.tenant_id`, after the subscription row.
    pub access: AccessStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    /// The ledger entry already existed; nothing was written.
    DuplicateEvent,
}

#[async_trait]
pub trait ReconciliationStore: Send + Sync {
    /// Apply `write`, optionally recording `event` in the ledger atomically with it.
    ///
    /// # Errors
    ///
    /// - `TenantNotFound` if the tenant row does not exist
    /// - `DatabaseError` on persistence failure, in which case nothing was written
    async fn apply(
        &self,
        write: &ReconciliationWrite,
        event: Option<&ProcessedEvent>,
    ) -> Result<ApplyResult, DomainError>;
}
