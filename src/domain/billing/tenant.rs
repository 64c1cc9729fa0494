//! Tenant aggregate and its access gate.
//!
//! Tenant-facing middleware reads only `access_status`; the billing engine is the
//! sole writer of it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{TenantId, Timestamp, ValidationError};

/// Whether a tenant's users may use the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessStatus {
    /// Waiting for the entry fee or a first successful subscription.
    PendingPayment,
    /// Users may sign in.
    Active,
    /// Locked out until billing recovers.
    Suspended,
}

impl AccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessStatus::PendingPayment => "pending_payment",
            AccessStatus::Active => "active",
            AccessStatus::Suspended => "suspended",
        }
    }

    /// Narrows a decision so that `Active` is only ever granted to tenants that
    /// paid the entry fee.
    pub fn gated_by_entry_fee(self, has_paid_entry_fee: bool) -> Self {
        match self {
            AccessStatus::Active if !has_paid_entry_fee => AccessStatus::PendingPayment,
            other => other,
        }
    }
}

impl fmt::Display for AccessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_payment" => Ok(AccessStatus::PendingPayment),
            "active" => Ok(AccessStatus::Active),
            "suspended" => Ok(AccessStatus::Suspended),
            other => Err(ValidationError::unknown_variant("access_status", other)),
        }
    }
}

/// One customer organization: the unit of billing and access control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub email: String,
    pub has_paid_entry_fee: bool,
    pub access_status: AccessStatus,
    /// Gateway customer reference, `None` until provisioned.
    pub customer_ref: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Tenant {
    /// Creates a tenant that has not yet been provisioned with the gateway.
    pub fn new(name: impl Into<String>, email: impl Into<String>, has_paid_entry_fee: bool) -> Self {
        let now = Timestamp::now();
        Self {
            id: TenantId::new(),
            name: name.into(),
            email: email.into(),
            has_paid_entry_fee,
            access_status: AccessStatus::PendingPayment,
            customer_ref: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builder-style override of the identifier, used when seeding known tenants.
    pub fn with_id(mut self, id: TenantId) -> Self {
        self.id = id;
        self
    }

    pub fn with_customer_ref(mut self, customer_ref: impl Into<String>) -> Self {
        self.customer_ref = Some(customer_ref.into());
        self
    }

    pub fn with_access_status(mut self, status: AccessStatus) -> Self {
        self.access_status = status;
        self
    }

    /// The access status this tenant ends up with for a given decision.
    pub fn effective_access(&self, decision: AccessStatus) -> AccessStatus {
        decision.gated_by_entry_fee(self.has_paid_entry_fee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tenant_starts_pending_payment() {
        let tenant = Tenant::new("Acme", "billing@acme.test", true);
        assert_eq!(tenant.access_status, AccessStatus::PendingPayment);
        assert!(tenant.customer_ref.is_none());
    }

    #[test]
    fn active_decision_is_downgraded_without_entry_fee() {
        let tenant = Tenant::new("Acme", "billing@acme.test", false);
        assert_eq!(
            tenant.effective_access(AccessStatus::Active),
            AccessStatus::PendingPayment
        );
    }

    #[test]
    fn active_decision_passes_with_entry_fee() {
        let tenant = Tenant::new("Acme", "billing@acme.test", true);
        assert_eq!(tenant.effective_access(AccessStatus::Active), AccessStatus::Active);
    }

    #[test]
    fn suspension_is_never_upgraded() {
        assert_eq!(
            AccessStatus::Suspended.gated_by_entry_fee(false),
            AccessStatus::Suspended
        );
        assert_eq!(
            AccessStatus::Suspended.gated_by_entry_fee(true),
            AccessStatus::Suspended
        );
    }

    #[test]
    fn access_status_parses_its_own_strings() {
        for status in [
            AccessStatus::PendingPayment,
            AccessStatus::Active,
            AccessStatus::Suspended,
        ] {
            assert_eq!(status.as_str().parse::<AccessStatus>().unwrap(), status);
        }
        assert!("locked".parse::<AccessStatus>().is_err());
    }

    #[test]
    fn access_status_serializes_snake_case() {
        let json = serde_json::to_string(&AccessStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
    }
}
