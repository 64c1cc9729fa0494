//! Local subscription record.
//!
//! At most one non-terminal record exists per tenant. Records are never deleted;
//! cancellation is a status change.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{SubscriptionId, TenantId, Timestamp, ValidationError};

/// Plan offered to tenants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Standard,
    Premium,
}

impl PlanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanType::Standard => "standard",
            PlanType::Premium => "premium",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(PlanType::Standard),
            "premium" => Ok(PlanType::Premium),
            other => Err(ValidationError::unknown_variant("plan_type", other)),
        }
    }
}

/// How often the plan is billed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingCycle {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(BillingCycle::Monthly),
            "yearly" => Ok(BillingCycle::Yearly),
            other => Err(ValidationError::unknown_variant("billing_cycle", other)),
        }
    }
}

/// Internal subscription status vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Inactive,
    Trial,
    Active,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Statuses in which the tenant's users are let in.
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }

    /// Canceled is the only terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubscriptionStatus::Canceled)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(SubscriptionStatus::Inactive),
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" => Ok(SubscriptionStatus::Canceled),
            other => Err(ValidationError::unknown_variant("status", other)),
        }
    }
}

/// Largest seat count the datastore's `extra_seats` column can hold.
pub const MAX_EXTRA_SEATS: u32 = i32::MAX as u32;

/// Authoritative local copy of a tenant's subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub customer_ref: String,
    /// Gateway subscription reference, `None` until the gateway confirms creation.
    pub external_ref: Option<String>,
    pub plan: PlanType,
    pub cycle: BillingCycle,
    pub extra_seats: u32,
    pub status: SubscriptionStatus,
    /// Set once, on the first transition into an access-granting status.
    pub activated_at: Option<Timestamp>,
    pub current_period_end: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates an inactive subscription awaiting gateway confirmation.
    pub fn new(
        tenant_id: TenantId,
        customer_ref: impl Into<String>,
        plan: PlanType,
        cycle: BillingCycle,
        extra_seats: u32,
    ) -> Self {
        let now = Timestamp::now();
        Self {
            id: SubscriptionId::new(),
            tenant_id,
            customer_ref: customer_ref.into(),
            external_ref: None,
            plan,
            cycle,
            extra_seats,
            status: SubscriptionStatus::Inactive,
            activated_at: None,
            current_period_end: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves to `status`, stamping `activated_at` the first time access is granted.
    pub fn transition_to(&mut self, status: SubscriptionStatus, now: Timestamp) {
        if status.grants_access() && self.activated_at.is_none() {
            self.activated_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Subscription {
        Subscription::new(
            TenantId::new(),
            "cus_123",
            PlanType::Standard,
            BillingCycle::Monthly,
            0,
        )
    }

    #[test]
    fn new_subscription_is_inactive_and_unactivated() {
        let sub = sample();
        assert_eq!(sub.status, SubscriptionStatus::Inactive);
        assert!(sub.activated_at.is_none());
        assert!(sub.external_ref.is_none());
    }

    #[test]
    fn first_access_granting_transition_sets_activated_at() {
        let mut sub = sample();
        let now = Timestamp::now();
        sub.transition_to(SubscriptionStatus::Trial, now);
        assert_eq!(sub.activated_at, Some(now));
    }

    #[test]
    fn activated_at_is_set_only_once() {
        let mut sub = sample();
        let first = Timestamp::from_unix_secs(1_000).unwrap();
        let later = Timestamp::from_unix_secs(2_000).unwrap();

        sub.transition_to(SubscriptionStatus::Active, first);
        sub.transition_to(SubscriptionStatus::PastDue, later);
        sub.transition_to(SubscriptionStatus::Active, later);

        assert_eq!(sub.activated_at, Some(first));
    }

    #[test]
    fn non_granting_transition_leaves_activated_at_empty() {
        let mut sub = sample();
        sub.transition_to(SubscriptionStatus::PastDue, Timestamp::now());
        assert!(sub.activated_at.is_none());
    }

    #[test]
    fn only_active_and_trial_grant_access() {
        assert!(SubscriptionStatus::Active.grants_access());
        assert!(SubscriptionStatus::Trial.grants_access());
        assert!(!SubscriptionStatus::Inactive.grants_access());
        assert!(!SubscriptionStatus::PastDue.grants_access());
        assert!(!SubscriptionStatus::Canceled.grants_access());
    }

    #[test]
    fn enums_parse_their_own_strings() {
        assert_eq!("premium".parse::<PlanType>().unwrap(), PlanType::Premium);
        assert_eq!("yearly".parse::<BillingCycle>().unwrap(), BillingCycle::Yearly);
        assert_eq!(
            "past_due".parse::<SubscriptionStatus>().unwrap(),
            SubscriptionStatus::PastDue
        );
        assert!("gold".parse::<PlanType>().is_err());
        assert!("weekly".parse::<BillingCycle>().is_err());
    }
}
