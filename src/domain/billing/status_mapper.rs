//! Gateway status to internal status and access decision.
//!
//! This table is the single answer to "does this tenant get in the door". Both the
//! webhook reconciler and subscription provisioning go through it.
//!
//! | gateway status | internal status | access |
//! |----------------|-----------------|--------|
//! | active | active | active |
//! | trialing | trial | active |
//! | past_due | past_due | suspended |
//! | canceled | canceled | suspended |
//! | unpaid | canceled | suspended |
//! | anything else | inactive | pending_payment |

use super::subscription::SubscriptionStatus;
use super::tenant::AccessStatus;

/// Outcome of mapping one gateway status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMapping {
    pub status: SubscriptionStatus,
    pub access: AccessStatus,
}

/// Maps a gateway-reported subscription status.
pub fn map_gateway_status(gateway_status: &str) -> StatusMapping {
    let (status, access) = match gateway_status {
        "active" => (SubscriptionStatus::Active, AccessStatus::Active),
        "trialing" => (SubscriptionStatus::Trial, AccessStatus::Active),
        "past_due" => (SubscriptionStatus::PastDue, AccessStatus::Suspended),
        "canceled" => (SubscriptionStatus::Canceled, AccessStatus::Suspended),
        "unpaid" => (SubscriptionStatus::Canceled, AccessStatus::Suspended),
        _ => (SubscriptionStatus::Inactive, AccessStatus::PendingPayment),
    };
    StatusMapping { status, access }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mapped(s: &str) -> (SubscriptionStatus, AccessStatus) {
        let m = map_gateway_status(s);
        (m.status, m.access)
    }

    #[test]
    fn active_maps_to_active() {
        assert_eq!(
            mapped("active"),
            (SubscriptionStatus::Active, AccessStatus::Active)
        );
    }

    #[test]
    fn trialing_maps_to_trial_with_access() {
        assert_eq!(
            mapped("trialing"),
            (SubscriptionStatus::Trial, AccessStatus::Active)
        );
    }

    #[test]
    fn past_due_suspends() {
        assert_eq!(
            mapped("past_due"),
            (SubscriptionStatus::PastDue, AccessStatus::Suspended)
        );
    }

    #[test]
    fn canceled_suspends() {
        assert_eq!(
            mapped("canceled"),
            (SubscriptionStatus::Canceled, AccessStatus::Suspended)
        );
    }

    #[test]
    fn unpaid_is_treated_as_canceled() {
        assert_eq!(
            mapped("unpaid"),
            (SubscriptionStatus::Canceled, AccessStatus::Suspended)
        );
    }

    #[test]
    fn incomplete_falls_to_default_branch() {
        assert_eq!(
            mapped("incomplete"),
            (SubscriptionStatus::Inactive, AccessStatus::PendingPayment)
        );
        assert_eq!(
            mapped("incomplete_expired"),
            (SubscriptionStatus::Inactive, AccessStatus::PendingPayment)
        );
        assert_eq!(
            mapped(""),
            (SubscriptionStatus::Inactive, AccessStatus::PendingPayment)
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(
            mapped("ACTIVE"),
            (SubscriptionStatus::Inactive, AccessStatus::PendingPayment)
        );
    }

    proptest! {
        #[test]
        fn unknown_statuses_never_grant_access(s in "[a-z_]{0,20}") {
            prop_assume!(!["active", "trialing", "past_due", "canceled", "unpaid"].contains(&s.as_str()));
            let m = map_gateway_status(&s);
            prop_assert_eq!(m.status, SubscriptionStatus::Inactive);
            prop_assert_eq!(m.access, AccessStatus::PendingPayment);
        }

        #[test]
        fn access_is_active_exactly_when_status_grants_it(s in "[a-z_]{0,20}") {
            let m = map_gateway_status(&s);
            prop_assert_eq!(m.access == AccessStatus::Active, m.status.grants_access());
        }
    }
}
