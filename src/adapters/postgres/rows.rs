//! Row types shared by the billing PostgreSQL adapters.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::billing::{Subscription, Tenant};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, TenantId, Timestamp};

pub(super) const TENANT_COLUMNS: &str = "id, name, email, has_paid_entry_fee, access_status, \
     stripe_customer_id, created_at, updated_at";

pub(super) const SUBSCRIPTION_COLUMNS: &str = "id, tenant_id, stripe_customer_id, \
     stripe_subscription_id, plan_type, billing_cycle, extra_seats, status, activated_at, \
     current_period_end, created_at, updated_at";

/// Unique index allowing one non-canceled subscription per tenant.
pub(super) const LIVE_SUBSCRIPTION_INDEX: &str = "subscriptions_one_live_per_tenant";

pub(super) const TENANT_FOREIGN_KEY: &str = "subscriptions_tenant_id_fkey";

#[derive(Debug, sqlx::FromRow)]
pub(super) struct TenantRow {
    id: Uuid,
    name: String,
    email: String,
    has_paid_entry_fee: bool,
    access_status: String,
    stripe_customer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            has_paid_entry_fee: row.has_paid_entry_fee,
            access_status: parse_column("access_status", &row.access_status)?,
            customer_ref: row.stripe_customer_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(super) struct SubscriptionRow {
    id: Uuid,
    tenant_id: Uuid,
    stripe_customer_id: String,
    stripe_subscription_id: Option<String>,
    plan_type: String,
    billing_cycle: String,
    extra_seats: i32,
    status: String,
    activated_at: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let extra_seats = u32::try_from(row.extra_seats).map_err(|_| {
            DomainError::database(format!("Negative extra_seats for subscription {}", row.id))
        })?;
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            customer_ref: row.stripe_customer_id,
            external_ref: row.stripe_subscription_id,
            plan: parse_column("plan_type", &row.plan_type)?,
            cycle: parse_column("billing_cycle", &row.billing_cycle)?,
            extra_seats,
            status: parse_column("status", &row.status)?,
            activated_at: row.activated_at.map(Timestamp::from_datetime),
            current_period_end: row.current_period_end.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_column<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, DomainError> {
    value.parse().map_err(|_| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, value),
        )
    })
}

/// `extra_seats` is an INTEGER column; larger counts are refused, never clamped.
pub(super) fn seats_column(extra_seats: u32) -> Result<i32, DomainError> {
    i32::try_from(extra_seats).map_err(|_| {
        DomainError::validation(
            "extra_seats",
            format!("{} extra seats exceeds the storable maximum", extra_seats),
        )
    })
}

/// Domain error for a subscription write rejected by a named constraint.
pub(super) fn subscription_constraint_error(
    constraint: &str,
    tenant_id: &TenantId,
) -> Option<DomainError> {
    match constraint {
        LIVE_SUBSCRIPTION_INDEX => Some(DomainError::new(
            ErrorCode::Conflict,
            format!("Tenant {} already has a live subscription", tenant_id),
        )),
        TENANT_FOREIGN_KEY => Some(DomainError::new(
            ErrorCode::TenantNotFound,
            format!("Tenant {} not found", tenant_id),
        )),
        _ => None,
    }
}

pub(super) fn db_error(context: &str, err: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, err))
}

pub(super) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{AccessStatus, PlanType, SubscriptionStatus, MAX_EXTRA_SEATS};

    const MIGRATION: &str = include_str!("../../../migrations/0001_billing.sql");

    fn tenant_row(access_status: &str) -> TenantRow {
        TenantRow {
            id: Uuid::new_v4(),
            name: "Acme".to_string(),
            email: "billing@acme.test".to_string(),
            has_paid_entry_fee: true,
            access_status: access_status.to_string(),
            stripe_customer_id: Some("cus_1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn subscription_row(plan_type: &str, status: &str, extra_seats: i32) -> SubscriptionRow {
        SubscriptionRow {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            stripe_customer_id: "cus_1".to_string(),
            stripe_subscription_id: Some("sub_1".to_string()),
            plan_type: plan_type.to_string(),
            billing_cycle: "monthly".to_string(),
            extra_seats,
            status: status.to_string(),
            activated_at: None,
            current_period_end: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn tenant_row_converts_with_known_access_status() {
        let tenant = Tenant::try_from(tenant_row("suspended")).unwrap();
        assert_eq!(tenant.access_status, AccessStatus::Suspended);
        assert_eq!(tenant.customer_ref.as_deref(), Some("cus_1"));
    }

    #[test]
    fn tenant_row_rejects_unknown_access_status() {
        let err = Tenant::try_from(tenant_row("frozen")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("access_status"));
    }

    #[test]
    fn subscription_row_converts_all_columns() {
        let sub = Subscription::try_from(subscription_row("premium", "past_due", 3)).unwrap();
        assert_eq!(sub.plan, PlanType::Premium);
        assert_eq!(sub.status, SubscriptionStatus::PastDue);
        assert_eq!(sub.extra_seats, 3);
        assert_eq!(sub.external_ref.as_deref(), Some("sub_1"));
    }

    #[test]
    fn subscription_row_rejects_negative_seats() {
        let err = Subscription::try_from(subscription_row("standard", "active", -1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn subscription_row_rejects_unknown_enum_values() {
        for (plan, status) in [("gold", "active"), ("standard", "paused")] {
            let err = Subscription::try_from(subscription_row(plan, status, 0)).unwrap_err();
            assert_eq!(err.code, ErrorCode::DatabaseError);
        }
    }

    #[test]
    fn parse_column_names_the_column() {
        let err = parse_column::<PlanType>("plan_type", "gold").unwrap_err();
        assert_eq!(err.message, "Invalid plan_type value: gold");
        assert_eq!(parse_column::<PlanType>("plan_type", "standard").unwrap(), PlanType::Standard);
    }

    #[test]
    fn seats_column_accepts_the_domain_maximum() {
        assert_eq!(seats_column(0).unwrap(), 0);
        assert_eq!(seats_column(MAX_EXTRA_SEATS).unwrap(), i32::MAX);
    }

    #[test]
    fn seats_column_refuses_instead_of_clamping() {
        let err = seats_column(MAX_EXTRA_SEATS + 1).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.details.get("field").map(String::as_str), Some("extra_seats"));
    }

    #[test]
    fn constraint_names_exist_in_the_migration() {
        assert!(MIGRATION.contains(&format!("CONSTRAINT {}", TENANT_FOREIGN_KEY)));
        assert!(MIGRATION.contains(&format!("CREATE UNIQUE INDEX {}", LIVE_SUBSCRIPTION_INDEX)));
    }

    #[test]
    fn named_constraints_map_to_domain_errors() {
        let tenant_id = TenantId::new();
        let conflict = subscription_constraint_error(LIVE_SUBSCRIPTION_INDEX, &tenant_id).unwrap();
        assert_eq!(conflict.code, ErrorCode::Conflict);
        let missing = subscription_constraint_error(TENANT_FOREIGN_KEY, &tenant_id).unwrap();
        assert_eq!(missing.code, ErrorCode::TenantNotFound);
        assert!(subscription_constraint_error("subscriptions_pkey", &tenant_id).is_none());
    }
}
