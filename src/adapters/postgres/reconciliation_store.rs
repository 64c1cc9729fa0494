//! PostgreSQL implementation of ReconciliationStore.
//!
//! One transaction per apply: ledger row first, then the subscription upsert,
//! then the tenant access flag. Dropping the transaction on any early return
//! rolls everything back.

use async_trait::async_trait;
use sqlx::PgPool;

use super::processed_event_ledger::insert_event;
use super::rows::{db_error, seats_column, subscription_constraint_error, violated_constraint};
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{
    ApplyResult, MarkResult, ProcessedEvent, ReconciliationStore, ReconciliationWrite,
};

pub struct PostgresReconciliationStore {
    pool: PgPool,
}

impl PostgresReconciliationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReconciliationStore for PostgresReconciliationStore {
    async fn apply(
        &self,
        write: &ReconciliationWrite,
        event: Option<&ProcessedEvent>,
    ) -> Result<ApplyResult, DomainError> {
        let sub = &write.subscription;
        let extra_seats = seats_column(sub.extra_seats)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;

        if let Some(event) = event {
            if insert_event(&mut *tx, event).await? == MarkResult::AlreadyExists {
                return Ok(ApplyResult::DuplicateEvent);
            }
        }

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, tenant_id, stripe_customer_id, stripe_subscription_id, plan_type,
                billing_cycle, extra_seats, status, activated_at, current_period_end,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                plan_type = EXCLUDED.plan_type,
                billing_cycle = EXCLUDED.billing_cycle,
                extra_seats = EXCLUDED.extra_seats,
                status = EXCLUDED.status,
                activated_at = COALESCE(subscriptions.activated_at, EXCLUDED.activated_at),
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(sub.id.as_uuid())
        .bind(sub.tenant_id.as_uuid())
        .bind(&sub.customer_ref)
        .bind(&sub.external_ref)
        .bind(sub.plan.as_str())
        .bind(sub.cycle.as_str())
        .bind(extra_seats)
        .bind(sub.status.as_str())
        .bind(sub.activated_at.as_ref().map(|t| *t.as_datetime()))
        .bind(sub.current_period_end.as_ref().map(|t| *t.as_datetime()))
        .bind(sub.created_at.as_datetime())
        .bind(sub.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            violated_constraint(&e)
                .and_then(|name| subscription_constraint_error(name, &sub.tenant_id))
                .unwrap_or_else(|| db_error("Failed to write subscription", e))
        })?;

        let updated = sqlx::query(
            "UPDATE tenants SET access_status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(sub.tenant_id.as_uuid())
        .bind(write.access.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to write tenant access", e))?;

        if updated.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::TenantNotFound,
                format!("Tenant {} not found", sub.tenant_id),
            ));
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit reconciliation", e))?;
        Ok(ApplyResult::Applied)
    }
}
