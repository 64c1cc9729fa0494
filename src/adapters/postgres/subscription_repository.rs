//! PostgreSQL implementation of SubscriptionRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{db_error, SubscriptionRow, SUBSCRIPTION_COLUMNS};
use crate::domain::billing::Subscription;
use crate::domain::foundation::{DomainError, TenantId};
use crate::ports::SubscriptionRepository;

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn find_current_by_tenant(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<Subscription>, DomainError> {
        // The live row if there is one, else the most recent canceled row.
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE tenant_id = $1 \
             ORDER BY (status <> 'canceled') DESC, created_at DESC LIMIT 1",
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(tenant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load subscription", e))?;
        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_external_ref(
        &self,
        external_ref: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE stripe_subscription_id = $1",
            SUBSCRIPTION_COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(external_ref)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load subscription", e))?;
        row.map(Subscription::try_from).transpose()
    }
}
