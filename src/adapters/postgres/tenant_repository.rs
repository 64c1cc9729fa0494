//! PostgreSQL implementation of TenantRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::rows::{db_error, violated_constraint, TenantRow, TENANT_COLUMNS};
use crate::domain::billing::Tenant;
use crate::domain::foundation::{DomainError, ErrorCode, TenantId};
use crate::ports::TenantRepository;

pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_one(&self, filter: &str, value: impl ToString) -> Result<Option<Tenant>, DomainError> {
        let sql = format!("SELECT {} FROM tenants WHERE {} = $1", TENANT_COLUMNS, filter);
        let row: Option<TenantRow> = sqlx::query_as(&sql)
            .bind(value.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load tenant", e))?;
        row.map(Tenant::try_from).transpose()
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        let sql = format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS);
        let row: Option<TenantRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to load tenant", e))?;
        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_customer_ref(
        &self,
        customer_ref: &str,
    ) -> Result<Option<Tenant>, DomainError> {
        self.find_one("stripe_customer_id", customer_ref).await
    }

    async fn set_customer_ref(&self, id: &TenantId, customer_ref: &str) -> Result<(), DomainError> {
        // Only fills an empty reference or repeats the same one.
        let result = sqlx::query(
            r#"
            UPDATE tenants
            SET stripe_customer_id = $2, updated_at = now()
            WHERE id = $1 AND (stripe_customer_id IS NULL OR stripe_customer_id = $2)
            "#,
        )
        .bind(id.as_uuid())
        .bind(customer_ref)
        .execute(&self.pool)
        .await
        .map_err(|e| match violated_constraint(&e) {
            Some(_) => DomainError::new(
                ErrorCode::Conflict,
                format!("Customer {} already belongs to another tenant", customer_ref),
            ),
            None => db_error("Failed to set customer reference", e),
        })?;

        if result.rows_affected() == 1 {
            return Ok(());
        }
        match self.find_by_id(id).await? {
            None => Err(DomainError::new(
                ErrorCode::TenantNotFound,
                format!("Tenant {} not found", id),
            )),
            Some(_) => Err(DomainError::new(
                ErrorCode::Conflict,
                format!("Tenant {} already has a different customer", id),
            )),
        }
    }
}
