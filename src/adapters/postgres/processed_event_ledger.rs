//! PostgreSQL implementation of ProcessedEventLedger.
//!
//! `event_id` is the primary key of `processed_events`; `ON CONFLICT DO NOTHING`
//! turns a concurrent duplicate into `MarkResult::AlreadyExists`.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres};

use super::rows::db_error;
use crate::domain::foundation::DomainError;
use crate::ports::{MarkResult, ProcessedEvent, ProcessedEventLedger};

pub struct PostgresProcessedEventLedger {
    pool: PgPool,
}

impl PostgresProcessedEventLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Insert a ledger row on any executor, so the reconciliation store can run it
/// inside its own transaction.
pub(super) async fn insert_event<'e, E>(executor: E, event: &ProcessedEvent) -> Result<MarkResult, DomainError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO processed_events (event_id, event_type, payload, processed_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(&event.event_id)
    .bind(&event.event_type)
    .bind(&event.payload)
    .bind(event.processed_at.as_datetime())
    .execute(executor)
    .await
    .map_err(|e| db_error("Failed to record processed event", e))?;

    Ok(mark_result(result.rows_affected()))
}

/// `ON CONFLICT DO NOTHING` leaves zero rows affected for a known event id.
fn mark_result(rows_affected: u64) -> MarkResult {
    if rows_affected == 1 {
        MarkResult::Inserted
    } else {
        MarkResult::AlreadyExists
    }
}

#[async_trait]
impl ProcessedEventLedger for PostgresProcessedEventLedger {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM processed_events WHERE event_id = $1)",
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to check processed event", e))?;
        Ok(exists)
    }

    async fn mark_processed(&self, event: &ProcessedEvent) -> Result<MarkResult, DomainError> {
        insert_event(&self.pool, event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_row_marks_event_new() {
        assert_eq!(mark_result(1), MarkResult::Inserted);
    }

    #[test]
    fn skipped_insert_marks_event_duplicate() {
        assert_eq!(mark_result(0), MarkResult::AlreadyExists);
    }
}
