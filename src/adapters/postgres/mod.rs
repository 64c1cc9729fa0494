//! PostgreSQL adapters - Database implementations for the billing ports.
//!
//! - `PostgresTenantRepository` - Tenant rows and customer references
//! - `PostgresSubscriptionRepository` - Subscription lookups
//! - `PostgresProcessedEventLedger` - Webhook idempotency ledger
//! - `PostgresReconciliationStore` - Transactional subscription + access writes

mod pool;
mod processed_event_ledger;
mod reconciliation_store;
mod rows;
mod subscription_repository;
mod tenant_repository;

pub use pool::{create_pool, run_migrations};
pub use processed_event_ledger::PostgresProcessedEventLedger;
pub use reconciliation_store::PostgresReconciliationStore;
pub use subscription_repository::PostgresSubscriptionRepository;
pub use tenant_repository::PostgresTenantRepository;
