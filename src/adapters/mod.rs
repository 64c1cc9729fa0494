//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the billing domain to external systems:
//! - `postgres` - Tenants, subscriptions and the processed-event ledger
//! - `stripe` - Payment gateway over the Stripe REST API, plus a test double
//! - `memory` - In-memory store and logging notifier
//! - `http` - Axum endpoints for webhooks and provisioning

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use memory::{InMemoryBillingStore, LogBillingNotifier};
pub use postgres::{
    PostgresProcessedEventLedger, PostgresReconciliationStore, PostgresSubscriptionRepository,
    PostgresTenantRepository,
};
pub use stripe::{MockPaymentGateway, StripeConfig, StripeGateway};
