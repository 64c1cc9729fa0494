//! In-memory adapters for tests and database-less runs.

mod in_memory_billing_store;
mod log_notifier;

pub use in_memory_billing_store::InMemoryBillingStore;
pub use log_notifier::LogBillingNotifier;
