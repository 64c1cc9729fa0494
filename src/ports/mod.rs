//! Ports - Interfaces between the billing domain and infrastructure.
//!
//! Adapters in `crate::adapters` implement these traits; handlers and the
//! reconciler consume them as `Arc<dyn Port>`.

mod billing_notifier;
mod payment_gateway;
mod processed_event_ledger;
mod reconciliation_store;
mod subscription_repository;
mod tenant_repository;

pub use billing_notifier::BillingNotifier;
pub use payment_gateway::{
    CreateCustomerRequest, CreateSubscriptionRequest, GatewayCustomer, PaymentError,
    PaymentErrorCode, PaymentGateway, PortalSession,
};
pub use processed_event_ledger::{MarkResult, ProcessedEvent, ProcessedEventLedger};
pub use reconciliation_store::{ApplyResult, ReconciliationStore, ReconciliationWrite};
pub use subscription_repository::SubscriptionRepository;
pub use tenant_repository::TenantRepository;
