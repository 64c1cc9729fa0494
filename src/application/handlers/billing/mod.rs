//! Billing handlers.
//!
//! ## Commands
//! - Creating the gateway customer for a tenant
//! - Starting a subscription
//! - Opening the self-service portal
//! - Processing signed gateway webhooks
//!
//! ## Queries
//! - Reading a tenant's access decision

mod create_customer;
mod create_subscription;
mod get_tenant_access;
mod handle_webhook;
mod open_portal;

// Commands
pub use create_customer::{CreateCustomerCommand, CreateCustomerHandler, CreateCustomerResult};
pub use create_subscription::{
    CreateSubscriptionCommand, CreateSubscriptionHandler, CreateSubscriptionResult,
};
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler};
pub use open_portal::{OpenPortalCommand, OpenPortalHandler, OpenPortalResult};

// Queries
pub use get_tenant_access::{GetTenantAccessHandler, GetTenantAccessQuery, GetTenantAccessResult};
