//! Application layer - Commands, Queries, and Handlers.
//!
//! Handlers validate input, enforce business preconditions and coordinate the
//! ports; the rules themselves live in `crate::domain::billing`.

pub mod handlers;

pub use handlers::billing::{
    CreateCustomerCommand, CreateCustomerHandler, CreateCustomerResult,
    CreateSubscriptionCommand, CreateSubscriptionHandler, CreateSubscriptionResult,
    GetTenantAccessHandler, GetTenantAccessQuery, GetTenantAccessResult, HandleWebhookCommand,
    HandleWebhookHandler, OpenPortalCommand, OpenPortalHandler, OpenPortalResult,
};
