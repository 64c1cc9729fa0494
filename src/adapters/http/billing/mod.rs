//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/billing/webhooks/stripe` - Signed gateway webhooks
//! - `POST /api/billing/customers` - Create the gateway customer for a tenant
//! - `POST /api/billing/subscriptions` - Start a subscription
//! - `POST /api/billing/portal` - Self-service portal link
//! - `GET /api/billing/tenants/:tenant_id/access` - Tenant access decision

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState, BillingPorts, SIGNATURE_HEADER};
pub use routes::billing_router;
