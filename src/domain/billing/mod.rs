//! Billing domain module.
//!
//! Tenant access, subscription records and the reconciliation of both against
//! the payment gateway's view of a subscription.
//!
//! # Module Structure
//!
//! - `tenant` - Tenant entity and its access status
//! - `subscription` - Subscription record, plan, cycle and status
//! - `status_mapper` - Gateway status to internal status and access decision
//! - `line_item` - Price table and priced order lines
//! - `reconciler` - Plans the writes that bring local state in line with the gateway
//! - `stripe_event` - Webhook envelope and gateway objects
//! - `webhook_verifier` - Stripe-Signature verification
//! - `event_router` / `event_handlers` - Dispatch by event type
//! - `webhook_processor` - Exactly-once application of verified events

mod errors;
mod event_handlers;
mod event_router;
mod line_item;
mod reconciler;
mod status_mapper;
mod stripe_event;
mod subscription;
mod tenant;
mod webhook_errors;
mod webhook_processor;
mod webhook_verifier;

pub use errors::BillingError;
pub use event_handlers::{
    InvoiceHandler, SubscriptionDeletedHandler, SubscriptionSyncHandler, TrialWillEndHandler,
};
pub use event_router::{
    BillingNotice, EventOutcome, EventRouter, WebhookDispatcher, WebhookEventHandler,
};
pub use line_item::{LineItem, LineItemRole, PriceTable, ROLE_METADATA_KEY};
pub use reconciler::{
    Reconciliation, SkipReason, SubscriptionReconciler, CYCLE_METADATA_KEY, PLAN_METADATA_KEY,
};
pub use status_mapper::{map_gateway_status, StatusMapping};
pub use stripe_event::{
    GatewayInvoice, GatewayItem, GatewayItemList, GatewayPrice, GatewaySubscription,
    StripeEvent, StripeEventData, StripeEventType, TENANT_METADATA_KEY,
};
pub use subscription::{
    BillingCycle, PlanType, Subscription, SubscriptionStatus, MAX_EXTRA_SEATS,
};
pub use tenant::{AccessStatus, Tenant};
pub use webhook_errors::WebhookError;
pub use webhook_processor::{IdempotentWebhookProcessor, WebhookResult};
pub use webhook_verifier::{SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS};

#[cfg(test)]
pub(crate) use line_item::test_price_table;
#[cfg(test)]
pub(crate) use stripe_event::test_event;
