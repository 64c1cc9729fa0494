//! Event router - dispatch table from Stripe event type to handler.
//!
//! Handlers never persist anything. They return an [`EventOutcome`] and the
//! webhook processor commits it together with the ledger entry, so a delivery
//! that loses the idempotency race leaves no trace.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use super::stripe_event::{StripeEvent, StripeEventType};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::ports::{BillingNotifier, ReconciliationWrite};

/// Notice sent to the tenant once the triggering event has been committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillingNotice {
    TrialEnding {
        tenant_id: TenantId,
        trial_end: Option<Timestamp>,
    },
    PaymentFailed {
        tenant_id: TenantId,
        invoice_id: String,
    },
}

impl BillingNotice {
    pub fn tenant_id(&self) -> &TenantId {
        match self {
            BillingNotice::TrialEnding { tenant_id, .. }
            | BillingNotice::PaymentFailed { tenant_id, .. } => tenant_id,
        }
    }

    pub async fn deliver(&self, notifier: &dyn BillingNotifier) -> Result<(), DomainError> {
        match self {
            BillingNotice::TrialEnding {
                tenant_id,
                trial_end,
            } => notifier.trial_ending(tenant_id, *trial_end).await,
            BillingNotice::PaymentFailed {
                tenant_id,
                invoice_id,
            } => notifier.payment_failed(tenant_id, invoice_id).await,
        }
    }
}

/// What handling an event amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Write the subscription and tenant rows, then send the notice if any.
    Reconcile {
        write: ReconciliationWrite,
        notice: Option<BillingNotice>,
    },
    /// No state change, only a notice.
    Notify(BillingNotice),
    /// Acknowledge and record the event without side effects.
    NoChange(String),
}

impl EventOutcome {
    pub fn no_change(reason: impl Into<String>) -> Self {
        EventOutcome::NoChange(reason.into())
    }
}

/// Handler for one or more Stripe event types.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    /// Event types this handler is registered for.
    fn handles(&self) -> Vec<StripeEventType>;

    /// Decide what the event means for local state.
    ///
    /// An `Err` leaves the event unrecorded so the gateway redelivers it.
    async fn handle(&self, event: &StripeEvent) -> Result<EventOutcome, WebhookError>;
}

#[async_trait]
pub trait WebhookDispatcher: Send + Sync {
    fn get_handler(&self, event_type: &StripeEventType) -> Option<&dyn WebhookEventHandler>;

    /// Route an event. Types without a handler are acknowledged as `NoChange`.
    async fn dispatch(&self, event: &StripeEvent) -> Result<EventOutcome, WebhookError> {
        let event_type = event.parsed_type();
        match self.get_handler(&event_type) {
            Some(handler) => handler.handle(event).await,
            None => {
                tracing::info!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    "No handler for webhook event type, acknowledging"
                );
                Ok(EventOutcome::no_change(format!(
                    "unhandled event type {}",
                    event.event_type
                )))
            }
        }
    }
}

/// Dispatcher backed by a map of registered handlers.
#[derive(Default)]
pub struct EventRouter {
    handlers: HashMap<StripeEventType, Arc<dyn WebhookEventHandler>>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every type it declares. Later registrations win.
    pub fn register(mut self, handler: Arc<dyn WebhookEventHandler>) -> Self {
        for event_type in handler.handles() {
            self.handlers.insert(event_type, handler.clone());
        }
        self
    }

    pub fn registered_types(&self) -> Vec<StripeEventType> {
        self.handlers.keys().copied().collect()
    }
}

impl WebhookDispatcher for EventRouter {
    fn get_handler(&self, event_type: &StripeEventType) -> Option<&dyn WebhookEventHandler> {
        self.handlers.get(event_type).map(|h| h.as_ref())
    }
}
