//! Stripe webhook event handlers.
//!
//! Subscription events carry the subscription object itself. Invoice events
//! only reference it, so their handlers re-fetch the subscription from the
//! gateway instead of trusting whatever the invoice embeds.

use async_trait::async_trait;
use std::sync::Arc;

use super::event_router::{BillingNotice, EventOutcome, EventRouter, WebhookEventHandler};
use super::reconciler::{Reconciliation, SubscriptionReconciler};
use super::stripe_event::{GatewayInvoice, GatewaySubscription, StripeEvent, StripeEventType};
use super::webhook_errors::WebhookError;
use crate::domain::foundation::Timestamp;
use crate::ports::PaymentGateway;

impl EventRouter {
    /// Router with every handler the billing engine ships.
    pub fn standard(
        reconciler: Arc<SubscriptionReconciler>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        EventRouter::new()
            .register(Arc::new(SubscriptionSyncHandler::new(reconciler.clone())))
            .register(Arc::new(SubscriptionDeletedHandler::new(reconciler.clone())))
            .register(Arc::new(InvoiceHandler::new(reconciler, gateway)))
            .register(Arc::new(TrialWillEndHandler))
    }
}

fn subscription_object(event: &StripeEvent) -> Result<GatewaySubscription, WebhookError> {
    event.deserialize_object().map_err(|e| {
        WebhookError::Processing(format!("Invalid subscription object in {}: {}", event.id, e))
    })
}

fn outcome_of(reconciliation: Reconciliation, notice: Option<BillingNotice>) -> EventOutcome {
    match reconciliation {
        Reconciliation::Write(write) => EventOutcome::Reconcile { write, notice },
        Reconciliation::Skip(reason) => EventOutcome::no_change(reason.to_string()),
    }
}

/// `customer.subscription.created` and `customer.subscription.updated`.
pub struct SubscriptionSyncHandler {
    reconciler: Arc<SubscriptionReconciler>,
}

impl SubscriptionSyncHandler {
    pub fn new(reconciler: Arc<SubscriptionReconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl WebhookEventHandler for SubscriptionSyncHandler {
    fn handles(&self) -> Vec<StripeEventType> {
        vec![
            StripeEventType::CustomerSubscriptionCreated,
            StripeEventType::CustomerSubscriptionUpdated,
        ]
    }

    async fn handle(&self, event: &StripeEvent) -> Result<EventOutcome, WebhookError> {
        let subscription = subscription_object(event)?;
        let plan = self.reconciler.plan_sync(&subscription).await?;
        Ok(outcome_of(plan, None))
    }
}

/// `customer.subscription.deleted`: always canceled and suspended.
pub struct SubscriptionDeletedHandler {
    reconciler: Arc<SubscriptionReconciler>,
}

impl SubscriptionDeletedHandler {
    pub fn new(reconciler: Arc<SubscriptionReconciler>) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl WebhookEventHandler for SubscriptionDeletedHandler {
    fn handles(&self) -> Vec<StripeEventType> {
        vec![StripeEventType::CustomerSubscriptionDeleted]
    }

    async fn handle(&self, event: &StripeEvent) -> Result<EventOutcome, WebhookError> {
        let subscription = subscription_object(event)?;
        let plan = self.reconciler.plan_cancellation(&subscription).await?;
        Ok(outcome_of(plan, None))
    }
}

/// `invoice.paid`, `invoice.payment_succeeded` and `invoice.payment_failed`.
pub struct InvoiceHandler {
    reconciler: Arc<SubscriptionReconciler>,
    gateway: Arc<dyn PaymentGateway>,
}

impl InvoiceHandler {
    pub fn new(reconciler: Arc<SubscriptionReconciler>, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            reconciler,
            gateway,
        }
    }
}

#[async_trait]
impl WebhookEventHandler for InvoiceHandler {
    fn handles(&self) -> Vec<StripeEventType> {
        vec![
            StripeEventType::InvoicePaid,
            StripeEventType::InvoicePaymentSucceeded,
            StripeEventType::InvoicePaymentFailed,
        ]
    }

    async fn handle(&self, event: &StripeEvent) -> Result<EventOutcome, WebhookError> {
        let invoice: GatewayInvoice = event.deserialize_object().map_err(|e| {
            WebhookError::Processing(format!("Invalid invoice object in {}: {}", event.id, e))
        })?;

        let Some(subscription_id) = invoice.subscription.as_deref() else {
            return Ok(EventOutcome::no_change(format!(
                "invoice {} is not tied to a subscription",
                invoice.id
            )));
        };

        let Some(subscription) = self.gateway.get_subscription(subscription_id).await? else {
            tracing::warn!(
                event_id = %event.id,
                invoice = %invoice.id,
                subscription = %subscription_id,
                "Invoice references a subscription the gateway does not know"
            );
            return Ok(EventOutcome::no_change(format!(
                "subscription {} not found at gateway",
                subscription_id
            )));
        };

        if event.parsed_type() != StripeEventType::InvoicePaymentFailed {
            let plan = self.reconciler.plan_sync(&subscription).await?;
            return Ok(outcome_of(plan, None));
        }

        let plan = self.reconciler.plan_payment_failure(&subscription).await?;
        let notice = match &plan {
            Reconciliation::Write(write) => Some(BillingNotice::PaymentFailed {
                tenant_id: write.subscription.tenant_id,
                invoice_id: invoice.id.clone(),
            }),
            Reconciliation::Skip(_) => None,
        };
        tracing::warn!(
            event_id = %event.id,
            invoice = %invoice.id,
            subscription = %subscription_id,
            "Invoice payment failed, suspending access"
        );
        Ok(outcome_of(plan, notice))
    }
}

/// `customer.subscription.trial_will_end`: notice only.
pub struct TrialWillEndHandler;

#[async_trait]
impl WebhookEventHandler for TrialWillEndHandler {
    fn handles(&self) -> Vec<StripeEventType> {
        vec![StripeEventType::CustomerSubscriptionTrialWillEnd]
    }

    async fn handle(&self, event: &StripeEvent) -> Result<EventOutcome, WebhookError> {
        let subscription = subscription_object(event)?;
        let Some(tenant_id) = subscription.tenant_id() else {
            return Ok(EventOutcome::no_change(format!(
                "subscription {} has no tenant metadata",
                subscription.id
            )));
        };
        Ok(EventOutcome::Notify(BillingNotice::TrialEnding {
            tenant_id,
            trial_end: subscription.trial_end.and_then(Timestamp::from_unix_secs),
        }))
    }
}
