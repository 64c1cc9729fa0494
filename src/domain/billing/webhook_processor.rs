//! Webhook processor - applies each verified Stripe event at most once.
//!
//! ## Flow
//!
//! 1. Skip events the ledger already holds (fast path only)
//! 2. Dispatch to the handler, which plans but does not write
//! 3. Commit the plan and the ledger entry in one unit
//! 4. Send any notice, only from the delivery that committed
//!
//! ## Race Condition Handling
//!
//! Concurrent deliveries of one event can all pass step 1. The ledger's unique
//! key on the event id picks a single winner in step 3; the others see
//! `DuplicateEvent`/`AlreadyExists`, write nothing and report `AlreadyProcessed`.
//!
//! A handler error or a failed commit leaves no ledger entry, so the gateway's
//! retry delivers the event again.

use std::sync::Arc;

use super::event_router::{BillingNotice, EventOutcome, WebhookDispatcher};
use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;
use crate::ports::{
    ApplyResult, BillingNotifier, MarkResult, ProcessedEvent, ProcessedEventLedger,
    ReconciliationStore,
};

/// Outcome of processing one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookResult {
    /// This delivery applied the event.
    Processed,
    /// The event had already been applied by an earlier or concurrent delivery.
    AlreadyProcessed,
}

pub struct IdempotentWebhookProcessor {
    ledger: Arc<dyn ProcessedEventLedger>,
    store: Arc<dyn ReconciliationStore>,
    dispatcher: Arc<dyn WebhookDispatcher>,
    notifier: Arc<dyn BillingNotifier>,
}

impl IdempotentWebhookProcessor {
    pub fn new(
        ledger: Arc<dyn ProcessedEventLedger>,
        store: Arc<dyn ReconciliationStore>,
        dispatcher: Arc<dyn WebhookDispatcher>,
        notifier: Arc<dyn BillingNotifier>,
    ) -> Self {
        Self {
            ledger,
            store,
            dispatcher,
            notifier,
        }
    }

    pub async fn process(&self, event: &StripeEvent) -> Result<WebhookResult, WebhookError> {
        if self.ledger.has_processed(&event.id).await? {
            tracing::info!(event_id = %event.id, event_type = %event.event_type, "Duplicate webhook event, skipping");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        tracing::info!(
            event_id = %event.id,
            event_type = %event.event_type,
            livemode = event.livemode,
            "Processing webhook event"
        );

        let outcome = match self.dispatcher.dispatch(event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    event_id = %event.id,
                    event_type = %event.event_type,
                    retryable = e.is_retryable(),
                    error = %e,
                    "Webhook handler failed, event left unrecorded"
                );
                return Err(e);
            }
        };

        let payload = serde_json::to_value(event)
            .map_err(|e| WebhookError::Processing(format!("Failed to serialize event: {}", e)))?;
        let record = ProcessedEvent::new(&event.id, &event.event_type, payload);

        let (committed, notice) = match outcome {
            EventOutcome::Reconcile { write, notice } => {
                let applied = self.store.apply(&write, Some(&record)).await?;
                if applied == ApplyResult::Applied {
                    tracing::info!(
                        event_id = %event.id,
                        tenant_id = %write.subscription.tenant_id,
                        status = %write.subscription.status,
                        access = %write.access,
                        "Reconciled subscription from webhook"
                    );
                }
                (applied == ApplyResult::Applied, notice)
            }
            EventOutcome::Notify(notice) => (self.mark(&record).await?, Some(notice)),
            EventOutcome::NoChange(reason) => {
                tracing::debug!(event_id = %event.id, reason = %reason, "Webhook event needs no state change");
                (self.mark(&record).await?, None)
            }
        };

        if !committed {
            tracing::info!(event_id = %event.id, "Webhook event committed by a concurrent delivery");
            return Ok(WebhookResult::AlreadyProcessed);
        }

        if let Some(notice) = notice {
            self.send(event, &notice).await;
        }
        Ok(WebhookResult::Processed)
    }

    async fn mark(&self, record: &ProcessedEvent) -> Result<bool, WebhookError> {
        Ok(self.ledger.mark_processed(record).await? == MarkResult::Inserted)
    }

    async fn send(&self, event: &StripeEvent, notice: &BillingNotice) {
        if let Err(e) = notice.deliver(self.notifier.as_ref()).await {
            tracing::warn!(
                event_id = %event.id,
                tenant_id = %notice.tenant_id(),
                error = %e,
                "Billing notice could not be delivered"
            );
        }
    }
}
