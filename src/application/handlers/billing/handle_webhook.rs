//! HandleWebhookHandler - Verifies a gateway delivery and hands it to the processor.

use std::sync::Arc;

use crate::domain::billing::{
    IdempotentWebhookProcessor, StripeWebhookVerifier, WebhookError, WebhookResult,
};

/// One webhook delivery, exactly as received.
#[derive(Debug, Clone)]
pub struct HandleWebhookCommand {
    /// Raw request body; the signature covers these exact bytes.
    pub payload: Vec<u8>,
    /// `Stripe-Signature` header value, if the request carried one.
    pub signature: Option<String>,
}

pub struct HandleWebhookHandler {
    verifier: StripeWebhookVerifier,
    processor: Arc<IdempotentWebhookProcessor>,
}

impl HandleWebhookHandler {
    pub fn new(verifier: StripeWebhookVerifier, processor: Arc<IdempotentWebhookProcessor>) -> Self {
        Self {
            verifier,
            processor,
        }
    }

    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<WebhookResult, WebhookError> {
        let signature = cmd.signature.ok_or(WebhookError::MissingSignature)?;

        let event = match self.verifier.verify_and_parse(&cmd.payload, &signature) {
            Ok(event) => event,
            Err(e) if e.is_signature_error() => {
                tracing::warn!(error = %e, payload_bytes = cmd.payload.len(), "Rejected webhook signature");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(error = %e, payload_bytes = cmd.payload.len(), "Rejected unreadable webhook delivery");
                return Err(e);
            }
        };

        self.processor.process(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryBillingStore, LogBillingNotifier};
    use crate::adapters::stripe::MockPaymentGateway;
    use crate::domain::billing::{test_price_table, EventRouter, SubscriptionReconciler};
    use secrecy::SecretString;
    use serde_json::json;

    const SECRET: &str = "whsec_test_secret";

    fn handler(store: &Arc<InMemoryBillingStore>) -> HandleWebhookHandler {
        let reconciler = Arc::new(SubscriptionReconciler::new(
            store.clone(),
            store.clone(),
            test_price_table(),
        ));
        let router = EventRouter::standard(reconciler, Arc::new(MockPaymentGateway::new()));
        let processor = IdempotentWebhookProcessor::new(
            store.clone(),
            store.clone(),
            Arc::new(router),
            Arc::new(LogBillingNotifier),
        );
        HandleWebhookHandler::new(verifier(), Arc::new(processor))
    }

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(SECRET.to_string()))
    }

    fn payload() -> Vec<u8> {
        serde_json::to_vec(&json!({
            "id": "evt_ping",
            "type": "charge.refunded",
            "created": 1_700_000_000,
            "data": { "object": {} },
            "livemode": false
        }))
        .unwrap()
    }

    fn signed(payload: &[u8]) -> String {
        verifier()
            .signature_header(chrono::Utc::now().timestamp(), payload)
            .unwrap()
    }

    #[tokio::test]
    async fn signed_delivery_is_processed_and_recorded() {
        let store = Arc::new(InMemoryBillingStore::new());
        let body = payload();

        let result = handler(&store)
            .handle(HandleWebhookCommand {
                signature: Some(signed(&body)),
                payload: body,
            })
            .await
            .unwrap();

        assert_eq!(result, WebhookResult::Processed);
        assert!(store.processed_event("evt_ping").is_some());
    }

    #[tokio::test]
    async fn verified_event_with_undecodable_object_fails_as_server_error() {
        let store = Arc::new(InMemoryBillingStore::new());
        let body = serde_json::to_vec(&json!({
            "id": "evt_bad_object",
            "type": "customer.subscription.updated",
            "created": 1_700_000_000,
            "data": { "object": { "id": 5 } },
            "livemode": false
        }))
        .unwrap();

        let err = handler(&store)
            .handle(HandleWebhookCommand {
                signature: Some(signed(&body)),
                payload: body,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::Processing(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.processed_event("evt_bad_object").is_none());
    }

    #[tokio::test]
    async fn missing_signature_is_rejected() {
        let store = Arc::new(InMemoryBillingStore::new());

        let err = handler(&store)
            .handle(HandleWebhookCommand {
                payload: payload(),
                signature: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::MissingSignature));
        assert_eq!(store.processed_count(), 0);
    }

    #[tokio::test]
    async fn tampered_body_is_rejected_before_processing() {
        let store = Arc::new(InMemoryBillingStore::new());
        let body = payload();
        let signature = signed(&body);
        let mut tampered = body.clone();
        tampered.extend_from_slice(b" ");

        let err = handler(&store)
            .handle(HandleWebhookCommand {
                payload: tampered,
                signature: Some(signature),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert_eq!(store.processed_count(), 0);
    }
}
