//! Idempotency ledger port.
//!
//! Stripe delivers events at least once. A row per applied event id turns that
//! into at-most-once application.
//!
//! ## Concurrency
//!
//! `has_processed` is only a fast path. Two deliveries of the same event can both
//! see `false`; the unique constraint on `event_id` decides the winner, and the
//! loser gets `MarkResult::AlreadyExists`.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Ledger entry for one applied event. Never updated or deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedEvent {
    /// Stripe event ID (evt_xxx format).
    pub event_id: String,

    /// Stripe event type string.
    pub event_type: String,

    /// The verified event body.
    pub payload: serde_json::Value,

    pub processed_at: Timestamp,
}

impl ProcessedEvent {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            payload,
            processed_at: Timestamp::now(),
        }
    }
}

/// Result of inserting a ledger row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkResult {
    /// This caller recorded the event.
    Inserted,
    /// Another delivery recorded it first.
    AlreadyExists,
}

#[async_trait]
pub trait ProcessedEventLedger: Send + Sync {
    async fn has_processed(&self, event_id: &str) -> Result<bool, DomainError>;

    /// Record an event whose side effects are already durable.
    async fn mark_processed(&self, event: &ProcessedEvent) -> Result<MarkResult, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn processed_event_ledger_is_object_safe() {
        fn _accepts_dyn(_ledger: &dyn ProcessedEventLedger) {}
    }

    #[test]
    fn new_entry_keeps_identity() {
        let entry = ProcessedEvent::new("evt_1", "invoice.paid", serde_json::json!({"id": "evt_1"}));
        assert_eq!(entry.event_id, "evt_1");
        assert_eq!(entry.event_type, "invoice.paid");
    }
}
