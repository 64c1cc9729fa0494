//! Billing notifier that only logs.
//!
//! Emails are sent by an external service that tails these log lines.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::ports::BillingNotifier;

#[derive(Debug, Default, Clone, Copy)]
pub struct LogBillingNotifier;

#[async_trait]
impl BillingNotifier for LogBillingNotifier {
    async fn trial_ending(
        &self,
        tenant_id: &TenantId,
        trial_end: Option<Timestamp>,
    ) -> Result<(), DomainError> {
        tracing::info!(
            tenant_id = %tenant_id,
            trial_end = ?trial_end.map(|t| t.as_datetime().to_rfc3339()),
            notice = "trial_ending",
            "Billing notice"
        );
        Ok(())
    }

    async fn payment_failed(&self, tenant_id: &TenantId, invoice_id: &str) -> Result<(), DomainError> {
        tracing::info!(
            tenant_id = %tenant_id,
            invoice = %invoice_id,
            notice = "payment_failed",
            "Billing notice"
        );
        Ok(())
    }
}
