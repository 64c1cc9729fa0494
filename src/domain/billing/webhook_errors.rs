//! Webhook error types for Stripe webhook handling.
//!
//! Status codes are the gateway's only feedback channel: 2xx acknowledges,
//! 4xx tells it the delivery is unusable, 5xx asks it to retry later.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::PaymentError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Stripe-Signature header was not sent.
    #[error("Missing signature header")]
    MissingSignature,

    /// Webhook signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signed timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signed timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// Signature header or verified envelope could not be parsed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A trusted event whose object could not be applied: undecodable
    /// `data.object` or values outside what the datastore can hold.
    #[error("Processing error: {0}")]
    Processing(String),

    /// Gateway call made while handling the event failed.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Datastore operation failed.
    #[error("Database error: {0}")]
    Database(String),
}

impl WebhookError {
    /// True for errors raised while authenticating the delivery.
    pub fn is_signature_error(&self) -> bool {
        matches!(
            self,
            WebhookError::MissingSignature
                | WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
        )
    }

    /// The delivery itself was rejected before any event was trusted.
    fn is_rejected_delivery(&self) -> bool {
        self.is_signature_error() || matches!(self, WebhookError::ParseError(_))
    }

    /// Returns true if Stripe should retry delivering this webhook.
    pub fn is_retryable(&self) -> bool {
        !self.is_rejected_delivery()
    }

    /// 400 for a rejected delivery, 500 for anything that failed after verification.
    pub fn status_code(&self) -> StatusCode {
        if self.is_rejected_delivery() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<DomainError> for WebhookError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => WebhookError::Processing(err.message),
            _ => WebhookError::Database(err.to_string()),
        }
    }
}

impl From<PaymentError> for WebhookError {
    fn from(err: PaymentError) -> Self {
        WebhookError::Gateway(err.to_string())
    }
}
