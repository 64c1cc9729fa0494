//! Stripe webhook event envelope and the gateway objects we read out of it.
//!
//! Only fields relevant to reconciliation are captured; everything else Stripe
//! sends is ignored by serde.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::line_item::{LineItemRole, PriceTable, ROLE_METADATA_KEY};
use super::subscription::MAX_EXTRA_SEATS;
use crate::domain::foundation::TenantId;

/// Metadata key carrying the tenant reference on gateway customers and subscriptions.
pub const TENANT_METADATA_KEY: &str = "tenant_id";

/// Envelope of every webhook delivery.
///
/// The raw value of `type` is kept so unknown types can be logged and recorded
/// in the ledger as sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// `evt_...`; the idempotency key for the whole pipeline.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: StripeEventData,
    /// Logged, never enforced.
    #[serde(default)]
    pub livemode: bool,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// Subscription, invoice or anything else, depending on `type`.
    pub object: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl StripeEvent {
    /// Reads `data.object` as `T`.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data.object)
    }

    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }
}

/// Stripe event types the router knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripeEventType {
    CustomerSubscriptionCreated,
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    CustomerSubscriptionTrialWillEnd,
    InvoicePaid,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    /// Anything else Stripe may send now or in the future.
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "customer.subscription.trial_will_end" => Self::CustomerSubscriptionTrialWillEnd,
            "invoice.paid" => Self::InvoicePaid,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    /// Wire name; `Unknown` has none and reports `"unknown"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerSubscriptionCreated => "customer.subscription.created",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::CustomerSubscriptionTrialWillEnd => "customer.subscription.trial_will_end",
            Self::InvoicePaid => "invoice.paid",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

/// A Stripe subscription object, as embedded in events or fetched from the API.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewaySubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    #[serde(default)]
    pub items: GatewayItemList,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub trial_end: Option<i64>,
    /// Only present when the API call expanded `latest_invoice.payment_intent`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_invoice: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GatewayItemList {
    #[serde(default)]
    pub data: Vec<GatewayItem>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayItem {
    #[serde(default)]
    pub id: String,
    pub price: GatewayPrice,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayPrice {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GatewayItem {
    /// Role from item metadata, falling back to price metadata.
    pub fn role(&self) -> Option<LineItemRole> {
        self.metadata
            .get(ROLE_METADATA_KEY)
            .or_else(|| self.price.metadata.get(ROLE_METADATA_KEY))
            .and_then(|r| r.parse().ok())
    }
}

impl GatewaySubscription {
    /// Tenant reference from metadata. `None` when absent or not a valid id.
    pub fn tenant_id(&self) -> Option<TenantId> {
        self.metadata
            .get(TENANT_METADATA_KEY)
            .and_then(|raw| raw.parse().ok())
    }

    /// Sums the quantity of extra-seat line items.
    ///
    /// Items tagged with a role are classified by the tag alone. Untagged items
    /// count as seats only when their price is one of the configured seat prices.
    /// `None` when the total exceeds [`MAX_EXTRA_SEATS`].
    pub fn extra_seat_count(&self, prices: &PriceTable) -> Option<u32> {
        self.items
            .data
            .iter()
            .filter(|item| match item.role() {
                Some(role) => role == LineItemRole::ExtraSeat,
                None => prices.is_seat_price(&item.price.id),
            })
            .try_fold(0u32, |total, item| {
                total.checked_add(item.quantity.unwrap_or(1))
            })
            .filter(|total| *total <= MAX_EXTRA_SEATS)
    }

    /// Client secret of the first payment intent, when the API expanded it.
    pub fn client_secret(&self) -> Option<String> {
        self.latest_invoice
            .as_ref()?
            .get("payment_intent")?
            .get("client_secret")?
            .as_str()
            .map(str::to_string)
    }
}

/// A Stripe invoice, reduced to the references needed to re-fetch its subscription.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GatewayInvoice {
    pub id: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[cfg(test)]
pub(crate) fn test_event(id: &str, event_type: &str, object: serde_json::Value) -> StripeEvent {
    StripeEvent {
        id: id.to_string(),
        event_type: event_type.to_string(),
        created: chrono::Utc::now().timestamp(),
        data: StripeEventData {
            object,
            previous_attributes: None,
        },
        livemode: false,
        api_version: Some("2023-10-16".to_string()),
    }
}
