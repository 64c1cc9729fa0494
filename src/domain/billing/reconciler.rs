//! Subscription reconciler.
//!
//! Re-derives a tenant's full billing state from the gateway's current view of
//! a subscription. Nothing here is an incremental diff, so stale or reordered
//! events converge on the same result as long as the input is fresh.
//!
//! The reconciler only plans. The returned [`ReconciliationWrite`] is persisted
//! by a [`ReconciliationStore`](crate::ports::ReconciliationStore), usually
//! together with the ledger entry of the event that triggered it.

use std::sync::Arc;

use super::line_item::PriceTable;
use super::status_mapper::{map_gateway_status, StatusMapping};
use super::stripe_event::GatewaySubscription;
use super::subscription::{BillingCycle, PlanType, Subscription, SubscriptionStatus};
use super::tenant::AccessStatus;
use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::ports::{ReconciliationWrite, SubscriptionRepository, TenantRepository};

/// Metadata keys written on gateway subscriptions at creation time.
pub const PLAN_METADATA_KEY: &str = "plan_type";
pub const CYCLE_METADATA_KEY: &str = "billing_cycle";

/// What the reconciler decided for one gateway subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    Write(ReconciliationWrite),
    Skip(SkipReason),
}

/// Why no local state was touched. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The subscription carries no usable tenant reference.
    MissingTenantMetadata { external_ref: String },
    /// The tenant reference names no local tenant.
    UnknownTenant(TenantId),
    /// The tenant's live record belongs to a different gateway subscription.
    Superseded {
        tenant_id: TenantId,
        external_ref: String,
    },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingTenantMetadata { external_ref } => {
                write!(f, "subscription {} has no tenant metadata", external_ref)
            }
            SkipReason::UnknownTenant(id) => write!(f, "tenant {} does not exist", id),
            SkipReason::Superseded {
                tenant_id,
                external_ref,
            } => write!(
                f,
                "subscription {} is superseded for tenant {}",
                external_ref, tenant_id
            ),
        }
    }
}

/// Forced outcome applied on top of the regular mapping.
#[derive(Debug, Clone, Copy)]
enum Override {
    None,
    Canceled,
    PaymentFailed,
}

pub struct SubscriptionReconciler {
    tenants: Arc<dyn TenantRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    prices: PriceTable,
}

impl SubscriptionReconciler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        prices: PriceTable,
    ) -> Self {
        Self {
            tenants,
            subscriptions,
            prices,
        }
    }

    /// Regular path: subscription created or updated, invoice paid.
    pub async fn plan_sync(
        &self,
        gateway: &GatewaySubscription,
    ) -> Result<Reconciliation, DomainError> {
        self.plan(gateway, Override::None).await
    }

    /// Subscription deleted at the gateway: canceled and suspended, whatever the payload says.
    pub async fn plan_cancellation(
        &self,
        gateway: &GatewaySubscription,
    ) -> Result<Reconciliation, DomainError> {
        self.plan(gateway, Override::Canceled).await
    }

    /// Payment failed: suspend immediately and mark past due.
    ///
    /// A subscription the gateway already reports as canceled stays canceled.
    pub async fn plan_payment_failure(
        &self,
        gateway: &GatewaySubscription,
    ) -> Result<Reconciliation, DomainError> {
        self.plan(gateway, Override::PaymentFailed).await
    }

    async fn plan(
        &self,
        gateway: &GatewaySubscription,
        forced: Override,
    ) -> Result<Reconciliation, DomainError> {
        let Some(tenant_id) = gateway.tenant_id() else {
            tracing::warn!(
                subscription = %gateway.id,
                "Gateway subscription has no tenant metadata, nothing to reconcile"
            );
            return Ok(Reconciliation::Skip(SkipReason::MissingTenantMetadata {
                external_ref: gateway.id.clone(),
            }));
        };

        let Some(tenant) = self.tenants.find_by_id(&tenant_id).await? else {
            tracing::warn!(
                tenant_id = %tenant_id,
                subscription = %gateway.id,
                "Gateway subscription references an unknown tenant"
            );
            return Ok(Reconciliation::Skip(SkipReason::UnknownTenant(tenant_id)));
        };

        let mapping = apply_override(map_gateway_status(&gateway.status), forced);

        let current = self.subscriptions.find_current_by_tenant(&tenant_id).await?;
        let mut record = match current {
            Some(row) if row.external_ref.as_deref() == Some(gateway.id.as_str()) => row,
            // Provisioning created the row but never stored the gateway reference.
            Some(row) if row.external_ref.is_none() && !row.status.is_terminal() => row,
            Some(row) if !row.status.is_terminal() => {
                tracing::info!(
                    tenant_id = %tenant_id,
                    subscription = %gateway.id,
                    live_subscription = ?row.external_ref,
                    "Ignoring event for a subscription that is no longer the tenant's live one"
                );
                return Ok(Reconciliation::Skip(SkipReason::Superseded {
                    tenant_id,
                    external_ref: gateway.id.clone(),
                }));
            }
            _ => {
                if self
                    .subscriptions
                    .find_by_external_ref(&gateway.id)
                    .await?
                    .is_some()
                {
                    return Ok(Reconciliation::Skip(SkipReason::Superseded {
                        tenant_id,
                        external_ref: gateway.id.clone(),
                    }));
                }
                tracing::info!(
                    tenant_id = %tenant_id,
                    subscription = %gateway.id,
                    "No local subscription record, creating one from gateway state"
                );
                Subscription::new(
                    tenant_id,
                    gateway.customer.clone(),
                    PlanType::Standard,
                    BillingCycle::Monthly,
                    0,
                )
            }
        };

        let now = Timestamp::now();
        record.external_ref = Some(gateway.id.clone());
        record.customer_ref = gateway.customer.clone();
        record.extra_seats = gateway.extra_seat_count(&self.prices).ok_or_else(|| {
            DomainError::validation(
                "extra_seats",
                format!("Subscription {} carries more extra seats than can be stored", gateway.id),
            )
        })?;
        if let Some(plan) = metadata_value(gateway, PLAN_METADATA_KEY) {
            record.plan = plan;
        }
        if let Some(cycle) = metadata_value(gateway, CYCLE_METADATA_KEY) {
            record.cycle = cycle;
        }
        if let Some(end) = gateway.current_period_end.and_then(Timestamp::from_unix_secs) {
            record.current_period_end = Some(end);
        }
        record.transition_to(mapping.status, now);

        let access = tenant.effective_access(mapping.access);

        tracing::debug!(
            tenant_id = %tenant_id,
            subscription = %gateway.id,
            gateway_status = %gateway.status,
            status = %record.status,
            access = %access,
            "Planned reconciliation"
        );

        Ok(Reconciliation::Write(ReconciliationWrite {
            subscription: record,
            access,
        }))
    }
}

fn apply_override(mapping: StatusMapping, forced: Override) -> StatusMapping {
    match forced {
        Override::None => mapping,
        Override::Canceled => StatusMapping {
            status: SubscriptionStatus::Canceled,
            access: AccessStatus::Suspended,
        },
        Override::PaymentFailed => StatusMapping {
            status: if mapping.status.is_terminal() {
                mapping.status
            } else {
                SubscriptionStatus::PastDue
            },
            access: AccessStatus::Suspended,
        },
    }
}

fn metadata_value<T: std::str::FromStr>(gateway: &GatewaySubscription, key: &str) -> Option<T> {
    gateway.metadata.get(key).and_then(|v| v.parse().ok())
}
