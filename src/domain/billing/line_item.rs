//! Priced line items for a subscription order.
//!
//! An order is always one plan charge plus, when seats were requested, one
//! extra-seat charge. Each item carries its role in gateway metadata so later
//! events can be read back without guessing from price identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::subscription::{BillingCycle, PlanType};
use crate::domain::foundation::ValidationError;

/// Metadata key under which a line item's role is stored at the gateway.
pub const ROLE_METADATA_KEY: &str = "role";

/// What a line item pays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemRole {
    Plan,
    ExtraSeat,
}

impl LineItemRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineItemRole::Plan => "plan",
            LineItemRole::ExtraSeat => "extra_seat",
        }
    }
}

impl fmt::Display for LineItemRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineItemRole {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan" => Ok(LineItemRole::Plan),
            "extra_seat" => Ok(LineItemRole::ExtraSeat),
            other => Err(ValidationError::unknown_variant(ROLE_METADATA_KEY, other)),
        }
    }
}

/// Static price table, one gateway price per plan and cycle plus a seat add-on per cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceTable {
    pub standard_monthly: String,
    pub standard_yearly: String,
    pub premium_monthly: String,
    pub premium_yearly: String,
    pub extra_seat_monthly: String,
    pub extra_seat_yearly: String,
}

impl PriceTable {
    pub fn plan_price(&self, plan: PlanType, cycle: BillingCycle) -> &str {
        match (plan, cycle) {
            (PlanType::Standard, BillingCycle::Monthly) => &self.standard_monthly,
            (PlanType::Standard, BillingCycle::Yearly) => &self.standard_yearly,
            (PlanType::Premium, BillingCycle::Monthly) => &self.premium_monthly,
            (PlanType::Premium, BillingCycle::Yearly) => &self.premium_yearly,
        }
    }

    pub fn seat_price(&self, cycle: BillingCycle) -> &str {
        match cycle {
            BillingCycle::Monthly => &self.extra_seat_monthly,
            BillingCycle::Yearly => &self.extra_seat_yearly,
        }
    }

    /// Exact match against the configured seat prices.
    ///
    /// Only consulted for line items that carry no role tag.
    pub fn is_seat_price(&self, price_id: &str) -> bool {
        price_id == self.extra_seat_monthly || price_id == self.extra_seat_yearly
    }
}

/// A single priced line in a subscription order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineItem {
    PlanCharge { price_id: String },
    ExtraSeatCharge { price_id: String, quantity: u32 },
}

impl LineItem {
    /// Builds the order for a plan, cycle and seat count.
    pub fn build_order(
        prices: &PriceTable,
        plan: PlanType,
        cycle: BillingCycle,
        extra_seats: u32,
    ) -> Vec<LineItem> {
        let mut items = vec![LineItem::PlanCharge {
            price_id: prices.plan_price(plan, cycle).to_string(),
        }];
        if extra_seats > 0 {
            items.push(LineItem::ExtraSeatCharge {
                price_id: prices.seat_price(cycle).to_string(),
                quantity: extra_seats,
            });
        }
        items
    }

    pub fn price_id(&self) -> &str {
        match self {
            LineItem::PlanCharge { price_id } | LineItem::ExtraSeatCharge { price_id, .. } => {
                price_id
            }
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            LineItem::PlanCharge { .. } => 1,
            LineItem::ExtraSeatCharge { quantity, .. } => *quantity,
        }
    }

    pub fn role(&self) -> LineItemRole {
        match self {
            LineItem::PlanCharge { .. } => LineItemRole::Plan,
            LineItem::ExtraSeatCharge { .. } => LineItemRole::ExtraSeat,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_price_table() -> PriceTable {
    PriceTable {
        standard_monthly: "price_std_m".to_string(),
        standard_yearly: "price_std_y".to_string(),
        premium_monthly: "price_prem_m".to_string(),
        premium_yearly: "price_prem_y".to_string(),
        extra_seat_monthly: "price_seat_m".to_string(),
        extra_seat_yearly: "price_seat_y".to_string(),
    }
}
