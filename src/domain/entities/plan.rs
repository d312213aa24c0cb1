use serde::Serialize;

use super::billing_cycle::BillingCycle;

/// A membership plan from the static pricing table.
#[derive(Debug, Clone, Serialize)]
pub struct MembershipPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub tier: &'static str,
    pub monthly_price_cents: i64,
    pub yearly_price_cents: i64,
    /// Credits granted per month of membership.
    pub credits_per_month: i64,
    /// Explicit yearly grant. When absent, the canonical rule applies:
    /// yearly grant = 12 x the monthly grant.
    pub yearly_credits: Option<i64>,
}

impl MembershipPlan {
    pub fn price_cents(&self, cycle: BillingCycle) -> i64 {
        match cycle {
            BillingCycle::Monthly => self.monthly_price_cents,
            BillingCycle::Yearly => self.yearly_price_cents,
        }
    }
}
