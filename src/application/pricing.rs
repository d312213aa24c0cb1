//! Static pricing table: plan lookup and credit-grant computation.

use crate::domain::entities::{billing_cycle::BillingCycle, plan::MembershipPlan};

/// The platform's membership plans. Prices are USD cents; CN rails charge
/// the CNY equivalent at order creation, the grant is currency-independent.
pub const MEMBERSHIP_PLANS: &[MembershipPlan] = &[
    MembershipPlan {
        id: "basic",
        name: "Basic",
        tier: "basic",
        monthly_price_cents: 500,
        yearly_price_cents: 4800,
        credits_per_month: 300,
        yearly_credits: None,
    },
    MembershipPlan {
        id: "pro",
        name: "Pro",
        tier: "pro",
        monthly_price_cents: 1500,
        yearly_price_cents: 14400,
        credits_per_month: 900,
        yearly_credits: None,
    },
    MembershipPlan {
        id: "business",
        name: "Business",
        tier: "business",
        monthly_price_cents: 4500,
        yearly_price_cents: 43200,
        credits_per_month: 2800,
        yearly_credits: None,
    },
];

/// Plan lookup + grant resolution over a set of membership plans.
///
/// Injected into the confirm workflow so tests can substitute their own
/// table (including deliberately broken entries).
#[derive(Clone)]
pub struct PricingTable {
    plans: &'static [MembershipPlan],
}

impl PricingTable {
    pub fn new(plans: &'static [MembershipPlan]) -> Self {
        Self { plans }
    }

    pub fn plan_by_id(&self, plan_id: &str) -> Option<&MembershipPlan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    pub fn plans(&self) -> &'static [MembershipPlan] {
        self.plans
    }

    /// Credits granted for a plan and billing cycle. Canonical rule:
    /// yearly = 12 x monthly unless the plan carries an explicit yearly
    /// grant.
    pub fn credits_for(&self, plan: &MembershipPlan, cycle: BillingCycle) -> i64 {
        match cycle {
            BillingCycle::Monthly => plan.credits_per_month,
            BillingCycle::Yearly => plan
                .yearly_credits
                .unwrap_or(plan.credits_per_month * 12),
        }
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new(MEMBERSHIP_PLANS)
    }
}
