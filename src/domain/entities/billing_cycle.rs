use serde::{Deserialize, Serialize};

/// Billing cycle for a membership plan purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "billing_cycle", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingCycle::Monthly => "monthly",
            BillingCycle::Yearly => "yearly",
        }
    }

    /// Lenient parse used at the API boundary: anything that is not
    /// exactly "yearly" falls back to monthly, absent values included.
    pub fn from_input(value: Option<&str>) -> Self {
        match value {
            Some(s) if s.eq_ignore_ascii_case("yearly") => BillingCycle::Yearly,
            _ => BillingCycle::Monthly,
        }
    }
}

impl Default for BillingCycle {
    fn default() -> Self {
        BillingCycle::Monthly
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
