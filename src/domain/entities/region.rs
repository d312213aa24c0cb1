use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Deployment region. Decides which payment rails are reachable:
/// CN deployments route through WeChat Pay / Alipay, INTL through Stripe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Region {
    Cn,
    Intl,
}

impl Region {
    pub fn is_china(&self) -> bool {
        matches!(self, Region::Cn)
    }

    /// Parse a configured region string, falling back to CN for anything
    /// unrecognized (matches the platform's historical default).
    pub fn from_config(value: &str) -> Self {
        match value.trim().to_uppercase().as_str() {
            "INTL" => Region::Intl,
            _ => Region::Cn,
        }
    }
}
