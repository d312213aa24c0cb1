use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::region::Region;

/// Payment method - the provider rail a payment was made through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, AsRefStr, Display,
    EnumString,
)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[derive(Default)]
pub enum PaymentMethod {
    #[default]
    Stripe,
    WechatNative,
    Alipay,
}

impl PaymentMethod {
    /// Human-readable display name for the method
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentMethod::Stripe => "Stripe",
            PaymentMethod::WechatNative => "WeChat Pay Native",
            PaymentMethod::Alipay => "Alipay",
        }
    }

    /// Whether this method is available on the given deployment region.
    /// Stripe is the INTL rail; WeChat Pay and Alipay are CN rails.
    pub fn supports_region(&self, region: Region) -> bool {
        match self {
            PaymentMethod::Stripe => region == Region::Intl,
            PaymentMethod::WechatNative | PaymentMethod::Alipay => region == Region::Cn,
        }
    }

    /// Methods available on a region, in preference order.
    pub fn for_region(region: Region) -> &'static [PaymentMethod] {
        match region {
            Region::Intl => &[PaymentMethod::Stripe],
            Region::Cn => &[PaymentMethod::WechatNative, PaymentMethod::Alipay],
        }
    }

    pub fn all() -> &'static [PaymentMethod] {
        &[
            PaymentMethod::Stripe,
            PaymentMethod::WechatNative,
            PaymentMethod::Alipay,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_support() {
        assert!(PaymentMethod::Stripe.supports_region(Region::Intl));
        assert!(!PaymentMethod::Stripe.supports_region(Region::Cn));
        assert!(PaymentMethod::WechatNative.supports_region(Region::Cn));
        assert!(!PaymentMethod::WechatNative.supports_region(Region::Intl));
        assert!(PaymentMethod::Alipay.supports_region(Region::Cn));
        assert!(!PaymentMethod::Alipay.supports_region(Region::Intl));
    }

    #[test]
    fn test_for_region_agrees_with_supports_region() {
        for region in [Region::Cn, Region::Intl] {
            for method in PaymentMethod::for_region(region) {
                assert!(method.supports_region(region));
            }
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "stripe".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Stripe
        );
        assert_eq!(
            "wechat_native".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::WechatNative
        );
        assert_eq!(
            "ALIPAY".parse::<PaymentMethod>().unwrap(),
            PaymentMethod::Alipay
        );
        assert!("paypal".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_display_matches_as_ref() {
        for method in PaymentMethod::all() {
            assert_eq!(format!("{}", method), method.as_ref());
        }
    }
}
