use serde::{Deserialize, Serialize};

/// Lifecycle state of a payment record.
///
/// A record starts as `pending`, moves to `verified` once the provider
/// confirms the payment, or to `failed` when the provider reports a
/// terminal failure. Credits are only ever applied to `verified` records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Verified => "verified",
            PaymentStatus::Failed => "failed",
        }
    }

    /// Whether the payment has been confirmed by the provider.
    pub fn is_verified(&self) -> bool {
        matches!(self, PaymentStatus::Verified)
    }

    /// Whether the record may still transition. `verified` is terminal;
    /// `failed` may be retried into `verified` if the provider later
    /// confirms (transient provider-side delays).
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Verified)
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        PaymentStatus::Pending
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "verified" => Ok(PaymentStatus::Verified),
            "failed" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_checks() {
        assert!(PaymentStatus::Verified.is_verified());
        assert!(!PaymentStatus::Pending.is_verified());
        assert!(!PaymentStatus::Failed.is_verified());

        assert!(PaymentStatus::Verified.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(!PaymentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_from_str() {
        assert_eq!(
            "pending".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Pending
        );
        assert_eq!(
            "VERIFIED".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Verified
        );
        assert_eq!(
            "failed".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Failed
        );
        assert!("paid".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_display_matches_as_str() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Verified,
            PaymentStatus::Failed,
        ] {
            assert_eq!(format!("{}", status), status.as_str());
        }
    }
}
