use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_verifier::{PaymentVerifierPort, ProviderVerification},
    domain::entities::payment_method::PaymentMethod,
    infra::config::AlipaySettings,
};

/// Sandbox Alipay verifier.
///
/// Production Alipay confirmations arrive through signed asynchronous
/// notifications and take the skip-verification confirm path; the only
/// server-initiated verification we perform is against the sandbox,
/// where a trade number is settled iff it carries the sandbox paid
/// marker. Simulates the provider locally without external calls.
#[derive(Clone)]
pub struct AlipaySandboxClient {
    settings: AlipaySettings,
}

impl AlipaySandboxClient {
    pub fn new(settings: AlipaySettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl PaymentVerifierPort for AlipaySandboxClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Alipay
    }

    async fn verify(&self, reference_id: &str) -> AppResult<ProviderVerification> {
        if !self.settings.sandbox {
            return Err(AppError::ProviderNotConfigured);
        }
        if reference_id.ends_with("_paid") {
            return Ok(ProviderVerification {
                success: true,
                transaction_id: Some(format!("sandbox_{reference_id}")),
                amount_cents: None,
                currency: Some("cny".to_string()),
            });
        }
        Ok(ProviderVerification::failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sandbox_paid_marker_verifies() {
        let client = AlipaySandboxClient::new(AlipaySettings { sandbox: true });
        let ok = client.verify("2024_trade_paid").await.unwrap();
        assert!(ok.success);
        let pending = client.verify("2024_trade").await.unwrap();
        assert!(!pending.success);
    }

    #[tokio::test]
    async fn non_sandbox_verification_is_not_configured() {
        let client = AlipaySandboxClient::new(AlipaySettings { sandbox: false });
        let err = client.verify("2024_trade_paid").await.unwrap_err();
        assert!(matches!(err, AppError::ProviderNotConfigured));
    }
}
