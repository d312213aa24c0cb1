//! Region-gated selection of the payment verifier for a provider rail.

use std::sync::Arc;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_verifier::PaymentVerifierPort,
    domain::entities::{payment_method::PaymentMethod, region::Region},
    infra::config::{AlipaySettings, StripeSettings, WechatSettings},
    infra::{
        alipay_sandbox_client::AlipaySandboxClient, stripe_client::StripeClient,
        stripe_verifier::StripeVerifier, wechat_client::WechatPayClient,
    },
};

/// Builds the verifier for a payment method, enforcing the deployment
/// region split: card rails on the international deployment, WeChat and
/// Alipay on the China deployment. A method outside its region is
/// rejected before any credential check, so the caller can tell
/// "wrong deployment" apart from "not configured".
pub struct VerifierFactory {
    region: Region,
    stripe: Option<StripeSettings>,
    wechat: Option<WechatSettings>,
    alipay: Option<AlipaySettings>,
    #[cfg(test)]
    test_verifier_override: Option<Arc<dyn PaymentVerifierPort>>,
}

impl VerifierFactory {
    pub fn new(
        region: Region,
        stripe: Option<StripeSettings>,
        wechat: Option<WechatSettings>,
        alipay: Option<AlipaySettings>,
    ) -> Self {
        Self {
            region,
            stripe,
            wechat,
            alipay,
            #[cfg(test)]
            test_verifier_override: None,
        }
    }

    /// Factory with no provider credentials at all.
    pub fn disconnected(region: Region) -> Self {
        Self::new(region, None, None, None)
    }

    #[cfg(test)]
    pub fn with_verifier_override(mut self, verifier: Arc<dyn PaymentVerifierPort>) -> Self {
        self.test_verifier_override = Some(verifier);
        self
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn get(&self, method: PaymentMethod) -> AppResult<Arc<dyn PaymentVerifierPort>> {
        #[cfg(test)]
        if let Some(verifier) = &self.test_verifier_override {
            return Ok(verifier.clone());
        }

        if !method.supports_region(self.region) {
            tracing::warn!(
                method = %method,
                region = %self.region,
                "Payment method requested outside its deployment region"
            );
            return Err(AppError::ProviderNotSupported);
        }

        match method {
            PaymentMethod::Stripe => {
                let settings = self
                    .stripe
                    .clone()
                    .ok_or(AppError::ProviderNotConfigured)?;
                Ok(Arc::new(StripeVerifier::new(StripeClient::new(settings))))
            }
            PaymentMethod::WechatNative => {
                let settings = self
                    .wechat
                    .clone()
                    .ok_or(AppError::ProviderNotConfigured)?;
                Ok(Arc::new(WechatPayClient::new(settings)))
            }
            PaymentMethod::Alipay => {
                let settings = self
                    .alipay
                    .clone()
                    .ok_or(AppError::ProviderNotConfigured)?;
                Ok(Arc::new(AlipaySandboxClient::new(settings)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stripe_is_rejected_on_cn_deployment() {
        let factory = VerifierFactory::disconnected(Region::Cn);
        let err = factory.get(PaymentMethod::Stripe).unwrap_err();
        assert!(matches!(err, AppError::ProviderNotSupported));
    }

    #[test]
    fn wechat_is_rejected_on_intl_deployment() {
        let factory = VerifierFactory::disconnected(Region::Intl);
        let err = factory.get(PaymentMethod::WechatNative).unwrap_err();
        assert!(matches!(err, AppError::ProviderNotSupported));
        let err = factory.get(PaymentMethod::Alipay).unwrap_err();
        assert!(matches!(err, AppError::ProviderNotSupported));
    }

    #[test]
    fn region_match_without_credentials_is_not_configured() {
        let factory = VerifierFactory::disconnected(Region::Intl);
        let err = factory.get(PaymentMethod::Stripe).unwrap_err();
        assert!(matches!(err, AppError::ProviderNotConfigured));

        let factory = VerifierFactory::disconnected(Region::Cn);
        let err = factory.get(PaymentMethod::WechatNative).unwrap_err();
        assert!(matches!(err, AppError::ProviderNotConfigured));
    }
}
