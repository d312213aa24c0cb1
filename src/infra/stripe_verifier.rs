use async_trait::async_trait;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_verifier::{PaymentVerifierPort, ProviderVerification},
    domain::entities::payment_method::PaymentMethod,
    infra::stripe_client::StripeClient,
};

/// Verifies Stripe payments by retrieving the checkout session and
/// checking its `payment_status`.
pub struct StripeVerifier {
    client: StripeClient,
}

impl StripeVerifier {
    pub fn new(client: StripeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentVerifierPort for StripeVerifier {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    async fn verify(&self, reference_id: &str) -> AppResult<ProviderVerification> {
        let session = match self.client.get_checkout_session(reference_id).await {
            Ok(session) => session,
            // Stripe rejects unknown or malformed session ids with a
            // request error. That is "not verified", not an outage.
            Err(AppError::InvalidInput(msg)) => {
                tracing::warn!(reference_id = %reference_id, error = %msg, "Stripe session lookup rejected");
                return Ok(ProviderVerification::failed());
            }
            Err(err) => return Err(err),
        };

        if session.payment_status != "paid" {
            tracing::info!(
                reference_id = %reference_id,
                payment_status = %session.payment_status,
                "Stripe session not paid"
            );
            return Ok(ProviderVerification::failed());
        }

        Ok(ProviderVerification {
            success: true,
            transaction_id: session.payment_intent,
            amount_cents: session.amount_total,
            currency: session.currency,
        })
    }
}
