use async_trait::async_trait;
use serde::Serialize;

use crate::{app_error::AppResult, domain::entities::payment_method::PaymentMethod};

/// Provider-side answer to "was this payment completed?".
#[derive(Debug, Clone, Serialize)]
pub struct ProviderVerification {
    pub success: bool,
    /// Provider transaction id, when the provider reports one distinct
    /// from the reference we asked about.
    pub transaction_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
}

impl ProviderVerification {
    pub fn failed() -> Self {
        Self {
            success: false,
            transaction_id: None,
            amount_cents: None,
            currency: None,
        }
    }
}

/// Raw order state as reported by a provider's query endpoint
/// (WeChat `trade_state` and friends).
#[derive(Debug, Clone, Serialize)]
pub struct ProviderOrder {
    pub reference_id: String,
    pub trade_state: String,
    pub transaction_id: Option<String>,
    pub amount_cents: Option<i64>,
}

/// Payment verifier port - abstracts a provider's server-side
/// verify/query capability.
///
/// One implementation per provider; the verifier factory picks the right
/// one for the deployment region. Implementations must be fail-closed:
/// any ambiguity (timeout, unexpected payload) is "not verified", never a
/// speculative success.
impl std::fmt::Debug for dyn PaymentVerifierPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentVerifierPort")
            .field("method", &self.method())
            .finish()
    }
}

#[async_trait]
pub trait PaymentVerifierPort: Send + Sync {
    /// The provider rail this verifier talks to.
    fn method(&self) -> PaymentMethod;

    /// Verify a payment by its provider reference (session id,
    /// out-trade-no, trade no).
    async fn verify(&self, reference_id: &str) -> AppResult<ProviderVerification>;

    /// Query raw order state by merchant order number. Only some
    /// providers expose this; the default is "unsupported".
    async fn query_order(&self, _out_trade_no: &str) -> AppResult<Option<ProviderOrder>> {
        Ok(None)
    }
}
