use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::{
    billing_cycle::BillingCycle, payment_method::PaymentMethod, payment_status::PaymentStatus,
};

/// Persistent record of a payment attempt, keyed by the provider's
/// reference id (Stripe session id, WeChat/Alipay out-trade-no, or a
/// generic transaction id).
///
/// Invariant: `credits_applied` transitions `false -> true` at most once
/// per `reference_id` and is never reset; credits are only applied to
/// records whose status is `verified`. The enforcement point is the
/// conditional claim write in the record repository, not this struct.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub reference_id: String,
    pub user_email: String,
    pub user_id: Option<Uuid>,
    pub method: PaymentMethod,
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub credits_applied: bool,
    /// Provider-side transaction id captured at verification time
    /// (e.g. WeChat `transaction_id`), when it differs from the reference.
    pub provider_transaction_id: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

impl PaymentRecord {
    /// Whether a confirm call for this record is a no-op.
    pub fn is_settled(&self) -> bool {
        self.credits_applied
    }
}
