//! Factories for test fixtures.

use uuid::Uuid;

use crate::{
    application::use_cases::payments::ConfirmPaymentInput,
    domain::entities::{
        billing_cycle::BillingCycle, payment_method::PaymentMethod,
        payment_record::PaymentRecord, payment_status::PaymentStatus,
    },
};

/// A pending record as persisted at order initiation.
pub fn pending_record(reference_id: &str, user_email: &str, plan_id: &str) -> PaymentRecord {
    PaymentRecord {
        id: Uuid::new_v4(),
        reference_id: reference_id.to_string(),
        user_email: user_email.to_string(),
        user_id: None,
        method: PaymentMethod::Stripe,
        plan_id: plan_id.to_string(),
        billing_cycle: BillingCycle::Monthly,
        amount_cents: 1500,
        currency: "usd".to_string(),
        status: PaymentStatus::Pending,
        credits_applied: false,
        provider_transaction_id: None,
        created_at: Some(chrono::Utc::now().naive_utc()),
        updated_at: Some(chrono::Utc::now().naive_utc()),
    }
}

/// A minimal confirm request. Empty strings become absent fields.
pub fn confirm_input(reference_id: &str, user_email: &str, plan_id: &str) -> ConfirmPaymentInput {
    ConfirmPaymentInput {
        reference_id: (!reference_id.is_empty()).then(|| reference_id.to_string()),
        user_email: (!user_email.is_empty()).then(|| user_email.to_string()),
        plan_id: (!plan_id.is_empty()).then(|| plan_id.to_string()),
        ..Default::default()
    }
}
