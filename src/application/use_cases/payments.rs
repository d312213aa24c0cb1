//! Payment confirmation & credit ledger use cases.
//!
//! The confirm workflow applies a plan's credit grant to a user's balance
//! at most once per payment reference. The at-most-once point is the
//! conditional claim write in [`PaymentRecordRepo::claim_credits`]: it
//! succeeds for exactly one caller per reference, every other caller
//! observes `already_processed`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_verifier::{ProviderOrder, ProviderVerification},
    application::pricing::PricingTable,
    application::use_cases::verifier_factory::VerifierFactory,
    domain::entities::{
        billing_cycle::BillingCycle, payment_method::PaymentMethod, payment_record::PaymentRecord,
    },
};

// ============================================================================
// Input Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentInput {
    pub reference_id: Option<String>,
    /// Stripe checkout session id.
    pub session_id: Option<String>,
    /// WeChat Pay merchant order number.
    pub out_trade_no: Option<String>,
    /// Alipay trade number.
    pub trade_no: Option<String>,
    pub transaction_id: Option<String>,
    pub user_email: Option<String>,
    pub user_id: Option<Uuid>,
    pub plan_id: Option<String>,
    pub billing_cycle: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    /// Escape hatch for trusted webhook call sites that have already
    /// verified the payment (signature-checked notification payloads).
    #[serde(default)]
    pub skip_provider_verification: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentInput {
    pub reference_id: String,
    pub user_email: String,
    pub user_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub plan_id: String,
    pub billing_cycle: Option<String>,
    pub currency: Option<String>,
}

// ============================================================================
// Result Types
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentResult {
    pub success: bool,
    pub already_processed: bool,
    pub credits_to_add: i64,
    pub user_email: String,
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    pub new_balance: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedPaymentRecords {
    pub records: Vec<PaymentRecord>,
    pub total: i64,
    pub page: i32,
    pub per_page: i32,
    pub total_pages: i32,
}

/// Account row in the external user store. This module only reads it and
/// increments `credits`.
#[derive(Debug, Clone, Serialize)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub credits: i64,
}

// ============================================================================
// Repository Traits
// ============================================================================

/// Fields written by the claim: used both to flip an existing record to
/// verified+applied and to insert a fresh verified record when the
/// confirm arrives before order initiation persisted one.
#[derive(Debug, Clone)]
pub struct ClaimCreditsInput {
    pub reference_id: String,
    pub user_email: String,
    pub user_id: Option<Uuid>,
    pub method: PaymentMethod,
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    pub currency: String,
    pub provider_transaction_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreatePaymentRecordInput {
    pub reference_id: String,
    pub user_email: String,
    pub user_id: Option<Uuid>,
    pub method: PaymentMethod,
    pub plan_id: String,
    pub billing_cycle: BillingCycle,
    pub amount_cents: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentRecordRepo: Send + Sync {
    async fn find_by_reference(&self, reference_id: &str) -> AppResult<Option<PaymentRecord>>;

    /// Persist a pending record at order initiation.
    async fn create_pending(&self, input: &CreatePaymentRecordInput) -> AppResult<PaymentRecord>;

    /// Conditional claim write: set `status = verified`,
    /// `credits_applied = true` only where `credits_applied` was false
    /// (inserting a verified record when none exists). Returns whether
    /// this caller won the claim. This is the at-most-once enforcement
    /// point for crediting.
    async fn claim_credits(&self, claim: &ClaimCreditsInput) -> AppResult<bool>;

    /// Mark a record failed (provider reported a terminal failure).
    /// Never overwrites a verified record.
    async fn mark_failed(&self, reference_id: &str) -> AppResult<()>;

    async fn list_by_email(
        &self,
        user_email: &str,
        page: i32,
        per_page: i32,
    ) -> AppResult<PaginatedPaymentRecords>;
}

#[async_trait]
pub trait UserBalanceRepo: Send + Sync {
    /// Look up an account by email, falling back to id.
    async fn find_account(
        &self,
        email: Option<&str>,
        user_id: Option<Uuid>,
    ) -> AppResult<Option<UserAccount>>;

    /// Atomic per-row increment; returns the new balance.
    async fn increment_credits(&self, account_id: Uuid, amount: i64) -> AppResult<i64>;
}

// ============================================================================
// Helpers
// ============================================================================

fn normalize_email(value: Option<&str>) -> Option<String> {
    let email = value?.trim().to_lowercase();
    if email.is_empty() { None } else { Some(email) }
}

/// Unexpanded template placeholders sometimes leak through checkout
/// redirects (`{CHECKOUT_SESSION_ID}`). Treat them as missing.
fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.contains("CHECKOUT_SESSION_ID") {
        return true;
    }
    trimmed.len() > 2
        && trimmed.starts_with('{')
        && trimmed.ends_with('}')
        && trimmed[1..trimmed.len() - 1]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct PaymentUseCases {
    records: Arc<dyn PaymentRecordRepo>,
    balances: Arc<dyn UserBalanceRepo>,
    pricing: PricingTable,
    verifiers: Arc<VerifierFactory>,
}

impl PaymentUseCases {
    pub fn new(
        records: Arc<dyn PaymentRecordRepo>,
        balances: Arc<dyn UserBalanceRepo>,
        pricing: PricingTable,
        verifiers: Arc<VerifierFactory>,
    ) -> Self {
        Self {
            records,
            balances,
            pricing,
            verifiers,
        }
    }

    /// Resolve the payment reference from the provider-specific fields.
    fn resolve_reference(input: &ConfirmPaymentInput) -> AppResult<String> {
        let candidates = [
            &input.reference_id,
            &input.transaction_id,
            &input.session_id,
            &input.out_trade_no,
            &input.trade_no,
        ];
        for candidate in candidates.into_iter().flatten() {
            let trimmed = candidate.trim();
            if trimmed.is_empty() {
                continue;
            }
            if is_placeholder(trimmed) {
                return Err(AppError::InvalidInput(
                    "Placeholder payment reference received; return from checkout and retry"
                        .into(),
                ));
            }
            return Ok(trimmed.to_string());
        }
        Err(AppError::MissingReference)
    }

    /// Infer the provider rail when the caller did not name one.
    fn resolve_method(input: &ConfirmPaymentInput) -> PaymentMethod {
        if let Some(method) = input.payment_method {
            return method;
        }
        if non_empty(input.session_id.as_ref()).is_some() {
            PaymentMethod::Stripe
        } else if non_empty(input.out_trade_no.as_ref()).is_some() {
            PaymentMethod::WechatNative
        } else if non_empty(input.trade_no.as_ref()).is_some() {
            PaymentMethod::Alipay
        } else {
            PaymentMethod::default()
        }
    }

    /// Confirm a payment and apply the credit grant exactly once.
    ///
    /// Fail-closed: any ambiguity about whether the payment succeeded
    /// results in "not yet applied", never a speculative grant. No
    /// internal retries; the HTTP layer owns retry/backoff for the
    /// retryable `Database` condition.
    pub async fn confirm_payment(
        &self,
        input: &ConfirmPaymentInput,
    ) -> AppResult<ConfirmPaymentResult> {
        // Input validation happens before any store call.
        let reference_id = Self::resolve_reference(input)?;
        let input_email = normalize_email(input.user_email.as_deref());
        if input_email.is_none() && input.user_id.is_none() {
            return Err(AppError::MissingRecipient);
        }

        let method = Self::resolve_method(input);

        // Idempotency pre-check. The conditional claim below is the real
        // guarantee; this read just short-circuits the common retry.
        let existing = self.records.find_by_reference(&reference_id).await?;
        if let Some(record) = existing.as_ref().filter(|r| r.is_settled()) {
            tracing::info!(
                reference_id = %reference_id,
                user_email = %record.user_email,
                "Payment already credited, returning alreadyProcessed"
            );
            return self.already_processed_result(record).await;
        }

        // Provider verification. A "not successful" answer leaves the
        // record pending so the caller may retry after provider-side
        // settlement delays.
        let verification = if input.skip_provider_verification {
            ProviderVerification {
                success: true,
                transaction_id: None,
                amount_cents: None,
                currency: None,
            }
        } else {
            let verifier = self.verifiers.get(method)?;
            verifier.verify(&reference_id).await?
        };
        if !verification.success {
            tracing::warn!(
                reference_id = %reference_id,
                method = %method,
                "Provider did not confirm payment"
            );
            return Err(AppError::PaymentNotVerified(format!(
                "{} did not confirm payment {}",
                method.display_name(),
                reference_id
            )));
        }

        // Plan & grant resolution.
        let plan_id = non_empty(input.plan_id.as_ref())
            .map(str::to_string)
            .or_else(|| existing.as_ref().map(|r| r.plan_id.clone()))
            .unwrap_or_default();
        let plan = self
            .pricing
            .plan_by_id(&plan_id)
            .ok_or_else(|| AppError::UnknownPlan(plan_id.clone()))?;
        let cycle = match input.billing_cycle.as_deref() {
            Some(raw) => BillingCycle::from_input(Some(raw)),
            None => existing
                .as_ref()
                .map(|r| r.billing_cycle)
                .unwrap_or_default(),
        };
        let credits_to_add = self.pricing.credits_for(plan, cycle);
        if credits_to_add <= 0 {
            tracing::error!(
                plan_id = %plan_id,
                cycle = %cycle,
                credits_to_add,
                "Pricing table produced a non-positive grant"
            );
            return Err(AppError::InvalidGrant(plan_id));
        }

        // Recipient resolution before the claim, so a bad recipient does
        // not burn the one claim a reference gets.
        let email = input_email
            .or_else(|| existing.as_ref().map(|r| r.user_email.clone()))
            .filter(|e| !e.is_empty());
        let account = self
            .balances
            .find_account(email.as_deref(), input.user_id)
            .await?
            .ok_or(AppError::RecipientNotFound)?;

        let amount_cents = verification
            .amount_cents
            .or_else(|| existing.as_ref().map(|r| r.amount_cents))
            .unwrap_or_else(|| plan.price_cents(cycle));
        let currency = verification
            .currency
            .clone()
            .or_else(|| existing.as_ref().map(|r| r.currency.clone()))
            .unwrap_or_else(|| "usd".to_string());

        // The claim: exactly one caller per reference gets `true` here.
        let claim = ClaimCreditsInput {
            reference_id: reference_id.clone(),
            user_email: account.email.clone(),
            user_id: input.user_id.or(existing.as_ref().and_then(|r| r.user_id)),
            method,
            plan_id: plan.id.to_string(),
            billing_cycle: cycle,
            amount_cents,
            currency,
            provider_transaction_id: verification.transaction_id.clone(),
        };
        let claimed = self.records.claim_credits(&claim).await?;
        if !claimed {
            tracing::info!(
                reference_id = %reference_id,
                "Lost the credit claim to a concurrent confirmation"
            );
            // The account snapshot predates the winner's increment;
            // re-read so the reported balance is not stale.
            let balance = self
                .balances
                .find_account(Some(&account.email), input.user_id)
                .await?
                .map(|a| a.credits);
            return Ok(ConfirmPaymentResult {
                success: true,
                already_processed: true,
                credits_to_add,
                user_email: account.email,
                plan_id: plan.id.to_string(),
                billing_cycle: cycle,
                new_balance: balance,
            });
        }

        // Balance increment. A failure after a won claim leaves a record
        // marked applied without the matching balance write; that gap is
        // handed to operators, not retried (retrying would risk double
        // credit under the claim-first ordering).
        let new_balance = match self
            .balances
            .increment_credits(account.id, credits_to_add)
            .await
        {
            Ok(balance) => balance,
            Err(err) => {
                tracing::error!(
                    reference_id = %reference_id,
                    account_id = %account.id,
                    credits_to_add,
                    error = ?err,
                    "MANUAL RECONCILIATION REQUIRED: claim won but balance increment failed"
                );
                return Err(err);
            }
        };

        tracing::info!(
            reference_id = %reference_id,
            user_email = %account.email,
            plan_id = %plan.id,
            cycle = %cycle,
            credits_to_add,
            new_balance,
            "Applied credit grant"
        );

        Ok(ConfirmPaymentResult {
            success: true,
            already_processed: false,
            credits_to_add,
            user_email: account.email,
            plan_id: plan.id.to_string(),
            billing_cycle: cycle,
            new_balance: Some(new_balance),
        })
    }

    async fn already_processed_result(
        &self,
        record: &PaymentRecord,
    ) -> AppResult<ConfirmPaymentResult> {
        let credits_to_add = self
            .pricing
            .plan_by_id(&record.plan_id)
            .map(|plan| self.pricing.credits_for(plan, record.billing_cycle))
            .unwrap_or(0);
        let balance = self
            .balances
            .find_account(Some(&record.user_email), record.user_id)
            .await?
            .map(|a| a.credits);
        Ok(ConfirmPaymentResult {
            success: true,
            already_processed: true,
            credits_to_add,
            user_email: record.user_email.clone(),
            plan_id: record.plan_id.clone(),
            billing_cycle: record.billing_cycle,
            new_balance: balance,
        })
    }

    /// Persist a pending record at order initiation.
    pub async fn create_payment(&self, input: &CreatePaymentInput) -> AppResult<PaymentRecord> {
        let reference_id = input.reference_id.trim();
        if reference_id.is_empty() {
            return Err(AppError::MissingReference);
        }
        if is_placeholder(reference_id) {
            return Err(AppError::InvalidInput(
                "Placeholder payment reference received".into(),
            ));
        }
        let user_email = normalize_email(Some(&input.user_email))
            .ok_or(AppError::MissingRecipient)?;

        let plan = self
            .pricing
            .plan_by_id(input.plan_id.trim())
            .ok_or_else(|| AppError::UnknownPlan(input.plan_id.clone()))?;
        let cycle = BillingCycle::from_input(input.billing_cycle.as_deref());

        let record = self
            .records
            .create_pending(&CreatePaymentRecordInput {
                reference_id: reference_id.to_string(),
                user_email,
                user_id: input.user_id,
                method: input.payment_method,
                plan_id: plan.id.to_string(),
                billing_cycle: cycle,
                amount_cents: plan.price_cents(cycle),
                currency: input
                    .currency
                    .as_deref()
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty())
                    .unwrap_or_else(|| "usd".to_string()),
            })
            .await?;
        tracing::info!(
            reference_id = %record.reference_id,
            user_email = %record.user_email,
            plan_id = %record.plan_id,
            "Created pending payment record"
        );
        Ok(record)
    }

    /// Look up a record by reference id.
    pub async fn payment_status(&self, reference_id: &str) -> AppResult<PaymentRecord> {
        let reference_id = reference_id.trim();
        if reference_id.is_empty() {
            return Err(AppError::MissingReference);
        }
        self.records
            .find_by_reference(reference_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Paginated payment history for a user email.
    pub async fn payment_history(
        &self,
        user_email: &str,
        page: i32,
        per_page: i32,
    ) -> AppResult<PaginatedPaymentRecords> {
        let email =
            normalize_email(Some(user_email)).ok_or(AppError::MissingRecipient)?;
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        self.records.list_by_email(&email, page, per_page).await
    }

    /// Raw provider order state by merchant order number (WeChat only).
    pub async fn query_order(
        &self,
        method: PaymentMethod,
        out_trade_no: &str,
    ) -> AppResult<ProviderOrder> {
        let out_trade_no = out_trade_no.trim();
        if out_trade_no.is_empty() {
            return Err(AppError::MissingReference);
        }
        let verifier = self.verifiers.get(method)?;
        verifier
            .query_order(out_trade_no)
            .await?
            .ok_or(AppError::ProviderNotSupported)
    }

    /// Mark a record failed on a provider failure notification.
    pub async fn mark_payment_failed(&self, reference_id: &str) -> AppResult<()> {
        let reference_id = reference_id.trim();
        if reference_id.is_empty() {
            return Err(AppError::MissingReference);
        }
        self.records.mark_failed(reference_id).await
    }
}
