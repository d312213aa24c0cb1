//! In-memory mocks for the payment record and balance stores.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_verifier::{PaymentVerifierPort, ProviderVerification},
    application::use_cases::payments::{
        ClaimCreditsInput, CreatePaymentRecordInput, PaginatedPaymentRecords, PaymentRecordRepo,
        UserAccount, UserBalanceRepo,
    },
    domain::entities::{
        payment_method::PaymentMethod, payment_record::PaymentRecord,
        payment_status::PaymentStatus,
    },
};

// ============================================================================
// InMemoryPaymentRecordRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRecordRepo {
    records: Mutex<HashMap<String, PaymentRecord>>,
    find_calls: AtomicUsize,
    claim_calls: AtomicUsize,
}

impl InMemoryPaymentRecordRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: PaymentRecord) {
        self.records
            .lock()
            .unwrap()
            .insert(record.reference_id.clone(), record);
    }

    pub fn get(&self, reference_id: &str) -> Option<PaymentRecord> {
        self.records.lock().unwrap().get(reference_id).cloned()
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    pub fn claim_calls(&self) -> usize {
        self.claim_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentRecordRepo for InMemoryPaymentRecordRepo {
    async fn find_by_reference(&self, reference_id: &str) -> AppResult<Option<PaymentRecord>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.get(reference_id))
    }

    async fn create_pending(&self, input: &CreatePaymentRecordInput) -> AppResult<PaymentRecord> {
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records.get(&input.reference_id) {
            if existing.credits_applied {
                return Err(AppError::InvalidInput(
                    "Payment reference already settled".into(),
                ));
            }
        }
        let record = PaymentRecord {
            id: Uuid::new_v4(),
            reference_id: input.reference_id.clone(),
            user_email: input.user_email.clone(),
            user_id: input.user_id,
            method: input.method,
            plan_id: input.plan_id.clone(),
            billing_cycle: input.billing_cycle,
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: PaymentStatus::Pending,
            credits_applied: false,
            provider_transaction_id: None,
            created_at: Some(chrono::Utc::now().naive_utc()),
            updated_at: Some(chrono::Utc::now().naive_utc()),
        };
        records.insert(record.reference_id.clone(), record.clone());
        Ok(record)
    }

    async fn claim_credits(&self, claim: &ClaimCreditsInput) -> AppResult<bool> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&claim.reference_id) {
            Some(record) => {
                if record.credits_applied {
                    return Ok(false);
                }
                record.status = PaymentStatus::Verified;
                record.credits_applied = true;
                record.user_email = claim.user_email.clone();
                record.user_id = claim.user_id.or(record.user_id);
                record.plan_id = claim.plan_id.clone();
                record.billing_cycle = claim.billing_cycle;
                record.amount_cents = claim.amount_cents;
                record.currency = claim.currency.clone();
                record.provider_transaction_id = claim
                    .provider_transaction_id
                    .clone()
                    .or(record.provider_transaction_id.take());
                record.updated_at = Some(chrono::Utc::now().naive_utc());
                Ok(true)
            }
            None => {
                let record = PaymentRecord {
                    id: Uuid::new_v4(),
                    reference_id: claim.reference_id.clone(),
                    user_email: claim.user_email.clone(),
                    user_id: claim.user_id,
                    method: claim.method,
                    plan_id: claim.plan_id.clone(),
                    billing_cycle: claim.billing_cycle,
                    amount_cents: claim.amount_cents,
                    currency: claim.currency.clone(),
                    status: PaymentStatus::Verified,
                    credits_applied: true,
                    provider_transaction_id: claim.provider_transaction_id.clone(),
                    created_at: Some(chrono::Utc::now().naive_utc()),
                    updated_at: Some(chrono::Utc::now().naive_utc()),
                };
                records.insert(record.reference_id.clone(), record);
                Ok(true)
            }
        }
    }

    async fn mark_failed(&self, reference_id: &str) -> AppResult<()> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(reference_id) {
            Some(record) => {
                if !record.credits_applied {
                    record.status = PaymentStatus::Failed;
                    record.updated_at = Some(chrono::Utc::now().naive_utc());
                }
                Ok(())
            }
            None => Err(AppError::NotFound),
        }
    }

    async fn list_by_email(
        &self,
        user_email: &str,
        page: i32,
        per_page: i32,
    ) -> AppResult<PaginatedPaymentRecords> {
        let records = self.records.lock().unwrap();
        let mut matching: Vec<PaymentRecord> = records
            .values()
            .filter(|r| r.user_email == user_email)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.reference_id.cmp(&b.reference_id)));

        let total = matching.len() as i64;
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i32;
        let offset = ((i64::from(page) - 1) * i64::from(per_page)).max(0) as usize;
        let page_records = matching
            .into_iter()
            .skip(offset)
            .take(per_page as usize)
            .collect();

        Ok(PaginatedPaymentRecords {
            records: page_records,
            total,
            page,
            per_page,
            total_pages,
        })
    }
}

// ============================================================================
// InMemoryUserBalanceRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserBalanceRepo {
    accounts: Mutex<HashMap<Uuid, UserAccount>>,
    find_calls: AtomicUsize,
    fail_increments: AtomicBool,
}

impl InMemoryUserBalanceRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(email: &str, credits: i64) -> Self {
        let repo = Self::default();
        repo.add_account(email, credits);
        repo
    }

    pub fn add_account(&self, email: &str, credits: i64) -> Uuid {
        let id = Uuid::new_v4();
        self.accounts.lock().unwrap().insert(
            id,
            UserAccount {
                id,
                email: email.to_string(),
                credits,
            },
        );
        id
    }

    pub fn credits_of(&self, email: &str) -> i64 {
        self.accounts
            .lock()
            .unwrap()
            .values()
            .find(|a| a.email == email)
            .map(|a| a.credits)
            .unwrap_or(0)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }

    /// Make subsequent `increment_credits` calls fail, simulating a
    /// balance store outage.
    pub fn fail_increments(&self, fail: bool) {
        self.fail_increments.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserBalanceRepo for InMemoryUserBalanceRepo {
    async fn find_account(
        &self,
        email: Option<&str>,
        user_id: Option<Uuid>,
    ) -> AppResult<Option<UserAccount>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        let accounts = self.accounts.lock().unwrap();
        if let Some(email) = email {
            if let Some(account) = accounts.values().find(|a| a.email == email) {
                return Ok(Some(account.clone()));
            }
        }
        if let Some(user_id) = user_id {
            return Ok(accounts.get(&user_id).cloned());
        }
        Ok(None)
    }

    async fn increment_credits(&self, account_id: Uuid, amount: i64) -> AppResult<i64> {
        if self.fail_increments.load(Ordering::SeqCst) {
            return Err(AppError::Database("balance store unavailable".into()));
        }
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.get_mut(&account_id).ok_or(AppError::NotFound)?;
        account.credits += amount;
        Ok(account.credits)
    }
}

// ============================================================================
// MockVerifier
// ============================================================================

/// Provider verifier that answers from a fixed script.
pub struct MockVerifier {
    succeed: bool,
}

impl MockVerifier {
    pub fn succeeding() -> Self {
        Self { succeed: true }
    }

    pub fn rejecting() -> Self {
        Self { succeed: false }
    }
}

#[async_trait]
impl PaymentVerifierPort for MockVerifier {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Stripe
    }

    async fn verify(&self, reference_id: &str) -> AppResult<ProviderVerification> {
        if self.succeed {
            Ok(ProviderVerification {
                success: true,
                transaction_id: Some(format!("txn_{reference_id}")),
                amount_cents: None,
                currency: None,
            })
        } else {
            Ok(ProviderVerification::failed())
        }
    }
}
