//! Test app state builder for HTTP-level integration testing.
//!
//! Creates an `AppState` backed by in-memory mocks so route handlers can
//! be exercised with `axum_test::TestServer` and no Postgres.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;

use crate::{
    adapters::http::app_state::AppState,
    application::pricing::PricingTable,
    application::use_cases::{payments::PaymentUseCases, verifier_factory::VerifierFactory},
    domain::entities::{payment_record::PaymentRecord, region::Region},
    infra::config::{AppConfig, StripeSettings, WechatSettings},
    test_utils::payment_mocks::{
        InMemoryPaymentRecordRepo, InMemoryUserBalanceRepo, MockVerifier,
    },
};

pub struct TestAppStateBuilder {
    records: Vec<PaymentRecord>,
    accounts: Vec<(String, i64)>,
    region: Region,
    stripe_webhook_secret: Option<String>,
    wechat_api_v3_key: Option<String>,
    succeeding_verifier: bool,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            accounts: Vec::new(),
            region: Region::Intl,
            stripe_webhook_secret: None,
            wechat_api_v3_key: None,
            succeeding_verifier: false,
        }
    }

    pub fn with_record(mut self, record: PaymentRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn with_account(mut self, email: &str, credits: i64) -> Self {
        self.accounts.push((email.to_string(), credits));
        self
    }

    pub fn with_cn_region(mut self) -> Self {
        self.region = Region::Cn;
        self
    }

    pub fn with_stripe_webhook_secret(mut self, secret: &str) -> Self {
        self.stripe_webhook_secret = Some(secret.to_string());
        self
    }

    pub fn with_wechat_api_v3_key(mut self, key: &str) -> Self {
        self.wechat_api_v3_key = Some(key.to_string());
        self
    }

    /// Route every provider verification through a verifier that says yes.
    pub fn with_succeeding_verifier(mut self) -> Self {
        self.succeeding_verifier = true;
        self
    }

    pub fn build(self) -> AppState {
        let records = Arc::new(InMemoryPaymentRecordRepo::new());
        for record in self.records {
            records.insert(record);
        }
        let balances = Arc::new(InMemoryUserBalanceRepo::new());
        for (email, credits) in &self.accounts {
            balances.add_account(email, *credits);
        }

        let stripe = self.stripe_webhook_secret.map(|secret| StripeSettings {
            secret_key: SecretString::new("sk_test_dummy".into()),
            webhook_secret: Some(SecretString::new(secret.into())),
        });
        let wechat = self.wechat_api_v3_key.map(|key| WechatSettings {
            mch_id: "1900000001".to_string(),
            app_id: "wx0000000000000000".to_string(),
            serial_no: "TESTSERIAL".to_string(),
            private_key_b64: SecretString::new("".into()),
            api_v3_key: SecretString::new(key.into()),
            api_base: "https://api.mch.weixin.qq.com".to_string(),
        });

        let mut factory =
            VerifierFactory::new(self.region, stripe.clone(), wechat.clone(), None);
        if self.succeeding_verifier {
            factory = factory.with_verifier_override(Arc::new(MockVerifier::succeeding()));
        }

        let config = AppConfig {
            bind_addr: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
            database_url: "postgres://unused".to_string(),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            region: self.region,
            stripe,
            wechat,
            alipay: None,
        };

        let payment_use_cases = PaymentUseCases::new(
            records,
            balances,
            PricingTable::default(),
            Arc::new(factory),
        );

        AppState {
            config: Arc::new(config),
            payment_use_cases: Arc::new(payment_use_cases),
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
