//! WeChat Pay v3 merchant API client.
//!
//! Requests are signed with the merchant's RSA key (SHA256withRSA over
//! the canonical message) and carried in the `Authorization` header.
//! Webhook notification resources arrive AES-256-GCM encrypted under the
//! merchant's APIv3 key.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use reqwest::Client;
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_verifier::{
        PaymentVerifierPort, ProviderOrder, ProviderVerification,
    },
    domain::entities::payment_method::PaymentMethod,
    infra::config::WechatSettings,
};

#[derive(Clone)]
pub struct WechatPayClient {
    client: Client,
    settings: WechatSettings,
}

impl WechatPayClient {
    pub fn new(settings: WechatSettings) -> Self {
        Self {
            client: Client::new(),
            settings,
        }
    }

    fn key_pair(&self) -> AppResult<RsaKeyPair> {
        let der = general_purpose::STANDARD
            .decode(self.settings.private_key_b64.expose_secret())
            .map_err(|e| AppError::Internal(format!("Invalid WECHAT_PRIVATE_KEY_B64: {e}")))?;
        RsaKeyPair::from_pkcs8(&der)
            .map_err(|e| AppError::Internal(format!("Invalid WeChat merchant key: {e}")))
    }

    /// Canonical v3 request signature:
    /// `{method}\n{path}\n{timestamp}\n{nonce}\n{body}\n`, SHA256withRSA,
    /// base64-encoded.
    fn sign_request(&self, method: &str, url_path: &str, body: &str) -> AppResult<String> {
        let key_pair = self.key_pair()?;
        let timestamp = chrono::Utc::now().timestamp();
        let nonce: String = hex::encode(rand::random::<[u8; 16]>());
        let message = format!("{method}\n{url_path}\n{timestamp}\n{nonce}\n{body}\n");

        let rng = SystemRandom::new();
        let mut signature = vec![0u8; key_pair.public().modulus_len()];
        key_pair
            .sign(&RSA_PKCS1_SHA256, &rng, message.as_bytes(), &mut signature)
            .map_err(|e| AppError::Internal(format!("WeChat request signing failed: {e}")))?;

        Ok(format!(
            r#"WECHATPAY2-SHA256-RSA2048 mchid="{}",nonce_str="{}",signature="{}",timestamp="{}",serial_no="{}""#,
            self.settings.mch_id,
            nonce,
            general_purpose::STANDARD.encode(&signature),
            timestamp,
            self.settings.serial_no,
        ))
    }

    async fn get_order(&self, out_trade_no: &str) -> AppResult<WechatOrder> {
        let url_path = format!(
            "/v3/pay/transactions/out-trade-no/{}?mchid={}",
            out_trade_no, self.settings.mch_id
        );
        let authorization = self.sign_request("GET", &url_path, "")?;

        let response = self
            .client
            .get(format!("{}{}", self.settings.api_base, url_path))
            .header("Authorization", authorization)
            .header("Accept", "application/json")
            .header("User-Agent", "toolpay-api")
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("WeChat request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "WeChat Pay API error");
            if status.as_u16() == 404 {
                return Err(AppError::NotFound);
            }
            return Err(AppError::Internal(format!(
                "WeChat Pay API error: {} - {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(body = %body, error = %e, "Failed to parse WeChat response");
            AppError::Internal(format!("Failed to parse WeChat response: {e}"))
        })
    }

    /// Decrypt an AES-256-GCM webhook `resource` under the APIv3 key.
    pub fn decrypt_webhook_resource(
        &self,
        ciphertext_b64: &str,
        nonce: &str,
        associated_data: Option<&str>,
    ) -> AppResult<String> {
        let key_bytes = self.settings.api_v3_key.expose_secret().as_bytes();
        if key_bytes.len() != 32 {
            return Err(AppError::Internal(
                "WECHAT_API_V3_KEY must be 32 bytes".into(),
            ));
        }
        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(key_bytes);
        let cipher = Aes256Gcm::new(key);

        let ciphertext = general_purpose::STANDARD
            .decode(ciphertext_b64.as_bytes())
            .map_err(|e| AppError::InvalidInput(format!("Invalid webhook ciphertext: {e}")))?;
        if nonce.len() != 12 {
            return Err(AppError::InvalidInput("Invalid webhook nonce".into()));
        }
        let nonce = Nonce::from_slice(nonce.as_bytes());

        let plaintext = cipher
            .decrypt(
                nonce,
                Payload {
                    msg: &ciphertext,
                    aad: associated_data.unwrap_or_default().as_bytes(),
                },
            )
            .map_err(|_| AppError::InvalidInput("Webhook resource decryption failed".into()))?;

        String::from_utf8(plaintext).map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[async_trait]
impl PaymentVerifierPort for WechatPayClient {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::WechatNative
    }

    async fn verify(&self, reference_id: &str) -> AppResult<ProviderVerification> {
        let order = match self.get_order(reference_id).await {
            Ok(order) => order,
            Err(AppError::NotFound) => {
                tracing::warn!(reference_id = %reference_id, "WeChat order not found");
                return Ok(ProviderVerification::failed());
            }
            Err(err) => return Err(err),
        };

        if order.trade_state != "SUCCESS" {
            tracing::info!(
                reference_id = %reference_id,
                trade_state = %order.trade_state,
                "WeChat order not settled"
            );
            return Ok(ProviderVerification::failed());
        }

        Ok(ProviderVerification {
            success: true,
            transaction_id: order.transaction_id,
            amount_cents: order.amount.as_ref().map(|a| a.total),
            currency: order
                .amount
                .as_ref()
                .and_then(|a| a.currency.clone())
                .map(|c| c.to_lowercase()),
        })
    }

    async fn query_order(&self, out_trade_no: &str) -> AppResult<Option<ProviderOrder>> {
        match self.get_order(out_trade_no).await {
            Ok(order) => Ok(Some(ProviderOrder {
                reference_id: order.out_trade_no,
                trade_state: order.trade_state,
                transaction_id: order.transaction_id,
                amount_cents: order.amount.map(|a| a.total),
            })),
            Err(AppError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct WechatOrder {
    pub out_trade_no: String,
    /// SUCCESS, REFUND, NOTPAY, CLOSED, REVOKED, USERPAYING, PAYERROR.
    pub trade_state: String,
    pub transaction_id: Option<String>,
    pub amount: Option<WechatAmount>,
}

#[derive(Debug, Deserialize)]
pub struct WechatAmount {
    /// Order amount in CNY cents.
    pub total: i64,
    pub currency: Option<String>,
}

/// Webhook notification envelope.
#[derive(Debug, Deserialize)]
pub struct WechatWebhookEnvelope {
    pub id: String,
    pub event_type: String,
    pub resource: WechatWebhookResource,
}

#[derive(Debug, Deserialize)]
pub struct WechatWebhookResource {
    pub ciphertext: String,
    pub nonce: String,
    pub associated_data: Option<String>,
}

/// Decrypted payment notification resource.
#[derive(Debug, Deserialize)]
pub struct WechatPaymentNotification {
    pub out_trade_no: String,
    pub trade_state: String,
    pub transaction_id: Option<String>,
    pub payer: Option<serde_json::Value>,
    pub amount: Option<WechatAmount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    fn client_with_key(api_v3_key: &str) -> WechatPayClient {
        WechatPayClient::new(WechatSettings {
            mch_id: "1900000001".to_string(),
            app_id: "wx0000000000000000".to_string(),
            serial_no: "TESTSERIAL".to_string(),
            private_key_b64: SecretString::new("".into()),
            api_v3_key: SecretString::new(api_v3_key.into()),
            api_base: "https://api.mch.weixin.qq.com".to_string(),
        })
    }

    fn encrypt_resource(key: &str, nonce: &str, aad: &str, plaintext: &str) -> String {
        let cipher = Aes256Gcm::new(aes_gcm::Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        let ciphertext = cipher
            .encrypt(
                Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: aad.as_bytes(),
                },
            )
            .unwrap();
        general_purpose::STANDARD.encode(ciphertext)
    }

    const KEY: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn webhook_resource_roundtrip() {
        let client = client_with_key(KEY);
        let plaintext = r#"{"out_trade_no":"wx_order_1","trade_state":"SUCCESS"}"#;
        let ciphertext = encrypt_resource(KEY, "abcdef123456", "transaction", plaintext);

        let decrypted = client
            .decrypt_webhook_resource(&ciphertext, "abcdef123456", Some("transaction"))
            .unwrap();
        assert_eq!(decrypted, plaintext);

        let notification: WechatPaymentNotification = serde_json::from_str(&decrypted).unwrap();
        assert_eq!(notification.out_trade_no, "wx_order_1");
        assert_eq!(notification.trade_state, "SUCCESS");
    }

    #[test]
    fn webhook_resource_wrong_aad_fails() {
        let client = client_with_key(KEY);
        let ciphertext = encrypt_resource(KEY, "abcdef123456", "transaction", "{}");
        let err = client
            .decrypt_webhook_resource(&ciphertext, "abcdef123456", Some("other"))
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn webhook_resource_wrong_key_fails() {
        let ciphertext = encrypt_resource(KEY, "abcdef123456", "transaction", "{}");
        let client = client_with_key("ffffffffffffffffffffffffffffffff");
        assert!(
            client
                .decrypt_webhook_resource(&ciphertext, "abcdef123456", Some("transaction"))
                .is_err()
        );
    }

    #[test]
    fn webhook_resource_bad_key_length_rejected() {
        let client = client_with_key("short");
        let err = client
            .decrypt_webhook_resource("AAAA", "abcdef123456", None)
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
