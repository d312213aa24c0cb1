use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

use crate::domain::entities::region::Region;

/// Stripe credentials (international deployments).
#[derive(Clone)]
pub struct StripeSettings {
    pub secret_key: SecretString,
    pub webhook_secret: Option<SecretString>,
}

/// WeChat Pay v3 merchant credentials (CN deployments).
#[derive(Clone)]
pub struct WechatSettings {
    pub mch_id: String,
    pub app_id: String,
    /// Merchant certificate serial number, sent in the Authorization header.
    pub serial_no: String,
    /// PKCS#8 DER private key, base64-encoded.
    pub private_key_b64: SecretString,
    /// 32-byte APIv3 key used to decrypt webhook resources.
    pub api_v3_key: SecretString,
    pub api_base: String,
}

/// Alipay sandbox settings (CN deployments; production Alipay goes through
/// the same confirm flow with webhook-verified notifications).
#[derive(Clone)]
pub struct AlipaySettings {
    pub sandbox: bool,
}

pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: HeaderValue,
    /// Which deployment this process serves; decides the payment rails.
    pub region: Region,
    pub stripe: Option<StripeSettings>,
    pub wechat: Option<WechatSettings>,
    pub alipay: Option<AlipaySettings>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let region =
            Region::from_config(&std::env::var("DEPLOYMENT_REGION").unwrap_or_default());

        let stripe = std::env::var("STRIPE_SECRET_KEY").ok().map(|key| {
            StripeSettings {
                secret_key: SecretString::new(key.into()),
                webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET")
                    .ok()
                    .map(|s| SecretString::new(s.into())),
            }
        });

        let wechat = std::env::var("WECHAT_MCH_ID").ok().map(|mch_id| {
            WechatSettings {
                mch_id,
                app_id: get_env("WECHAT_APP_ID"),
                serial_no: get_env("WECHAT_SERIAL_NO"),
                private_key_b64: SecretString::new(
                    get_env::<String>("WECHAT_PRIVATE_KEY_B64").into(),
                ),
                api_v3_key: SecretString::new(get_env::<String>("WECHAT_API_V3_KEY").into()),
                api_base: get_env_default(
                    "WECHAT_API_BASE",
                    "https://api.mch.weixin.qq.com".to_string(),
                ),
            }
        });

        let alipay = std::env::var("ALIPAY_ENABLED")
            .ok()
            .filter(|v| v == "true" || v == "1")
            .map(|_| AlipaySettings {
                sandbox: get_env_default("ALIPAY_SANDBOX", true),
            });

        Self {
            bind_addr,
            database_url,
            cors_origin,
            region,
            stripe,
            wechat,
            alipay,
        }
    }
}
