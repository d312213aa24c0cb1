//! Provider webhook handlers.
//!
//! Webhooks authenticate the provider (Stripe HMAC signature, WeChat
//! APIv3 AEAD decryption) and then run the same confirm workflow as the
//! client-initiated path, with provider verification skipped. The
//! confirm workflow's claim write keeps the two paths racing safely.

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::error;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::use_cases::payments::ConfirmPaymentInput,
    domain::entities::payment_method::PaymentMethod,
    infra::stripe_client::StripeClient,
    infra::wechat_client::{WechatPayClient, WechatPaymentNotification, WechatWebhookEnvelope},
};

/// Whether a webhook processing error should make the provider retry.
/// Retryable errors get a 5xx; expected conditions get a 2xx and a log
/// line so the provider stops redelivering.
fn is_retryable_error(error: &AppError) -> bool {
    matches!(error, AppError::Database(_) | AppError::Internal(_))
}

// ============================================================================
// Stripe
// ============================================================================

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

/// POST /webhooks/stripe
async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let Some(webhook_secret) = state
        .config
        .stripe
        .as_ref()
        .and_then(|s| s.webhook_secret.as_ref())
    else {
        error!("Stripe webhook received but no webhook secret configured");
        return StatusCode::BAD_REQUEST;
    };

    let Some(signature) = headers.get("stripe-signature").and_then(|v| v.to_str().ok()) else {
        error!("Stripe webhook missing signature header");
        return StatusCode::BAD_REQUEST;
    };

    if let Err(err) =
        StripeClient::verify_webhook_signature(&body, signature, webhook_secret.expose_secret())
    {
        error!(error = ?err, "Stripe webhook signature verification failed");
        return StatusCode::BAD_REQUEST;
    }

    let event: StripeEvent = match serde_json::from_str(&body) {
        Ok(event) => event,
        Err(err) => {
            error!(error = %err, "Failed to parse Stripe webhook event");
            return StatusCode::BAD_REQUEST;
        }
    };

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session = &event.data.object;
            if session["payment_status"] != "paid" {
                tracing::info!(
                    event_id = %event.id,
                    "Checkout session completed but not paid, ignoring"
                );
                return StatusCode::OK;
            }

            let metadata = &session["metadata"];
            let input = ConfirmPaymentInput {
                session_id: session["id"].as_str().map(str::to_string),
                user_email: metadata["user_email"]
                    .as_str()
                    .or_else(|| session["customer_email"].as_str())
                    .or_else(|| session["customer_details"]["email"].as_str())
                    .map(str::to_string),
                plan_id: metadata["plan_id"].as_str().map(str::to_string),
                billing_cycle: metadata["billing_cycle"].as_str().map(str::to_string),
                payment_method: Some(PaymentMethod::Stripe),
                // The signature check above already authenticated Stripe.
                skip_provider_verification: true,
                ..Default::default()
            };

            match state.payment_use_cases.confirm_payment(&input).await {
                Ok(result) => {
                    tracing::info!(
                        event_id = %event.id,
                        already_processed = result.already_processed,
                        credits_to_add = result.credits_to_add,
                        "Stripe webhook confirmed payment"
                    );
                    StatusCode::OK
                }
                Err(err) if is_retryable_error(&err) => {
                    error!(
                        error = %err,
                        event_id = %event.id,
                        event_type = %event.event_type,
                        "Webhook processing failed, returning 500 for Stripe retry"
                    );
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                Err(err) => {
                    error!(
                        error = %err,
                        event_id = %event.id,
                        event_type = %event.event_type,
                        "Webhook processing failed with non-retryable error"
                    );
                    StatusCode::OK
                }
            }
        }
        other => {
            tracing::debug!(event_type = %other, "Ignoring unhandled Stripe event type");
            StatusCode::OK
        }
    }
}

// ============================================================================
// WeChat Pay
// ============================================================================

#[derive(serde::Serialize)]
struct WechatAck {
    code: &'static str,
    message: &'static str,
}

fn wechat_ack(status: StatusCode, code: &'static str, message: &'static str) -> impl IntoResponse {
    (status, Json(WechatAck { code, message }))
}

/// Trade states that will never become SUCCESS.
fn is_terminal_failure(trade_state: &str) -> bool {
    matches!(trade_state, "CLOSED" | "REVOKED" | "PAYERROR")
}

/// POST /webhooks/wechat
async fn handle_wechat_webhook(
    State(state): State<AppState>,
    body: String,
) -> impl IntoResponse {
    let Some(settings) = state.config.wechat.clone() else {
        error!("WeChat webhook received but WeChat Pay is not configured");
        return wechat_ack(StatusCode::BAD_REQUEST, "FAIL", "not configured");
    };
    let client = WechatPayClient::new(settings);

    let envelope: WechatWebhookEnvelope = match serde_json::from_str(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            error!(error = %err, "Failed to parse WeChat webhook envelope");
            return wechat_ack(StatusCode::BAD_REQUEST, "FAIL", "bad envelope");
        }
    };

    // Decryption under the APIv3 key doubles as authentication: a forged
    // notification cannot produce a valid AEAD tag.
    let plaintext = match client.decrypt_webhook_resource(
        &envelope.resource.ciphertext,
        &envelope.resource.nonce,
        envelope.resource.associated_data.as_deref(),
    ) {
        Ok(plaintext) => plaintext,
        Err(err) => {
            error!(error = ?err, notification_id = %envelope.id, "WeChat webhook decryption failed");
            return wechat_ack(StatusCode::BAD_REQUEST, "FAIL", "decryption failed");
        }
    };

    let notification: WechatPaymentNotification = match serde_json::from_str(&plaintext) {
        Ok(notification) => notification,
        Err(err) => {
            error!(error = %err, "Failed to parse WeChat payment notification");
            return wechat_ack(StatusCode::BAD_REQUEST, "FAIL", "bad resource");
        }
    };

    if notification.trade_state != "SUCCESS" {
        if is_terminal_failure(&notification.trade_state) {
            if let Err(err) = state
                .payment_use_cases
                .mark_payment_failed(&notification.out_trade_no)
                .await
            {
                tracing::warn!(
                    error = %err,
                    out_trade_no = %notification.out_trade_no,
                    "Could not mark payment failed from webhook"
                );
            }
        }
        tracing::info!(
            out_trade_no = %notification.out_trade_no,
            trade_state = %notification.trade_state,
            "WeChat notification without settled payment"
        );
        return wechat_ack(StatusCode::OK, "SUCCESS", "ok");
    }

    // The recipient is whoever initiated the order.
    let record = match state
        .payment_use_cases
        .payment_status(&notification.out_trade_no)
        .await
    {
        Ok(record) => record,
        Err(AppError::NotFound) => {
            // The order row may not have committed yet; ask for a retry.
            tracing::warn!(
                out_trade_no = %notification.out_trade_no,
                "WeChat notification for unknown order, requesting redelivery"
            );
            return wechat_ack(StatusCode::INTERNAL_SERVER_ERROR, "FAIL", "order not found");
        }
        Err(err) => {
            error!(error = %err, "Failed to load order for WeChat notification");
            return wechat_ack(StatusCode::INTERNAL_SERVER_ERROR, "FAIL", "store error");
        }
    };

    let input = ConfirmPaymentInput {
        out_trade_no: Some(notification.out_trade_no.clone()),
        transaction_id: None,
        user_email: Some(record.user_email),
        user_id: record.user_id,
        payment_method: Some(PaymentMethod::WechatNative),
        skip_provider_verification: true,
        ..Default::default()
    };

    match state.payment_use_cases.confirm_payment(&input).await {
        Ok(result) => {
            tracing::info!(
                out_trade_no = %notification.out_trade_no,
                already_processed = result.already_processed,
                credits_to_add = result.credits_to_add,
                "WeChat webhook confirmed payment"
            );
            wechat_ack(StatusCode::OK, "SUCCESS", "ok")
        }
        Err(err) if is_retryable_error(&err) => {
            error!(
                error = %err,
                out_trade_no = %notification.out_trade_no,
                "WeChat webhook processing failed, requesting redelivery"
            );
            wechat_ack(StatusCode::INTERNAL_SERVER_ERROR, "FAIL", "processing failed")
        }
        Err(err) => {
            error!(
                error = %err,
                out_trade_no = %notification.out_trade_no,
                "WeChat webhook processing failed with non-retryable error"
            );
            wechat_ack(StatusCode::OK, "SUCCESS", "ok")
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stripe", post(handle_stripe_webhook))
        .route("/wechat", post(handle_wechat_webhook))
}
