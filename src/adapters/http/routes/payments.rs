//! Payment routes: confirm, create, status, history, provider order query.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::use_cases::payments::{ConfirmPaymentInput, CreatePaymentInput},
    domain::entities::{payment_method::PaymentMethod, payment_record::PaymentRecord},
};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PaymentResponse {
    reference_id: String,
    user_email: String,
    payment_method: PaymentMethod,
    plan_id: String,
    billing_cycle: String,
    amount_cents: i64,
    currency: String,
    status: String,
    credits_applied: bool,
    created_at: Option<i64>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(record: PaymentRecord) -> Self {
        Self {
            reference_id: record.reference_id,
            user_email: record.user_email,
            payment_method: record.method,
            plan_id: record.plan_id,
            billing_cycle: record.billing_cycle.as_str().to_string(),
            amount_cents: record.amount_cents,
            currency: record.currency,
            status: record.status.as_str().to_string(),
            credits_applied: record.credits_applied,
            created_at: record.created_at.map(|t| t.and_utc().timestamp()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    user_email: String,
    page: Option<i32>,
    per_page: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    payments: Vec<PaymentResponse>,
    total: i64,
    page: i32,
    per_page: i32,
    total_pages: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WechatQueryParams {
    out_trade_no: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /payments/confirm
async fn confirm_payment(
    State(state): State<AppState>,
    Json(input): Json<ConfirmPaymentInput>,
) -> AppResult<impl IntoResponse> {
    let result = state.payment_use_cases.confirm_payment(&input).await?;
    Ok(Json(result))
}

/// POST /payments/create
async fn create_payment(
    State(state): State<AppState>,
    Json(input): Json<CreatePaymentInput>,
) -> AppResult<impl IntoResponse> {
    let record = state.payment_use_cases.create_payment(&input).await?;
    Ok(Json(PaymentResponse::from(record)))
}

/// GET /payments/status/{reference_id}
async fn payment_status(
    State(state): State<AppState>,
    Path(reference_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let record = state.payment_use_cases.payment_status(&reference_id).await?;
    Ok(Json(PaymentResponse::from(record)))
}

/// GET /payments/history?userEmail=...&page=1&perPage=20
async fn payment_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<impl IntoResponse> {
    let page = state
        .payment_use_cases
        .payment_history(
            &query.user_email,
            query.page.unwrap_or(1),
            query.per_page.unwrap_or(20),
        )
        .await?;

    Ok(Json(HistoryResponse {
        payments: page.records.into_iter().map(PaymentResponse::from).collect(),
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        total_pages: page.total_pages,
    }))
}

/// GET /payments/wechat/query?outTradeNo=...
async fn wechat_query(
    State(state): State<AppState>,
    Query(params): Query<WechatQueryParams>,
) -> AppResult<impl IntoResponse> {
    let order = state
        .payment_use_cases
        .query_order(PaymentMethod::WechatNative, &params.out_trade_no)
        .await?;
    Ok(Json(order))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/confirm", post(confirm_payment))
        .route("/create", post(create_payment))
        .route("/status/{reference_id}", get(payment_status))
        .route("/history", get(payment_history))
        .route("/wechat/query", get(wechat_query))
}
