use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payments::{
        ClaimCreditsInput, CreatePaymentRecordInput, PaginatedPaymentRecords, PaymentRecordRepo,
    },
    domain::entities::payment_record::PaymentRecord,
};

const SELECT_COLS: &str = "id, reference_id, user_email, user_id, method, plan_id, \
     billing_cycle, amount_cents, currency, status, credits_applied, \
     provider_transaction_id, created_at, updated_at";

fn row_to_record(row: sqlx::postgres::PgRow) -> PaymentRecord {
    PaymentRecord {
        id: row.get("id"),
        reference_id: row.get("reference_id"),
        user_email: row.get("user_email"),
        user_id: row.get("user_id"),
        method: row.get("method"),
        plan_id: row.get("plan_id"),
        billing_cycle: row.get("billing_cycle"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: row.get("status"),
        credits_applied: row.get("credits_applied"),
        provider_transaction_id: row.get("provider_transaction_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl PaymentRecordRepo for PostgresPersistence {
    async fn find_by_reference(&self, reference_id: &str) -> AppResult<Option<PaymentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {SELECT_COLS} FROM payment_records WHERE reference_id = $1"
        ))
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(row.map(row_to_record))
    }

    async fn create_pending(&self, input: &CreatePaymentRecordInput) -> AppResult<PaymentRecord> {
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payment_records (
                id, reference_id, user_email, user_id, method, plan_id,
                billing_cycle, amount_cents, currency, status, credits_applied
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'pending', FALSE)
            ON CONFLICT (reference_id) DO UPDATE SET
                status = 'pending',
                user_email = EXCLUDED.user_email,
                user_id = COALESCE(EXCLUDED.user_id, payment_records.user_id),
                plan_id = EXCLUDED.plan_id,
                billing_cycle = EXCLUDED.billing_cycle,
                amount_cents = EXCLUDED.amount_cents,
                currency = EXCLUDED.currency,
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_records.credits_applied = FALSE
            RETURNING {SELECT_COLS}
            "#
        ))
        .bind(id)
        .bind(&input.reference_id)
        .bind(&input.user_email)
        .bind(input.user_id)
        .bind(input.method)
        .bind(&input.plan_id)
        .bind(input.billing_cycle)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        // The conditional upsert returns no row when the record was
        // already credited; re-creating such an order is a caller bug.
        match row {
            Some(row) => Ok(row_to_record(row)),
            None => Err(AppError::InvalidInput(
                "Payment reference already settled".into(),
            )),
        }
    }

    async fn claim_credits(&self, claim: &ClaimCreditsInput) -> AppResult<bool> {
        // Single conditional write. The WHERE on the conflict update is
        // what makes crediting at-most-once: only one caller ever sees
        // credits_applied flip from FALSE, everyone else gets zero rows.
        let id = Uuid::new_v4();
        let result = sqlx::query(
            r#"
            INSERT INTO payment_records (
                id, reference_id, user_email, user_id, method, plan_id,
                billing_cycle, amount_cents, currency, status, credits_applied,
                provider_transaction_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 'verified', TRUE, $10)
            ON CONFLICT (reference_id) DO UPDATE SET
                status = 'verified',
                credits_applied = TRUE,
                user_email = EXCLUDED.user_email,
                user_id = COALESCE(EXCLUDED.user_id, payment_records.user_id),
                plan_id = EXCLUDED.plan_id,
                billing_cycle = EXCLUDED.billing_cycle,
                amount_cents = EXCLUDED.amount_cents,
                currency = EXCLUDED.currency,
                provider_transaction_id = COALESCE(
                    EXCLUDED.provider_transaction_id,
                    payment_records.provider_transaction_id
                ),
                updated_at = CURRENT_TIMESTAMP
            WHERE payment_records.credits_applied = FALSE
            "#,
        )
        .bind(id)
        .bind(&claim.reference_id)
        .bind(&claim.user_email)
        .bind(claim.user_id)
        .bind(claim.method)
        .bind(&claim.plan_id)
        .bind(claim.billing_cycle)
        .bind(claim.amount_cents)
        .bind(&claim.currency)
        .bind(&claim.provider_transaction_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, reference_id: &str) -> AppResult<()> {
        // Never downgrades a record that already granted credits.
        let result = sqlx::query(
            r#"
            UPDATE payment_records SET
                status = 'failed',
                updated_at = CURRENT_TIMESTAMP
            WHERE reference_id = $1 AND credits_applied = FALSE
            "#,
        )
        .bind(reference_id)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;

        if result.rows_affected() == 0 {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM payment_records WHERE reference_id = $1")
                    .bind(reference_id)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(AppError::from)?;
            if exists.is_none() {
                return Err(AppError::NotFound);
            }
            tracing::warn!(
                reference_id = %reference_id,
                "Ignored failure notification for an already-credited payment"
            );
        }
        Ok(())
    }

    async fn list_by_email(
        &self,
        user_email: &str,
        page: i32,
        per_page: i32,
    ) -> AppResult<PaginatedPaymentRecords> {
        // i64 arithmetic: page is caller-controlled and i32 offsets overflow.
        let offset = (i64::from(page) - 1) * i64::from(per_page);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payment_records WHERE user_email = $1")
                .bind(user_email)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {SELECT_COLS} FROM payment_records
            WHERE user_email = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_email)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;

        let records: Vec<PaymentRecord> = rows.into_iter().map(row_to_record).collect();
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i32;

        Ok(PaginatedPaymentRecords {
            records,
            total,
            page,
            per_page,
            total_pages,
        })
    }
}
