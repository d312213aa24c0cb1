use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::payments::{UserAccount, UserBalanceRepo},
};

fn row_to_account(row: sqlx::postgres::PgRow) -> UserAccount {
    UserAccount {
        id: row.get("id"),
        email: row.get("email"),
        credits: row.get("credits"),
    }
}

#[async_trait]
impl UserBalanceRepo for PostgresPersistence {
    async fn find_account(
        &self,
        email: Option<&str>,
        user_id: Option<Uuid>,
    ) -> AppResult<Option<UserAccount>> {
        if let Some(email) = email {
            let row = sqlx::query("SELECT id, email, credits FROM users WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::from)?;
            if let Some(row) = row {
                return Ok(Some(row_to_account(row)));
            }
        }
        if let Some(user_id) = user_id {
            let row = sqlx::query("SELECT id, email, credits FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(AppError::from)?;
            return Ok(row.map(row_to_account));
        }
        Ok(None)
    }

    async fn increment_credits(&self, account_id: Uuid, amount: i64) -> AppResult<i64> {
        // Single-statement increment; concurrent grants to the same
        // account serialize on the row lock instead of racing a
        // read-modify-write.
        let new_balance: i64 = sqlx::query_scalar(
            r#"
            UPDATE users SET
                credits = credits + $2,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING credits
            "#,
        )
        .bind(account_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;

        Ok(new_balance)
    }
}
