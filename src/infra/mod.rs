use crate::{adapters::persistence::PostgresPersistence, infra::db::init_db};

pub mod alipay_sandbox_client;
pub mod app;
pub mod config;
pub mod db;
pub mod setup;
pub mod stripe_client;
pub mod stripe_verifier;
pub mod wechat_client;

pub async fn postgres_persistence(database_url: &str) -> anyhow::Result<PostgresPersistence> {
    let pool = init_db(database_url).await?;
    let persistence = PostgresPersistence::new(pool);
    Ok(persistence)
}
