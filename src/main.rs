//! GiftLink maintenance binary.
//!
//! Runs the monthly request-quota reset against the configured database and
//! logs the outcome. Scheduled monthly (cron) in deployment, runnable on
//! demand with identical semantics.

use chrono::Utc;
use giftlink::config::database::create_connection;
use giftlink::core::monthly::{format_reset_summary, reset_all_monthly_quotas};
use giftlink::errors::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    dotenvy::dotenv().ok();

    let db = create_connection().await?;
    let result = reset_all_monthly_quotas(&db, Utc::now()).await?;
    tracing::info!("{}", format_reset_summary(&result));

    Ok(())
}
