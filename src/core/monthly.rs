//! Monthly quota reset.
//!
//! Zeroes every user's monthly request counter in one blanket UPDATE. The
//! reset runs on a fixed monthly schedule and can also be invoked on demand
//! with identical semantics; running it twice in a period just re-zeroes
//! already-zero counters. It is the one operation permitted to race loosely
//! with per-user counter increments - a reset overlapping an in-flight
//! request may lose that increment, a documented best-effort limitation, but
//! the stored value is always the integer the single UPDATE wrote.

use crate::{
    entities::{User, user},
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ConnectionTrait, EntityTrait};

/// Outcome of a monthly quota reset run.
#[derive(Debug, Clone, Copy)]
pub struct MonthlyResetResult {
    /// Number of user rows updated
    pub modified_count: u64,
    /// Timestamp stamped into every user's `last_monthly_reset`
    pub reset_date: DateTime<Utc>,
}

/// Unconditionally sets every user's monthly request count to 0 and stamps
/// `last_monthly_reset` with `now`.
pub async fn reset_all_monthly_quotas<C>(db: &C, now: DateTime<Utc>) -> Result<MonthlyResetResult>
where
    C: ConnectionTrait,
{
    let update = User::update_many()
        .col_expr(user::Column::MonthlyRequestCount, Expr::value(0_i64))
        .col_expr(user::Column::LastMonthlyReset, Expr::value(Some(now)))
        .exec(db)
        .await?;

    tracing::info!(
        modified_count = update.rows_affected,
        reset_date = %now,
        "monthly request count reset completed"
    );

    Ok(MonthlyResetResult {
        modified_count: update.rows_affected,
        reset_date: now,
    })
}

/// Formats a reset result into a human-readable summary string, for logging
/// or operator output.
#[must_use]
pub fn format_reset_summary(result: &MonthlyResetResult) -> String {
    format!(
        "Monthly Reset - {} - {} users updated",
        result.reset_date.format("%B %Y"),
        result.modified_count
    )
}
