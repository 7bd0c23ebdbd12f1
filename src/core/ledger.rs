//! Gift-points ledger - balance arithmetic and atomic balance updates.
//!
//! The pure [`apply_ledger_entry`] computes a new balance and the audit entry
//! recording it; it never rejects, callers pre-check sufficiency. The async
//! functions mutate the authoritative balance on the user row with a single
//! atomic SQL statement (`gift_points = gift_points + delta`) rather than a
//! read-modify-write cycle, so concurrent settlements cannot lose updates.
//! [`debit_guarded`] additionally folds the sufficiency and monthly-quota
//! checks into the UPDATE's WHERE clause - the double-spend guard is the
//! database's conditional write, not an application-level pre-read.

use crate::{
    entities::{User, points_entry, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, ConnectionTrait, EntityTrait, prelude::*};

/// Points debited from the requester when a request is submitted
pub const REQUEST_COST: i64 = 10;
/// Points credited to the requester when the donor approves
pub const APPROVAL_REWARD: i64 = 5;
/// Points credited back to the requester when the donor rejects
pub const REJECTION_REFUND: i64 = 10;
/// Points credited to the requester when the donor marks the handover complete
pub const COMPLETION_REWARD: i64 = 5;
/// Points credited when an administrator verifies a user
pub const VERIFICATION_BONUS: i64 = 50;

/// Descriptive fields carried onto a ledger entry.
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// What caused the change (e.g., `"request"`, `"refund"`, `"reward"`)
    pub action: &'static str,
    /// Item involved, if any
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    /// Human-readable explanation for display
    pub reason: String,
}

/// Result of applying a delta to a balance: the new balance and the entry
/// that records it.
#[derive(Debug)]
pub struct LedgerApplication {
    pub new_balance: i64,
    pub entry: points_entry::ActiveModel,
}

/// Computes `current_balance + delta` and constructs the matching audit entry.
///
/// Pure bookkeeping: no I/O, no rejection. The entry's `balance` column always
/// equals the returned `new_balance`, so the trail stays reconstructible.
/// Callers are responsible for pre-checking sufficiency on debits.
#[must_use]
pub fn apply_ledger_entry(
    user_id: &str,
    current_balance: i64,
    delta: i64,
    meta: EntryMeta,
) -> LedgerApplication {
    let new_balance = current_balance + delta;

    let entry = points_entry::ActiveModel {
        user_id: Set(user_id.to_string()),
        action: Set(meta.action.to_string()),
        amount: Set(delta),
        balance: Set(new_balance),
        item_id: Set(meta.item_id),
        item_name: Set(meta.item_name),
        reason: Set(meta.reason),
        timestamp: Set(Utc::now()),
        ..Default::default()
    };

    LedgerApplication { new_balance, entry }
}

/// Credits `amount` points to a user and appends the matching ledger entry.
///
/// The balance change is a single atomic `UPDATE users SET gift_points =
/// gift_points + amount`, then the row is re-read so the appended entry
/// records the authoritative post-credit balance.
pub async fn credit<C>(db: &C, user_id: &str, amount: i64, meta: EntryMeta) -> Result<i64>
where
    C: ConnectionTrait,
{
    let update = User::update_many()
        .col_expr(
            user::Column::GiftPoints,
            Expr::col(user::Column::GiftPoints).add(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if update.rows_affected == 0 {
        return Err(Error::UserNotFound {
            id: user_id.to_string(),
        });
    }

    let updated = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    let applied = apply_ledger_entry(user_id, updated.gift_points - amount, amount, meta);
    applied.entry.insert(db).await?;

    Ok(applied.new_balance)
}

/// Debits `cost` points and increments the monthly request counter, but only
/// if the user can afford it and is under their monthly limit.
///
/// Both guards live in the UPDATE's WHERE clause (`gift_points >= cost` and
/// `monthly_request_count < monthly_request_limit`), so two racing requests
/// cannot both spend the same points. Returns `Ok(None)` when the conditional
/// write matched no row; the caller re-reads to name the violated guard.
pub async fn debit_guarded<C>(
    db: &C,
    user_id: &str,
    cost: i64,
    meta: EntryMeta,
) -> Result<Option<i64>>
where
    C: ConnectionTrait,
{
    let update = User::update_many()
        .col_expr(
            user::Column::GiftPoints,
            Expr::col(user::Column::GiftPoints).sub(cost),
        )
        .col_expr(
            user::Column::MonthlyRequestCount,
            Expr::col(user::Column::MonthlyRequestCount).add(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::GiftPoints.gte(cost))
        .filter(
            Expr::col(user::Column::MonthlyRequestCount)
                .lt(Expr::col(user::Column::MonthlyRequestLimit)),
        )
        .exec(db)
        .await?;

    if update.rows_affected == 0 {
        return Ok(None);
    }

    let updated = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    let applied = apply_ledger_entry(user_id, updated.gift_points + cost, -cost, meta);
    applied.entry.insert(db).await?;

    Ok(Some(applied.new_balance))
}

/// Reverses a guarded debit: credits `cost` back and decrements the monthly
/// counter. Used only as the compensating step when a settlement fails after
/// its debit; no ledger entry is appended, matching the compensation's
/// internal nature.
pub async fn undo_debit<C>(db: &C, user_id: &str, cost: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let update = User::update_many()
        .col_expr(
            user::Column::GiftPoints,
            Expr::col(user::Column::GiftPoints).add(cost),
        )
        .col_expr(
            user::Column::MonthlyRequestCount,
            Expr::col(user::Column::MonthlyRequestCount).sub(1),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if update.rows_affected == 0 {
        return Err(Error::UserNotFound {
            id: user_id.to_string(),
        });
    }

    Ok(())
}

/// Retrieves a user's ledger entries, newest first.
pub async fn points_history<C>(db: &C, user_id: &str) -> Result<Vec<points_entry::Model>>
where
    C: ConnectionTrait,
{
    use sea_orm::QueryOrder;

    crate::entities::PointsEntry::find()
        .filter(points_entry::Column::UserId.eq(user_id))
        .order_by_desc(points_entry::Column::Timestamp)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{create_test_user, create_user_with_points, setup_test_db};

    fn meta(action: &'static str) -> EntryMeta {
        EntryMeta {
            action,
            item_id: None,
            item_name: None,
            reason: "test entry".to_string(),
        }
    }

    #[test]
    fn test_apply_ledger_entry_debit() {
        let applied = apply_ledger_entry("user1", 100, -REQUEST_COST, meta("request"));

        assert_eq!(applied.new_balance, 90);
        assert_eq!(applied.entry.amount.clone().unwrap(), -10);
        assert_eq!(applied.entry.balance.clone().unwrap(), 90);
        assert_eq!(applied.entry.action.clone().unwrap(), "request");
    }

    #[test]
    fn test_apply_ledger_entry_credit() {
        let applied = apply_ledger_entry("user1", 90, APPROVAL_REWARD, meta("approval_reward"));

        assert_eq!(applied.new_balance, 95);
        assert_eq!(applied.entry.balance.clone().unwrap(), 95);
    }

    #[test]
    fn test_apply_ledger_entry_never_rejects_overdraft() {
        // The primitive does not enforce the floor; callers pre-check.
        let applied = apply_ledger_entry("user1", 5, -REQUEST_COST, meta("request"));
        assert_eq!(applied.new_balance, -5);
        assert_eq!(applied.entry.balance.clone().unwrap(), -5);
    }

    #[tokio::test]
    async fn test_credit_updates_balance_and_appends_entry() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "alice@example.com").await?;

        let balance = credit(&db, &user.id, 5, meta("reward")).await?;
        assert_eq!(balance, user.gift_points + 5);

        let history = points_history(&db, &user.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 5);
        assert_eq!(history[0].balance, balance);

        Ok(())
    }

    #[tokio::test]
    async fn test_credit_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;

        let result = credit(&db, "missing", 5, meta("reward")).await;
        assert!(matches!(result, Err(Error::UserNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_debit_guarded_success() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user_with_points(&db, "bob@example.com", 100).await?;

        let balance = debit_guarded(&db, &user.id, REQUEST_COST, meta("request")).await?;
        assert_eq!(balance, Some(90));

        let updated = User::find_by_id(&user.id).one(&db).await?.unwrap();
        assert_eq!(updated.gift_points, 90);
        assert_eq!(updated.monthly_request_count, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_debit_guarded_insufficient_points() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user_with_points(&db, "carol@example.com", 5).await?;

        let balance = debit_guarded(&db, &user.id, REQUEST_COST, meta("request")).await?;
        assert_eq!(balance, None);

        // No mutation and no ledger entry on a failed guard
        let updated = User::find_by_id(&user.id).one(&db).await?.unwrap();
        assert_eq!(updated.gift_points, 5);
        assert_eq!(updated.monthly_request_count, 0);
        assert!(points_history(&db, &user.id).await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_debit_guarded_monthly_limit() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user_with_points(&db, "dave@example.com", 100).await?;

        // Exhaust the default limit of 5
        for _ in 0..5 {
            let debited = debit_guarded(&db, &user.id, REQUEST_COST, meta("request")).await?;
            assert!(debited.is_some());
        }

        let over = debit_guarded(&db, &user.id, REQUEST_COST, meta("request")).await?;
        assert_eq!(over, None);

        let updated = User::find_by_id(&user.id).one(&db).await?.unwrap();
        assert_eq!(updated.monthly_request_count, 5);
        assert_eq!(updated.gift_points, 50);

        Ok(())
    }

    #[tokio::test]
    async fn test_undo_debit_restores_balance_and_counter() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user_with_points(&db, "erin@example.com", 100).await?;

        debit_guarded(&db, &user.id, REQUEST_COST, meta("request")).await?;
        undo_debit(&db, &user.id, REQUEST_COST).await?;

        let updated = User::find_by_id(&user.id).one(&db).await?.unwrap();
        assert_eq!(updated.gift_points, 100);
        assert_eq!(updated.monthly_request_count, 0);

        Ok(())
    }
}
