//! User accounts - registration, lookup, verification, and moderation flags.

use crate::{
    core::ledger::{self, VERIFICATION_BONUS},
    entities::{User, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};

/// Starting gift-points balance for a new account
pub const DEFAULT_GIFT_POINTS: i64 = 100;
/// Monthly request allowance for an unverified account
pub const DEFAULT_MONTHLY_LIMIT: i64 = 5;
/// Raised monthly request allowance for a verified account
pub const VERIFIED_MONTHLY_LIMIT: i64 = 10;

/// Registration input.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Registers a new account with the default balance and quota. The email
/// column is unique, so a duplicate registration fails at insert.
pub async fn create_user<C>(db: &C, data: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let created = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(data.email),
        first_name: Set(data.first_name),
        last_name: Set(data.last_name),
        gift_points: Set(DEFAULT_GIFT_POINTS),
        monthly_request_count: Set(0),
        monthly_request_limit: Set(DEFAULT_MONTHLY_LIMIT),
        is_verified: Set(false),
        is_blocked: Set(false),
        last_monthly_reset: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await?;

    tracing::info!(user_id = %created.id, email = %created.email, "registered new user");
    Ok(created)
}

pub async fn get_user<C>(db: &C, id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    User::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound { id: id.to_string() })
}

pub async fn get_user_by_email<C>(db: &C, email: &str) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::Email.eq(email))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Marks a user verified: raises the monthly allowance and credits the
/// one-time verification bonus with a ledger entry.
pub async fn verify_user<C>(db: &C, id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = get_user(db, id).await?;
    if user.is_verified {
        return Err(Error::guard("User is already verified"));
    }

    user::ActiveModel {
        id: Set(user.id.clone()),
        is_verified: Set(true),
        monthly_request_limit: Set(VERIFIED_MONTHLY_LIMIT),
        ..Default::default()
    }
    .update(db)
    .await?;

    ledger::credit(
        db,
        &user.id,
        VERIFICATION_BONUS,
        ledger::EntryMeta {
            action: "verification",
            item_id: None,
            item_name: None,
            reason: "Account verification bonus".to_string(),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "user verified");
    get_user(db, id).await
}

/// Blocks a user from making new requests. Existing requests are untouched.
pub async fn block_user<C>(db: &C, id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    set_blocked(db, id, true).await
}

/// Lifts a block.
pub async fn unblock_user<C>(db: &C, id: &str) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    set_blocked(db, id, false).await
}

async fn set_blocked<C>(db: &C, id: &str, blocked: bool) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    let user = get_user(db, id).await?;

    let updated = user::ActiveModel {
        id: Set(user.id),
        is_blocked: Set(blocked),
        ..Default::default()
    }
    .update(db)
    .await?;

    tracing::info!(user_id = %updated.id, blocked, "updated user block flag");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::ledger::points_history;
    use crate::test_utils::setup_test_db;

    fn registration(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_user_defaults() -> Result<()> {
        let db = setup_test_db().await?;

        let user = create_user(&db, registration("new@example.com")).await?;
        assert_eq!(user.gift_points, DEFAULT_GIFT_POINTS);
        assert_eq!(user.monthly_request_count, 0);
        assert_eq!(user.monthly_request_limit, DEFAULT_MONTHLY_LIMIT);
        assert!(!user.is_verified);
        assert!(!user.is_blocked);
        assert_eq!(user.display_name(), "Test User");

        Ok(())
    }

    #[tokio::test]
    async fn test_create_user_duplicate_email() -> Result<()> {
        let db = setup_test_db().await?;

        create_user(&db, registration("dup@example.com")).await?;
        let result = create_user(&db, registration("dup@example.com")).await;
        assert!(matches!(result, Err(Error::Database(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_get_user_by_email() -> Result<()> {
        let db = setup_test_db().await?;
        let created = create_user(&db, registration("find@example.com")).await?;

        let found = get_user_by_email(&db, "find@example.com").await?.unwrap();
        assert_eq!(found.id, created.id);
        assert!(get_user_by_email(&db, "other@example.com").await?.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_user_raises_limit_and_pays_bonus() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, registration("verify@example.com")).await?;

        let verified = verify_user(&db, &user.id).await?;
        assert!(verified.is_verified);
        assert_eq!(verified.monthly_request_limit, VERIFIED_MONTHLY_LIMIT);
        assert_eq!(verified.gift_points, DEFAULT_GIFT_POINTS + VERIFICATION_BONUS);

        let history = points_history(&db, &user.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "verification");
        assert_eq!(history[0].amount, VERIFICATION_BONUS);

        Ok(())
    }

    #[tokio::test]
    async fn test_verify_user_twice() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, registration("once@example.com")).await?;

        verify_user(&db, &user.id).await?;
        let result = verify_user(&db, &user.id).await;
        assert!(matches!(result, Err(Error::Guard { .. })));

        // The bonus was paid exactly once
        let fresh = get_user(&db, &user.id).await?;
        assert_eq!(fresh.gift_points, DEFAULT_GIFT_POINTS + VERIFICATION_BONUS);

        Ok(())
    }

    #[tokio::test]
    async fn test_block_and_unblock() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_user(&db, registration("mod@example.com")).await?;

        let blocked = block_user(&db, &user.id).await?;
        assert!(blocked.is_blocked);

        let unblocked = unblock_user(&db, &user.id).await?;
        assert!(!unblocked.is_blocked);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;

        let result = get_user(&db, "missing").await;
        assert!(matches!(result, Err(Error::UserNotFound { .. })));

        Ok(())
    }
}
