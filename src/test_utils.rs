//! Shared helpers for unit tests.

use crate::{
    config::database::create_tables,
    core::item::{NewItem, create_item},
    entities::{gift, item, user},
    errors::Result,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, DatabaseConnection};

/// A request reason that satisfies the 20-500 character rule.
pub const TEST_REASON: &str = "I really need this item for my new apartment";

/// Creates an in-memory SQLite database with all tables.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    create_tables(&db).await?;
    Ok(db)
}

/// Creates a user with the default 100 points and a monthly limit of 5.
pub async fn create_test_user(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    create_user_with_points(db, email, 100).await
}

/// Creates a user with a chosen starting balance.
pub async fn create_user_with_points(
    db: &DatabaseConnection,
    email: &str,
    points: i64,
) -> Result<user::Model> {
    user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        email: Set(email.to_string()),
        first_name: Set("Test".to_string()),
        last_name: Set("User".to_string()),
        gift_points: Set(points),
        monthly_request_count: Set(0),
        monthly_request_limit: Set(5),
        is_verified: Set(false),
        is_blocked: Set(false),
        last_monthly_reset: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Valid listing input: Living-room category, Good condition.
pub fn new_item_data(name: &str) -> NewItem {
    NewItem {
        name: name.to_string(),
        category: "Living".to_string(),
        condition: "Good".to_string(),
        description: "A perfectly serviceable piece of furniture".to_string(),
        image: None,
        zipcode: "12345".to_string(),
    }
}

/// Lists an item through the normal creation path, history event included.
pub async fn create_test_item(
    db: &DatabaseConnection,
    donor: &user::Model,
    name: &str,
) -> Result<item::Model> {
    create_item(db, donor, new_item_data(name)).await
}

/// Seeds a fully-populated legacy gift record.
pub async fn seed_legacy_gift(
    db: &DatabaseConnection,
    id: &str,
    name: &str,
) -> Result<gift::Model> {
    gift::ActiveModel {
        id: Set(id.to_string()),
        legacy_key: Set(None),
        name: Set(Some(name.to_string())),
        category: Set(Some("Living".to_string())),
        condition: Set(Some("Good".to_string())),
        description: Set(Some("An old but sturdy piece".to_string())),
        image: Set(None),
        zipcode: Set(Some("54321".to_string())),
        date_added: Set(Some(1_600_000_000)),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Seeds a legacy gift with every optional attribute absent, to exercise
/// migration defaults.
pub async fn seed_sparse_legacy_gift(db: &DatabaseConnection, id: &str) -> Result<gift::Model> {
    gift::ActiveModel {
        id: Set(id.to_string()),
        legacy_key: Set(None),
        name: Set(None),
        category: Set(None),
        condition: Set(None),
        description: Set(None),
        image: Set(None),
        zipcode: Set(None),
        date_added: Set(None),
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
