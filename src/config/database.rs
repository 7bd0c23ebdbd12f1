//! Database configuration module for GiftLink.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! It provides functions for establishing database connections and creating all necessary tables
//! based on the entity definitions. The module uses `SeaORM`'s `Schema::create_table_from_entity`
//! method to automatically generate SQL statements from the entity models, ensuring that the
//! database schema matches the Rust struct definitions without requiring manual SQL.

use crate::entities::{Gift, Item, ItemEvent, PointsEntry, Request, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
///
/// This function looks for `DATABASE_URL` in the environment and falls back to
/// a default local `SQLite` file if not found.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/giftlink.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
/// This function handles connection errors and provides a clean interface for database access
/// throughout the application.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();

    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from entity definitions.
///
/// This function uses the `DeriveEntityModel` macros to automatically generate proper SQL
/// statements for table creation, ensuring the database schema matches the Rust struct
/// definitions. It creates tables for items, item events, requests, users, points entries,
/// and the legacy gifts store.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let item_table = schema.create_table_from_entity(Item);
    let item_event_table = schema.create_table_from_entity(ItemEvent);
    let request_table = schema.create_table_from_entity(Request);
    let user_table = schema.create_table_from_entity(User);
    let points_entry_table = schema.create_table_from_entity(PointsEntry);
    let gift_table = schema.create_table_from_entity(Gift);

    db.execute(builder.build(&item_table)).await?;
    db.execute(builder.build(&item_event_table)).await?;
    db.execute(builder.build(&request_table)).await?;
    db.execute(builder.build(&user_table)).await?;
    db.execute(builder.build(&points_entry_table)).await?;
    db.execute(builder.build(&gift_table)).await?;

    Ok(())
}
