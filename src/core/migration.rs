//! Legacy migration adapter - lazily upgrades old "gift" records.
//!
//! An older, simpler gift schema predates the item lifecycle and points
//! fields. Both shapes stay browsable and requestable: on first touch a gift
//! is copied forward into the items table under the same id, with defaults
//! filled in and a fixed legacy-donor identity attached as owner. Migration is
//! optimistic - when two callers race, the loser's insert hits the primary-key
//! constraint and is treated as success by re-reading the winner's row. The
//! gift row itself is never mutated or deleted; it remains the repeatable
//! lookup source of truth.

use crate::{
    core::item::{Actor, parse_category, parse_condition, record_event},
    entities::{Category, Condition, Gift, Item, ItemStatus, gift, item, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    SqlErr,
};

/// Fallback donor id when the legacy donor account does not exist.
pub const LEGACY_DONOR_ID: &str = "000000000000000000000000";
/// Well-known account that owns all migrated legacy items.
pub const LEGACY_DONOR_EMAIL: &str = "legacy-donor@giftlink.example";
/// Display name attached to migrated legacy items.
pub const LEGACY_DONOR_NAME: &str = "GiftLink Legacy";

/// Owner identity attached to migrated legacy items.
#[derive(Debug, Clone)]
pub(crate) struct LegacyDonor {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Resolves the legacy donor account, falling back to the fixed identity when
/// no such user exists.
pub(crate) async fn legacy_donor<C>(db: &C) -> Result<LegacyDonor>
where
    C: ConnectionTrait,
{
    let account = crate::entities::User::find()
        .filter(user::Column::Email.eq(LEGACY_DONOR_EMAIL))
        .one(db)
        .await?;

    Ok(account.map_or_else(
        || LegacyDonor {
            id: LEGACY_DONOR_ID.to_string(),
            email: LEGACY_DONOR_EMAIL.to_string(),
            name: LEGACY_DONOR_NAME.to_string(),
        },
        |user| {
            let name = user.display_name();
            LegacyDonor {
                id: user.id,
                email: user.email,
                name,
            }
        },
    ))
}

/// Synthesizes a current-schema item from a legacy gift, filling defaults for
/// every attribute the old shape may lack.
pub(crate) fn gift_to_item(gift: &gift::Model, donor: &LegacyDonor) -> item::Model {
    let listed_at = gift
        .date_added
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now);

    item::Model {
        id: gift.id.clone(),
        name: gift
            .name
            .clone()
            .unwrap_or_else(|| "Unnamed Item".to_string()),
        category: gift
            .category
            .as_deref()
            .and_then(parse_category)
            .unwrap_or(Category::Other),
        condition: gift
            .condition
            .as_deref()
            .and_then(parse_condition)
            .unwrap_or(Condition::Good),
        description: gift
            .description
            .clone()
            .unwrap_or_else(|| "No description available".to_string()),
        image: gift.image.clone().unwrap_or_default(),
        zipcode: gift.zipcode.clone().unwrap_or_else(|| "00000".to_string()),
        donor_id: donor.id.clone(),
        donor_email: donor.email.clone(),
        donor_name: donor.name.clone(),
        status: ItemStatus::Available,
        requested_by: None,
        requester_email: None,
        requester_name: None,
        reason: None,
        requested_at: None,
        approved_at: None,
        completed_at: None,
        is_deleted: false,
        deleted_at: None,
        deleted_by: None,
        is_legacy: true,
        created_at: listed_at,
        updated_at: listed_at,
    }
}

/// Looks up an item by id, migrating it from the legacy gifts store if the id
/// only resolves there.
///
/// Lookup order: items by id; gifts by id; gifts by the alternate legacy key.
/// A found gift is copied forward into the items table under its original id,
/// exactly once. A concurrent migration of the same id surfaces as a
/// unique-key conflict on insert and is treated as success: the now-existing
/// item row is re-read and returned.
pub async fn migrate_if_legacy<C>(db: &C, id: &str) -> Result<item::Model>
where
    C: ConnectionTrait,
{
    if let Some(existing) = Item::find_by_id(id).one(db).await? {
        return Ok(existing);
    }

    let gift = match Gift::find_by_id(id).one(db).await? {
        Some(gift) => gift,
        None => Gift::find()
            .filter(gift::Column::LegacyKey.eq(id))
            .one(db)
            .await?
            .ok_or_else(|| Error::ItemNotFound { id: id.to_string() })?,
    };

    let donor = legacy_donor(db).await?;
    let synthesized = gift_to_item(&gift, &donor);
    let item_id = synthesized.id.clone();

    match synthesized.into_active_model().reset_all().insert(db).await {
        Ok(migrated) => {
            tracing::info!(item_id = %migrated.id, name = %migrated.name, "migrated legacy gift to item catalog");
            record_event(
                db,
                &migrated.id,
                "migrated",
                Actor {
                    id: &donor.id,
                    email: &donor.email,
                    name: &donor.name,
                },
                "Legacy gift migrated to item catalog",
            )
            .await?;
            Ok(migrated)
        }
        // Another caller migrated the same id first; their row wins.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            tracing::debug!(item_id = %item_id, "legacy gift already migrated, re-reading");
            Item::find_by_id(&item_id)
                .one(db)
                .await?
                .ok_or(Error::Database(err))
        }
        Err(err) => Err(err.into()),
    }
}

/// Transforms every not-yet-migrated gift into a current-schema item for
/// display, without persisting anything. Used to merge legacy records into the
/// first page of the browse listing.
pub(crate) async fn unmigrated_gifts_as_items<C>(db: &C) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    let gifts = Gift::find().all(db).await?;
    if gifts.is_empty() {
        return Ok(Vec::new());
    }

    let migrated: std::collections::HashSet<String> = Item::find()
        .filter(item::Column::IsLegacy.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();

    let donor = legacy_donor(db).await?;
    Ok(gifts
        .iter()
        .filter(|gift| !migrated.contains(&gift.id))
        .map(|gift| gift_to_item(gift, &donor))
        .collect())
}
