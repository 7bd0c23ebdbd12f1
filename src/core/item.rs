//! Item operations - listing validation, lookups, and lifecycle guards.
//!
//! Guards encode who may act on an item and from which state, and return the
//! user-facing reason strings the calling UI displays verbatim. They never
//! mutate anything; the settlement orchestrator re-verifies each guard's state
//! check atomically at write time with a conditional update, so a passing
//! guard here is a fast pre-check, not the final word.

use crate::{
    core::migration,
    entities::{
        Category, Condition, Item, ItemEvent, ItemStatus, item, item_event,
        user::Model as UserModel,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{
    ActiveValue::Set, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

/// Input for listing a new item. Category and condition arrive as strings from
/// the route layer and are validated into their enums here.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub category: String,
    pub condition: String,
    pub description: String,
    /// Image URL from the upload pipeline, if any
    pub image: Option<String>,
    pub zipcode: String,
}

/// Filters and paging for the browse listing.
#[derive(Debug, Clone)]
pub struct ItemFilters {
    /// Status filter; defaults to `Available`. `None` means all statuses.
    pub status: Option<ItemStatus>,
    pub category: Option<Category>,
    pub condition: Option<Condition>,
    pub zipcode: Option<String>,
    /// 1-based page number
    pub page: u64,
    pub limit: u64,
}

impl Default for ItemFilters {
    fn default() -> Self {
        Self {
            status: Some(ItemStatus::Available),
            category: None,
            condition: None,
            zipcode: None,
            page: 1,
            limit: 20,
        }
    }
}

/// Paging metadata returned with a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

/// One page of the browse listing.
#[derive(Debug, Clone)]
pub struct ItemPage {
    pub items: Vec<item::Model>,
    pub pagination: Pagination,
}

/// Identity of the user performing an action, as recorded on history events.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub name: &'a str,
}

pub(crate) fn parse_category(value: &str) -> Option<Category> {
    match value {
        "Living" => Some(Category::Living),
        "Bedroom" => Some(Category::Bedroom),
        "Bathroom" => Some(Category::Bathroom),
        "Kitchen" => Some(Category::Kitchen),
        "Office" => Some(Category::Office),
        "Other" => Some(Category::Other),
        _ => None,
    }
}

pub(crate) fn parse_condition(value: &str) -> Option<Condition> {
    match value {
        "New" => Some(Condition::New),
        "Like New" => Some(Condition::LikeNew),
        "Good" => Some(Condition::Good),
        "Fair" => Some(Condition::Fair),
        _ => None,
    }
}

fn is_valid_zipcode(zipcode: &str) -> bool {
    let bytes = zipcode.as_bytes();
    match bytes.len() {
        5 => bytes.iter().all(u8::is_ascii_digit),
        10 => {
            bytes[5] == b'-'
                && bytes[..5].iter().all(u8::is_ascii_digit)
                && bytes[6..].iter().all(u8::is_ascii_digit)
        }
        _ => false,
    }
}

/// Validates listing input, collecting one message per offending field.
///
/// `Other` is a legacy-only category and is rejected for new listings.
pub fn validate_new_item(data: &NewItem) -> Result<(Category, Condition)> {
    let mut details = Vec::new();

    if data.name.trim().is_empty() {
        details.push("Item name is required".to_string());
    }

    let category = parse_category(data.category.trim());
    if !matches!(
        category,
        Some(
            Category::Living
                | Category::Bedroom
                | Category::Bathroom
                | Category::Kitchen
                | Category::Office
        )
    ) {
        details.push(
            "Valid category is required (Living, Bedroom, Bathroom, Kitchen, Office)".to_string(),
        );
    }

    let condition = parse_condition(data.condition.trim());
    if condition.is_none() {
        details.push("Valid condition is required (New, Like New, Good, Fair)".to_string());
    }

    if data.description.trim().is_empty() {
        details.push("Description is required".to_string());
    }

    if !is_valid_zipcode(data.zipcode.trim()) {
        details.push("Valid zipcode is required (e.g., 12345 or 12345-6789)".to_string());
    }

    match (category, condition) {
        (Some(category), Some(condition)) if details.is_empty() => Ok((category, condition)),
        _ => Err(Error::Validation { details }),
    }
}

/// Lists a new item for donation.
///
/// Validates the input, seeds the history with a "created" event, and returns
/// the stored model with status `Available`.
pub async fn create_item(
    db: &DatabaseConnection,
    donor: &UserModel,
    data: NewItem,
) -> Result<item::Model> {
    let (category, condition) = validate_new_item(&data)?;

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();

    let txn = db.begin().await?;

    let model = item::ActiveModel {
        id: Set(id.clone()),
        name: Set(data.name.trim().to_string()),
        category: Set(category),
        condition: Set(condition),
        description: Set(data.description.trim().to_string()),
        image: Set(data.image.unwrap_or_default()),
        zipcode: Set(data.zipcode.trim().to_string()),
        donor_id: Set(donor.id.clone()),
        donor_email: Set(donor.email.clone()),
        donor_name: Set(donor.display_name()),
        status: Set(ItemStatus::Available),
        requested_by: Set(None),
        requester_email: Set(None),
        requester_name: Set(None),
        reason: Set(None),
        requested_at: Set(None),
        approved_at: Set(None),
        completed_at: Set(None),
        is_deleted: Set(false),
        deleted_at: Set(None),
        deleted_by: Set(None),
        is_legacy: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    let donor_name = donor.display_name();
    record_event(
        &txn,
        &id,
        "created",
        Actor {
            id: &donor.id,
            email: &donor.email,
            name: &donor_name,
        },
        "Item listed for donation",
    )
    .await?;

    txn.commit().await?;

    Ok(model)
}

/// Finds an item by id, migrating it out of the legacy gifts store if that is
/// the only place the id resolves.
///
/// Soft-deleted items are reported as not found; only direct admin inspection
/// bypasses that filter.
pub async fn get_item_by_id(db: &DatabaseConnection, id: &str) -> Result<item::Model> {
    let item = migration::migrate_if_legacy(db, id).await?;

    if item.is_deleted {
        return Err(Error::ItemNotFound { id: id.to_string() });
    }

    Ok(item)
}

/// Returns one page of the browse listing.
///
/// Excludes soft-deleted items, newest first. On the first page of an
/// `Available` listing, not-yet-migrated legacy gifts are merged in as
/// transformed (but not persisted) items, so both schemas stay browsable.
pub async fn list_available(db: &DatabaseConnection, filters: ItemFilters) -> Result<ItemPage> {
    let page = filters.page.max(1);
    let limit = filters.limit.clamp(1, 100);

    let mut query = Item::find().filter(item::Column::IsDeleted.eq(false));
    if let Some(status) = filters.status {
        query = query.filter(item::Column::Status.eq(status));
    }
    if let Some(category) = filters.category {
        query = query.filter(item::Column::Category.eq(category));
    }
    if let Some(condition) = filters.condition {
        query = query.filter(item::Column::Condition.eq(condition));
    }
    if let Some(zipcode) = &filters.zipcode {
        query = query.filter(item::Column::Zipcode.eq(zipcode.clone()));
    }

    let paginator = query
        .order_by_desc(item::Column::CreatedAt)
        .paginate(db, limit);
    let totals = paginator.num_items_and_pages().await?;
    let mut items = paginator.fetch_page(page - 1).await?;

    if page == 1 && filters.status == Some(ItemStatus::Available) {
        items.extend(migration::unmigrated_gifts_as_items(db).await?);
    }

    Ok(ItemPage {
        items,
        pagination: Pagination {
            current_page: page,
            total_pages: totals.number_of_pages,
            total_items: totals.number_of_items,
            items_per_page: limit,
            has_next_page: page < totals.number_of_pages,
            has_prev_page: page > 1,
        },
    })
}

/// Returns a donor's own listings, newest first, excluding soft-deleted ones.
pub async fn donations_by_donor<C>(db: &C, donor_id: &str) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    Item::find()
        .filter(item::Column::DonorId.eq(donor_id))
        .filter(item::Column::IsDeleted.eq(false))
        .order_by_desc(item::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns an item's full history, oldest first.
pub async fn item_history<C>(db: &C, item_id: &str) -> Result<Vec<item_event::Model>>
where
    C: ConnectionTrait,
{
    ItemEvent::find()
        .filter(item_event::Column::ItemId.eq(item_id))
        .order_by_asc(item_event::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Appends one event to an item's history trail.
pub(crate) async fn record_event<C>(
    db: &C,
    item_id: &str,
    action: &str,
    actor: Actor<'_>,
    details: &str,
) -> Result<()>
where
    C: ConnectionTrait,
{
    item_event::ActiveModel {
        item_id: Set(item_id.to_string()),
        action: Set(action.to_string()),
        actor_id: Set(actor.id.to_string()),
        actor_email: Set(actor.email.to_string()),
        actor_name: Set(actor.name.to_string()),
        details: Set(details.to_string()),
        timestamp: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(())
}

/// Checks whether `user_id` may request this item: requesters cannot be the
/// donor, and only `Available` items accept requests.
pub fn can_request(item: &item::Model, user_id: &str) -> Result<()> {
    if item.donor_id == user_id {
        return Err(Error::guard("Cannot request your own item"));
    }

    if item.status != ItemStatus::Available {
        return Err(Error::guard("Item is not available for requests"));
    }

    Ok(())
}

/// Checks whether `user_id` may approve or reject the pending request: donor
/// only, and only while a request is pending.
pub fn can_approve(item: &item::Model, user_id: &str) -> Result<()> {
    if item.donor_id != user_id {
        return Err(Error::guard("Only the donor can approve requests"));
    }

    if item.status != ItemStatus::Requested {
        return Err(Error::guard("No pending request to approve"));
    }

    Ok(())
}

/// Checks whether `user_id` may mark the handover complete: donor only, from
/// `Approved` only.
pub fn can_complete(item: &item::Model, user_id: &str) -> Result<()> {
    if item.donor_id != user_id {
        return Err(Error::guard("Only the donor can mark items as completed"));
    }

    if item.status != ItemStatus::Approved {
        return Err(Error::guard("Item must be approved before completion"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{
        create_test_item, create_test_user, new_item_data, seed_legacy_gift, setup_test_db,
    };

    #[test]
    fn test_zipcode_validation() {
        assert!(is_valid_zipcode("12345"));
        assert!(is_valid_zipcode("12345-6789"));
        assert!(!is_valid_zipcode("1234"));
        assert!(!is_valid_zipcode("123456"));
        assert!(!is_valid_zipcode("12345-678"));
        assert!(!is_valid_zipcode("abcde"));
        assert!(!is_valid_zipcode("12345_6789"));
    }

    #[test]
    fn test_validate_new_item_collects_field_errors() {
        let data = NewItem {
            name: "  ".to_string(),
            category: "Garage".to_string(),
            condition: "Broken".to_string(),
            description: String::new(),
            image: None,
            zipcode: "12".to_string(),
        };

        let err = validate_new_item(&data).unwrap_err();
        match err {
            Error::Validation { details } => assert_eq!(details.len(), 5),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_new_item_rejects_legacy_category() {
        let mut data = new_item_data("Bookshelf");
        data.category = "Other".to_string();

        assert!(validate_new_item(&data).is_err());
    }

    #[test]
    fn test_validate_new_item_ok() {
        let data = new_item_data("Bookshelf");
        let (category, condition) = validate_new_item(&data).unwrap();
        assert_eq!(category, Category::Living);
        assert_eq!(condition, Condition::Good);
    }

    #[tokio::test]
    async fn test_create_item_seeds_history() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;

        let item = create_item(&db, &donor, new_item_data("Sofa")).await?;

        assert_eq!(item.status, ItemStatus::Available);
        assert_eq!(item.donor_id, donor.id);
        assert_eq!(item.requested_by, None);
        assert!(!item.is_deleted);
        assert!(!item.is_legacy);

        let history = item_history(&db, &item.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].action, "created");
        assert_eq!(history[0].actor_id, donor.id);

        Ok(())
    }

    #[tokio::test]
    async fn test_get_item_by_id_not_found() -> Result<()> {
        let db = setup_test_db().await?;

        let result = get_item_by_id(&db, "no-such-id").await;
        assert!(matches!(result, Err(Error::ItemNotFound { .. })));

        Ok(())
    }

    #[tokio::test]
    async fn test_list_available_filters_and_pagination() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;

        for n in 0..3 {
            create_test_item(&db, &donor, &format!("Item {n}")).await?;
        }

        let page = list_available(
            &db,
            ItemFilters {
                limit: 2,
                ..ItemFilters::default()
            },
        )
        .await?;

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.pagination.total_items, 3);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_next_page);
        assert!(!page.pagination.has_prev_page);

        // Category filter excludes everything (test items are Living)
        let empty = list_available(
            &db,
            ItemFilters {
                category: Some(Category::Kitchen),
                ..ItemFilters::default()
            },
        )
        .await?;
        assert!(empty.items.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_list_available_merges_legacy_gifts_on_first_page() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        create_test_item(&db, &donor, "Modern Item").await?;
        seed_legacy_gift(&db, "legacy-1", "Old Lamp").await?;

        let page = list_available(&db, ItemFilters::default()).await?;
        assert_eq!(page.items.len(), 2);
        assert!(page.items.iter().any(|i| i.is_legacy && i.id == "legacy-1"));

        // Page 2 never merges legacy gifts
        let page_two = list_available(
            &db,
            ItemFilters {
                page: 2,
                ..ItemFilters::default()
            },
        )
        .await?;
        assert!(page_two.items.iter().all(|i| !i.is_legacy));

        Ok(())
    }

    #[tokio::test]
    async fn test_donations_by_donor_excludes_other_donors() -> Result<()> {
        let db = setup_test_db().await?;
        let donor_a = create_test_user(&db, "a@example.com").await?;
        let donor_b = create_test_user(&db, "b@example.com").await?;

        create_test_item(&db, &donor_a, "Desk").await?;
        create_test_item(&db, &donor_b, "Chair").await?;

        let donations = donations_by_donor(&db, &donor_a.id).await?;
        assert_eq!(donations.len(), 1);
        assert_eq!(donations[0].name, "Desk");

        Ok(())
    }

    #[tokio::test]
    async fn test_guards_reject_wrong_actor_and_state() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        let item = create_test_item(&db, &donor, "Sofa").await?;

        // Donor cannot request their own item, whatever the state
        let err = can_request(&item, &donor.id).unwrap_err();
        assert_eq!(err.to_string(), "Cannot request your own item");

        // Strangers can request an available item
        assert!(can_request(&item, "someone-else").is_ok());

        // Nothing to approve or complete while available
        let err = can_approve(&item, &donor.id).unwrap_err();
        assert_eq!(err.to_string(), "No pending request to approve");
        let err = can_complete(&item, &donor.id).unwrap_err();
        assert_eq!(err.to_string(), "Item must be approved before completion");

        // Non-donors cannot moderate at all
        let err = can_approve(&item, "someone-else").unwrap_err();
        assert_eq!(err.to_string(), "Only the donor can approve requests");

        Ok(())
    }
}
