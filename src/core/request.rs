//! Request tracking - one row per request attempt.
//!
//! Requests are never deleted, only status-updated, so the table doubles as
//! the full ask history of the marketplace. The invariant enforced here is
//! at-most-one `Pending` row per (item, requester) pair: [`has_pending_request`]
//! is the uniqueness guard the settlement orchestrator consults before
//! creating a new row.

use crate::{
    entities::{
        Request, RequestStatus, item::Model as ItemModel, request, user::Model as UserModel,
    },
    errors::Result,
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, prelude::*,
};

/// True iff the user already has a `Pending` request for this item. A
/// rejected or approved attempt does not block a future ask on the same item.
pub async fn has_pending_request<C>(db: &C, item_id: &str, requester_id: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = Request::find()
        .filter(request::Column::ItemId.eq(item_id))
        .filter(request::Column::RequesterId.eq(requester_id))
        .filter(request::Column::Status.eq(RequestStatus::Pending))
        .count(db)
        .await?;

    Ok(count > 0)
}

/// Returns the user's most recent request for an item regardless of status.
/// Display helper, not a guard.
pub async fn find_request<C>(
    db: &C,
    item_id: &str,
    requester_id: &str,
) -> Result<Option<request::Model>>
where
    C: ConnectionTrait,
{
    Request::find()
        .filter(request::Column::ItemId.eq(item_id))
        .filter(request::Column::RequesterId.eq(requester_id))
        .order_by_desc(request::Column::RequestDate)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Returns every request attempt against an item, newest first.
pub async fn requests_for_item<C>(db: &C, item_id: &str) -> Result<Vec<request::Model>>
where
    C: ConnectionTrait,
{
    Request::find()
        .filter(request::Column::ItemId.eq(item_id))
        .order_by_desc(request::Column::RequestDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Returns every request a user has made, newest first.
pub async fn requests_by_requester<C>(db: &C, requester_id: &str) -> Result<Vec<request::Model>>
where
    C: ConnectionTrait,
{
    Request::find()
        .filter(request::Column::RequesterId.eq(requester_id))
        .order_by_desc(request::Column::RequestDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Inserts a new `Pending` request row, denormalizing item and donor identity
/// for display.
pub(crate) async fn create_request<C>(
    db: &C,
    item: &ItemModel,
    requester: &UserModel,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<request::Model>
where
    C: ConnectionTrait,
{
    request::ActiveModel {
        item_id: Set(item.id.clone()),
        item_name: Set(item.name.clone()),
        requester_id: Set(requester.id.clone()),
        requester_email: Set(requester.email.clone()),
        requester_name: Set(requester.display_name()),
        donor_id: Set(item.donor_id.clone()),
        donor_email: Set(item.donor_email.clone()),
        donor_name: Set(item.donor_name.clone()),
        reason: Set(reason.to_string()),
        status: Set(RequestStatus::Pending),
        request_date: Set(now),
        approval_date: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}

/// Resolves the item's `Pending` request to `Approved` or `Rejected`, stamping
/// the approval date. Returns the number of rows resolved.
pub(crate) async fn resolve_pending_request<C>(
    db: &C,
    item_id: &str,
    outcome: RequestStatus,
    now: DateTime<Utc>,
) -> Result<u64>
where
    C: ConnectionTrait,
{
    let update = Request::update_many()
        .col_expr(request::Column::Status, Expr::value(outcome))
        .col_expr(request::Column::ApprovalDate, Expr::value(Some(now)))
        .filter(request::Column::ItemId.eq(item_id))
        .filter(request::Column::Status.eq(RequestStatus::Pending))
        .exec(db)
        .await?;

    Ok(update.rows_affected)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{TEST_REASON, create_test_item, create_test_user, setup_test_db};

    #[tokio::test]
    async fn test_has_pending_request_tracks_status() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        let receiver = create_test_user(&db, "receiver@example.com").await?;
        let item = create_test_item(&db, &donor, "Sofa").await?;

        assert!(!has_pending_request(&db, &item.id, &receiver.id).await?);

        let now = Utc::now();
        create_request(&db, &item, &receiver, TEST_REASON, now).await?;
        assert!(has_pending_request(&db, &item.id, &receiver.id).await?);

        // A resolved request no longer blocks
        resolve_pending_request(&db, &item.id, RequestStatus::Rejected, now).await?;
        assert!(!has_pending_request(&db, &item.id, &receiver.id).await?);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_request_returns_most_recent() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        let receiver = create_test_user(&db, "receiver@example.com").await?;
        let item = create_test_item(&db, &donor, "Sofa").await?;

        let earlier = Utc::now() - chrono::Duration::minutes(5);
        create_request(&db, &item, &receiver, TEST_REASON, earlier).await?;
        resolve_pending_request(&db, &item.id, RequestStatus::Rejected, earlier).await?;
        create_request(&db, &item, &receiver, TEST_REASON, Utc::now()).await?;

        let found = find_request(&db, &item.id, &receiver.id).await?.unwrap();
        assert_eq!(found.status, RequestStatus::Pending);

        Ok(())
    }

    #[tokio::test]
    async fn test_find_request_none_for_stranger() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        let item = create_test_item(&db, &donor, "Sofa").await?;

        let found = find_request(&db, &item.id, "stranger").await?;
        assert!(found.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_create_request_denormalizes_identities() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        let receiver = create_test_user(&db, "receiver@example.com").await?;
        let item = create_test_item(&db, &donor, "Sofa").await?;

        let row = create_request(&db, &item, &receiver, TEST_REASON, Utc::now()).await?;

        assert_eq!(row.item_name, "Sofa");
        assert_eq!(row.requester_email, "receiver@example.com");
        assert_eq!(row.donor_email, "donor@example.com");
        assert_eq!(row.status, RequestStatus::Pending);
        assert!(row.approval_date.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_pending_request_only_touches_pending() -> Result<()> {
        let db = setup_test_db().await?;
        let donor = create_test_user(&db, "donor@example.com").await?;
        let receiver = create_test_user(&db, "receiver@example.com").await?;
        let item = create_test_item(&db, &donor, "Sofa").await?;

        let now = Utc::now();
        create_request(&db, &item, &receiver, TEST_REASON, now).await?;

        let resolved = resolve_pending_request(&db, &item.id, RequestStatus::Approved, now).await?;
        assert_eq!(resolved, 1);

        // Nothing left pending, second resolve is a no-op
        let resolved = resolve_pending_request(&db, &item.id, RequestStatus::Rejected, now).await?;
        assert_eq!(resolved, 0);

        let rows = requests_for_item(&db, &item.id).await?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RequestStatus::Approved);
        assert!(rows[0].approval_date.is_some());

        Ok(())
    }
}
