//! Settlement orchestrator - the guarded lifecycle transitions.
//!
//! Every transition is a compare-and-swap on the item's status column
//! (`UPDATE items SET ... WHERE id = ? AND status = <expected>`, checked via
//! `rows_affected`), never a read-then-write. The pure guards in `core::item`
//! run first to produce a user-facing reason, but the CAS is what actually
//! decides a race: of two concurrent approvals, exactly one matches the
//! `Requested` row.
//!
//! `request_item` is the one multi-step settlement: the guarded points debit
//! commits before the item transaction. If the transaction then fails, the
//! debit is compensated with a best-effort credit-back; a failed compensation
//! is the single unrecoverable case and surfaces as [`Error::Compensation`].

use crate::{
    core::{
        item::{self, Actor},
        ledger::{
            self, APPROVAL_REWARD, COMPLETION_REWARD, EntryMeta, REJECTION_REFUND, REQUEST_COST,
        },
        migration, request as request_tracker, user as user_ops,
    },
    entities::{Item, ItemStatus, RequestStatus, User, item as item_entity, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, TransactionTrait};

/// Outcome of a successful lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReceipt {
    pub item_id: String,
    pub status: ItemStatus,
}

const MIN_REASON_LEN: usize = 20;
const MAX_REASON_LEN: usize = 500;

fn validate_reason(reason: &str) -> Result<&str> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation {
            details: vec!["Reason is required".to_string()],
        });
    }
    if trimmed.len() < MIN_REASON_LEN || trimmed.len() > MAX_REASON_LEN {
        return Err(Error::Validation {
            details: vec!["Reason must be 20-500 characters".to_string()],
        });
    }
    Ok(trimmed)
}

/// Requests an item on behalf of `requester_id`, debiting the request cost.
///
/// Order of operations: validate the reason, migrate the item out of the
/// legacy store if needed, run the guards, then debit 10 points and increment
/// the monthly counter in one conditional write. Only after the debit lands
/// does a transaction insert the `Pending` request row, CAS the item
/// `Available` -> `Requested`, and append the "requested" history event. A
/// failure in that transaction triggers a compensating credit-back of the
/// debit (no ledger entry; the user-visible trail shows nothing happened).
pub async fn request_item(
    db: &DatabaseConnection,
    item_id: &str,
    requester_id: &str,
    reason: &str,
) -> Result<TransitionReceipt> {
    let reason = validate_reason(reason)?;

    let requester = user_ops::get_user(db, requester_id).await?;
    if requester.is_blocked {
        return Err(Error::guard("Your account is blocked from making requests"));
    }

    let item = migration::migrate_if_legacy(db, item_id).await?;
    if item.is_deleted {
        return Err(Error::ItemNotFound {
            id: item_id.to_string(),
        });
    }

    item::can_request(&item, requester_id)?;

    if request_tracker::has_pending_request(db, &item.id, requester_id).await? {
        return Err(Error::guard("You have already requested this item"));
    }

    settle_request(db, &item, &requester, reason).await
}

/// The debit plus the transactional finalize, with the compensating
/// credit-back when the finalize fails after the debit has landed.
async fn settle_request(
    db: &DatabaseConnection,
    item: &item_entity::Model,
    requester: &user::Model,
    reason: &str,
) -> Result<TransitionReceipt> {
    let debited = ledger::debit_guarded(
        db,
        &requester.id,
        REQUEST_COST,
        EntryMeta {
            action: "request",
            item_id: Some(item.id.clone()),
            item_name: Some(item.name.clone()),
            reason: format!("Requested item: {}", item.name),
        },
    )
    .await?;

    if debited.is_none() {
        // The conditional write matched no row; re-read to name the guard.
        let fresh = user_ops::get_user(db, &requester.id).await?;
        if fresh.gift_points < REQUEST_COST {
            return Err(Error::guard(format!(
                "Insufficient points. You need at least {REQUEST_COST} points to request an item."
            )));
        }
        return Err(Error::guard(format!(
            "Monthly request limit reached. You can make {} requests per month.",
            fresh.monthly_request_limit
        )));
    }

    match finalize_request(db, item, requester, reason).await {
        Ok(receipt) => Ok(receipt),
        Err(err) => {
            if let Err(comp_err) = ledger::undo_debit(db, &requester.id, REQUEST_COST).await {
                tracing::error!(
                    user_id = %requester.id,
                    amount = REQUEST_COST,
                    error = %comp_err,
                    "failed to return points after settlement failure"
                );
                return Err(Error::Compensation {
                    user_id: requester.id.clone(),
                    amount: REQUEST_COST,
                });
            }
            tracing::info!(user_id = %requester.id, "points returned after settlement failure");
            Err(err)
        }
    }
}

/// The post-debit stage of a request: request row, item CAS, history event,
/// all in one transaction.
async fn finalize_request(
    db: &DatabaseConnection,
    item: &item_entity::Model,
    requester: &user::Model,
    reason: &str,
) -> Result<TransitionReceipt> {
    let now = Utc::now();
    let txn = db.begin().await?;

    request_tracker::create_request(&txn, item, requester, reason, now).await?;

    let update = Item::update_many()
        .col_expr(item_entity::Column::Status, Expr::value(ItemStatus::Requested))
        .col_expr(
            item_entity::Column::RequestedBy,
            Expr::value(Some(requester.id.clone())),
        )
        .col_expr(
            item_entity::Column::RequesterEmail,
            Expr::value(Some(requester.email.clone())),
        )
        .col_expr(
            item_entity::Column::RequesterName,
            Expr::value(Some(requester.display_name())),
        )
        .col_expr(
            item_entity::Column::Reason,
            Expr::value(Some(reason.to_string())),
        )
        .col_expr(item_entity::Column::RequestedAt, Expr::value(Some(now)))
        .col_expr(item_entity::Column::UpdatedAt, Expr::value(now))
        .filter(item_entity::Column::Id.eq(&item.id))
        .filter(item_entity::Column::Status.eq(ItemStatus::Available))
        .filter(item_entity::Column::IsDeleted.eq(false))
        .exec(&txn)
        .await?;

    if update.rows_affected == 0 {
        // Lost the race (a concurrent request or soft delete landed first);
        // dropping the transaction rolls back the request row.
        return Err(Error::guard("Item is not available for requests"));
    }

    let requester_name = requester.display_name();
    item::record_event(
        &txn,
        &item.id,
        "requested",
        Actor {
            id: &requester.id,
            email: &requester.email,
            name: &requester_name,
        },
        &format!("Item requested by {requester_name}"),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(item_id = %item.id, requester_id = %requester.id, "item requested");
    Ok(TransitionReceipt {
        item_id: item.id.clone(),
        status: ItemStatus::Requested,
    })
}

/// Approves the pending request: CAS `Requested` -> `Approved`, credit the
/// requester the approval reward, resolve the request row, append history.
pub async fn approve_request(
    db: &DatabaseConnection,
    item_id: &str,
    actor: &user::Model,
) -> Result<TransitionReceipt> {
    let item = item::get_item_by_id(db, item_id).await?;
    item::can_approve(&item, &actor.id)?;
    finalize_approval(db, &item, actor).await
}

/// The transactional stage of an approval, against the snapshot's requester.
///
/// The CAS conditions on `requested_by` as well as status: a snapshot made
/// stale by a reject-then-rerequest names the old requester and matches
/// nothing, so the reward can never be paid to the wrong user.
async fn finalize_approval(
    db: &DatabaseConnection,
    item: &item_entity::Model,
    actor: &user::Model,
) -> Result<TransitionReceipt> {
    let requester_id = item
        .requested_by
        .clone()
        .ok_or_else(|| Error::guard("No pending request to approve"))?;

    let now = Utc::now();
    let txn = db.begin().await?;

    let update = Item::update_many()
        .col_expr(item_entity::Column::Status, Expr::value(ItemStatus::Approved))
        .col_expr(item_entity::Column::ApprovedAt, Expr::value(Some(now)))
        .col_expr(item_entity::Column::UpdatedAt, Expr::value(now))
        .filter(item_entity::Column::Id.eq(&item.id))
        .filter(item_entity::Column::Status.eq(ItemStatus::Requested))
        .filter(item_entity::Column::RequestedBy.eq(requester_id.as_str()))
        .exec(&txn)
        .await?;

    if update.rows_affected == 0 {
        return Err(Error::guard("No pending request to approve"));
    }

    // Credit only after the CAS wins, so a raced approval cannot pay twice.
    ledger::credit(
        &txn,
        &requester_id,
        APPROVAL_REWARD,
        EntryMeta {
            action: "approval_reward",
            item_id: Some(item.id.clone()),
            item_name: Some(item.name.clone()),
            reason: format!("Request approved - reward for: {}", item.name),
        },
    )
    .await?;

    request_tracker::resolve_pending_request(&txn, &item.id, RequestStatus::Approved, now).await?;

    let requester_name = item.requester_name.clone().unwrap_or_default();
    item::record_event(
        &txn,
        &item.id,
        "approved",
        Actor {
            id: &actor.id,
            email: &actor.email,
            name: &actor.display_name(),
        },
        &format!("Request approved for {requester_name}"),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(item_id = %item.id, requester_id = %requester_id, "request approved");
    Ok(TransitionReceipt {
        item_id: item.id.clone(),
        status: ItemStatus::Approved,
    })
}

/// Rejects the pending request: CAS `Requested` -> `Available` clearing the
/// requester fields, refund the request cost, hand back the monthly quota
/// slot, resolve the request row, append history.
pub async fn reject_request(
    db: &DatabaseConnection,
    item_id: &str,
    actor: &user::Model,
) -> Result<TransitionReceipt> {
    let item = item::get_item_by_id(db, item_id).await?;
    item::can_approve(&item, &actor.id)?;
    finalize_rejection(db, &item, actor).await
}

/// The transactional stage of a rejection. Conditions on `requested_by` for
/// the same reason as [`finalize_approval`]: the refund must go to the
/// requester the CAS actually displaced.
async fn finalize_rejection(
    db: &DatabaseConnection,
    item: &item_entity::Model,
    actor: &user::Model,
) -> Result<TransitionReceipt> {
    let requester_id = item
        .requested_by
        .clone()
        .ok_or_else(|| Error::guard("No pending request to approve"))?;

    let now = Utc::now();
    let txn = db.begin().await?;

    let update = Item::update_many()
        .col_expr(
            item_entity::Column::Status,
            Expr::value(ItemStatus::Available),
        )
        .col_expr(item_entity::Column::RequestedBy, Expr::value(None::<String>))
        .col_expr(
            item_entity::Column::RequesterEmail,
            Expr::value(None::<String>),
        )
        .col_expr(
            item_entity::Column::RequesterName,
            Expr::value(None::<String>),
        )
        .col_expr(item_entity::Column::Reason, Expr::value(None::<String>))
        .col_expr(
            item_entity::Column::RequestedAt,
            Expr::value(None::<DateTime<Utc>>),
        )
        .col_expr(item_entity::Column::UpdatedAt, Expr::value(now))
        .filter(item_entity::Column::Id.eq(&item.id))
        .filter(item_entity::Column::Status.eq(ItemStatus::Requested))
        .filter(item_entity::Column::RequestedBy.eq(requester_id.as_str()))
        .exec(&txn)
        .await?;

    if update.rows_affected == 0 {
        return Err(Error::guard("No pending request to approve"));
    }

    ledger::credit(
        &txn,
        &requester_id,
        REJECTION_REFUND,
        EntryMeta {
            action: "refund",
            item_id: Some(item.id.clone()),
            item_name: Some(item.name.clone()),
            reason: format!("Request rejected - refund for: {}", item.name),
        },
    )
    .await?;

    // Hand back the quota slot. Unconditional; racing a monthly reset can
    // briefly leave the counter negative, which the next reset corrects.
    User::update_many()
        .col_expr(
            user::Column::MonthlyRequestCount,
            Expr::col(user::Column::MonthlyRequestCount).sub(1),
        )
        .filter(user::Column::Id.eq(&requester_id))
        .exec(&txn)
        .await?;

    request_tracker::resolve_pending_request(&txn, &item.id, RequestStatus::Rejected, now).await?;

    let requester_name = item.requester_name.clone().unwrap_or_default();
    item::record_event(
        &txn,
        &item.id,
        "rejected",
        Actor {
            id: &actor.id,
            email: &actor.email,
            name: &actor.display_name(),
        },
        &format!("Request rejected for {requester_name}"),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(item_id = %item.id, requester_id = %requester_id, "request rejected");
    Ok(TransitionReceipt {
        item_id: item.id.clone(),
        status: ItemStatus::Available,
    })
}

/// Marks the handover complete: CAS `Approved` -> `Completed`, credit the
/// receiver the completion reward, append history.
pub async fn complete_item(
    db: &DatabaseConnection,
    item_id: &str,
    actor: &user::Model,
) -> Result<TransitionReceipt> {
    let item = item::get_item_by_id(db, item_id).await?;
    item::can_complete(&item, &actor.id)?;

    let receiver_id = item
        .requested_by
        .clone()
        .ok_or_else(|| Error::guard("Item must be approved before completion"))?;

    let now = Utc::now();
    let txn = db.begin().await?;

    let update = Item::update_many()
        .col_expr(
            item_entity::Column::Status,
            Expr::value(ItemStatus::Completed),
        )
        .col_expr(item_entity::Column::CompletedAt, Expr::value(Some(now)))
        .col_expr(item_entity::Column::UpdatedAt, Expr::value(now))
        .filter(item_entity::Column::Id.eq(&item.id))
        .filter(item_entity::Column::Status.eq(ItemStatus::Approved))
        .exec(&txn)
        .await?;

    if update.rows_affected == 0 {
        return Err(Error::guard("Item must be approved before completion"));
    }

    ledger::credit(
        &txn,
        &receiver_id,
        COMPLETION_REWARD,
        EntryMeta {
            action: "reward",
            item_id: Some(item.id.clone()),
            item_name: Some(item.name.clone()),
            reason: format!("Reward for successfully receiving: {}", item.name),
        },
    )
    .await?;

    let requester_name = item.requester_name.clone().unwrap_or_default();
    item::record_event(
        &txn,
        &item.id,
        "completed",
        Actor {
            id: &actor.id,
            email: &actor.email,
            name: &actor.display_name(),
        },
        &format!("Item marked as completed for {requester_name}"),
    )
    .await?;

    txn.commit().await?;

    tracing::info!(item_id = %item.id, receiver_id = %receiver_id, "item completed");
    Ok(TransitionReceipt {
        item_id: item.id.clone(),
        status: ItemStatus::Completed,
    })
}

/// Soft-deletes an available listing. Donor only; items with an active
/// request or handover cannot be withdrawn.
pub async fn delete_item(
    db: &DatabaseConnection,
    item_id: &str,
    actor: &user::Model,
) -> Result<TransitionReceipt> {
    let item = item::get_item_by_id(db, item_id).await?;

    if item.donor_id != actor.id {
        return Err(Error::guard("Only the donor can delete this item"));
    }

    let now = Utc::now();
    let txn = db.begin().await?;

    let update = Item::update_many()
        .col_expr(item_entity::Column::IsDeleted, Expr::value(true))
        .col_expr(item_entity::Column::DeletedAt, Expr::value(Some(now)))
        .col_expr(
            item_entity::Column::DeletedBy,
            Expr::value(Some(actor.email.clone())),
        )
        .col_expr(item_entity::Column::UpdatedAt, Expr::value(now))
        .filter(item_entity::Column::Id.eq(&item.id))
        .filter(item_entity::Column::Status.eq(ItemStatus::Available))
        .filter(item_entity::Column::IsDeleted.eq(false))
        .exec(&txn)
        .await?;

    if update.rows_affected == 0 {
        return Err(Error::guard("Only available items can be deleted"));
    }

    item::record_event(
        &txn,
        &item.id,
        "deleted",
        Actor {
            id: &actor.id,
            email: &actor.email,
            name: &actor.display_name(),
        },
        "Item deleted by donor",
    )
    .await?;

    txn.commit().await?;

    tracing::info!(item_id = %item.id, donor_id = %actor.id, "item deleted");
    Ok(TransitionReceipt {
        item_id: item.id.clone(),
        status: ItemStatus::Available,
    })
}
