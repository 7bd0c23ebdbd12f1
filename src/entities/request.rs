//! Request entity - a receiver's ask against one item.
//!
//! One row per request attempt, never deleted, only status-updated. Both item
//! and donor identity are denormalized for display. At most one row per
//! (item, requester) pair may be `Pending` at any time; a rejected or approved
//! row does not block a later request on the same item once it returns to
//! AVAILABLE.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// State of a single request attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum RequestStatus {
    /// Submitted, waiting for donor decision
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Donor approved the request
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Donor rejected the request
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
}

/// Request database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "requests")]
pub struct Model {
    /// Unique identifier for the request
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item being requested
    pub item_id: String,
    /// Item name, denormalized for display
    pub item_name: String,
    pub requester_id: String,
    pub requester_email: String,
    pub requester_name: String,
    pub donor_id: String,
    pub donor_email: String,
    pub donor_name: String,
    /// Why the requester needs this item
    pub reason: String,
    pub status: RequestStatus,
    pub request_date: DateTimeUtc,
    /// When the donor approved or rejected; `None` while pending
    pub approval_date: Option<DateTimeUtc>,
}

/// Defines relationships between Request and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each request targets one item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id"
    )]
    Item,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
