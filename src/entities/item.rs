//! Item entity - a donor's listing in the marketplace.
//!
//! Items follow the lifecycle AVAILABLE → REQUESTED → APPROVED → COMPLETED,
//! with rejection returning a REQUESTED item to AVAILABLE. Donor and requester
//! identities are denormalized onto the row as a read optimization. The primary
//! key is an assignable string so legacy gift records can be copied forward
//! under their original id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle state of an item. `Completed` is terminal; rejection is not a
/// stored state but a transition back to `Available`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum ItemStatus {
    /// Listed and open for requests
    #[sea_orm(string_value = "AVAILABLE")]
    Available,
    /// Someone has requested this item (pending donor decision)
    #[sea_orm(string_value = "REQUESTED")]
    Requested,
    /// Donor approved the request (waiting for pickup/completion)
    #[sea_orm(string_value = "APPROVED")]
    Approved,
    /// Item has been successfully donated and received
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
}

/// Item category. `Other` exists only for migrated legacy records and is
/// rejected when listing a new item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Category {
    #[sea_orm(string_value = "Living")]
    Living,
    #[sea_orm(string_value = "Bedroom")]
    Bedroom,
    #[sea_orm(string_value = "Bathroom")]
    Bathroom,
    #[sea_orm(string_value = "Kitchen")]
    Kitchen,
    #[sea_orm(string_value = "Office")]
    Office,
    /// Legacy records without a recognized category
    #[sea_orm(string_value = "Other")]
    Other,
}

/// Physical condition of an item
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum Condition {
    #[sea_orm(string_value = "New")]
    New,
    #[sea_orm(string_value = "Like New")]
    LikeNew,
    #[sea_orm(string_value = "Good")]
    Good,
    #[sea_orm(string_value = "Fair")]
    Fair,
}

/// Item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier; assigned by the application, not auto-incremented
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Item name (e.g., "Sofa", "Dining Table")
    pub name: String,
    pub category: Category,
    pub condition: Condition,
    /// Detailed description of the item
    pub description: String,
    /// Image URL, empty if none was uploaded
    pub image: String,
    /// Location zipcode for pickup
    pub zipcode: String,
    /// User id of the donor who listed this item
    pub donor_id: String,
    /// Donor's email, denormalized for read convenience
    pub donor_email: String,
    /// Donor's display name, denormalized for read convenience
    pub donor_name: String,
    pub status: ItemStatus,
    /// User id of the current requester; `Some` iff status is
    /// `Requested` or `Approved`
    pub requested_by: Option<String>,
    pub requester_email: Option<String>,
    pub requester_name: Option<String>,
    /// Reason the requester gave for needing this item
    pub reason: Option<String>,
    pub requested_at: Option<DateTimeUtc>,
    pub approved_at: Option<DateTimeUtc>,
    pub completed_at: Option<DateTimeUtc>,
    /// Soft delete flag - if true, the item is hidden but data is preserved
    pub is_deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
    /// True for records copied forward from the legacy gifts store
    pub is_legacy: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One item has many history events
    #[sea_orm(has_many = "super::item_event::Entity")]
    Events,
    /// One item has many requests (one row per request attempt)
    #[sea_orm(has_many = "super::request::Entity")]
    Requests,
}

impl Related<super::item_event::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Events.def()
    }
}

impl Related<super::request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Requests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
