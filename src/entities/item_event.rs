//! Item event entity - the append-only audit trail of an item.
//!
//! One row per action taken on an item ("created", "requested", "approved",
//! "rejected", "completed", "deleted", "migrated"). Rows are never mutated or
//! pruned; every item has at least its seed event from creation or migration
//! time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item history event database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_events")]
pub struct Model {
    /// Unique identifier for the event
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Item this event belongs to
    pub item_id: String,
    /// Action performed (e.g., `"requested"`, `"approved"`)
    pub action: String,
    /// User id of the actor
    pub actor_id: String,
    pub actor_email: String,
    pub actor_name: String,
    /// Free-form detail text about the action
    pub details: String,
    pub timestamp: DateTimeUtc,
}

/// Defines relationships between `ItemEvent` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each event belongs to one item
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
