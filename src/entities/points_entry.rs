//! Points entry entity - the append-only per-user gift-points ledger.
//!
//! Every balance change appends one entry whose `balance` column records the
//! post-transaction balance, so the trail is reconstructible by inspection.
//! Entries are audit-only; the authoritative balance lives on the user row.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Points ledger entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "points_entries")]
pub struct Model {
    /// Unique identifier for the entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// User whose balance changed
    pub user_id: String,
    /// What caused the change (e.g., `"request"`, `"refund"`, `"reward"`)
    pub action: String,
    /// Signed delta; negative for debits
    pub amount: i64,
    /// Balance after this entry was applied
    pub balance: i64,
    /// Item involved, if any
    pub item_id: Option<String>,
    pub item_name: Option<String>,
    /// Human-readable explanation for display
    pub reason: String,
    pub timestamp: DateTimeUtc,
}

/// Defines relationships between `PointsEntry` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
