//! User entity - the points-relevant projection of a user record.
//!
//! The auth/profile subsystem owns the full user; this core reads and mutates
//! only the gift-points economy fields. `gift_points` is the authoritative
//! balance - the points ledger is audit-only and is never replayed to
//! recompute it (entries can be created out of band, e.g. the verification
//! bonus).

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model (points projection)
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier; assigned by the application, not auto-incremented
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Current gift-points balance; debited on request, credited on
    /// approval, rejection refund, completion, and verification
    pub gift_points: i64,
    /// Requests made since the last monthly reset
    pub monthly_request_count: i64,
    /// Maximum requests per month; raised when the user is verified
    pub monthly_request_limit: i64,
    pub is_verified: bool,
    /// Blocked users cannot make requests
    pub is_blocked: bool,
    pub last_monthly_reset: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many points ledger entries
    #[sea_orm(has_many = "super::points_entry::Entity")]
    PointsEntries,
}

impl Related<super::points_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PointsEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Display name used for denormalized columns and history entries.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
