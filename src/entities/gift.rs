//! Gift entity - the legacy, pre-migration item record shape.
//!
//! Gifts predate the lifecycle and points fields; every attribute except the
//! id may be missing. The core only ever reads this table: on first touch a
//! gift is copied forward into the items table under the same id by the
//! migration adapter, and the original row stays intact as the lookup source
//! of truth.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Legacy gift database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "gifts")]
pub struct Model {
    /// Record id from the legacy store
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Alternate lookup key some legacy rows carry instead of a usable id
    pub legacy_key: Option<String>,
    pub name: Option<String>,
    pub category: Option<String>,
    pub condition: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub zipcode: Option<String>,
    /// Listing time as unix seconds, when the legacy record has one
    pub date_added: Option<i64>,
}

/// Gifts have no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
