//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod gift;
pub mod item;
pub mod item_event;
pub mod points_entry;
pub mod request;
pub mod user;

// Re-export specific types to avoid conflicts
pub use gift::{Column as GiftColumn, Entity as Gift, Model as GiftModel};
pub use item::{
    Category, Column as ItemColumn, Condition, Entity as Item, ItemStatus, Model as ItemModel,
};
pub use item_event::{Column as ItemEventColumn, Entity as ItemEvent, Model as ItemEventModel};
pub use points_entry::{
    Column as PointsEntryColumn, Entity as PointsEntry, Model as PointsEntryModel,
};
pub use request::{
    Column as RequestColumn, Entity as Request, Model as RequestModel, RequestStatus,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
