//! Entity module - SeaORM entity definitions for the action tables.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod favorite;
pub mod follow;

// Re-export specific types to avoid conflicts with the domain records
pub use favorite::{Entity as FavoriteEntity, Model as FavoriteModel};
pub use follow::{Entity as FollowEntity, Model as FollowModel};
