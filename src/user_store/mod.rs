//! Reader accounts and their activity.
//!
//! Holds users, their book ratings and their shelf entries. The pipeline
//! jobs read all three in bulk; writes come from the client-facing paths
//! and from tests.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{Rating, ShelfEntry, User};
pub use schema::USER_VERSIONED_SCHEMAS;
pub use store::SqliteUserStore;
pub use trait_def::UserStore;
