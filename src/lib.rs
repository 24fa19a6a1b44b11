//! Readnest Server Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod background_jobs;
pub mod catalog_store;
pub mod config;
pub mod derived_store;
pub mod server_store;
pub mod sqlite_persistence;
pub mod user_store;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use derived_store::{DerivedStore, SqliteDerivedStore};
pub use server_store::{ServerStore, SqliteServerStore};
pub use user_store::{SqliteUserStore, UserStore};
