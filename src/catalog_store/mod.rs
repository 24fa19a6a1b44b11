//! Book catalog storage.
//!
//! The catalog holds books and their facet sets (tags, categories, authors).
//! It is read-mostly: the preference pipeline only queries it, writes come
//! from the external catalog ingestion path and from tests.

mod models;
mod null_store;
mod schema;
mod store;
mod trait_def;

pub use models::{Book, FacetKind};
pub use null_store::NullCatalogStore;
pub use schema::CATALOG_VERSIONED_SCHEMAS;
pub use store::SqliteCatalogStore;
pub use trait_def::CatalogStore;
