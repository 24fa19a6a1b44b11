//! CatalogStore trait definition.

use super::models::{Book, FacetKind};
use anyhow::Result;
use std::collections::HashMap;

/// Trait for catalog storage backends.
///
/// The preference pipeline consumes the catalog exclusively through the
/// read operations; the write operations serve catalog ingestion and tests.
pub trait CatalogStore: Send + Sync {
    /// Get a book with its facet sets by ID.
    fn get_book(&self, id: &str) -> Result<Option<Book>>;

    /// Insert a book and its facet rows. Fails if the ID already exists.
    fn insert_book(&self, book: &Book) -> Result<()>;

    /// Delete a book and its facet rows by ID.
    fn delete_book(&self, id: &str) -> Result<()>;

    /// The number of books in the catalog.
    fn get_books_count(&self) -> usize;

    /// List all book IDs in the catalog.
    fn list_all_book_ids(&self) -> Result<Vec<String>>;

    /// The facet values a single book carries along one axis.
    fn get_facet_values(&self, book_id: &str, kind: FacetKind) -> Result<Vec<String>>;

    /// Bulk book-to-facet-values map for one axis, loaded in a single query.
    ///
    /// Books without any value along the axis are absent from the map.
    fn get_facet_values_by_book(&self, kind: FacetKind) -> Result<HashMap<String, Vec<String>>>;

    /// IDs of every book carrying the given facet value, in ID order.
    fn get_books_with_facet_value(&self, kind: FacetKind, value: &str) -> Result<Vec<String>>;
}
