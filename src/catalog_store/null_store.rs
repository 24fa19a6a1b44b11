//! Null catalog store implementation.
//!
//! A no-op implementation of CatalogStore for use cases where catalog
//! access is not needed (e.g., scheduler tests).

use super::models::{Book, FacetKind};
use super::trait_def::CatalogStore;
use anyhow::Result;
use std::collections::HashMap;

/// A no-op catalog store that returns empty/none for all operations.
pub struct NullCatalogStore;

impl CatalogStore for NullCatalogStore {
    fn get_book(&self, _id: &str) -> Result<Option<Book>> {
        Ok(None)
    }

    fn insert_book(&self, _book: &Book) -> Result<()> {
        Ok(())
    }

    fn delete_book(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    fn get_books_count(&self) -> usize {
        0
    }

    fn list_all_book_ids(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn get_facet_values(&self, _book_id: &str, _kind: FacetKind) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn get_facet_values_by_book(&self, _kind: FacetKind) -> Result<HashMap<String, Vec<String>>> {
        Ok(HashMap::new())
    }

    fn get_books_with_facet_value(&self, _kind: FacetKind, _value: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
