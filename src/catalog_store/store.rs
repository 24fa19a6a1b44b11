use super::models::{Book, FacetKind};
use super::schema::CATALOG_VERSIONED_SCHEMAS;
use super::CatalogStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
}

fn facet_table(kind: FacetKind) -> &'static str {
    match kind {
        FacetKind::Tag => "book_tags",
        FacetKind::Category => "book_categories",
        FacetKind::Author => "book_authors",
    }
}

impl SqliteCatalogStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open catalog database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new catalog database at {:?}", path);
            CATALOG_VERSIONED_SCHEMAS
                .last()
                .context("No catalog schema defined")?
                .create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            let schema = CATALOG_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown catalog database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Catalog database schema validation failed for version {}",
                    db_version
                )
            })?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        CATALOG_VERSIONED_SCHEMAS
            .last()
            .context("No catalog schema defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl CatalogStore for SqliteCatalogStore {
    fn get_book(&self, id: &str) -> Result<Option<Book>> {
        let conn = self.conn.lock().unwrap();

        let title: Option<String> = conn
            .query_row(
                "SELECT title FROM books WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(title) = title else {
            return Ok(None);
        };

        let mut facets: [Vec<String>; 3] = Default::default();
        for (slot, kind) in [FacetKind::Tag, FacetKind::Category, FacetKind::Author]
            .into_iter()
            .enumerate()
        {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT value FROM {} WHERE book_id = ?1 ORDER BY value",
                facet_table(kind)
            ))?;
            facets[slot] = stmt
                .query_map(params![id], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
        }
        let [tags, categories, authors] = facets;

        Ok(Some(Book {
            id: id.to_string(),
            title,
            tags,
            categories,
            authors,
        }))
    }

    fn insert_book(&self, book: &Book) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO books (id, title) VALUES (?1, ?2)",
            params![book.id, book.title],
        )
        .with_context(|| format!("Failed to insert book {}", book.id))?;

        for kind in [FacetKind::Tag, FacetKind::Category, FacetKind::Author] {
            let sql = format!(
                "INSERT INTO {} (book_id, value) VALUES (?1, ?2)",
                facet_table(kind)
            );
            for value in book.facet_values(kind) {
                tx.execute(&sql, params![book.id, value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_book(&self, id: &str) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        for kind in [FacetKind::Tag, FacetKind::Category, FacetKind::Author] {
            tx.execute(
                &format!("DELETE FROM {} WHERE book_id = ?1", facet_table(kind)),
                params![id],
            )?;
        }
        tx.execute("DELETE FROM books WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    fn get_books_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM books", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    fn list_all_book_ids(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id FROM books ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_facet_values(&self, book_id: &str, kind: FacetKind) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT value FROM {} WHERE book_id = ?1 ORDER BY value",
            facet_table(kind)
        ))?;
        let values = stmt
            .query_map(params![book_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(values)
    }

    fn get_facet_values_by_book(&self, kind: FacetKind) -> Result<HashMap<String, Vec<String>>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT book_id, value FROM {} ORDER BY book_id, value",
            facet_table(kind)
        ))?;
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (book_id, value) = row?;
            map.entry(book_id).or_default().push(value);
        }
        Ok(map)
    }

    fn get_books_with_facet_value(&self, kind: FacetKind, value: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT book_id FROM {} WHERE value = ?1 ORDER BY book_id",
            facet_table(kind)
        ))?;
        let ids = stmt
            .query_map(params![value], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(id: &str, title: &str, tags: &[&str], categories: &[&str], authors: &[&str]) -> Book {
        Book {
            id: id.to_string(),
            title: title.to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            authors: authors.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_insert_and_get_book() {
        let store = SqliteCatalogStore::new_in_memory().unwrap();
        let original = book(
            "b1",
            "Dust and Ink",
            &["mystery", "noir"],
            &["fiction"],
            &["C. Writer"],
        );
        store.insert_book(&original).unwrap();

        let loaded = store.get_book("b1").unwrap().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(store.get_books_count(), 1);
        assert!(store.get_book("b2").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let store = SqliteCatalogStore::new_in_memory().unwrap();
        let b = book("b1", "Dust and Ink", &[], &[], &[]);
        store.insert_book(&b).unwrap();
        assert!(store.insert_book(&b).is_err());
    }

    #[test]
    fn test_delete_book_removes_facet_rows() {
        let store = SqliteCatalogStore::new_in_memory().unwrap();
        store
            .insert_book(&book("b1", "Dust and Ink", &["noir"], &[], &[]))
            .unwrap();
        store.delete_book("b1").unwrap();

        assert_eq!(store.get_books_count(), 0);
        assert!(store
            .get_books_with_facet_value(FacetKind::Tag, "noir")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_books_with_facet_value_sorted_by_id() {
        let store = SqliteCatalogStore::new_in_memory().unwrap();
        store
            .insert_book(&book("b2", "Second", &["noir"], &[], &[]))
            .unwrap();
        store
            .insert_book(&book("b1", "First", &["noir"], &[], &[]))
            .unwrap();
        store
            .insert_book(&book("b3", "Third", &["cozy"], &[], &[]))
            .unwrap();

        let ids = store
            .get_books_with_facet_value(FacetKind::Tag, "noir")
            .unwrap();
        assert_eq!(ids, ["b1", "b2"]);
    }

    #[test]
    fn test_facet_values_by_book_bulk_map() {
        let store = SqliteCatalogStore::new_in_memory().unwrap();
        store
            .insert_book(&book("b1", "First", &["noir", "mystery"], &[], &[]))
            .unwrap();
        store
            .insert_book(&book("b2", "Second", &[], &["fiction"], &[]))
            .unwrap();

        let by_book = store.get_facet_values_by_book(FacetKind::Tag).unwrap();
        assert_eq!(by_book.len(), 1);
        assert_eq!(by_book["b1"], ["mystery", "noir"]);
    }
}
