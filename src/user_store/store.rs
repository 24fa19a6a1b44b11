use super::models::{Rating, ShelfEntry, User};
use super::schema::USER_VERSIONED_SCHEMAS;
use super::UserStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open user database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new user database at {:?}", path);
            USER_VERSIONED_SCHEMAS
                .last()
                .context("No user schema defined")?
                .create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            let schema = USER_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown user database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "User database schema validation failed for version {}",
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
        USER_VERSIONED_SCHEMAS
            .last()
            .context("No user schema defined")?
            .create(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_rating(row: &rusqlite::Row) -> rusqlite::Result<Rating> {
        let rated_at_str: String = row.get("rated_at")?;
        Ok(Rating {
            user_id: row.get("user_id")?,
            book_id: row.get("book_id")?,
            score: row.get("score")?,
            rated_at: Self::parse_datetime(&rated_at_str),
        })
    }

    fn row_to_shelf_entry(row: &rusqlite::Row) -> rusqlite::Result<ShelfEntry> {
        let added_at_str: String = row.get("added_at")?;
        Ok(ShelfEntry {
            user_id: row.get("user_id")?,
            book_id: row.get("book_id")?,
            added_at: Self::parse_datetime(&added_at_str),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, handle: &str) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO users (handle, created_at) VALUES (?1, ?2)",
            params![handle, Utc::now().to_rfc3339()],
        )
        .with_context(|| format!("Failed to create user '{}'", handle))?;
        Ok(conn.last_insert_rowid())
    }

    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let user = conn
            .query_row(
                "SELECT id, handle, created_at FROM users WHERE handle = ?1",
                params![handle],
                |row| {
                    let created_at_str: String = row.get(2)?;
                    Ok(User {
                        id: row.get(0)?,
                        handle: row.get(1)?,
                        created_at: Self::parse_datetime(&created_at_str),
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn list_user_ids(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached("SELECT id FROM users ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn get_users_count(&self) -> usize {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .unwrap_or(0)
    }

    fn set_rating(&self, rating: &Rating) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO ratings (user_id, book_id, score, rated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, book_id)
             DO UPDATE SET score = excluded.score, rated_at = excluded.rated_at",
            params![
                rating.user_id,
                rating.book_id,
                rating.score,
                rating.rated_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn get_user_ratings(&self, user_id: i64) -> Result<Vec<Rating>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, book_id, score, rated_at FROM ratings
             WHERE user_id = ?1 ORDER BY book_id",
        )?;
        let ratings = stmt
            .query_map(params![user_id], Self::row_to_rating)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }

    fn get_all_ratings(&self) -> Result<Vec<Rating>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, book_id, score, rated_at FROM ratings
             ORDER BY user_id, book_id",
        )?;
        let ratings = stmt
            .query_map([], Self::row_to_rating)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }

    fn add_shelf_entry(&self, entry: &ShelfEntry) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR IGNORE INTO shelf_entries (user_id, book_id, added_at)
             VALUES (?1, ?2, ?3)",
            params![entry.user_id, entry.book_id, entry.added_at.to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove_shelf_entry(&self, user_id: i64, book_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM shelf_entries WHERE user_id = ?1 AND book_id = ?2",
            params![user_id, book_id],
        )?;
        Ok(())
    }

    fn get_all_shelf_entries(&self) -> Result<Vec<ShelfEntry>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, book_id, added_at FROM shelf_entries
             ORDER BY user_id, book_id",
        )?;
        let entries = stmt
            .query_map([], Self::row_to_shelf_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}
