use super::models::{AffinityRow, RecommendationRow, TrendRow};
use super::schema::DERIVED_VERSIONED_SCHEMAS;
use super::DerivedStore;
use crate::catalog_store::FacetKind;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteDerivedStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDerivedStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open derived database")?;
        conn.execute("PRAGMA foreign_keys = ON;", [])?;

        if is_new_db {
            info!("Creating new derived database at {:?}", path);
            DERIVED_VERSIONED_SCHEMAS
                .last()
                .context("No derived schema defined")?
                .create(&conn)?;
        } else {
            let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
            let db_version = raw_version - BASE_DB_VERSION as i64;

            let schema = DERIVED_VERSIONED_SCHEMAS
                .iter()
                .find(|s| s.version == db_version as usize)
                .with_context(|| format!("Unknown derived database version {}", db_version))?;
            schema.validate(&conn).with_context(|| {
                format!(
                    "Derived database schema validation failed for version {}",
                    db_version
                )
            })?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        DERIVED_VERSIONED_SCHEMAS
            .last()
            .context("No derived schema defined")?
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

    fn row_to_affinity(row: &rusqlite::Row) -> rusqlite::Result<AffinityRow> {
        let facet_type: String = row.get("facet_type")?;
        let rank: i64 = row.get("rank")?;
        let computed_at_str: String = row.get("computed_at")?;
        Ok(AffinityRow {
            user_id: row.get("user_id")?,
            facet_kind: FacetKind::parse(&facet_type).unwrap_or(FacetKind::Tag),
            facet_value: row.get("facet_value")?,
            rank: rank as usize,
            mean_score: row.get("mean_score")?,
            computed_at: Self::parse_datetime(&computed_at_str),
        })
    }

    fn row_to_recommendation(row: &rusqlite::Row) -> rusqlite::Result<RecommendationRow> {
        let facet_type: String = row.get("facet_type")?;
        let computed_at_str: String = row.get("computed_at")?;
        Ok(RecommendationRow {
            user_id: row.get("user_id")?,
            facet_kind: FacetKind::parse(&facet_type).unwrap_or(FacetKind::Tag),
            facet_value: row.get("facet_value")?,
            book_id: row.get("book_id")?,
            computed_at: Self::parse_datetime(&computed_at_str),
        })
    }

    fn row_to_trend(row: &rusqlite::Row) -> rusqlite::Result<TrendRow> {
        let shelf_count: i64 = row.get("shelf_count")?;
        let computed_at_str: String = row.get("computed_at")?;
        Ok(TrendRow {
            tag: row.get("tag")?,
            book_id: row.get("book_id")?,
            shelf_count: shelf_count as usize,
            computed_at: Self::parse_datetime(&computed_at_str),
        })
    }
}

impl DerivedStore for SqliteDerivedStore {
    fn replace_affinity(&self, kind: FacetKind, rows: &[AffinityRow]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM affinity_snapshots WHERE facet_type = ?1",
            params![kind.as_str()],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO affinity_snapshots
                 (user_id, facet_type, facet_value, rank, mean_score, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.user_id,
                    kind.as_str(),
                    row.facet_value,
                    row.rank as i64,
                    row.mean_score,
                    row.computed_at.to_rfc3339()
                ])?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to replace {} affinity snapshot", kind))?;
        Ok(())
    }

    fn get_affinity(&self, kind: FacetKind) -> Result<Vec<AffinityRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, facet_type, facet_value, rank, mean_score, computed_at
             FROM affinity_snapshots WHERE facet_type = ?1
             ORDER BY user_id, rank",
        )?;
        let rows = stmt
            .query_map(params![kind.as_str()], Self::row_to_affinity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_user_affinity(&self, user_id: i64, kind: FacetKind) -> Result<Vec<AffinityRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, facet_type, facet_value, rank, mean_score, computed_at
             FROM affinity_snapshots WHERE user_id = ?1 AND facet_type = ?2
             ORDER BY rank",
        )?;
        let rows = stmt
            .query_map(params![user_id, kind.as_str()], Self::row_to_affinity)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn replace_recommendations(&self, kind: FacetKind, rows: &[RecommendationRow]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM recommendation_snapshots WHERE facet_type = ?1",
            params![kind.as_str()],
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO recommendation_snapshots
                 (user_id, facet_type, facet_value, book_id, computed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.user_id,
                    kind.as_str(),
                    row.facet_value,
                    row.book_id,
                    row.computed_at.to_rfc3339()
                ])?;
            }
        }
        tx.commit()
            .with_context(|| format!("Failed to replace {} recommendation snapshot", kind))?;
        Ok(())
    }

    fn get_user_recommendations(
        &self,
        user_id: i64,
        kind: FacetKind,
    ) -> Result<Vec<RecommendationRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, facet_type, facet_value, book_id, computed_at
             FROM recommendation_snapshots WHERE user_id = ?1 AND facet_type = ?2
             ORDER BY facet_value, book_id",
        )?;
        let rows = stmt
            .query_map(params![user_id, kind.as_str()], Self::row_to_recommendation)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn replace_trends(&self, rows: &[TrendRow]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM trend_candidates", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO trend_candidates (tag, book_id, shelf_count, computed_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.tag,
                    row.book_id,
                    row.shelf_count as i64,
                    row.computed_at.to_rfc3339()
                ])?;
            }
        }
        tx.commit().context("Failed to replace trend table")?;
        Ok(())
    }

    fn get_trending_books(&self, tag: &str) -> Result<Vec<TrendRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT tag, book_id, shelf_count, computed_at
             FROM trend_candidates WHERE tag = ?1
             ORDER BY shelf_count DESC, book_id",
        )?;
        let rows = stmt
            .query_map(params![tag], Self::row_to_trend)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get_all_trends(&self) -> Result<Vec<TrendRow>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT tag, book_id, shelf_count, computed_at
             FROM trend_candidates
             ORDER BY tag, shelf_count DESC, book_id",
        )?;
        let rows = stmt
            .query_map([], Self::row_to_trend)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
