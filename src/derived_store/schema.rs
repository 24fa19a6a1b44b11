//! SQLite schema definitions for the derived database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Affinity snapshots table - per-user top facet values by mean score
const AFFINITY_SNAPSHOTS_TABLE_V1: Table = Table {
    name: "affinity_snapshots",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("facet_type", &SqlType::Text, non_null = true),
        sqlite_column!("facet_value", &SqlType::Text, non_null = true),
        sqlite_column!("rank", &SqlType::Integer, non_null = true),
        sqlite_column!("mean_score", &SqlType::Real, non_null = true),
        sqlite_column!("computed_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_affinity_snapshots_facet_type", "facet_type")],
    unique_constraints: &[&["user_id", "facet_type", "rank"]],
};

/// Recommendation snapshots table - candidate books per (user, facet value)
const RECOMMENDATION_SNAPSHOTS_TABLE_V1: Table = Table {
    name: "recommendation_snapshots",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("facet_type", &SqlType::Text, non_null = true),
        sqlite_column!("facet_value", &SqlType::Text, non_null = true),
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("computed_at", &SqlType::Text, non_null = true),
    ],
    indices: &[(
        "idx_recommendation_snapshots_user",
        "user_id, facet_type",
    )],
    unique_constraints: &[&["user_id", "facet_type", "facet_value", "book_id"]],
};

/// Trend candidates table - global per-tag shelf counts
const TREND_CANDIDATES_TABLE_V1: Table = Table {
    name: "trend_candidates",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("tag", &SqlType::Text, non_null = true),
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("shelf_count", &SqlType::Integer, non_null = true),
        sqlite_column!("computed_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_trend_candidates_tag", "tag")],
    unique_constraints: &[&["tag", "book_id"]],
};

/// All versioned schemas for the derived database.
///
/// Version 1: affinity snapshots, recommendation snapshots, trend candidates
pub const DERIVED_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        AFFINITY_SNAPSHOTS_TABLE_V1,
        RECOMMENDATION_SNAPSHOTS_TABLE_V1,
        TREND_CANDIDATES_TABLE_V1,
    ],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_v1_schema_creates_successfully() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &DERIVED_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn test_affinity_rank_unique_per_user_and_axis() {
        let conn = Connection::open_in_memory().unwrap();
        DERIVED_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        conn.execute(
            "INSERT INTO affinity_snapshots (user_id, facet_type, facet_value, rank, mean_score, computed_at)
             VALUES (1, 'tag', 'noir', 1, 4.5, '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        // Same rank on a different axis is fine
        conn.execute(
            "INSERT INTO affinity_snapshots (user_id, facet_type, facet_value, rank, mean_score, computed_at)
             VALUES (1, 'author', 'A. Uthor', 1, 4.0, '2025-01-01T00:00:00Z')",
            [],
        )
        .unwrap();
        // Same (user, axis, rank) is not
        let err = conn.execute(
            "INSERT INTO affinity_snapshots (user_id, facet_type, facet_value, rank, mean_score, computed_at)
             VALUES (1, 'tag', 'cozy', 1, 4.5, '2025-01-01T00:00:00Z')",
            [],
        );
        assert!(err.is_err());
    }
}
