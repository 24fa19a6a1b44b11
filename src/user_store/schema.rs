//! SQLite schema definitions for the user database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Users table - reader accounts
const USERS_TABLE_V1: Table = Table {
    name: "users",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Ratings table - one row per (user, book), re-rating overwrites
const RATINGS_TABLE_V1: Table = Table {
    name: "ratings",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("score", &SqlType::Real, non_null = true),
        sqlite_column!("rated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_ratings_user_id", "user_id"),
        ("idx_ratings_book_id", "book_id"),
    ],
    unique_constraints: &[&["user_id", "book_id"]],
};

/// Shelf entries table - one row per (user, book) on a shelf
const SHELF_ENTRIES_TABLE_V1: Table = Table {
    name: "shelf_entries",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("added_at", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_shelf_entries_book_id", "book_id")],
    unique_constraints: &[&["user_id", "book_id"]],
};

/// All versioned schemas for the user database.
///
/// Version 1: users, ratings and shelf entries
pub const USER_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[USERS_TABLE_V1, RATINGS_TABLE_V1, SHELF_ENTRIES_TABLE_V1],
    migration: None,
}];
