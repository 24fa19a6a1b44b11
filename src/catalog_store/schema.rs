//! SQLite schema definitions for the catalog database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Books table - one row per catalog entry
const BOOKS_TABLE_V1: Table = Table {
    name: "books",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[],
};

/// Book tags table - one row per (book, tag) pair
const BOOK_TAGS_TABLE_V1: Table = Table {
    name: "book_tags",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_book_tags_value", "value")],
    unique_constraints: &[&["book_id", "value"]],
};

/// Book categories table - one row per (book, category) pair
const BOOK_CATEGORIES_TABLE_V1: Table = Table {
    name: "book_categories",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_book_categories_value", "value")],
    unique_constraints: &[&["book_id", "value"]],
};

/// Book authors table - one row per (book, author) pair
const BOOK_AUTHORS_TABLE_V1: Table = Table {
    name: "book_authors",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("book_id", &SqlType::Text, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_book_authors_value", "value")],
    unique_constraints: &[&["book_id", "value"]],
};

/// All versioned schemas for the catalog database.
///
/// Version 1: books plus one facet table per axis
pub const CATALOG_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[
        BOOKS_TABLE_V1,
        BOOK_TAGS_TABLE_V1,
        BOOK_CATEGORIES_TABLE_V1,
        BOOK_AUTHORS_TABLE_V1,
    ],
    migration: None,
}];
