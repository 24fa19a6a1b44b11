use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub handle: String,
    pub created_at: DateTime<Utc>,
}

/// A reader's score for a book. At most one rating per (user, book);
/// re-rating replaces the previous score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: i64,
    pub book_id: String,
    pub score: f64,
    pub rated_at: DateTime<Utc>,
}

/// A book a reader has put on their shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfEntry {
    pub user_id: i64,
    pub book_id: String,
    pub added_at: DateTime<Utc>,
}
