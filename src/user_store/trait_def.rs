//! UserStore trait definition.

use super::models::{Rating, ShelfEntry, User};
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Create a user with the given handle, returning its ID.
    fn create_user(&self, handle: &str) -> Result<i64>;

    /// Look a user up by handle.
    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>>;

    /// All user IDs, ascending.
    fn list_user_ids(&self) -> Result<Vec<i64>>;

    fn get_users_count(&self) -> usize;

    /// Record a score, replacing any previous rating by the same user for
    /// the same book.
    fn set_rating(&self, rating: &Rating) -> Result<()>;

    /// All ratings for one user.
    fn get_user_ratings(&self, user_id: i64) -> Result<Vec<Rating>>;

    /// Every rating in the store. The pipeline jobs consume this in bulk.
    fn get_all_ratings(&self) -> Result<Vec<Rating>>;

    /// Put a book on a user's shelf. Adding the same book twice is a no-op.
    fn add_shelf_entry(&self, entry: &ShelfEntry) -> Result<()>;

    /// Take a book off a user's shelf.
    fn remove_shelf_entry(&self, user_id: i64, book_id: &str) -> Result<()>;

    /// Every shelf entry in the store.
    fn get_all_shelf_entries(&self) -> Result<Vec<ShelfEntry>>;
}
