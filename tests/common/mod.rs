//! Shared test fixtures for pipeline integration tests.

use chrono::Utc;
use readnest_server::background_jobs::JobContext;
use readnest_server::catalog_store::{Book, CatalogStore, SqliteCatalogStore};
use readnest_server::config::PipelineSettings;
use readnest_server::derived_store::{DerivedStore, SqliteDerivedStore};
use readnest_server::server_store::{ServerStore, SqliteServerStore};
use readnest_server::user_store::{Rating, ShelfEntry, SqliteUserStore, UserStore};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// A complete store environment backed by temporary database files.
pub struct TestEnv {
    pub catalog_store: Arc<dyn CatalogStore>,
    pub user_store: Arc<dyn UserStore>,
    pub derived_store: Arc<dyn DerivedStore>,
    pub server_store: Arc<dyn ServerStore>,
    pub settings: PipelineSettings,
    _temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let catalog_store =
            Arc::new(SqliteCatalogStore::new(temp_dir.path().join("catalog.db")).unwrap());
        let user_store = Arc::new(SqliteUserStore::new(temp_dir.path().join("user.db")).unwrap());
        let derived_store =
            Arc::new(SqliteDerivedStore::new(temp_dir.path().join("derived.db")).unwrap());
        let server_store =
            Arc::new(SqliteServerStore::new(temp_dir.path().join("server.db")).unwrap());

        Self {
            catalog_store,
            user_store,
            derived_store,
            server_store,
            settings: PipelineSettings::default(),
            _temp_dir: temp_dir,
        }
    }

    /// Job context wired to this environment's stores.
    pub fn job_context(&self) -> JobContext {
        JobContext::new(
            CancellationToken::new(),
            Arc::clone(&self.catalog_store),
            Arc::clone(&self.user_store),
            Arc::clone(&self.derived_store),
            Arc::clone(&self.server_store),
        )
    }

    pub fn add_book(&self, id: &str, tags: &[&str], categories: &[&str], authors: &[&str]) {
        let book = Book {
            id: id.to_string(),
            title: format!("Title of {id}"),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            categories: categories.iter().map(|s| s.to_string()).collect(),
            authors: authors.iter().map(|s| s.to_string()).collect(),
        };
        self.catalog_store.insert_book(&book).unwrap();
    }

    pub fn create_user(&self, handle: &str) -> i64 {
        self.user_store.create_user(handle).unwrap()
    }

    pub fn rate(&self, user_id: i64, book_id: &str, score: f64) {
        self.user_store
            .set_rating(&Rating {
                user_id,
                book_id: book_id.to_string(),
                score,
                rated_at: Utc::now(),
            })
            .unwrap();
    }

    pub fn shelve(&self, user_id: i64, book_id: &str) {
        self.user_store
            .add_shelf_entry(&ShelfEntry {
                user_id,
                book_id: book_id.to_string(),
                added_at: Utc::now(),
            })
            .unwrap();
    }
}
